pub mod bounds;
pub mod commands;
pub mod config;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod init_config;
pub mod io;
pub mod particle;
pub mod profiler;
pub mod random;
pub mod region;
pub mod simulation;
pub mod species;
pub mod units;

pub use error::{Error, Result};
pub use simulation::{HoldConstant, Notification, RevertReason, Simulation};

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));

// simulation/mod.rs
// Re-exports and module declarations for simulation submodules

pub mod collision;
pub mod diffusion;
pub mod hold_constant;
pub mod particle_system;
pub mod pressure;
pub mod simulation;
pub mod thermal;
pub use hold_constant::{HoldConstant, Notification, RevertReason};
pub use simulation::*;

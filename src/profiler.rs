// profiler.rs
// Scoped timing of step phases, compiled in only with the `profiling` feature

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SectionStats {
    pub total: Duration,
    pub calls: u64,
}

impl SectionStats {
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Cumulative time per named section.
#[derive(Debug, Default)]
pub struct Profiler {
    pub sections: HashMap<&'static str, SectionStats>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        let stats = self.sections.entry(name).or_default();
        stats.total += elapsed;
        stats.calls += 1;
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        self.record(guard.name, guard.start.elapsed());
    }

    /// Sections by descending total time.
    pub fn report_sorted(&self) -> Vec<(&'static str, SectionStats)> {
        let mut v: Vec<_> = self.sections.iter().map(|(n, s)| (*n, *s)).collect();
        v.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
        v
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn log_and_clear(&mut self) {
        for (name, stats) in self.report_sorted() {
            info!(section = name, total = ?stats.total, calls = stats.calls, mean = ?stats.mean(), "profile");
        }
        self.clear();
    }
}

pub struct ProfilerGuard {
    name: &'static str,
    start: Instant,
}

/// Start a profiling section. The global profiler is updated when the guard drops.
pub fn start(name: &'static str) -> ProfilerGuard {
    ProfilerGuard { name, start: Instant::now() }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Profile the enclosing scope when the `profiling` feature is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($name);
    };
}

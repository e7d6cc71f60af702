// random.rs
// Injectable random source. The simulation owns exactly one and every random draw
// (injection angle/temperature, diffusion placement, gauge noise) goes through it.

use rand::rngs::StdRng;
use rand::{rng, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

pub trait RandomSource {
    /// Uniform sample in [0, 1).
    fn next_f64(&mut self) -> f64;

    /// Sample from the standard normal distribution.
    fn next_gaussian(&mut self) -> f64;

    /// Uniform sample in [lo, hi).
    fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Default source backed by `StdRng`.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn new() -> Self {
        Self { rng: StdRng::seed_from_u64(rng().random()) }
    }

    /// Reproducible source for tests and scripted runs.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for StdRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn next_gaussian(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

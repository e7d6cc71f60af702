// diagnostics.rs
// Read-only telemetry snapshots and the wall-collision counter

use crate::simulation::{HoldConstant, Simulation};
use crate::species::Species;
use serde::{Deserialize, Serialize};

/// Counts wall collisions over a fixed model-time window, like a stopwatch the user
/// can start and stop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionCounter {
    pub running: bool,
    /// ps
    pub sample_period: f64,
    elapsed: f64,
    count: usize,
    /// Count from the last completed window
    pub last_sample: Option<usize>,
}

impl CollisionCounter {
    pub fn new(sample_period: f64) -> Self {
        Self { running: false, sample_period, elapsed: 0.0, count: 0, last_sample: None }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.elapsed = 0.0;
        self.count = 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn record(&mut self, wall_hits: usize, dt: f64) {
        if !self.running {
            return;
        }
        self.count += wall_hits;
        self.elapsed += dt;
        if self.elapsed >= self.sample_period {
            self.last_sample = Some(self.count);
            self.elapsed = 0.0;
            self.count = 0;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTelemetry {
    pub species: Species,
    pub inside: usize,
    pub outside: usize,
    /// pm/ps, `None` when no inside particles
    pub average_speed: Option<f64>,
}

/// Everything a display needs, captured between steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub time: f64,
    pub frame: usize,
    pub species: Vec<SpeciesTelemetry>,
    pub total_inside: usize,
    pub temperature: Option<f64>,
    /// kPa
    pub pressure: f64,
    pub gauge_pressure: f64,
    /// pm³
    pub volume: f64,
    pub width: f64,
    pub hold_constant: HoldConstant,
    pub lid_open: bool,
    pub particle_collisions: usize,
    pub wall_collisions: usize,
    pub total_particle_collisions: u64,
    pub total_wall_collisions: u64,
    /// Particles per region, grid order
    pub region_occupancy: Vec<usize>,
    pub total_kinetic_energy: f64,
}

impl Telemetry {
    pub fn capture(sim: &Simulation) -> Self {
        let species = Species::ALL
            .iter()
            .map(|&s| {
                let arrays = sim.particles.species(s);
                let average_speed = if arrays.inside.is_empty() {
                    None
                } else {
                    Some(arrays.inside.iter().map(|p| p.speed()).sum::<f64>() / arrays.inside.len() as f64)
                };
                SpeciesTelemetry {
                    species: s,
                    inside: arrays.inside.len(),
                    outside: arrays.outside.len(),
                    average_speed,
                }
            })
            .collect();
        Self {
            time: sim.time,
            frame: sim.frame,
            species,
            total_inside: sim.particles.total_inside(),
            temperature: sim.temperature,
            pressure: sim.pressure.value,
            gauge_pressure: sim.pressure.gauge.value,
            volume: sim.container.volume(),
            width: sim.container.width,
            hold_constant: sim.hold_constant,
            lid_open: sim.container.is_lid_open(),
            particle_collisions: sim.detector.particle_collisions,
            wall_collisions: sim.detector.wall_collisions,
            total_particle_collisions: sim.detector.total_particle_collisions,
            total_wall_collisions: sim.detector.total_wall_collisions,
            region_occupancy: sim.detector.grid.occupancy(),
            total_kinetic_energy: sim.particles.total_kinetic_energy(),
        }
    }

    /// How many regions hold exactly `k` particles, for k = 0..=max.
    pub fn occupancy_histogram(&self) -> Vec<usize> {
        let max = self.region_occupancy.iter().copied().max().unwrap_or(0);
        let mut hist = vec![0; max + 1];
        for &n in &self.region_occupancy {
            hist[n] += 1;
        }
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::random::StdRandom;

    #[test]
    fn counter_reports_after_full_window() {
        let mut c = CollisionCounter::new(1.0);
        c.record(5, 0.5);
        assert_eq!(c.last_sample, None, "not running");
        c.start();
        c.record(3, 0.5);
        assert_eq!(c.last_sample, None);
        c.record(4, 0.5);
        assert_eq!(c.last_sample, Some(7));
        c.stop();
        c.record(100, 1.0);
        assert_eq!(c.last_sample, Some(7));
    }

    #[test]
    fn telemetry_reflects_population() {
        let mut sim = Simulation::with_random(SimConfig::default(), Box::new(StdRandom::seeded(5)));
        sim.set_species_count(Species::Heavy, 12);
        sim.set_species_count(Species::Light, 4);
        sim.step(0.2);
        let t = Telemetry::capture(&sim);
        assert_eq!(t.total_inside, 16);
        assert_eq!(t.species[Species::Heavy.index()].inside, 12);
        assert_eq!(t.species[Species::Light.index()].inside, 4);
        assert!(t.temperature.is_some());
        // Every particle sits in at least one region.
        assert!(t.region_occupancy.iter().sum::<usize>() >= 16);
        assert_eq!(t.occupancy_histogram().iter().sum::<usize>(), t.region_occupancy.len());
    }
}

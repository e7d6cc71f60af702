// simulation/diffusion.rs
// Divider, per-side injection and per-side telemetry for the two-species diffusion setup

use super::particle_system::Injector;
use super::Simulation;
use crate::container::Side;
use crate::particle::Particle;
use crate::species::Species;
use crate::units;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DIFFUSION_SPECIES: [Species; 2] = [Species::Diffusion1, Species::Diffusion2];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SideData {
    /// Indexed like `DIFFUSION_SPECIES`
    pub counts: [usize; 2],
    /// K, `None` for an empty side
    pub average_temperature: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffusionData {
    pub left: SideData,
    pub right: SideData,
    /// Mean x of each diffusion species (pm), `None` when it has no particles
    pub center_of_mass_x: [Option<f64>; 2],
}

impl DiffusionData {
    pub fn side(&self, side: Side) -> &SideData {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

fn side_data<'a>(particles: impl Iterator<Item = &'a Particle>) -> SideData {
    let mut data = SideData::default();
    let (mut ke, mut n) = (0.0, 0usize);
    for p in particles {
        if let Some(i) = DIFFUSION_SPECIES.iter().position(|s| *s == p.species) {
            data.counts[i] += 1;
        }
        ke += p.kinetic_energy();
        n += 1;
    }
    if n > 0 {
        data.average_temperature = Some(units::temperature_for_kinetic_energy(ke / n as f64));
    }
    data
}

impl Simulation {
    /// Insert or remove the divider. Inserting pushes overlapping particles to the
    /// side their centre is on.
    pub fn set_divider(&mut self, present: bool) {
        if self.container.has_divider == present {
            return;
        }
        self.container.has_divider = present;
        if present {
            self.particles
                .clear_divider(self.container.divider_x(), self.container.divider_thickness);
        }
        debug!(present, "divider changed");
    }

    pub fn set_side_count(&mut self, side: Side, species: Species, n: usize) {
        let temperature = self.initial_temperature();
        let injector = Injector {
            config: &self.config,
            container: &self.container,
            temperature,
            sample_temperatures: self.detector.particle_particle_enabled,
        };
        let props = self.species.get(species);
        self.particles.set_side_count(species, side, n, props, &injector, self.random.as_mut());
    }

    /// Returns the mass actually applied, or `None` for a species with fixed mass.
    pub fn set_species_mass(&mut self, species: Species, mass: f64) -> Option<f64> {
        let mass = self.species.set_mass(species, mass)?;
        self.particles.update_species_props(species, self.species.get(species));
        Some(mass)
    }

    pub fn set_species_radius(&mut self, species: Species, radius: f64) -> Option<f64> {
        let radius = self.species.set_radius(species, radius)?;
        self.particles.update_species_props(species, self.species.get(species));
        Some(radius)
    }

    pub fn diffusion_data(&self) -> DiffusionData {
        let x = self.container.divider_x();
        let inside: Vec<&Particle> = self.particles.inside().collect();
        let left = side_data(inside.iter().copied().filter(|p| p.pos.x <= x));
        let right = side_data(inside.iter().copied().filter(|p| p.pos.x > x));
        let center_of_mass_x = DIFFUSION_SPECIES.map(|species| {
            let arr = &self.particles.species(species).inside;
            if arr.is_empty() {
                None
            } else {
                Some(arr.iter().map(|p| p.pos.x).sum::<f64>() / arr.len() as f64)
            }
        });
        DiffusionData { left, right, center_of_mass_x }
    }
}

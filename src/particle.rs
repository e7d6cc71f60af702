// particle.rs
// Point-mass rigid disk: position, previous position, velocity, mass, radius

use crate::bounds::Bounds;
use crate::species::{Species, SpeciesProps};
use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// pm
    pub pos: DVec2,
    /// Position before the most recent `step`, used by collision repositioning.
    pub prev_pos: DVec2,
    /// pm/ps
    pub vel: DVec2,
    /// AMU
    pub mass: f64,
    /// pm
    pub radius: f64,
    pub species: Species,
}

impl Particle {
    pub fn new(species: Species, props: SpeciesProps, pos: DVec2, vel: DVec2) -> Self {
        debug_assert!(props.mass > 0.0 && props.radius > 0.0, "mass and radius must be > 0");
        Self {
            pos,
            prev_pos: pos,
            vel,
            mass: props.mass,
            radius: props.radius,
            species,
        }
    }

    /// Advance by `vel * dt`, remembering where we came from.
    #[inline]
    pub fn step(&mut self, dt: f64) {
        self.prev_pos = self.pos;
        self.pos += self.vel * dt;
    }

    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.vel.mag_sq()
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.vel.mag()
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.pos.x - self.radius
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.pos.x + self.radius
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.pos.y - self.radius
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.pos.y + self.radius
    }

    /// Bounding square of the disk.
    #[inline]
    pub fn bounding_box(&self) -> Bounds {
        Bounds::around(self.pos, self.radius)
    }

    /// Disks touch or overlap now (inclusive).
    #[inline]
    pub fn contacts(&self, other: &Particle) -> bool {
        let r = self.radius + other.radius;
        (self.pos - other.pos).mag_sq() <= r * r
    }

    /// Disks touched or overlapped at their previous positions.
    #[inline]
    pub fn contacted_previously(&self, other: &Particle) -> bool {
        let r = self.radius + other.radius;
        (self.prev_pos - other.prev_pos).mag_sq() <= r * r
    }

    /// Change mass while keeping kinetic energy.
    pub fn set_mass_keep_energy(&mut self, mass: f64) {
        debug_assert!(mass > 0.0);
        self.vel *= (self.mass / mass).sqrt();
        self.mass = mass;
    }
}

//! Physical unit definitions and conversions.
//!
//! Base units:
//! - Length: picometer (pm)
//! - Time: picosecond (ps)
//! - Mass: atomic mass unit (AMU)
//! - Temperature: kelvin (K)
//!
//! Pressure is reported in kilopascals (kPa).

/// Boltzmann constant in AMU⋅pm²/(ps²⋅K).
/// k = 1.380649e-23 J/K; 1 kg = 6.02214076e26 AMU, 1 m²/s² = 1 pm²/ps².
pub const BOLTZMANN: f64 = 8314.462_618_153_24;

/// Converts pressure from AMU/(pm⋅ps²) to kPa.
pub const PRESSURE_CONVERSION_SCALE: f64 = 1.660_539_066_60e6;

/// Root-mean-square speed (pm/ps) of a particle of `mass` (AMU) at `temperature` (K).
#[inline]
pub fn rms_speed(temperature: f64, mass: f64) -> f64 {
    (3.0 * BOLTZMANN * temperature / mass).sqrt()
}

/// Temperature (K) corresponding to an average kinetic energy per particle.
#[inline]
pub fn temperature_for_kinetic_energy(average_ke: f64) -> f64 {
    (2.0 / 3.0) * average_ke / BOLTZMANN
}

/// Average kinetic energy per particle (AMU⋅pm²/ps²) at `temperature`.
#[inline]
pub fn kinetic_energy_for_temperature(temperature: f64) -> f64 {
    1.5 * BOLTZMANN * temperature
}

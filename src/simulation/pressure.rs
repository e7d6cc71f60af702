// simulation/pressure.rs
// Ideal-gas pressure, the wall-collision latch, and the periodic noisy gauge

use crate::config::SimConfig;
use crate::random::RandomSource;
use crate::units;
use serde::{Deserialize, Serialize};

/// `P = NkT/V` in kPa. `volume` in pm³.
#[inline]
pub fn ideal_pressure(n: usize, temperature: f64, volume: f64) -> f64 {
    debug_assert!(volume > 0.0);
    n as f64 * units::BOLTZMANN * temperature / volume * units::PRESSURE_CONVERSION_SCALE
}

/// Volume (pm³) at which `n` particles at `temperature` exert `pressure` kPa.
#[inline]
pub fn ideal_volume(n: usize, temperature: f64, pressure: f64) -> f64 {
    debug_assert!(pressure > 0.0);
    n as f64 * units::BOLTZMANN * temperature * units::PRESSURE_CONVERSION_SCALE / pressure
}

/// Temperature (K) at which `n` particles in `volume` exert `pressure` kPa.
#[inline]
pub fn ideal_temperature(n: usize, pressure: f64, volume: f64) -> f64 {
    debug_assert!(n > 0);
    pressure / units::PRESSURE_CONVERSION_SCALE * volume / (n as f64 * units::BOLTZMANN)
}

/// Display reading of the pressure, refreshed at a fixed real-time interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureGauge {
    /// Real seconds between samples
    pub sample_interval: f64,
    accumulated: f64,
    pub noise_enabled: bool,
    /// kPa
    pub value: f64,
}

impl PressureGauge {
    pub fn new(sample_interval: f64) -> Self {
        Self { sample_interval, accumulated: 0.0, noise_enabled: true, value: 0.0 }
    }

    /// Advance by `real_dt` seconds. Zero means a paused update: sample now, without noise.
    pub fn update(
        &mut self,
        pressure: f64,
        temperature: Option<f64>,
        real_dt: f64,
        config: &SimConfig,
        rng: &mut dyn RandomSource,
    ) {
        if real_dt <= 0.0 {
            self.value = pressure;
            self.accumulated = 0.0;
            return;
        }
        self.accumulated += real_dt;
        if self.accumulated < self.sample_interval {
            return;
        }
        self.accumulated = 0.0;
        self.value = if self.noise_enabled && pressure > 0.0 {
            let amp = noise_amplitude(pressure, temperature.unwrap_or(0.0), config);
            (pressure + rng.next_range(-amp, amp)).max(0.0)
        } else {
            pressure
        };
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.value = 0.0;
    }
}

/// Full noise at zero pressure, none at `max_pressure`, damped below the temperature knee.
pub fn noise_amplitude(pressure: f64, temperature: f64, config: &SimConfig) -> f64 {
    let by_pressure = config.max_pressure_noise * (1.0 - pressure / config.max_pressure).clamp(0.0, 1.0);
    let by_temperature = (temperature / config.pressure_noise_temperature_knee).clamp(0.0, 1.0);
    by_pressure * by_temperature
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureModel {
    /// Latch: pressure reads 0 until a particle has hit a wall
    pub enabled: bool,
    /// True (noise-free) pressure, kPa
    pub value: f64,
    pub gauge: PressureGauge,
}

impl PressureModel {
    pub fn new(config: &SimConfig) -> Self {
        Self { enabled: false, value: 0.0, gauge: PressureGauge::new(config.pressure_sample_interval) }
    }

    /// Recompute from the ensemble and feed the gauge.
    pub fn update(
        &mut self,
        n: usize,
        temperature: Option<f64>,
        volume: f64,
        real_dt: f64,
        config: &SimConfig,
        rng: &mut dyn RandomSource,
    ) {
        if n == 0 {
            self.enabled = false;
        }
        self.value = match temperature {
            Some(t) if self.enabled => ideal_pressure(n, t, volume),
            _ => 0.0,
        };
        debug_assert!(self.value.is_finite() && self.value >= 0.0);
        self.gauge.update(self.value, temperature, real_dt, config, rng);
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.value = 0.0;
        self.gauge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;

    #[test]
    fn ideal_gas_helpers_agree() {
        let (n, t, v) = (100, 300.0, 10000.0 * 8750.0 * 8750.0);
        let p = ideal_pressure(n, t, v);
        assert!((ideal_volume(n, t, p) - v).abs() / v < 1e-12);
        assert!((ideal_temperature(n, p, v) - t).abs() / t < 1e-12);
    }

    #[test]
    fn latch_pins_pressure_to_zero() {
        let config = SimConfig::default();
        let mut rng = StdRandom::seeded(0);
        let mut model = PressureModel::new(&config);
        model.update(10, Some(300.0), 1.0e12, 0.0, &config, &mut rng);
        assert_eq!(model.value, 0.0);
        model.enabled = true;
        model.update(10, Some(300.0), 1.0e12, 0.0, &config, &mut rng);
        assert!(model.value > 0.0);
        model.update(0, None, 1.0e12, 0.0, &config, &mut rng);
        assert!(!model.enabled);
        assert_eq!(model.value, 0.0);
    }

    #[test]
    fn gauge_samples_on_interval_only() {
        let config = SimConfig::default();
        let mut rng = StdRandom::seeded(0);
        let mut gauge = PressureGauge::new(config.pressure_sample_interval);
        gauge.noise_enabled = false;
        gauge.update(100.0, Some(300.0), 0.5, &config, &mut rng);
        assert_eq!(gauge.value, 0.0);
        gauge.update(100.0, Some(300.0), 0.5, &config, &mut rng);
        assert_eq!(gauge.value, 100.0);
    }

    #[test]
    fn paused_sample_is_exact() {
        let config = SimConfig::default();
        let mut rng = StdRandom::seeded(0);
        let mut gauge = PressureGauge::new(config.pressure_sample_interval);
        gauge.update(250.0, Some(300.0), 0.0, &config, &mut rng);
        assert_eq!(gauge.value, 250.0);
    }

    #[test]
    fn noise_is_bounded() {
        let config = SimConfig::default();
        let mut rng = StdRandom::seeded(9);
        let mut gauge = PressureGauge::new(config.pressure_sample_interval);
        let amp = noise_amplitude(100.0, 300.0, &config);
        assert!(amp > 0.0 && amp <= config.max_pressure_noise);
        for _ in 0..200 {
            gauge.update(100.0, Some(300.0), 1.0, &config, &mut rng);
            assert!((gauge.value - 100.0).abs() <= amp);
        }
    }

    #[test]
    fn noise_fades_with_pressure_and_cold() {
        let config = SimConfig::default();
        assert_eq!(noise_amplitude(config.max_pressure, 300.0, &config), 0.0);
        assert_eq!(noise_amplitude(10.0, 0.0, &config), 0.0);
        let half = noise_amplitude(0.0, config.pressure_noise_temperature_knee / 2.0, &config);
        assert!((half - config.max_pressure_noise / 2.0).abs() < 1e-12);
    }
}

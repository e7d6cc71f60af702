// Centralized configuration for simulation parameters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ====================
// Container
// ====================
/// Inside height of the container (pm). Fixed.
pub const CONTAINER_HEIGHT: f64 = 8750.0;
/// Depth used for volume (pm). Fixed.
pub const CONTAINER_DEPTH: f64 = 8750.0;
pub const CONTAINER_WALL_THICKNESS: f64 = 75.0;
pub const CONTAINER_WIDTH_MIN: f64 = 5000.0;
pub const CONTAINER_WIDTH_MAX: f64 = 15000.0;
pub const CONTAINER_WIDTH_DEFAULT: f64 = 10000.0;
/// The lid never gets narrower than this, so the opening is at most `width - MIN_LID_WIDTH`.
pub const MIN_LID_WIDTH: f64 = 2500.0;
/// Fastest the left wall moves when the width is animated (pm/ps)
pub const WALL_SPEED_LIMIT: f64 = 200.0;
pub const DIVIDER_THICKNESS: f64 = 50.0;
/// Region edge length is container height divided by this
pub const REGIONS_PER_HEIGHT: f64 = 4.0;
/// Largest region grid a config may ask for
pub const MAX_REGIONS: f64 = 65536.0;
/// Escaped particles are removed once they leave the container's maximum bounds grown by this (pm)
pub const OFFSCREEN_MARGIN: f64 = 15000.0;

// ====================
// Temperature
// ====================
/// Default injection temperature (K)
pub const DEFAULT_TEMPERATURE: f64 = 300.0;
/// Used by injection when the container is empty and no injection temperature is set
pub const FALLBACK_TEMPERATURE: f64 = 300.0;
pub const MIN_INJECTION_TEMPERATURE: f64 = 50.0;
pub const MAX_INJECTION_TEMPERATURE: f64 = 1000.0;
/// Reaching this clears the container (K)
pub const MAX_TEMPERATURE: f64 = 2000.0;

// ====================
// Injection
// ====================
/// Standard deviation of injected temperatures as a fraction of the target mean
pub const INJECTION_TEMPERATURE_SIGMA_FRACTION: f64 = 0.1;
/// Injected temperatures are clamped to mean ± this many standard deviations
pub const INJECTION_TEMPERATURE_CLAMP_SIGMAS: f64 = 2.0;
/// Particles enter heading in -x, spread across this cone (radians)
pub const INJECTION_DISPERSION_ANGLE: f64 = PI / 2.0;
pub const INJECTION_DIRECTION: f64 = PI;
/// Entry point height as a fraction of container height, on the fixed (right) wall
pub const INJECTION_Y_FRACTION: f64 = 0.5;

// ====================
// Heat/Cool
// ====================
/// Velocity scale per step is `1 + factor / HEAT_COOL_K`
pub const HEAT_COOL_K: f64 = 100.0;

// ====================
// Pressure
// ====================
/// Pressure above this blows the lid off (kPa)
pub const MAX_PRESSURE: f64 = 20000.0;
/// Real time between gauge samples (s)
pub const PRESSURE_SAMPLE_INTERVAL: f64 = 0.75;
/// Gauge noise amplitude at zero pressure (kPa)
pub const MAX_PRESSURE_NOISE: f64 = 50.0;
/// Gauge noise fades out linearly below this temperature (K)
pub const PRESSURE_NOISE_TEMPERATURE_KNEE: f64 = 50.0;

// ====================
// Hold Constant
// ====================
/// Decimal places kept when compensating the width for constant pressure
pub const WIDTH_ROUNDING_DECIMALS: u32 = 5;

// ====================
// Time
// ====================
/// Default model timestep (ps)
pub const DEFAULT_DT_PS: f64 = 0.2;
/// Model picoseconds per real second at normal speed
pub const MODEL_PS_PER_SECOND: f64 = 12.0;
/// Sample period for the wall-collision counter (ps)
pub const COLLISION_COUNTER_SAMPLE_PERIOD: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    #[inline]
    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }
}

/// Every field defaults, so a config file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub container_height: f64,
    pub container_depth: f64,
    pub wall_thickness: f64,
    pub width_range: ValueRange,
    pub default_width: f64,
    pub min_lid_width: f64,
    pub wall_speed_limit: f64,
    pub divider_thickness: f64,
    pub regions_per_height: f64,
    pub offscreen_margin: f64,

    pub default_temperature: f64,
    pub fallback_temperature: f64,
    pub injection_temperature_range: ValueRange,
    pub max_temperature: f64,

    pub injection_sigma_fraction: f64,
    pub injection_clamp_sigmas: f64,
    pub injection_dispersion_angle: f64,
    pub injection_direction: f64,
    pub injection_y_fraction: f64,

    pub heat_cool_k: f64,

    pub max_pressure: f64,
    /// Interval between gauge samples (s)
    #[serde(alias = "pressure_sample_period")]
    pub pressure_sample_interval: f64,
    pub max_pressure_noise: f64,
    pub pressure_noise_temperature_knee: f64,

    pub width_rounding_decimals: u32,

    pub dt: f64,
    pub model_ps_per_second: f64,
    pub collision_counter_sample_period: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            container_height: CONTAINER_HEIGHT,
            container_depth: CONTAINER_DEPTH,
            wall_thickness: CONTAINER_WALL_THICKNESS,
            width_range: ValueRange::new(CONTAINER_WIDTH_MIN, CONTAINER_WIDTH_MAX),
            default_width: CONTAINER_WIDTH_DEFAULT,
            min_lid_width: MIN_LID_WIDTH,
            wall_speed_limit: WALL_SPEED_LIMIT,
            divider_thickness: DIVIDER_THICKNESS,
            regions_per_height: REGIONS_PER_HEIGHT,
            offscreen_margin: OFFSCREEN_MARGIN,

            default_temperature: DEFAULT_TEMPERATURE,
            fallback_temperature: FALLBACK_TEMPERATURE,
            injection_temperature_range: ValueRange::new(
                MIN_INJECTION_TEMPERATURE,
                MAX_INJECTION_TEMPERATURE,
            ),
            max_temperature: MAX_TEMPERATURE,

            injection_sigma_fraction: INJECTION_TEMPERATURE_SIGMA_FRACTION,
            injection_clamp_sigmas: INJECTION_TEMPERATURE_CLAMP_SIGMAS,
            injection_dispersion_angle: INJECTION_DISPERSION_ANGLE,
            injection_direction: INJECTION_DIRECTION,
            injection_y_fraction: INJECTION_Y_FRACTION,

            heat_cool_k: HEAT_COOL_K,

            max_pressure: MAX_PRESSURE,
            pressure_sample_interval: PRESSURE_SAMPLE_INTERVAL,
            max_pressure_noise: MAX_PRESSURE_NOISE,
            pressure_noise_temperature_knee: PRESSURE_NOISE_TEMPERATURE_KNEE,

            width_rounding_decimals: WIDTH_ROUNDING_DECIMALS,

            dt: DEFAULT_DT_PS,
            model_ps_per_second: MODEL_PS_PER_SECOND,
            collision_counter_sample_period: COLLISION_COUNTER_SAMPLE_PERIOD,
        }
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(format!("{name} must be finite and > 0, got {v}")))
    }
}

impl SimConfig {
    /// Reject configurations the step pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        positive("container_height", self.container_height)?;
        positive("container_depth", self.container_depth)?;
        positive("width_range.min", self.width_range.min)?;
        positive("regions_per_height", self.regions_per_height)?;
        positive("heat_cool_k", self.heat_cool_k)?;
        positive("max_temperature", self.max_temperature)?;
        positive("max_pressure", self.max_pressure)?;
        positive("pressure_sample_interval", self.pressure_sample_interval)?;
        positive("dt", self.dt)?;
        positive("model_ps_per_second", self.model_ps_per_second)?;
        positive("collision_counter_sample_period", self.collision_counter_sample_period)?;
        positive("injection_temperature_range.min", self.injection_temperature_range.min)?;
        positive("width_range.max", self.width_range.max)?;
        if self.width_range.min > self.width_range.max {
            return Err(Error::invalid("width_range is inverted"));
        }
        let cell = self.region_size();
        let regions = (self.width_range.max / cell).ceil() * self.regions_per_height.ceil();
        if !(regions <= MAX_REGIONS) {
            return Err(Error::invalid(format!(
                "width_range.max {} needs {regions} regions, limit is {MAX_REGIONS}",
                self.width_range.max
            )));
        }
        if !self.width_range.contains(self.default_width) {
            return Err(Error::invalid(format!(
                "default_width {} outside width range [{}, {}]",
                self.default_width, self.width_range.min, self.width_range.max
            )));
        }
        if self.injection_temperature_range.min > self.injection_temperature_range.max {
            return Err(Error::invalid("injection_temperature_range is inverted"));
        }
        if !(self.min_lid_width >= 0.0 && self.min_lid_width <= self.width_range.min) {
            return Err(Error::invalid("min_lid_width must lie in [0, width_range.min]"));
        }
        if !(0.0..1.0).contains(&(self.injection_sigma_fraction * self.injection_clamp_sigmas)) {
            return Err(Error::invalid(
                "injection_sigma_fraction * injection_clamp_sigmas must lie in [0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&self.injection_y_fraction) {
            return Err(Error::invalid("injection_y_fraction must lie in [0, 1]"));
        }
        if self.wall_speed_limit.is_nan() || self.wall_speed_limit <= 0.0 {
            return Err(Error::invalid("wall_speed_limit must be > 0"));
        }
        if self.divider_thickness < 0.0 || self.divider_thickness >= self.width_range.min {
            return Err(Error::invalid("divider_thickness must lie in [0, width_range.min)"));
        }
        Ok(())
    }

    /// Edge length of one collision region (pm).
    pub fn region_size(&self) -> f64 {
        self.container_height / self.regions_per_height
    }

    /// Real seconds that correspond to `dt` model picoseconds.
    pub fn real_seconds(&self, dt: f64) -> f64 {
        dt / self.model_ps_per_second
    }
}

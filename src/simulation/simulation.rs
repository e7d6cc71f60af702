// simulation/simulation.rs
// Contains the Simulation struct and the fixed-order step pipeline

use super::collision::CollisionDetector;
use super::hold_constant::{HoldConstant, Notification};
use super::particle_system::{Injector, ParticleSystem};
use super::pressure::PressureModel;
use super::thermal;
use crate::bounds::Bounds;
use crate::config::SimConfig;
use crate::container::Container;
use crate::diagnostics::CollisionCounter;
use crate::error::Result;
use crate::profile_scope;
use crate::random::{RandomSource, StdRandom};
use crate::species::{Species, SpeciesTable};
use tracing::{debug, warn};

/// Upper bound on fixed steps run by one `advance` call, so a long stall does not
/// turn into a burst of catch-up work.
const MAX_STEPS_PER_ADVANCE: usize = 10;

/// The main simulation state and logic for the gas.
pub struct Simulation {
    pub config: SimConfig,
    pub species: SpeciesTable,
    pub container: Container,
    pub particles: ParticleSystem,
    pub detector: CollisionDetector,
    /// K, `None` when the container is empty
    pub temperature: Option<f64>,
    pub pressure: PressureModel,
    pub hold_constant: HoldConstant,
    /// In [-1, 1]; positive heats
    pub heat_cool_factor: f64,
    /// User-chosen injection temperature (K). `None` means match the container.
    pub injection_temperature: Option<f64>,
    pub paused: bool,
    /// Model time (ps)
    pub time: f64,
    pub frame: usize,
    pub collision_counter: CollisionCounter,
    /// Escaped particles are removed once they stop intersecting this.
    pub visible_bounds: Bounds,
    /// Real time not yet consumed by `advance`
    accumulator: f64,
    notifications: Vec<Notification>,
    pub(crate) random: Box<dyn RandomSource>,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_random(SimConfig::default(), Box::new(StdRandom::new()))
    }

    /// Validates `config` and builds a simulation on an OS-seeded random source.
    pub fn with_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_random(config, Box::new(StdRandom::new())))
    }

    pub fn with_random(config: SimConfig, random: Box<dyn RandomSource>) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid SimConfig");
        let container = Container::new(&config);
        let detector = CollisionDetector::new(&container, &config);
        let pressure = PressureModel::new(&config);
        let visible_bounds = container.max_bounds().dilated(config.offscreen_margin);
        let collision_counter = CollisionCounter::new(config.collision_counter_sample_period);
        Self {
            config,
            species: SpeciesTable::default(),
            container,
            particles: ParticleSystem::new(),
            detector,
            temperature: None,
            pressure,
            hold_constant: HoldConstant::Nothing,
            heat_cool_factor: 0.0,
            injection_temperature: None,
            paused: false,
            time: 0.0,
            frame: 0,
            collision_counter,
            visible_bounds,
            accumulator: 0.0,
            notifications: Vec::new(),
            random,
        }
    }

    /// Back to an empty container at the default width. Config and random source are kept.
    pub fn reset(&mut self) {
        debug!("simulation reset");
        self.species = SpeciesTable::default();
        self.container = Container::new(&self.config);
        self.particles.clear();
        self.detector = CollisionDetector::new(&self.container, &self.config);
        self.pressure = PressureModel::new(&self.config);
        self.temperature = None;
        self.hold_constant = HoldConstant::Nothing;
        self.heat_cool_factor = 0.0;
        self.injection_temperature = None;
        self.time = 0.0;
        self.frame = 0;
        self.collision_counter = CollisionCounter::new(self.config.collision_counter_sample_period);
        self.visible_bounds = self.container.max_bounds().dilated(self.config.offscreen_margin);
        self.accumulator = 0.0;
        self.notifications.clear();
    }

    /// Run one full pipeline step of `dt` ps.
    pub fn step(&mut self, dt: f64) {
        debug_assert!(dt.is_finite() && dt > 0.0, "dt must be finite and > 0, got {dt}");
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        profile_scope!("simulation_step");

        if !self.hold_constant.holds_temperature() {
            profile_scope!("heat_cool");
            self.particles.heat_cool(self.heat_cool_factor, self.config.heat_cool_k);
        }

        self.particles.step(dt);
        {
            profile_scope!("escape");
            let escaped = self.particles.escape_particles(&self.container);
            if escaped > 0 {
                debug!(escaped, "particles escaped through the lid");
            }
        }
        self.container.step(dt);

        let wall_does_work = self.hold_constant != HoldConstant::Temperature;
        let wall_hits = self.detector.step(&mut self.particles, &self.container, wall_does_work);
        if wall_hits > 0 {
            self.pressure.enabled = true;
        }

        self.particles.remove_out_of_bounds(&self.visible_bounds);
        self.collision_counter.record(wall_hits, dt);

        self.update_derived(dt);
        self.time += dt;
        self.frame += 1;
    }

    /// Frame driver entry point. Consumes `real_dt` seconds of wall-clock time in fixed
    /// `config.dt` steps. Returns how many steps ran.
    pub fn advance(&mut self, real_dt: f64) -> usize {
        if self.paused || !(real_dt.is_finite() && real_dt > 0.0) {
            return 0;
        }
        let step_real = self.config.real_seconds(self.config.dt);
        self.accumulator += real_dt;
        let mut steps = 0;
        while self.accumulator >= step_real && steps < MAX_STEPS_PER_ADVANCE {
            self.step(self.config.dt);
            self.accumulator -= step_real;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_ADVANCE {
            self.accumulator = self.accumulator.min(step_real);
        }
        steps
    }

    /// Single manual step at the configured dt, used by the step button while paused.
    pub fn step_once(&mut self) {
        self.step(self.config.dt);
    }

    /// Re-run compensation, temperature and pressure without advancing time, so
    /// readings reflect a change made while paused.
    pub fn update_while_paused(&mut self) {
        profile_scope!("update_while_paused");
        self.update_derived(0.0);
    }

    /// Call after anything overwrote particle or container state from outside.
    pub fn invalidate_caches(&mut self) {
        self.detector.clear_caches();
        self.pressure.reset();
        self.accumulator = 0.0;
        self.visible_bounds = self.container.max_bounds().dilated(self.config.offscreen_margin);
        self.temperature = thermal::compute_temperature(&self.particles);
        let n = self.particles.total_inside();
        let volume = self.container.volume();
        self.pressure.update(n, self.temperature, volume, 0.0, &self.config, self.random.as_mut());
    }

    fn update_derived(&mut self, dt: f64) {
        let forced = self.compensate();
        {
            profile_scope!("temperature");
            self.temperature = forced.or_else(|| thermal::compute_temperature(&self.particles));
        }
        {
            profile_scope!("pressure");
            let n = self.particles.total_inside();
            let volume = self.container.volume();
            let real_dt = self.config.real_seconds(dt);
            self.pressure.gauge.noise_enabled = !self.hold_constant.holds_pressure();
            self.pressure.update(n, self.temperature, volume, real_dt, &self.config, self.random.as_mut());
        }
        if self.pressure.value > self.config.max_pressure && self.container.lid.on {
            warn!(pressure = self.pressure.value, "pressure limit exceeded, lid blown off");
            self.container.blow_lid_off();
            self.notify(Notification::LidBlownOff { pressure: self.pressure.value });
        }
        self.check_temperature_ceiling();
    }

    fn check_temperature_ceiling(&mut self) {
        let Some(t) = self.temperature else {
            return;
        };
        if t < self.config.max_temperature {
            return;
        }
        warn!(temperature = t, "temperature ceiling reached, container emptied");
        self.particles.clear();
        if self.hold_constant.holds_pressure() {
            self.hold_constant = HoldConstant::Nothing;
        }
        self.container.return_lid();
        self.heat_cool_factor = 0.0;
        self.temperature = None;
        self.pressure.reset();
        self.notify(Notification::TemperatureCeiling { temperature: t });
    }

    /// Temperature new particles are injected at.
    pub fn initial_temperature(&self) -> f64 {
        self.injection_temperature
            .or(self.temperature)
            .unwrap_or(self.config.fallback_temperature)
    }

    pub fn set_species_count(&mut self, species: Species, n: usize) {
        let temperature = self.initial_temperature();
        let injector = Injector {
            config: &self.config,
            container: &self.container,
            temperature,
            sample_temperatures: self.detector.particle_particle_enabled,
        };
        let props = self.species.get(species);
        self.particles.set_species_count(species, n, props, &injector, self.random.as_mut());
    }

    /// Instant resize that moves particles with the wall, scaled about the fixed side.
    pub fn resize_container(&mut self, width: f64) {
        let old = self.container.width;
        self.container.resize(width);
        let scale = self.container.width / old;
        if scale != 1.0 {
            self.particles.redistribute(scale, self.container.right());
        }
        if scale < 1.0 {
            // Scaling pulls centres in but not radii; keep edges off the new left wall.
            let left = self.container.left();
            for p in self.particles.inside_mut() {
                let min_x = left + p.radius;
                if p.pos.x < min_x {
                    p.pos.x = min_x;
                    p.prev_pos.x = min_x;
                }
            }
        }
    }

    pub fn set_heat_cool_factor(&mut self, factor: f64) {
        self.heat_cool_factor = factor.clamp(-1.0, 1.0);
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        self.detector.particle_particle_enabled = enabled;
    }

    pub fn set_visible_bounds(&mut self, bounds: Bounds) {
        self.visible_bounds = bounds;
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Pending one-shot notices, oldest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn random(&mut self) -> &mut dyn RandomSource {
        self.random.as_mut()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

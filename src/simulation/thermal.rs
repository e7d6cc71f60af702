// simulation/thermal.rs
// Temperature of the inside ensemble and the velocity rescale that forces it

use super::particle_system::ParticleSystem;
use crate::units;

/// `T = (2/3)(KE/N)/k` over inside particles, `None` when there are none.
pub fn compute_temperature(particles: &ParticleSystem) -> Option<f64> {
    let n = particles.total_inside();
    if n == 0 {
        return None;
    }
    let t = units::temperature_for_kinetic_energy(particles.total_kinetic_energy() / n as f64);
    debug_assert!(t.is_finite() && t >= 0.0, "temperature must be finite and >= 0, got {t}");
    Some(t)
}

impl ParticleSystem {
    /// Rescale every inside velocity by the same energy ratio so the ensemble sits at
    /// `temperature` exactly. The shape of the speed distribution is preserved.
    /// No-op for an empty or motionless ensemble.
    pub fn set_temperature(&mut self, temperature: f64) {
        debug_assert!(temperature.is_finite() && temperature >= 0.0);
        let n = self.total_inside();
        if n == 0 {
            return;
        }
        let actual = self.total_kinetic_energy() / n as f64;
        if actual <= 0.0 {
            return;
        }
        let desired = units::kinetic_energy_for_temperature(temperature);
        let ratio = desired / actual;
        for p in self.inside_mut() {
            let ke = p.kinetic_energy();
            let speed = p.speed();
            if speed > 0.0 {
                let new_speed = (2.0 * ratio * ke / p.mass).sqrt();
                p.vel *= new_speed / speed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::container::Container;
    use crate::random::StdRandom;
    use crate::simulation::particle_system::Injector;
    use crate::species::Species;

    fn mixed(temperature: f64) -> ParticleSystem {
        let config = SimConfig::default();
        let container = Container::new(&config);
        let mut rng = StdRandom::seeded(11);
        let injector = Injector { config: &config, container: &container, temperature, sample_temperatures: true };
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 40, Species::Heavy.default_props(), &injector, &mut rng);
        ps.set_species_count(Species::Light, 25, Species::Light.default_props(), &injector, &mut rng);
        ps
    }

    #[test]
    fn empty_ensemble_has_no_temperature() {
        assert_eq!(compute_temperature(&ParticleSystem::new()), None);
    }

    #[test]
    fn unsampled_injection_reads_back_its_temperature() {
        let config = SimConfig::default();
        let container = Container::new(&config);
        let mut rng = StdRandom::seeded(1);
        let injector = Injector { config: &config, container: &container, temperature: 420.0, sample_temperatures: false };
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Light, 7, Species::Light.default_props(), &injector, &mut rng);
        let t = compute_temperature(&ps).unwrap();
        assert!((t - 420.0).abs() / 420.0 < 1e-9);
    }

    #[test]
    fn set_temperature_round_trips() {
        let mut ps = mixed(300.0);
        for target in [50.0, 299.0, 1234.5] {
            ps.set_temperature(target);
            let t = compute_temperature(&ps).unwrap();
            assert!((t - target).abs() / target < 1e-3, "wanted {target}, got {t}");
        }
    }

    #[test]
    fn set_temperature_preserves_speed_ratios() {
        let mut ps = mixed(300.0);
        let t0 = compute_temperature(&ps).unwrap();
        let before: Vec<f64> = ps.inside().map(|p| p.speed()).collect();
        ps.set_temperature(600.0);
        let after: Vec<f64> = ps.inside().map(|p| p.speed()).collect();
        let scale = after[0] / before[0];
        for (a, b) in after.iter().zip(&before) {
            assert!((a / b - scale).abs() < 1e-9);
        }
        assert!((scale - (600.0 / t0).sqrt()).abs() < 1e-9);
    }
}

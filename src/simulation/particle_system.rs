// simulation/particle_system.rs
// Species arrays and the manager that creates, moves, escapes and removes particles

use crate::bounds::Bounds;
use crate::config::SimConfig;
use crate::container::{Container, Side};
use crate::particle::Particle;
use crate::profile_scope;
use crate::random::RandomSource;
use crate::region::ParticleRef;
use crate::species::{Species, SpeciesProps};
use crate::units;
use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

/// Live particles of one species. `inside` is what the collision detector sees;
/// `outside` holds particles that escaped through the lid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesArrays {
    pub inside: Vec<Particle>,
    pub outside: Vec<Particle>,
}

/// How new particles get their speed. Built per call from the simulation's state.
pub struct Injector<'a> {
    pub config: &'a SimConfig,
    pub container: &'a Container,
    /// Target mean temperature (K)
    pub temperature: f64,
    /// Draw a per-particle temperature around the mean instead of using it exactly.
    /// Only useful when particle-particle collisions will mix the speeds.
    pub sample_temperatures: bool,
}

impl<'a> Injector<'a> {
    fn sample_temperature(&self, rng: &mut dyn RandomSource) -> f64 {
        if !self.sample_temperatures {
            return self.temperature;
        }
        let sigma = self.config.injection_sigma_fraction * self.temperature;
        let limit = self.config.injection_clamp_sigmas * sigma;
        let t = self.temperature + rng.next_gaussian() * sigma;
        t.clamp(self.temperature - limit, self.temperature + limit)
    }

    fn speed(&self, mass: f64, rng: &mut dyn RandomSource) -> f64 {
        units::rms_speed(self.sample_temperature(rng).max(0.0), mass)
    }

    /// Particle at the entry point on the fixed wall, heading into the container.
    pub fn at_entry(&self, species: Species, props: SpeciesProps, rng: &mut dyn RandomSource) -> Particle {
        let c = self.container;
        let pos = DVec2::new(
            c.right() - props.radius,
            c.bottom() + c.height * self.config.injection_y_fraction,
        );
        let half = self.config.injection_dispersion_angle / 2.0;
        let angle = self.config.injection_direction + rng.next_range(-half, half);
        let vel = DVec2::new(angle.cos(), angle.sin()) * self.speed(props.mass, rng);
        Particle::new(species, props, pos, vel)
    }

    /// Particle at a uniform random position fully inside `bounds`, random direction.
    pub fn within(
        &self,
        bounds: &Bounds,
        species: Species,
        props: SpeciesProps,
        rng: &mut dyn RandomSource,
    ) -> Particle {
        let r = props.radius;
        let x = if bounds.width() > 2.0 * r {
            rng.next_range(bounds.min.x + r, bounds.max.x - r)
        } else {
            bounds.center().x
        };
        let y = if bounds.height() > 2.0 * r {
            rng.next_range(bounds.min.y + r, bounds.max.y - r)
        } else {
            bounds.center().y
        };
        let angle = rng.next_range(0.0, std::f64::consts::TAU);
        let vel = DVec2::new(angle.cos(), angle.sin()) * self.speed(props.mass, rng);
        Particle::new(species, props, DVec2::new(x, y), vel)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleSystem {
    arrays: [SpeciesArrays; Species::COUNT],
}

fn two_mut<T>(slice: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i != j);
    if i < j {
        let (a, b) = slice.split_at_mut(j);
        (&mut a[i], &mut b[0])
    } else {
        let (a, b) = slice.split_at_mut(i);
        (&mut b[0], &mut a[j])
    }
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn species(&self, species: Species) -> &SpeciesArrays {
        &self.arrays[species.index()]
    }

    #[inline]
    pub fn species_mut(&mut self, species: Species) -> &mut SpeciesArrays {
        &mut self.arrays[species.index()]
    }

    pub fn inside_count(&self, species: Species) -> usize {
        self.species(species).inside.len()
    }

    pub fn outside_count(&self, species: Species) -> usize {
        self.species(species).outside.len()
    }

    pub fn total_inside(&self) -> usize {
        self.arrays.iter().map(|a| a.inside.len()).sum()
    }

    pub fn total_outside(&self) -> usize {
        self.arrays.iter().map(|a| a.outside.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_inside() == 0 && self.total_outside() == 0
    }

    pub fn inside(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.arrays.iter().flat_map(|a| a.inside.iter())
    }

    pub fn inside_mut(&mut self) -> impl Iterator<Item = &mut Particle> + '_ {
        self.arrays.iter_mut().flat_map(|a| a.inside.iter_mut())
    }

    pub fn outside(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.arrays.iter().flat_map(|a| a.outside.iter())
    }

    /// Every inside particle with the reference the collision detector uses for it.
    pub fn inside_refs(&self) -> impl Iterator<Item = (ParticleRef, &Particle)> + '_ {
        Species::ALL.into_iter().flat_map(move |species| {
            self.species(species)
                .inside
                .iter()
                .enumerate()
                .map(move |(index, p)| (ParticleRef { species, index }, p))
        })
    }

    #[inline]
    pub fn get(&self, r: ParticleRef) -> &Particle {
        &self.arrays[r.species.index()].inside[r.index]
    }

    #[inline]
    pub fn get_mut(&mut self, r: ParticleRef) -> &mut Particle {
        &mut self.arrays[r.species.index()].inside[r.index]
    }

    /// Two distinct inside particles borrowed mutably at once.
    pub fn pair_mut(&mut self, a: ParticleRef, b: ParticleRef) -> (&mut Particle, &mut Particle) {
        debug_assert!(a != b, "pair_mut needs two distinct particles");
        if a.species == b.species {
            two_mut(&mut self.arrays[a.species.index()].inside, a.index, b.index)
        } else {
            let (sa, sb) = two_mut(&mut self.arrays, a.species.index(), b.species.index());
            (&mut sa.inside[a.index], &mut sb.inside[b.index])
        }
    }

    /// Grow or shrink the inside array of `species` to exactly `n`.
    pub fn set_species_count(
        &mut self,
        species: Species,
        n: usize,
        props: SpeciesProps,
        injector: &Injector,
        rng: &mut dyn RandomSource,
    ) {
        let inside = &mut self.arrays[species.index()].inside;
        if n < inside.len() {
            inside.truncate(n);
        } else {
            inside.reserve(n - inside.len());
            while inside.len() < n {
                inside.push(injector.at_entry(species, props, rng));
            }
        }
        debug_assert_eq!(inside.len(), n);
    }

    /// Number of inside particles of `species` whose centre lies on `side` of `divider_x`.
    pub fn side_count(&self, species: Species, side: Side, divider_x: f64) -> usize {
        self.species(species).inside.iter().filter(|p| side_of(p.pos.x, divider_x) == side).count()
    }

    /// Grow or shrink the particles of `species` on one side of the container to `n`.
    pub fn set_side_count(
        &mut self,
        species: Species,
        side: Side,
        n: usize,
        props: SpeciesProps,
        injector: &Injector,
        rng: &mut dyn RandomSource,
    ) {
        let divider_x = injector.container.divider_x();
        let bounds = injector.container.side_bounds(side);
        let mut current = self.side_count(species, side, divider_x);
        let inside = &mut self.arrays[species.index()].inside;
        while current > n {
            // Newest first, same as tail removal for the whole species.
            match inside.iter().rposition(|p| side_of(p.pos.x, divider_x) == side) {
                Some(i) => {
                    inside.remove(i);
                    current -= 1;
                }
                None => break,
            }
        }
        while current < n {
            inside.push(injector.within(&bounds, species, props, rng));
            current += 1;
        }
    }

    /// Advance every live particle, inside and outside.
    pub fn step(&mut self, dt: f64) {
        profile_scope!("particles_step");
        for arrays in &mut self.arrays {
            for p in arrays.inside.iter_mut().chain(arrays.outside.iter_mut()) {
                p.step(dt);
            }
        }
    }

    /// Scale inside speeds by `1 + factor / k`. No-op when `factor` is zero.
    pub fn heat_cool(&mut self, factor: f64, k: f64) {
        debug_assert!((-1.0..=1.0).contains(&factor), "heat/cool factor out of range");
        if factor == 0.0 {
            return;
        }
        let scale = 1.0 + factor / k;
        for p in self.inside_mut() {
            p.vel *= scale;
        }
    }

    /// Move inside particles that cleared the top wall through the opening to `outside`.
    /// Returns how many escaped.
    pub fn escape_particles(&mut self, container: &Container) -> usize {
        let Some((open_left, open_right)) = container.opening() else {
            return 0;
        };
        let top = container.top();
        let mut escaped = 0;
        for arrays in &mut self.arrays {
            let mut i = 0;
            while i < arrays.inside.len() {
                let p = &arrays.inside[i];
                if p.top() > top && p.left() >= open_left && p.right() <= open_right {
                    let p = arrays.inside.remove(i);
                    arrays.outside.push(p);
                    escaped += 1;
                } else {
                    i += 1;
                }
            }
        }
        escaped
    }

    /// Drop outside particles that no longer intersect `visible`. Returns how many.
    pub fn remove_out_of_bounds(&mut self, visible: &Bounds) -> usize {
        let mut removed = 0;
        for arrays in &mut self.arrays {
            let before = arrays.outside.len();
            arrays.outside.retain(|p| p.bounding_box().intersects(visible));
            removed += before - arrays.outside.len();
        }
        removed
    }

    /// Scale inside x positions about `anchor_x` (the fixed wall).
    pub fn redistribute(&mut self, scale_x: f64, anchor_x: f64) {
        debug_assert!(scale_x.is_finite() && scale_x > 0.0);
        for p in self.inside_mut() {
            p.pos.x = anchor_x + (p.pos.x - anchor_x) * scale_x;
            p.prev_pos.x = anchor_x + (p.prev_pos.x - anchor_x) * scale_x;
        }
    }

    /// Push inside particles out of the divider slab, toward the side their centre is on.
    pub fn clear_divider(&mut self, divider_x: f64, thickness: f64) {
        let half = thickness / 2.0;
        for p in self.inside_mut() {
            if p.pos.x <= divider_x {
                let limit = divider_x - half - p.radius;
                if p.pos.x > limit {
                    p.pos.x = limit;
                    p.prev_pos.x = limit;
                }
            } else {
                let limit = divider_x + half + p.radius;
                if p.pos.x < limit {
                    p.pos.x = limit;
                    p.prev_pos.x = limit;
                }
            }
        }
    }

    /// Apply new mass/radius to every live particle of `species`. Mass changes keep
    /// each particle's kinetic energy.
    pub fn update_species_props(&mut self, species: Species, props: SpeciesProps) {
        let arrays = &mut self.arrays[species.index()];
        for p in arrays.inside.iter_mut().chain(arrays.outside.iter_mut()) {
            if p.mass != props.mass {
                p.set_mass_keep_energy(props.mass);
            }
            p.radius = props.radius;
        }
    }

    pub fn total_kinetic_energy(&self) -> f64 {
        self.inside().map(Particle::kinetic_energy).sum()
    }

    pub fn clear(&mut self) {
        for arrays in &mut self.arrays {
            arrays.inside.clear();
            arrays.outside.clear();
        }
    }
}

#[inline]
fn side_of(x: f64, divider_x: f64) -> Side {
    if x <= divider_x {
        Side::Left
    } else {
        Side::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;

    fn setup() -> (SimConfig, Container, StdRandom) {
        let config = SimConfig::default();
        let container = Container::new(&config);
        (config, container, StdRandom::seeded(3))
    }

    #[test]
    fn set_species_count_grows_and_shrinks_from_tail() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: true };
        let props = Species::Heavy.default_props();
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 5, props, &injector, &mut rng);
        assert_eq!(ps.inside_count(Species::Heavy), 5);
        let first_two: Vec<_> = ps.species(Species::Heavy).inside[..2].to_vec();
        ps.set_species_count(Species::Heavy, 2, props, &injector, &mut rng);
        assert_eq!(ps.species(Species::Heavy).inside, first_two);
        ps.set_species_count(Species::Heavy, 0, props, &injector, &mut rng);
        assert_eq!(ps.total_inside(), 0);
    }

    #[test]
    fn injected_particles_start_inside_heading_inward() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: true };
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Light, 50, Species::Light.default_props(), &injector, &mut rng);
        for p in ps.inside() {
            assert!(container.bounds().contains_bounds(&p.bounding_box(), 1e-9));
            assert!(p.vel.x < 0.0, "entry velocity must point away from the fixed wall");
        }
    }

    #[test]
    fn unsampled_injection_uses_exact_speed() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 500.0, sample_temperatures: false };
        let mut ps = ParticleSystem::new();
        let props = Species::Heavy.default_props();
        ps.set_species_count(Species::Heavy, 10, props, &injector, &mut rng);
        let expected = units::rms_speed(500.0, props.mass);
        for p in ps.inside() {
            assert!((p.speed() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn sampled_injection_stays_within_clamp() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: true };
        let props = Species::Heavy.default_props();
        let lo = units::rms_speed(300.0 * 0.8, props.mass);
        let hi = units::rms_speed(300.0 * 1.2, props.mass);
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 200, props, &injector, &mut rng);
        for p in ps.inside() {
            assert!(p.speed() >= lo - 1e-9 && p.speed() <= hi + 1e-9);
        }
    }

    #[test]
    fn pair_mut_across_species() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: false };
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 2, Species::Heavy.default_props(), &injector, &mut rng);
        ps.set_species_count(Species::Light, 1, Species::Light.default_props(), &injector, &mut rng);
        let a = ParticleRef { species: Species::Light, index: 0 };
        let b = ParticleRef { species: Species::Heavy, index: 1 };
        {
            let (pa, pb) = ps.pair_mut(a, b);
            pa.vel = DVec2::new(1.0, 0.0);
            pb.vel = DVec2::new(2.0, 0.0);
        }
        assert_eq!(ps.get(a).vel.x, 1.0);
        assert_eq!(ps.get(b).vel.x, 2.0);
        let (p1, p0) = ps.pair_mut(ParticleRef { species: Species::Heavy, index: 1 }, ParticleRef { species: Species::Heavy, index: 0 });
        p1.vel.y = 5.0;
        p0.vel.y = 6.0;
        assert_eq!(ps.species(Species::Heavy).inside[0].vel.y, 6.0);
    }

    #[test]
    fn escape_requires_open_lid_and_clearance() {
        let (config, mut container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: false };
        let props = Species::Heavy.default_props();
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 1, props, &injector, &mut rng);
        let x = container.left() + 1000.0;
        ps.species_mut(Species::Heavy).inside[0].pos = DVec2::new(x, container.top() - props.radius + 1.0);

        assert_eq!(ps.escape_particles(&container), 0, "closed lid");
        container.set_opening_width(3000.0);
        assert_eq!(ps.escape_particles(&container), 1);
        assert_eq!(ps.inside_count(Species::Heavy), 0);
        assert_eq!(ps.outside_count(Species::Heavy), 1);
    }

    #[test]
    fn out_of_bounds_removes_only_far_outside_particles() {
        let (_, container, _) = setup();
        let mut ps = ParticleSystem::new();
        let props = Species::Heavy.default_props();
        let near = Particle::new(Species::Heavy, props, DVec2::new(-100.0, container.top() + 500.0), DVec2::zero());
        let far = Particle::new(Species::Heavy, props, DVec2::new(-100.0, container.top() + 1.0e6), DVec2::zero());
        ps.species_mut(Species::Heavy).outside.extend([near, far]);
        let visible = container.max_bounds().dilated(1000.0);
        assert_eq!(ps.remove_out_of_bounds(&visible), 1);
        assert_eq!(ps.outside_count(Species::Heavy), 1);
    }

    #[test]
    fn redistribute_scales_about_anchor() {
        let mut ps = ParticleSystem::new();
        let props = Species::Heavy.default_props();
        ps.species_mut(Species::Heavy)
            .inside
            .push(Particle::new(Species::Heavy, props, DVec2::new(-4000.0, 100.0), DVec2::zero()));
        ps.redistribute(0.5, 0.0);
        let p = &ps.species(Species::Heavy).inside[0];
        assert_eq!(p.pos, DVec2::new(-2000.0, 100.0));
        assert_eq!(p.prev_pos, p.pos);
    }

    #[test]
    fn side_count_places_particles_on_requested_side() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: true };
        let props = Species::Diffusion1.default_props();
        let mut ps = ParticleSystem::new();
        ps.set_side_count(Species::Diffusion1, Side::Left, 20, props, &injector, &mut rng);
        ps.set_side_count(Species::Diffusion1, Side::Right, 5, props, &injector, &mut rng);
        let x = container.divider_x();
        assert_eq!(ps.side_count(Species::Diffusion1, Side::Left, x), 20);
        assert_eq!(ps.side_count(Species::Diffusion1, Side::Right, x), 5);
        ps.set_side_count(Species::Diffusion1, Side::Left, 3, props, &injector, &mut rng);
        assert_eq!(ps.side_count(Species::Diffusion1, Side::Left, x), 3);
        assert_eq!(ps.side_count(Species::Diffusion1, Side::Right, x), 5);
    }

    #[test]
    fn heat_cool_zero_is_noop() {
        let (config, container, mut rng) = setup();
        let injector = Injector { config: &config, container: &container, temperature: 300.0, sample_temperatures: false };
        let mut ps = ParticleSystem::new();
        ps.set_species_count(Species::Heavy, 3, Species::Heavy.default_props(), &injector, &mut rng);
        let before = ps.clone();
        ps.heat_cool(0.0, config.heat_cool_k);
        assert_eq!(ps, before);
        ps.heat_cool(1.0, config.heat_cool_k);
        let ratio = ps.total_kinetic_energy() / before.total_kinetic_energy();
        assert!((ratio - 1.01f64.powi(2)).abs() < 1e-9);
    }
}

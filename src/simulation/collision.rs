// simulation/collision.rs
// Broad phase over the region grid, elastic particle-particle response, and
// particle-wall response against one or two collision domains.

use crate::bounds::Bounds;
use crate::config::SimConfig;
use crate::container::{CollisionDomains, Container};
use crate::particle::Particle;
use crate::profile_scope;
use crate::region::{ParticleRef, RegionGrid};
use crate::simulation::particle_system::ParticleSystem;
use std::collections::HashSet;
use ultraviolet::DVec2;

/// Slack allowed when checking that particles end a step inside their domain (pm)
const CONTAINMENT_EPSILON: f64 = 1e-6;

pub struct CollisionDetector {
    pub grid: RegionGrid,
    pub particle_particle_enabled: bool,
    /// Counts from the most recent `step`
    pub particle_collisions: usize,
    pub wall_collisions: usize,
    pub total_particle_collisions: u64,
    pub total_wall_collisions: u64,
    visited: HashSet<(ParticleRef, ParticleRef)>,
    pairs: Vec<(ParticleRef, ParticleRef)>,
}

impl CollisionDetector {
    pub fn new(container: &Container, config: &SimConfig) -> Self {
        Self {
            grid: RegionGrid::new(container, config.region_size()),
            particle_particle_enabled: true,
            particle_collisions: 0,
            wall_collisions: 0,
            total_particle_collisions: 0,
            total_wall_collisions: 0,
            visited: HashSet::new(),
            pairs: Vec::new(),
        }
    }

    /// Drop all transient membership. The next `step` rebuilds it.
    pub fn clear_caches(&mut self) {
        self.grid.clear();
        self.visited.clear();
        self.pairs.clear();
        self.particle_collisions = 0;
        self.wall_collisions = 0;
    }

    /// Resolve one step of collisions. Returns the number of particles that hit a wall.
    pub fn step(&mut self, particles: &mut ParticleSystem, container: &Container, wall_does_work: bool) -> usize {
        profile_scope!("collision");
        let bounds = container.bounds();
        let domains = container.collision_domains();

        self.grid.clear();
        for (r, p) in particles.inside_refs() {
            self.grid.assign(r, p);
        }

        self.particle_collisions = 0;
        if self.particle_particle_enabled {
            self.collect_pairs(&bounds);
            for &(a, b) in &self.pairs {
                if let CollisionDomains::Split { .. } = domains {
                    if domains.index_of(particles.get(a).prev_pos.x) != domains.index_of(particles.get(b).prev_pos.x) {
                        continue;
                    }
                }
                let (p1, p2) = particles.pair_mut(a, b);
                if resolve_particle_particle(p1, p2) {
                    self.particle_collisions += 1;
                }
            }
        }

        let wall_vx = if wall_does_work { container.left_wall_velocity.x } else { 0.0 };
        let mut hits = 0;
        for p in particles.inside_mut() {
            let index = domains.index_of(p.prev_pos.x);
            let domain = domains.get(index);
            // Only the first domain's left edge is the moving wall.
            let left_vx = if index == 0 { wall_vx } else { 0.0 };
            if resolve_particle_wall(p, &domain, left_vx) {
                hits += 1;
            }
            debug_assert!(
                domain.contains_bounds(&p.bounding_box(), CONTAINMENT_EPSILON),
                "particle left its domain: pos={:?} r={} domain={:?}",
                p.pos,
                p.radius,
                domain
            );
        }

        self.wall_collisions = hits;
        self.total_wall_collisions += hits as u64;
        self.total_particle_collisions += self.particle_collisions as u64;
        hits
    }

    fn collect_pairs(&mut self, bounds: &Bounds) {
        self.visited.clear();
        self.pairs.clear();
        for region in self.grid.active(bounds) {
            let members = &region.particles;
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    let key = if members[i] < members[j] {
                        (members[i], members[j])
                    } else {
                        (members[j], members[i])
                    };
                    if self.visited.insert(key) {
                        self.pairs.push(key);
                    }
                }
            }
        }
    }
}

/// Elastic collision between two disks that came into contact this step.
/// Returns false (and changes nothing) when they are apart, or were already
/// touching at their previous positions.
pub fn resolve_particle_particle(p1: &mut Particle, p2: &mut Particle) -> bool {
    if p1.contacted_previously(p2) || !p1.contacts(p2) {
        return false;
    }
    let d = p2.pos - p1.pos;
    let dist = d.mag();
    if dist == 0.0 {
        return false;
    }
    let normal = d / dist;
    let tangent = DVec2::new(-normal.y, normal.x);
    let contact = p1.pos + normal * p1.radius;

    reposition(p1, contact, tangent, -normal);
    reposition(p2, contact, tangent, normal);

    // Reflection alone can leave some overlap when the approach was oblique.
    let d = p2.pos - p1.pos;
    let dist = d.mag();
    let sum = p1.radius + p2.radius;
    if dist < sum {
        let n = if dist > 0.0 { d / dist } else { normal };
        let overlap = sum - dist;
        let total = p1.mass + p2.mass;
        p1.pos -= n * (overlap * p2.mass / total);
        p2.pos += n * (overlap * p1.mass / total);
    }

    // Normal-only impulse, e = 1
    let vr = (p1.vel - p2.vel).dot(normal);
    let j = -2.0 * vr / (1.0 / p1.mass + 1.0 / p2.mass);
    p1.vel += normal * (j / p1.mass);
    p2.vel -= normal * (j / p2.mass);
    true
}

/// Reflect the current position across the tangent line through the point one
/// radius from `contact`, toward where the particle came from.
fn reposition(p: &mut Particle, contact: DVec2, tangent: DVec2, fallback: DVec2) {
    let back = p.prev_pos - contact;
    let dir = if back.mag_sq() > 0.0 { back.normalized() } else { fallback };
    let pivot = contact + dir * p.radius;
    let rel = p.pos - pivot;
    p.pos = pivot + tangent * (2.0 * rel.dot(tangent)) - rel;
}

/// Clamp a particle inside `b` and reflect the velocity of every wall it touched.
/// `left_wall_vx` is added on the left wall, which may be moving.
pub fn resolve_particle_wall(p: &mut Particle, b: &Bounds, left_wall_vx: f64) -> bool {
    let mut hit = false;
    if p.left() <= b.min.x {
        p.pos.x = b.min.x + p.radius;
        p.vel.x = -(p.vel.x - left_wall_vx);
        hit = true;
    } else if p.right() >= b.max.x {
        p.pos.x = b.max.x - p.radius;
        p.vel.x = -p.vel.x;
        hit = true;
    }
    if p.bottom() <= b.min.y {
        p.pos.y = b.min.y + p.radius;
        p.vel.y = -p.vel.y;
        hit = true;
    } else if p.top() >= b.max.y {
        p.pos.y = b.max.y - p.radius;
        p.vel.y = -p.vel.y;
        hit = true;
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use proptest::prelude::*;

    fn disk(mass: f64, radius: f64, pos: DVec2, vel: DVec2) -> Particle {
        let mut props = Species::Heavy.default_props();
        props.mass = mass;
        props.radius = radius;
        Particle::new(Species::Heavy, props, pos, vel)
    }

    /// Two disks that just moved into overlap along the x axis.
    fn head_on(mass: f64) -> (Particle, Particle) {
        let mut a = disk(mass, 100.0, DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0));
        let mut b = disk(mass, 100.0, DVec2::new(190.0, 0.0), DVec2::new(-10.0, 0.0));
        a.prev_pos = DVec2::new(-10.0, 0.0);
        b.prev_pos = DVec2::new(200.0 + 10.0, 0.0);
        (a, b)
    }

    #[test]
    fn equal_mass_head_on_exchanges_velocities() {
        let (mut a, mut b) = head_on(28.0);
        assert!(resolve_particle_particle(&mut a, &mut b));
        assert!((a.vel - DVec2::new(-10.0, 0.0)).mag() < 1e-12);
        assert!((b.vel - DVec2::new(10.0, 0.0)).mag() < 1e-12);
        assert!((b.pos - a.pos).mag() >= 200.0 - 1e-9);
    }

    #[test]
    fn previously_touching_pair_is_skipped() {
        let (mut a, mut b) = head_on(28.0);
        a.prev_pos = a.pos;
        b.prev_pos = b.pos;
        let (a0, b0) = (a.clone(), b.clone());
        assert!(!resolve_particle_particle(&mut a, &mut b));
        assert_eq!((a, b), (a0, b0));
    }

    #[test]
    fn moving_left_wall_does_work() {
        let b = Bounds::new(0.0, 0.0, 1000.0, 1000.0);
        let mut p = disk(28.0, 100.0, DVec2::new(90.0, 500.0), DVec2::new(-50.0, 0.0));
        assert!(resolve_particle_wall(&mut p, &b, 20.0));
        assert_eq!(p.pos.x, 100.0);
        assert_eq!(p.vel.x, 70.0);

        let mut q = disk(28.0, 100.0, DVec2::new(950.0, 950.0), DVec2::new(5.0, 7.0));
        assert!(resolve_particle_wall(&mut q, &b, 20.0));
        assert_eq!(q.pos, DVec2::new(900.0, 900.0));
        assert_eq!(q.vel, DVec2::new(-5.0, -7.0));
    }

    #[test]
    fn clear_of_walls_is_untouched() {
        let b = Bounds::new(0.0, 0.0, 1000.0, 1000.0);
        let mut p = disk(28.0, 100.0, DVec2::new(500.0, 500.0), DVec2::new(-50.0, 3.0));
        let before = p.clone();
        assert!(!resolve_particle_wall(&mut p, &b, 0.0));
        assert_eq!(p, before);
    }

    #[test]
    fn detector_counts_wall_hits_once_per_particle() {
        let config = SimConfig::default();
        let container = Container::new(&config);
        let mut detector = CollisionDetector::new(&container, &config);
        let mut ps = ParticleSystem::new();
        // Corner hit: two walls, one collision.
        let corner = disk(28.0, 125.0, DVec2::new(container.left() + 100.0, container.bottom() + 100.0), DVec2::new(-1.0, -1.0));
        ps.species_mut(Species::Heavy).inside.push(corner);
        assert_eq!(detector.step(&mut ps, &container, true), 1);
        assert_eq!(detector.total_wall_collisions, 1);
        let p = &ps.species(Species::Heavy).inside[0];
        assert_eq!(p.vel, DVec2::new(1.0, 1.0));
    }

    #[test]
    fn divider_blocks_cross_domain_pairs() {
        let config = SimConfig::default();
        let mut container = Container::new(&config);
        container.has_divider = true;
        let mut detector = CollisionDetector::new(&container, &config);
        let x = container.divider_x();
        let y = container.bottom() + 2000.0;
        // Overlapping across the divider: would collide without it.
        let mut a = disk(28.0, 45.0, DVec2::new(x - 40.0, y), DVec2::new(1.0, 0.0));
        let mut b = disk(28.0, 45.0, DVec2::new(x + 40.0, y), DVec2::new(-1.0, 0.0));
        a.prev_pos = a.pos - DVec2::new(100.0, 0.0);
        b.prev_pos = b.pos + DVec2::new(100.0, 0.0);
        let mut ps = ParticleSystem::new();
        ps.species_mut(Species::Heavy).inside.extend([a, b]);
        detector.step(&mut ps, &container, false);
        assert_eq!(detector.particle_collisions, 0);
        // Both were pushed off the divider by their own side's walls.
        let inside = &ps.species(Species::Heavy).inside;
        assert!(inside[0].right() <= x - container.divider_thickness / 2.0 + 1e-9);
        assert!(inside[1].left() >= x + container.divider_thickness / 2.0 - 1e-9);
    }

    #[test]
    fn fast_particle_bounces_off_divider_instead_of_crossing() {
        let config = SimConfig::default();
        let mut container = Container::new(&config);
        container.has_divider = true;
        let mut detector = CollisionDetector::new(&container, &config);
        let x = container.divider_x();
        let half = container.divider_thickness / 2.0;
        let y = container.bottom() + 3000.0;
        // One integration step carried the centre clean through the slab.
        let mut p = disk(28.0, 125.0, DVec2::new(x + 150.0, y), DVec2::new(995.0, 0.0));
        p.prev_pos = DVec2::new(x - 170.0, y);
        let mut ps = ParticleSystem::new();
        ps.species_mut(Species::Heavy).inside.push(p);
        assert_eq!(detector.step(&mut ps, &container, true), 1);
        let p = &ps.species(Species::Heavy).inside[0];
        assert!((p.pos.x - (x - half - 125.0)).abs() < 1e-9, "crossed to {}", p.pos.x);
        assert_eq!(p.vel.x, -995.0);
    }

    #[test]
    fn collisions_disabled_skips_pairs() {
        let config = SimConfig::default();
        let container = Container::new(&config);
        let mut detector = CollisionDetector::new(&container, &config);
        detector.particle_particle_enabled = false;
        let c = container.bounds().center();
        let (mut a, mut b) = head_on(28.0);
        for p in [&mut a, &mut b] {
            p.pos += c;
            p.prev_pos += c;
        }
        let mut ps = ParticleSystem::new();
        ps.species_mut(Species::Heavy).inside.extend([a.clone(), b.clone()]);
        detector.step(&mut ps, &container, true);
        assert_eq!(ps.species(Species::Heavy).inside[0].vel, a.vel);
        assert_eq!(detector.particle_collisions, 0);
    }

    proptest! {
        #[test]
        fn fresh_contact_resolves_elastically(
            angle in 0.0f64..std::f64::consts::TAU,
            overlap_frac in 0.01f64..0.9,
            m1 in 4.0f64..32.0,
            m2 in 4.0f64..32.0,
            r1 in 50.0f64..150.0,
            r2 in 50.0f64..150.0,
            v1x in -500.0f64..500.0,
            v1y in -500.0f64..500.0,
            v2x in -500.0f64..500.0,
            v2y in -500.0f64..500.0,
        ) {
            let n = DVec2::new(angle.cos(), angle.sin());
            let sum = r1 + r2;
            let sep = sum * (1.0 - overlap_frac);
            let mut a = disk(m1, r1, DVec2::zero(), DVec2::new(v1x, v1y));
            let mut b = disk(m2, r2, n * sep, DVec2::new(v2x, v2y));
            a.prev_pos = a.pos - n * sum;
            b.prev_pos = b.pos + n * sum;

            let momentum = a.vel * m1 + b.vel * m2;
            let energy = a.kinetic_energy() + b.kinetic_energy();

            prop_assert!(resolve_particle_particle(&mut a, &mut b));
            prop_assert!((b.pos - a.pos).mag() >= sum - 1e-9);

            let momentum_after = a.vel * m1 + b.vel * m2;
            prop_assert!((momentum_after - momentum).mag() <= 1e-9 * (1.0 + momentum.mag()));
            let energy_after = a.kinetic_energy() + b.kinetic_energy();
            prop_assert!((energy_after - energy).abs() <= 1e-9 * (1.0 + energy));
        }
    }
}

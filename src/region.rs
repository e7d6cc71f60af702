// region.rs
// Fixed square grid over the container's maximum extent. Membership is rebuilt every
// step and holds non-owning references into the species arrays.

use crate::bounds::Bounds;
use crate::container::Container;
use crate::particle::Particle;
use crate::species::Species;

/// Index of a live "inside" particle within its species array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleRef {
    pub species: Species,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct Region {
    pub bounds: Bounds,
    pub particles: Vec<ParticleRef>,
}

pub struct RegionGrid {
    pub cell_size: f64,
    /// Fixed corner the grid is tiled from (container's bottom-right)
    right: f64,
    bottom: f64,
    grid_size_x: usize,
    grid_size_y: usize,
    /// Column-major from the right wall: index = col * grid_size_y + row
    regions: Vec<Region>,
}

impl RegionGrid {
    pub fn new(container: &Container, cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0);
        let max = container.max_bounds();
        let grid_size_x = (max.width() / cell_size).ceil().max(1.0) as usize;
        let grid_size_y = (max.height() / cell_size).ceil().max(1.0) as usize;
        let right = max.max.x;
        let bottom = max.min.y;
        let mut regions = Vec::with_capacity(grid_size_x * grid_size_y);
        for col in 0..grid_size_x {
            for row in 0..grid_size_y {
                let max_x = right - col as f64 * cell_size;
                let min_y = bottom + row as f64 * cell_size;
                regions.push(Region {
                    bounds: Bounds::new(max_x - cell_size, min_y, max_x, min_y + cell_size),
                    particles: Vec::new(),
                });
            }
        }
        Self { cell_size, right, bottom, grid_size_x, grid_size_y, regions }
    }

    pub fn clear(&mut self) {
        for region in &mut self.regions {
            region.particles.clear();
        }
    }

    /// Add `pref` to every region its bounding square touches.
    pub fn assign(&mut self, pref: ParticleRef, particle: &Particle) {
        let bbox = particle.bounding_box();
        // Candidate span, widened by one cell so shared edges are caught; the
        // inclusive intersects test does the final filtering.
        let col_lo = ((self.right - bbox.max.x) / self.cell_size).floor() as isize - 1;
        let col_hi = ((self.right - bbox.min.x) / self.cell_size).floor() as isize + 1;
        let row_lo = ((bbox.min.y - self.bottom) / self.cell_size).floor() as isize - 1;
        let row_hi = ((bbox.max.y - self.bottom) / self.cell_size).floor() as isize + 1;
        let col_lo = col_lo.max(0) as usize;
        let row_lo = row_lo.max(0) as usize;
        if col_hi < 0 || row_hi < 0 {
            return;
        }
        let col_hi = (col_hi as usize).min(self.grid_size_x - 1);
        let row_hi = (row_hi as usize).min(self.grid_size_y - 1);
        for col in col_lo..=col_hi {
            for row in row_lo..=row_hi {
                let region = &mut self.regions[col * self.grid_size_y + row];
                if region.bounds.intersects(&bbox) {
                    region.particles.push(pref);
                }
            }
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Regions that overlap the container's current bounds.
    pub fn active<'a>(&'a self, bounds: &'a Bounds) -> impl Iterator<Item = &'a Region> + 'a {
        self.regions.iter().filter(move |r| r.bounds.intersects(bounds))
    }

    /// Number of particles in each region, in grid order.
    pub fn occupancy(&self) -> Vec<usize> {
        self.regions.iter().map(|r| r.particles.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use ultraviolet::DVec2;

    fn grid() -> (Container, RegionGrid) {
        let config = SimConfig::default();
        let container = Container::new(&config);
        let grid = RegionGrid::new(&container, config.region_size());
        (container, grid)
    }

    fn heavy(x: f64, y: f64) -> Particle {
        Particle::new(Species::Heavy, Species::Heavy.default_props(), DVec2::new(x, y), DVec2::zero())
    }

    #[test]
    fn grid_covers_maximum_width() {
        let (container, grid) = grid();
        let max = container.max_bounds();
        for corner in [max.min, max.max, max.center()] {
            assert!(grid.regions().iter().any(|r| r.bounds.contains_point(corner)));
        }
        // 15000 / 2187.5 -> 7 columns, 4 rows
        assert_eq!(grid.regions().len(), 7 * 4);
    }

    #[test]
    fn only_regions_touching_current_bounds_are_active() {
        let (mut container, grid) = grid();
        let all = grid.regions().len();
        container.resize(container.width_range.min);
        let b = container.bounds();
        let active = grid.active(&b).count();
        assert!(active < all);
        assert!(active > 0);
    }

    #[test]
    fn straddling_particle_joins_both_cells() {
        let (container, mut grid) = grid();
        let size = grid.cell_size;
        // Centre exactly on the boundary between column 0 and column 1, mid-row.
        let p = heavy(container.right() - size, container.bottom() + size * 0.5);
        grid.assign(ParticleRef { species: Species::Heavy, index: 0 }, &p);
        let hits = grid.occupancy().iter().filter(|&&n| n > 0).count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn clear_empties_membership() {
        let (container, mut grid) = grid();
        let p = heavy(container.right() - 500.0, container.bottom() + 500.0);
        grid.assign(ParticleRef { species: Species::Heavy, index: 0 }, &p);
        assert_eq!(grid.occupancy().iter().sum::<usize>(), 1);
        grid.clear();
        assert_eq!(grid.occupancy().iter().sum::<usize>(), 0);
    }
}

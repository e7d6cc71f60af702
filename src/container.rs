// container.rs
// Axis-aligned container with a fixed right/bottom corner and a movable left wall.
// Carries the lid/opening on the top wall and the optional diffusion divider.

use crate::bounds::Bounds;
use crate::config::{SimConfig, ValueRange};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use ultraviolet::DVec2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lid {
    /// Horizontal extent of the opening, measured from the inside left edge (pm)
    pub opening_width: f64,
    /// False after the lid has been blown off
    pub on: bool,
}

/// Independent collision domains. A divider splits the container in two.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollisionDomains {
    Single(Bounds),
    Split { left: Bounds, right: Bounds },
}

impl CollisionDomains {
    pub fn bounds(&self) -> SmallVec<[Bounds; 2]> {
        match *self {
            CollisionDomains::Single(b) => smallvec![b],
            CollisionDomains::Split { left, right } => smallvec![left, right],
        }
    }

    /// Index of the domain on whose side of the divider centre `x` lies.
    /// Callers pass a particle's previous x, so a particle that crossed the
    /// divider slab during integration is still resolved against its own side.
    #[inline]
    pub fn index_of(&self, x: f64) -> usize {
        match self {
            CollisionDomains::Single(_) => 0,
            CollisionDomains::Split { left, right } => {
                if x <= 0.5 * (left.max.x + right.min.x) {
                    0
                } else {
                    1
                }
            }
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Bounds {
        match *self {
            CollisionDomains::Single(b) => b,
            CollisionDomains::Split { left, right } => {
                if index == 0 {
                    left
                } else {
                    right
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Fixed bottom-right inside corner (pm)
    pub position: DVec2,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub wall_thickness: f64,
    pub width_range: ValueRange,
    pub desired_width: f64,
    pub animating: bool,
    pub wall_speed_limit: f64,
    /// x-only, recomputed every step
    pub left_wall_velocity: DVec2,
    pub lid: Lid,
    pub min_lid_width: f64,
    pub has_divider: bool,
    pub divider_thickness: f64,
}

impl Container {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            position: DVec2::zero(),
            width: config.default_width,
            height: config.container_height,
            depth: config.container_depth,
            wall_thickness: config.wall_thickness,
            width_range: config.width_range,
            desired_width: config.default_width,
            animating: false,
            wall_speed_limit: config.wall_speed_limit,
            left_wall_velocity: DVec2::zero(),
            lid: Lid { opening_width: 0.0, on: true },
            min_lid_width: config.min_lid_width,
            has_divider: false,
            divider_thickness: config.divider_thickness,
        }
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.position.x - self.width
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.position.y
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.position.y + self.height
    }

    /// Inside bounds at the current width.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left(), self.bottom(), self.right(), self.top())
    }

    /// Inside bounds at the maximum width.
    pub fn max_bounds(&self) -> Bounds {
        Bounds::new(self.right() - self.width_range.max, self.bottom(), self.right(), self.top())
    }

    /// pm³
    pub fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Width that encloses `volume` at the fixed height and depth.
    pub fn width_for_volume(&self, volume: f64) -> f64 {
        volume / (self.height * self.depth)
    }

    /// Request a new width. Animated changes move the left wall at a bounded speed
    /// from `step`; otherwise the width changes now with no wall velocity.
    pub fn set_desired_width(&mut self, width: f64, animate: bool) {
        let width = self.width_range.clamp(width);
        self.desired_width = width;
        if animate {
            self.animating = (width - self.width).abs() > f64::EPSILON;
        } else {
            self.resize(width);
        }
    }

    /// Instantaneous resize. The wall does no work.
    pub fn resize(&mut self, width: f64) {
        debug_assert!(width.is_finite() && width > 0.0, "width must be finite and > 0");
        self.width = self.width_range.clamp(width);
        self.desired_width = self.width;
        self.animating = false;
        self.left_wall_velocity = DVec2::zero();
        self.clamp_lid();
    }

    /// Animate the left wall and compute its velocity for this step.
    pub fn step(&mut self, dt: f64) {
        let old_left = self.left();
        if self.animating {
            let delta = self.desired_width - self.width;
            let max_delta = self.wall_speed_limit * dt;
            if delta.abs() <= max_delta {
                self.width = self.desired_width;
                self.animating = false;
            } else {
                self.width += max_delta.copysign(delta);
            }
            self.clamp_lid();
        }
        self.left_wall_velocity = if dt > 0.0 {
            DVec2::new((self.left() - old_left) / dt, 0.0)
        } else {
            DVec2::zero()
        };
    }

    // ---- lid ----

    pub fn max_opening_width(&self) -> f64 {
        (self.width - self.min_lid_width).max(0.0)
    }

    pub fn set_opening_width(&mut self, opening: f64) {
        self.lid.opening_width = opening.clamp(0.0, self.max_opening_width());
    }

    fn clamp_lid(&mut self) {
        self.lid.opening_width = self.lid.opening_width.min(self.max_opening_width());
    }

    /// Horizontal extent of the opening in the top wall, if any.
    pub fn opening(&self) -> Option<(f64, f64)> {
        if !self.lid.on {
            Some((self.left(), self.right()))
        } else if self.lid.opening_width > 0.0 {
            Some((self.left(), self.left() + self.lid.opening_width))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_lid_open(&self) -> bool {
        self.opening().is_some()
    }

    pub fn blow_lid_off(&mut self) {
        self.lid.on = false;
    }

    /// Put the lid back, closed.
    pub fn return_lid(&mut self) {
        self.lid.on = true;
        self.lid.opening_width = 0.0;
    }

    // ---- divider ----

    pub fn divider_x(&self) -> f64 {
        self.bounds().center().x
    }

    pub fn collision_domains(&self) -> CollisionDomains {
        let b = self.bounds();
        if !self.has_divider {
            return CollisionDomains::Single(b);
        }
        let half = self.divider_thickness / 2.0;
        let x = self.divider_x();
        CollisionDomains::Split {
            left: Bounds::new(b.min.x, b.min.y, x - half, b.max.y),
            right: Bounds::new(x + half, b.min.y, b.max.x, b.max.y),
        }
    }

    /// Bounds of one side of the container, regardless of whether the divider is in.
    pub fn side_bounds(&self, side: Side) -> Bounds {
        let b = self.bounds();
        let half = self.divider_thickness / 2.0;
        let x = self.divider_x();
        match side {
            Side::Left => Bounds::new(b.min.x, b.min.y, x - half, b.max.y),
            Side::Right => Bounds::new(x + half, b.min.y, b.max.x, b.max.y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

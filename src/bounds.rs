// bounds.rs
// Axis-aligned rectangle used for container bounds, regions and particle boxes

use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y, "inverted bounds");
        Self { min: DVec2::new(min_x, min_y), max: DVec2::new(max_x, max_y) }
    }

    /// Square box of half-size `half` centred on `center`.
    pub fn around(center: DVec2, half: f64) -> Self {
        Self {
            min: center - DVec2::one() * half,
            max: center + DVec2::one() * half,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    /// Inclusive overlap test: boxes that share an edge intersect.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains_point(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// True when `other` lies entirely inside, allowing `eps` of slack on every edge.
    pub fn contains_bounds(&self, other: &Bounds, eps: f64) -> bool {
        other.min.x >= self.min.x - eps
            && other.max.x <= self.max.x + eps
            && other.min.y >= self.min.y - eps
            && other.max.y <= self.max.y + eps
    }

    pub fn dilated(&self, amount: f64) -> Self {
        Self {
            min: self.min - DVec2::one() * amount,
            max: self.max + DVec2::one() * amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_edge_counts_as_intersection() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 0.0, 20.0, 10.0);
        let c = Bounds::new(10.5, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn containment_respects_slack() {
        let outer = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let inner = Bounds::new(-1e-9, 1.0, 5.0, 5.0);
        assert!(!outer.contains_bounds(&inner, 0.0));
        assert!(outer.contains_bounds(&inner, 1e-6));
    }
}

//! Collision primitives
//!
//! Every hit test in the game is a circle (projectile) against an axis-aligned
//! box (ship, minion, boss, power-up). Entities convert themselves to an
//! [`Aabb`] through [`Bounded`] so the test never cares which entity it is.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box, top-left origin, +y down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Square box, as used by every entity with a single `size` field
    pub fn square(top_left: Vec2, size: f32) -> Self {
        Self {
            min: top_left,
            size: Vec2::splat(size),
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Box of the same center scaled by `factor` on both axes
    pub fn shrunk(&self, factor: f32) -> Self {
        let size = self.size * factor;
        Self {
            min: self.center() - size * 0.5,
            size,
        }
    }

    /// Closest point inside the box to `p`
    #[inline]
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max())
    }

    /// Strict box/box overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && a_max.x > other.min.x && self.min.y < b_max.y && a_max.y > other.min.y
    }

    /// Horizontal extents overlap, ignoring y entirely
    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x < other.max().x && self.max().x > other.min.x
    }
}

/// A circle (projectile shape)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Anything that occupies a box in the play area
pub trait Bounded {
    fn bounds(&self) -> Aabb;
}

impl Bounded for Aabb {
    fn bounds(&self) -> Aabb {
        *self
    }
}

/// Circle vs box overlap
///
/// Clamps the circle center into the box to find the nearest point, then
/// compares the distance against the radius. Touching counts as a hit.
#[inline]
pub fn circle_intersects_box(circle: Circle, aabb: &Aabb) -> bool {
    let nearest = aabb.clamp_point(circle.center);
    circle.center.distance(nearest) <= circle.radius
}

/// Convenience wrapper for any [`Bounded`] entity
#[inline]
pub fn circle_hits<B: Bounded + ?Sized>(circle: Circle, target: &B) -> bool {
    circle_intersects_box(circle, &target.bounds())
}

/// Whether a circle has left the play area by more than `margin`
pub fn outside_play_area(center: Vec2, width: f32, height: f32, margin: f32) -> bool {
    center.x < -margin || center.x > width + margin || center.y < -margin || center.y > height + margin
}

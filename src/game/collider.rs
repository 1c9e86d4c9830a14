//! Axis-Aligned Bounding Boxes
//!
//! Entities collide as boxes that never rotate. Intersection uses open
//! intervals: boxes that only share an edge are not touching, which is what
//! lets a minimum translation vector fully separate a pair.

use serde::{Serialize, Deserialize};
use super::vector::Vector;

/// Bound on slop doublings when rounding keeps a pushed pair overlapping
pub const MAX_SEPARATION_STEPS: usize = 8;

/// Axis-aligned box described by its center and full size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vector,
    /// Full width/height, both components >= 0
    pub size: Vector,
}

impl Aabb {
    /// Create a box. Negative sizes are folded to their absolute value.
    pub fn new(center: Vector, size: Vector) -> Self {
        Self {
            center,
            size: Vector::new(size.x.abs(), size.y.abs()),
        }
    }

    pub fn from_min_max(min: Vector, max: Vector) -> Self {
        Self::new((min + max) * 0.5, max - min)
    }

    pub fn half_size(&self) -> Vector {
        self.size * 0.5
    }

    pub fn min(&self) -> Vector {
        self.center - self.half_size()
    }

    pub fn max(&self) -> Vector {
        self.center + self.half_size()
    }

    pub fn translate(&mut self, offset: Vector) {
        self.center += offset;
    }

    /// Penetration depth on each axis. Zero or negative means the boxes are
    /// apart (or touching) on that axis.
    pub fn overlap(&self, other: &Aabb) -> Vector {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        Vector::new(
            a_max.x.min(b_max.x) - a_min.x.max(b_min.x),
            a_max.y.min(b_max.y) - a_min.y.max(b_min.y),
        )
    }

    /// True iff the projections overlap on both axes. Shared edges don't count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
    }

    /// Smallest translation that moves `self` out of `other`.
    ///
    /// Separates along the axis with the smaller penetration; an exact tie picks
    /// the horizontal axis. The push points away from `other`'s center, and
    /// coincident centers push toward +axis. Returns `None` when the boxes do
    /// not intersect.
    pub fn minimum_translation_vector(&self, other: &Aabb) -> Option<Vector> {
        if !self.intersects(other) {
            return None;
        }

        let delta = self.center - other.center;
        let reach = self.half_size() + other.half_size();
        // Push needed to clear the other box along each axis. Accounts for
        // containment, unlike `overlap`.
        let depth_x = reach.x - delta.x.abs();
        let depth_y = reach.y - delta.y.abs();

        let direction = |d: f64| if d < 0.0 { -1.0 } else { 1.0 };

        let (mut mtv, axis) = if depth_x <= depth_y {
            (Vector::new(depth_x * direction(delta.x), 0.0), Vector::new(direction(delta.x), 0.0))
        } else {
            (Vector::new(0.0, depth_y * direction(delta.y)), Vector::new(0.0, direction(delta.y)))
        };

        // The exact depth can round back into overlap once added to the center
        let mut slop = self.separation_slop(other);
        for _ in 0..MAX_SEPARATION_STEPS {
            let mut moved = *self;
            moved.translate(mtv);
            if !moved.intersects(other) {
                break;
            }
            mtv += axis * slop;
            slop *= 2.0;
        }
        Some(mtv)
    }

    /// Extra push that outweighs float rounding at the scale of this pair
    pub fn separation_slop(&self, other: &Aabb) -> f64 {
        let scale = [
            self.center.x,
            self.center.y,
            self.size.x,
            self.size.y,
            other.center.x,
            other.center.y,
            other.size.x,
            other.size.y,
        ]
        .iter()
        .fold(1.0_f64, |m, v| m.max(v.abs()));
        scale * f64::EPSILON * 4.0
    }

    /// Clamp a point into the box, per axis
    pub fn closest_point(&self, point: Vector) -> Vector {
        let (min, max) = (self.min(), self.max());
        Vector::new(point.x.clamp(min.x, max.x), point.y.clamp(min.y, max.y))
    }

    /// Closed-interval containment, used for pointer hit tests
    pub fn contains_point(&self, point: Vector) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }
}

/// Collision shape owned by an entity, positioned relative to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub size: Vector,
    /// Offset of the box center from the entity position
    #[serde(default)]
    pub offset: Vector,
}

impl Collider {
    pub fn new(size: Vector) -> Self {
        Self {
            size: Vector::new(size.x.abs(), size.y.abs()),
            offset: Vector::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Vector) -> Self {
        self.offset = offset;
        self
    }

    /// World-space box for an entity at `position`
    pub fn aabb_at(&self, position: Vector) -> Aabb {
        Aabb::new(position + self.offset, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f64, y: f64, w: f64, h: f64) -> Aabb {
        Aabb::new(Vector::new(x, y), Vector::new(w, h))
    }

    #[test]
    fn test_min_max() {
        let b = boxed(10.0, 20.0, 4.0, 8.0);
        assert_eq!(b.min(), Vector::new(8.0, 16.0));
        assert_eq!(b.max(), Vector::new(12.0, 24.0));
        assert_eq!(Aabb::from_min_max(b.min(), b.max()), b);
    }

    #[test]
    fn test_negative_size_is_folded() {
        let b = boxed(0.0, 0.0, -2.0, -4.0);
        assert_eq!(b.size, Vector::new(2.0, 4.0));
    }

    #[test]
    fn test_intersects_is_symmetric() {
        let cases = [
            (boxed(0.0, 0.0, 2.0, 2.0), boxed(1.0, 1.0, 2.0, 2.0)),
            (boxed(0.0, 0.0, 2.0, 2.0), boxed(5.0, 0.0, 2.0, 2.0)),
            (boxed(0.0, 0.0, 2.0, 2.0), boxed(2.0, 0.0, 2.0, 2.0)),
            (boxed(0.0, 0.0, 10.0, 10.0), boxed(0.5, 0.5, 1.0, 1.0)),
        ];
        for (a, b) in cases {
            assert_eq!(a.intersects(&b), b.intersects(&a));
        }
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = boxed(0.0, 0.0, 2.0, 2.0);
        let right = boxed(2.0, 0.0, 2.0, 2.0);
        let below = boxed(0.0, 2.0, 2.0, 2.0);
        assert!(!a.intersects(&right));
        assert!(!a.intersects(&below));
        assert!(a.minimum_translation_vector(&right).is_none());
    }

    #[test]
    fn test_mtv_picks_smaller_overlap() {
        // Overlap 0.5 on x, 1.5 on y -> push horizontally
        let a = boxed(0.0, 0.0, 2.0, 2.0);
        let b = boxed(1.5, 0.5, 2.0, 2.0);
        let mtv = a.minimum_translation_vector(&b).unwrap();
        assert_eq!(mtv, Vector::new(-0.5, 0.0));

        // Overlap 1.5 on x, 0.25 on y, b is above a -> push a down (+y)
        let c = boxed(0.5, -1.75, 2.0, 2.0);
        let mtv = a.minimum_translation_vector(&c).unwrap();
        assert_eq!(mtv, Vector::new(0.0, 0.25));
    }

    #[test]
    fn test_mtv_tie_prefers_horizontal() {
        let a = boxed(0.0, 0.0, 2.0, 2.0);
        let b = boxed(1.0, 1.0, 2.0, 2.0);
        let mtv = a.minimum_translation_vector(&b).unwrap();
        assert_eq!(mtv, Vector::new(-1.0, 0.0));
    }

    #[test]
    fn test_mtv_coincident_centers_use_fixed_direction() {
        let a = boxed(3.0, 3.0, 2.0, 4.0);
        let b = boxed(3.0, 3.0, 2.0, 4.0);
        let mtv = a.minimum_translation_vector(&b).unwrap();
        assert_eq!(mtv, Vector::new(2.0, 0.0));
        assert_eq!(b.minimum_translation_vector(&a).unwrap(), mtv);
    }

    #[test]
    fn test_applying_mtv_separates() {
        let others = [
            boxed(1.5, 0.5, 2.0, 2.0),
            boxed(-0.75, 0.25, 2.0, 2.0),
            boxed(0.25, 1.75, 2.0, 2.0),
            boxed(0.0, 0.0, 1.0, 1.0),
            boxed(0.5, -0.5, 4.0, 1.0),
        ];
        for other in others {
            let mut a = boxed(0.0, 0.0, 2.0, 2.0);
            assert!(a.intersects(&other));
            let mtv = a.minimum_translation_vector(&other).unwrap();
            a.translate(mtv);
            assert!(!a.intersects(&other), "still intersecting after {:?}", mtv);
        }
    }

    #[test]
    fn test_applying_mtv_separates_random_pairs() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        let mut checked = 0;
        for _ in 0..50_000 {
            let mut a = boxed(
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.1..30.0),
                rng.gen_range(0.1..30.0),
            );
            let b = boxed(
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.1..30.0),
                rng.gen_range(0.1..30.0),
            );
            let Some(mtv) = a.minimum_translation_vector(&b) else {
                continue;
            };
            checked += 1;
            // Only a hair beyond the true depth
            let depth = mtv.x.abs().max(mtv.y.abs());
            assert!(depth <= (a.size + b.size).x.max((a.size + b.size).y));
            a.translate(mtv);
            assert!(!a.intersects(&b), "{:?} vs {:?} still intersecting after {:?}", a, b, mtv);
        }
        assert!(checked > 1000);
    }

    #[test]
    fn test_closest_point_and_contains() {
        let b = boxed(0.0, 0.0, 2.0, 2.0);
        assert_eq!(b.closest_point(Vector::new(5.0, -5.0)), Vector::new(1.0, -1.0));
        assert_eq!(b.closest_point(Vector::new(0.5, 0.25)), Vector::new(0.5, 0.25));
        assert!(b.contains_point(Vector::new(1.0, 1.0)));
        assert!(!b.contains_point(Vector::new(1.01, 0.0)));
    }

    #[test]
    fn test_collider_offset() {
        let c = Collider::new(Vector::new(2.0, 2.0)).with_offset(Vector::new(0.0, -1.0));
        let aabb = c.aabb_at(Vector::new(10.0, 10.0));
        assert_eq!(aabb.center, Vector::new(10.0, 9.0));
    }
}

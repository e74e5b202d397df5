//! Axis-aligned bounding boxes.

use glam::DVec3;

/// Axis-aligned bounding box given by componentwise minima and maxima.
///
/// Flat (zero-thickness) boxes are legal; they arise from planar primitives
/// and from kd-tree splits at coincident extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// A box that is empty under `union` (inverted infinite bounds).
    pub fn empty_growable() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    /// True when some component has `min > max`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True when the box has zero volume but is not empty.
    #[inline]
    pub fn is_flat(&self) -> bool {
        !self.is_empty()
            && (self.min.x == self.max.x || self.min.y == self.max.y || self.min.z == self.max.z)
    }

    #[inline]
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Surface area; zero-thickness boxes report the area of the flat faces.
    pub fn surface_area(&self) -> f64 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    #[inline]
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn enlarge_to_contain(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn enlarge_to_contain_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn intersection(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Axis component accessor (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn min_on_axis(&self, axis: usize) -> f64 {
        self.min[axis]
    }

    #[inline]
    pub fn max_on_axis(&self, axis: usize) -> f64 {
        self.max[axis]
    }

    /// Entry and exit distances of a ray against the box.
    ///
    /// Returns `None` on a miss. A ray starting inside reports a negative
    /// entry distance; callers clamp to zero as needed. Rays parallel to a
    /// slab are rejected unless the origin lies inside that slab.
    pub fn ray_entry_exit(&self, origin: DVec3, dir: DVec3) -> Option<(f64, f64)> {
        let mut t_in = f64::NEG_INFINITY;
        let mut t_out = f64::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d == 0.0 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = if inv >= 0.0 {
                ((self.min[axis] - o) * inv, (self.max[axis] - o) * inv)
            } else {
                ((self.max[axis] - o) * inv, (self.min[axis] - o) * inv)
            };
            t_in = t_in.max(t0);
            t_out = t_out.min(t1);
            if t_in > t_out {
                return None;
            }
        }
        Some((t_in, t_out))
    }

    /// Bounding box of a point set. Returns `None` on an empty set.
    pub fn from_points(points: &[DVec3]) -> Option<Aabb> {
        let (&first, rest) = points.split_first()?;
        let mut aabb = Aabb::new(first, first);
        for &p in rest {
            aabb.enlarge_to_contain_point(p);
        }
        Some(aabb)
    }

    /// Clamp this box to lie inside `bounds` (guards roundoff from clipping).
    pub fn clamp_to(&mut self, bounds: &Aabb) {
        self.min = self.min.clamp(bounds.min, bounds.max);
        self.max = self.max.clamp(bounds.min, bounds.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::ONE)
    }

    #[test]
    fn ray_hits_box_straight_on() {
        let (t_in, t_out) = unit_box()
            .ray_entry_exit(DVec3::new(0.5, 0.5, -2.0), DVec3::Z)
            .unwrap();
        assert!((t_in - 2.0).abs() < 1e-12);
        assert!((t_out - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ray_parallel_outside_slab_misses() {
        assert!(
            unit_box()
                .ray_entry_exit(DVec3::new(2.0, 0.5, -1.0), DVec3::Z)
                .is_none()
        );
    }

    #[test]
    fn ray_from_inside_reports_negative_entry() {
        let (t_in, t_out) = unit_box()
            .ray_entry_exit(DVec3::splat(0.5), DVec3::X)
            .unwrap();
        assert!(t_in < 0.0);
        assert!((t_out - 0.5).abs() < 1e-12);
    }

    #[test]
    fn flat_box_is_legal_and_hittable() {
        let flat = Aabb::new(DVec3::new(0.0, 0.0, 0.5), DVec3::new(1.0, 1.0, 0.5));
        assert!(flat.is_flat());
        let (t_in, t_out) = flat
            .ray_entry_exit(DVec3::new(0.5, 0.5, 0.0), DVec3::Z)
            .unwrap();
        assert!((t_in - 0.5).abs() < 1e-12);
        assert!((t_out - 0.5).abs() < 1e-12);
    }

    #[test]
    fn surface_area_of_unit_cube() {
        assert!((unit_box().surface_area() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn union_and_intersection() {
        let a = unit_box();
        let b = Aabb::new(DVec3::splat(0.5), DVec3::splat(2.0));
        let mut u = a;
        u.enlarge_to_contain(&b);
        assert_eq!(u, Aabb::new(DVec3::ZERO, DVec3::splat(2.0)));
        assert_eq!(a.intersection(&b), Aabb::new(DVec3::splat(0.5), DVec3::ONE));
        assert!(a.intersects(&b));
    }
}

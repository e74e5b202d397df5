//! Convex polygon clipping against planes, slabs, and boxes.
//!
//! Used by the exact extents-in-box computations that feed kd-tree
//! construction. The vertex list is caller-owned; there is no shared scratch.

use crate::aabb::Aabb;
use crate::util::lerp_delta;
use glam::DVec3;

/// Clip a convex polygon to the half-space `{x : x . normal <= plane_const}`.
///
/// Vertices exactly on the plane are retained. Returns true when the polygon
/// was changed; the polygon may come back empty.
pub fn clip_convex_polygon_against_plane(
    verts: &mut Vec<DVec3>,
    normal: DVec3,
    plane_const: f64,
) -> bool {
    let n = verts.len();
    if n == 0 {
        return false;
    }
    let above: Vec<f64> = verts.iter().map(|v| v.dot(normal) - plane_const).collect();
    if above.iter().all(|&a| a <= 0.0) {
        return false;
    }
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let (pa, ca) = (above[prev], above[i]);
        if ca <= 0.0 {
            // Entering or staying inside; a strict crossing adds the entry point
            if pa > 0.0 && ca < 0.0 {
                out.push(lerp_delta(verts[i], verts[prev], ca / (ca - pa)));
            }
            out.push(verts[i]);
        } else if pa < 0.0 {
            // Leaving the half-space through the interior
            out.push(lerp_delta(verts[prev], verts[i], pa / (pa - ca)));
        }
    }
    *verts = out;
    true
}

/// Clip a convex polygon to the slab `{x : c_min <= x . normal <= c_max}`.
///
/// Zero-area intersections are discarded: a polygon lying entirely on one
/// boundary plane of a thick slab is removed, and a zero-thickness slab keeps
/// the polygon only when it lies exactly in the slab plane. Returns true when
/// the polygon was changed.
pub fn clip_convex_polygon_against_slab(
    verts: &mut Vec<DVec3>,
    normal: DVec3,
    c_min: f64,
    c_max: f64,
) -> bool {
    debug_assert!(c_min <= c_max);
    if verts.is_empty() {
        return false;
    }
    let dots: Vec<f64> = verts.iter().map(|v| v.dot(normal)).collect();
    let any_outside = dots.iter().any(|&d| d < c_min || d > c_max);
    if !any_outside {
        return false;
    }
    let zero_thickness = c_min == c_max;
    let all_right = dots.iter().all(|&d| d >= c_max);
    let all_left = dots.iter().all(|&d| d <= c_min);
    if zero_thickness || all_right || all_left {
        verts.clear();
        return true;
    }
    clip_convex_polygon_against_plane(verts, normal, c_max);
    clip_convex_polygon_against_plane(verts, -normal, -c_min);
    true
}

/// Clip a convex polygon against an axis-aligned box.
///
/// `plane_normal` is the normal of the plane containing the polygon; the axis
/// it is most aligned with is clipped last, which keeps near-degenerate
/// polygons stable. Returns the remaining vertex count (zero when the
/// intersection has no area).
pub fn clip_convex_polygon_against_box(
    verts: &mut Vec<DVec3>,
    plane_normal: DVec3,
    bounds: &Aabb,
) -> usize {
    if verts.len() <= 2 {
        verts.clear();
        return 0;
    }
    let na = plane_normal.abs();
    let greatest = if na.x > na.y {
        if na.x > na.z { 0 } else { 2 }
    } else if na.y > na.z {
        1
    } else {
        2
    };
    for j in (0..3).rev() {
        let axis = (greatest + j) % 3;
        let dir = match axis {
            0 => DVec3::X,
            1 => DVec3::Y,
            _ => DVec3::Z,
        };
        clip_convex_polygon_against_slab(verts, dir, bounds.min[axis], bounds.max[axis]);
        if verts.len() <= 2 {
            verts.clear();
            return 0;
        }
    }
    verts.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square_xy() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn plane_clip_keeps_polygon_below() {
        let mut verts = unit_square_xy();
        let changed = clip_convex_polygon_against_plane(&mut verts, DVec3::X, 2.0);
        assert!(!changed);
        assert_eq!(verts.len(), 4);
    }

    #[test]
    fn plane_clip_halves_square() {
        let mut verts = unit_square_xy();
        assert!(clip_convex_polygon_against_plane(&mut verts, DVec3::X, 0.5));
        assert_eq!(verts.len(), 4);
        for v in &verts {
            assert!(v.x <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn plane_clip_discards_polygon_above() {
        let mut verts = unit_square_xy();
        assert!(clip_convex_polygon_against_plane(&mut verts, -DVec3::X, -2.0));
        assert!(verts.is_empty());
    }

    #[test]
    fn polygon_exactly_on_plane_is_retained() {
        let mut verts = unit_square_xy();
        let changed = clip_convex_polygon_against_plane(&mut verts, DVec3::Z, 0.0);
        assert!(!changed);
        assert_eq!(verts.len(), 4);
    }

    #[test]
    fn zero_thickness_slab_keeps_only_inplane_polygon() {
        let mut inplane = unit_square_xy();
        assert!(!clip_convex_polygon_against_slab(
            &mut inplane,
            DVec3::Z,
            0.0,
            0.0
        ));
        assert_eq!(inplane.len(), 4);

        let mut tilted = vec![
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(0.0, 1.0, 1.0),
        ];
        assert!(clip_convex_polygon_against_slab(
            &mut tilted,
            DVec3::Z,
            0.0,
            0.0
        ));
        assert!(tilted.is_empty());
    }

    #[test]
    fn polygon_on_slab_boundary_is_discarded() {
        // On the max plane of a thick slab with nothing strictly outside:
        // retained unchanged.
        let mut verts = unit_square_xy();
        assert!(!clip_convex_polygon_against_slab(
            &mut verts,
            DVec3::Z,
            -1.0,
            0.0
        ));
        assert_eq!(verts.len(), 4);

        let mut above = unit_square_xy();
        for v in &mut above {
            v.z = 1.0;
        }
        assert!(clip_convex_polygon_against_slab(
            &mut above,
            DVec3::Z,
            -1.0,
            0.0
        ));
        assert!(above.is_empty());
    }

    #[test]
    fn slab_clip_trims_both_sides() {
        let mut verts = unit_square_xy();
        assert!(clip_convex_polygon_against_slab(
            &mut verts,
            DVec3::X,
            0.25,
            0.75
        ));
        for v in &verts {
            assert!(v.x >= 0.25 - 1e-12 && v.x <= 0.75 + 1e-12);
        }
    }

    #[test]
    fn box_clip_of_large_triangle() {
        let mut verts = vec![
            DVec3::new(-5.0, -5.0, 0.5),
            DVec3::new(5.0, -5.0, 0.5),
            DVec3::new(0.0, 5.0, 0.5),
        ];
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let n = clip_convex_polygon_against_box(&mut verts, DVec3::Z, &bounds);
        assert!(n >= 3);
        for v in &verts {
            assert!(bounds.contains_point(*v));
        }
    }

    #[test]
    fn box_clip_misses_entirely() {
        let mut verts = vec![
            DVec3::new(5.0, 5.0, 5.0),
            DVec3::new(6.0, 5.0, 5.0),
            DVec3::new(5.0, 6.0, 5.0),
        ];
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        assert_eq!(
            clip_convex_polygon_against_box(&mut verts, DVec3::Z, &bounds),
            0
        );
    }
}

//! Exact extents of primitives clipped to bounding boxes.
//!
//! These feed kd-tree construction: the tighter the clipped extents, the
//! better the surface-area-heuristic splits. Planar primitives use convex
//! polygon clipping; spheres use interval analysis per axis.

use glam::DVec3;
use vmath::polygon::clip_convex_polygon_against_box;
use vmath::util::square;
use vmath::{Aabb, Parallelepiped};

/// Extents of a convex planar polygon clipped to `bounds`.
pub fn polygon_extents_in_box(
    vertices: &[DVec3],
    plane_normal: DVec3,
    bounds: &Aabb,
) -> Option<Aabb> {
    let mut verts = vertices.to_vec();
    if clip_convex_polygon_against_box(&mut verts, plane_normal, bounds) == 0 {
        return None;
    }
    let mut aabb = Aabb::from_points(&verts)?;
    aabb.clamp_to(bounds);
    Some(aabb)
}

/// Extents of a parallelepiped solid clipped to `bounds`.
///
/// Clips all six faces against the box and also keeps any extremal solid
/// vertices that lie inside it. The intersection is declared empty when no
/// pair of extremal vertices survives and fewer than two faces intersect
/// the box (grazing contact).
pub fn parallelepiped_extents_in_box(
    base: DVec3,
    edge_a: DVec3,
    edge_b: DVec3,
    edge_c: DVec3,
    bounds: &Aabb,
) -> Option<Aabb> {
    let ppd = Parallelepiped::new(base, edge_a, edge_b, edge_c);
    let mut collected: Vec<DVec3> = Vec::with_capacity(32);
    let mut face_isect_count = 0;

    let faces = [
        (ppd.front_face(), ppd.normal_front()),
        (ppd.back_face(), ppd.normal_front()),
        (ppd.right_face(), ppd.normal_left()),
        (ppd.left_face(), ppd.normal_left()),
        (ppd.bottom_face(), ppd.normal_bottom()),
        (ppd.top_face(), ppd.normal_bottom()),
    ];
    for (face, normal) in faces {
        let mut verts = face.to_vec();
        if clip_convex_polygon_against_box(&mut verts, normal, bounds) > 0 {
            face_isect_count += 1;
            collected.append(&mut verts);
        }
    }

    // Extremal solid vertices per axis; two surviving endpoints on any axis
    // mean the solid genuinely overlaps the box.
    let mut two_endpoints_in = false;
    for axis in 0..3 {
        let mut min_v = base;
        let mut max_v = base;
        for edge in [edge_a, edge_b, edge_c] {
            if edge[axis] > 0.0 {
                max_v += edge;
            } else {
                min_v += edge;
            }
        }
        let mut num_in = 0;
        for v in [min_v, max_v] {
            if bounds.contains_point(v) {
                collected.push(v);
                num_in += 1;
            }
        }
        if num_in == 2 {
            two_endpoints_in = true;
        }
    }

    if !two_endpoints_in && face_isect_count < 2 {
        return None;
    }
    let mut aabb = Aabb::from_points(&collected)?;
    aabb.clamp_to(bounds);
    Some(aabb)
}

/// Extents of a sphere clipped to `bounds`, via per-axis interval analysis.
/// Zero-area contacts (tangent faces, corner touches) report empty.
pub fn sphere_extents_in_box(center: DVec3, radius: f64, bounds: &Aabb) -> Option<Aabb> {
    let min = bounds.min - center;
    let max = bounds.max - center;

    let (x_sq_min, x_sq_max) = min_max_squares(min.x, max.x);
    let (y_sq_min, y_sq_max) = min_max_squares(min.y, max.y);
    let (z_sq_min, z_sq_max) = min_max_squares(min.z, max.z);

    let radius_sq = square(radius);
    let x = axis_extent_for_sphere(min.x, max.x, radius_sq, y_sq_min + z_sq_min, y_sq_max + z_sq_max)?;
    let y = axis_extent_for_sphere(min.y, max.y, radius_sq, x_sq_min + z_sq_min, x_sq_max + z_sq_max)?;
    let z = axis_extent_for_sphere(min.z, max.z, radius_sq, x_sq_min + y_sq_min, x_sq_max + y_sq_max)?;

    Some(Aabb::new(
        DVec3::new(x.0, y.0, z.0) + center,
        DVec3::new(x.1, y.1, z.1) + center,
    ))
}

/// Min and max of `x^2` over `[val_min, val_max]`.
fn min_max_squares(val_min: f64, val_max: f64) -> (f64, f64) {
    debug_assert!(val_min <= val_max);
    if val_min < 0.0 && val_max > 0.0 {
        (0.0, square(val_min).max(square(val_max)))
    } else {
        let (a, b) = (square(val_min), square(val_max));
        if a > b { (b, a) } else { (a, b) }
    }
}

/// Range of one coordinate over the sphere-box intersection.
///
/// Given the coordinate's box range and the min/max of the other two
/// coordinates' squared sum, the sphere equation bounds the coordinate to
/// `[-max_pos, -min_pos] U [min_pos, max_pos]`; intersect with the box.
fn axis_extent_for_sphere(
    box_min: f64,
    box_max: f64,
    radius_sq: f64,
    other_sq_min: f64,
    other_sq_max: f64,
) -> Option<(f64, f64)> {
    let max_sq = radius_sq - other_sq_min;
    if max_sq < 0.0 {
        return None;
    }
    let max_pos = max_sq.sqrt();
    let min_sq = radius_sq - other_sq_max;
    let min_pos = if min_sq > 0.0 { min_sq.sqrt() } else { 0.0 };

    // <= ignores single-point contacts
    if max_pos <= box_min || -max_pos >= box_max {
        return None;
    }
    if box_min < -min_pos {
        let lo = box_min.max(-max_pos);
        let hi = if box_max > min_pos {
            box_max.min(max_pos)
        } else {
            box_max.min(-min_pos)
        };
        Some((lo, hi))
    } else if box_max > min_pos {
        Some((box_min.max(min_pos), box_max.min(max_pos)))
    } else {
        None
    }
}

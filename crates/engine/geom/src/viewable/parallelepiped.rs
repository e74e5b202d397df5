//! Parallelepipeds (cubes and rectangular prisms included).

use super::Viewable;
use crate::error::GeomError;
use crate::extents;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;
use vmath::Aabb;

pub const PPD_FRONT_FACE: usize = 0;
pub const PPD_BACK_FACE: usize = 1;
pub const PPD_TOP_FACE: usize = 2;
pub const PPD_BOTTOM_FACE: usize = 3;
pub const PPD_RIGHT_FACE: usize = 4;
pub const PPD_LEFT_FACE: usize = 5;

const MIN_VOLUME_FACTOR: f64 = 1.0e-24;

/// One pair of parallel bounding planes.
#[derive(Clone, Copy)]
struct Slab {
    normal: DVec3,
    bottom_coef: f64,
    top_coef: f64,
    /// True when the plane through vertex A has the larger coefficient.
    a_at_top: bool,
}

/// Parallelepiped given by a corner vertex A and its three adjacent
/// vertices B, C, D. B is to the right of A, C above it, D behind it; the
/// exact identities matter only for face numbering and texture coordinates.
pub struct Parallelepiped {
    vertex_a: DVec3,
    vertex_b: DVec3,
    vertex_c: DVec3,
    vertex_d: DVec3,

    // Plane pairs: ABC (front/back), ABD (bottom/top), ACD (left/right)
    slab_abc: Slab,
    slab_abd: Slab,
    slab_acd: Slab,

    outer_material: Arc<dyn Material>,
    inner_material: Arc<dyn Material>,
}

impl Parallelepiped {
    pub fn new(
        vertex_a: DVec3,
        vertex_b: DVec3,
        vertex_c: DVec3,
        vertex_d: DVec3,
        material: Arc<dyn Material>,
    ) -> Result<Self, GeomError> {
        let ab = vertex_b - vertex_a;
        let ac = vertex_c - vertex_a;
        let ad = vertex_d - vertex_a;
        let volume = ab.cross(ac).dot(ad).abs();
        let scale = ab.length() * ac.length() * ad.length();
        if volume < MIN_VOLUME_FACTOR * scale.max(1.0) {
            return Err(GeomError::CoplanarEdges);
        }

        let make_slab = |normal: DVec3, opposite_vertex: DVec3| {
            let normal = normal.normalize();
            let coef_a = normal.dot(vertex_a);
            let coef_opp = normal.dot(opposite_vertex);
            Slab {
                normal,
                bottom_coef: coef_a.min(coef_opp),
                top_coef: coef_a.max(coef_opp),
                a_at_top: coef_a > coef_opp,
            }
        };

        Ok(Self {
            vertex_a,
            vertex_b,
            vertex_c,
            vertex_d,
            slab_abc: make_slab(ab.cross(ac), vertex_d),
            slab_abd: make_slab(ab.cross(ad), vertex_c),
            slab_acd: make_slab(ac.cross(ad), vertex_b),
            outer_material: material.clone(),
            inner_material: material,
        })
    }

    pub fn set_material_outer(&mut self, material: Arc<dyn Material>) {
        self.outer_material = material;
    }

    pub fn set_material_inner(&mut self, material: Arc<dyn Material>) {
        self.inner_material = material;
    }

    pub fn vertices(&self) -> [DVec3; 4] {
        [self.vertex_a, self.vertex_b, self.vertex_c, self.vertex_d]
    }

    /// Slab test shared with Bezier bounding volumes: entry/exit distances
    /// of a ray against three plane pairs, or `None` on a miss.
    #[allow(clippy::too_many_arguments)]
    pub fn quick_intersect_slabs(
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        normal_a: DVec3,
        min_dot_a: f64,
        max_dot_a: f64,
        normal_b: DVec3,
        min_dot_b: f64,
        max_dot_b: f64,
        normal_c: DVec3,
        min_dot_c: f64,
        max_dot_c: f64,
    ) -> Option<(f64, f64)> {
        let mut t_in = f64::NEG_INFINITY;
        let mut t_out = f64::INFINITY;
        for (normal, min_dot, max_dot) in [
            (normal_a, min_dot_a, max_dot_a),
            (normal_b, min_dot_b, max_dot_b),
            (normal_c, min_dot_c, max_dot_c),
        ] {
            let pdotn = view_pos.dot(normal);
            let udotn = view_dir.dot(normal);
            if udotn == 0.0 {
                if pdotn < min_dot || pdotn > max_dot {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / udotn;
            let (t0, t1) = if inv > 0.0 {
                ((min_dot - pdotn) * inv, (max_dot - pdotn) * inv)
            } else {
                ((max_dot - pdotn) * inv, (min_dot - pdotn) * inv)
            };
            t_in = t_in.max(t0);
            t_out = t_out.min(t1);
            if t_in > t_out || t_in > max_dist {
                return None;
            }
        }
        if t_out < 0.0 { None } else { Some((t_in, t_out)) }
    }

    /// Face number for a hit on the given slab, oriented by whether the hit
    /// plane is the one through vertex A.
    fn face_for(slab_index: usize, through_a: bool) -> usize {
        match (slab_index, through_a) {
            // ABC pair: plane through A is the front
            (0, true) => PPD_FRONT_FACE,
            (0, false) => PPD_BACK_FACE,
            // ABD pair: plane through A is the bottom
            (1, true) => PPD_BOTTOM_FACE,
            (1, false) => PPD_TOP_FACE,
            // ACD pair: plane through A is the left
            (2, true) => PPD_LEFT_FACE,
            _ => PPD_RIGHT_FACE,
        }
    }

    fn slabs(&self) -> [Slab; 3] {
        [self.slab_abc, self.slab_abd, self.slab_acd]
    }
}

impl Viewable for Parallelepiped {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let mut max_front = f64::NEG_INFINITY;
        let mut min_back = f64::MAX;
        let mut front_info = (0usize, false);
        let mut back_info = (0usize, false);

        for (i, slab) in self.slabs().iter().enumerate() {
            let pdotn = view_pos.dot(slab.normal);
            let udotn = view_dir.dot(slab.normal);
            if udotn == 0.0 {
                if pdotn < slab.bottom_coef || pdotn > slab.top_coef {
                    return None; // parallel and outside the slab
                }
                continue;
            }
            let inv = 1.0 / udotn;
            let (t_enter, t_exit, enter_top, exit_top) = if inv > 0.0 {
                (
                    (slab.bottom_coef - pdotn) * inv,
                    (slab.top_coef - pdotn) * inv,
                    false,
                    true,
                )
            } else {
                (
                    (slab.top_coef - pdotn) * inv,
                    (slab.bottom_coef - pdotn) * inv,
                    true,
                    false,
                )
            };
            if t_enter > max_front {
                max_front = t_enter;
                front_info = (i, enter_top);
            }
            if t_exit < min_back {
                min_back = t_exit;
                back_info = (i, exit_top);
            }
            if max_front > min_back {
                return None;
            }
        }

        let (distance, info) = if max_front > 0.0 {
            vis_point.set_front_face();
            vis_point.set_material(self.outer_material.clone());
            (max_front, front_info)
        } else if min_back > 0.0 {
            vis_point.set_back_face();
            vis_point.set_material(self.inner_material.clone());
            (min_back, back_info)
        } else {
            return None;
        };
        if distance >= max_dist {
            return None;
        }

        let position = view_pos + view_dir * distance;
        vis_point.set_position(position);

        let (slab_index, hit_top) = info;
        let slab = self.slabs()[slab_index];
        let outward = if hit_top { slab.normal } else { -slab.normal };
        vis_point.set_normal(outward);
        vis_point.set_face_number(Self::face_for(slab_index, hit_top == slab.a_at_top));

        // uv from the two edges spanning the hit face
        let (edge_u, edge_v) = match slab_index {
            0 => (self.vertex_b - self.vertex_a, self.vertex_c - self.vertex_a),
            1 => (self.vertex_b - self.vertex_a, self.vertex_d - self.vertex_a),
            _ => (self.vertex_d - self.vertex_a, self.vertex_c - self.vertex_a),
        };
        let rel = position - self.vertex_a;
        let u = rel.dot(edge_u) / edge_u.length_squared();
        let v = rel.dot(edge_v) / edge_v.length_squared();
        vis_point.set_uv(u, v);
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let ab = self.vertex_b - self.vertex_a;
        let ac = self.vertex_c - self.vertex_a;
        let ad = self.vertex_d - self.vertex_a;
        let base = u.dot(self.vertex_a);
        let mut min = base;
        let mut max = base;
        for delta in [ab, ac, ad] {
            let d = u.dot(delta);
            if d > 0.0 {
                max += d;
            } else {
                min += d;
            }
        }
        (min, max)
    }

    fn calc_extents_in_box(&self, bounds: &Aabb) -> Option<Aabb> {
        extents::parallelepiped_extents_in_box(
            self.vertex_a,
            self.vertex_b - self.vertex_a,
            self.vertex_c - self.vertex_a,
            self.vertex_d - self.vertex_a,
            bounds,
        )
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        let (edge_u, edge_v) = match vis_point.face_number() {
            PPD_FRONT_FACE | PPD_BACK_FACE => {
                (self.vertex_b - self.vertex_a, self.vertex_c - self.vertex_a)
            }
            PPD_TOP_FACE | PPD_BOTTOM_FACE => {
                (self.vertex_b - self.vertex_a, self.vertex_d - self.vertex_a)
            }
            _ => (self.vertex_d - self.vertex_a, self.vertex_c - self.vertex_a),
        };
        Some((edge_u, edge_v))
    }
}

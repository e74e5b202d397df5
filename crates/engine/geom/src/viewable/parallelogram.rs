//! Parallelograms (rectangles and squares included).

use super::Viewable;
use crate::error::GeomError;
use crate::extents;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;
use vmath::Aabb;

const MIN_NORMAL_LENGTH_SQ: f64 = 1.0e-24;

/// Parallelogram given by three vertices in counterclockwise order. The
/// corners run A, B, C, D in a circuit, so the computed fourth vertex is
/// `D = A + C - B`.
pub struct Parallelogram {
    vertex_a: DVec3,
    vertex_b: DVec3,
    vertex_c: DVec3,
    vertex_d: DVec3,

    normal: DVec3,
    plane_coef: f64,
    // Affine coordinate solvers along the edges AB and BC
    u_along_ab: DVec3,
    u_along_bc: DVec3,

    front_material: Arc<dyn Material>,
    back_material: Option<Arc<dyn Material>>,
}

impl Parallelogram {
    pub fn new(
        vertex_a: DVec3,
        vertex_b: DVec3,
        vertex_c: DVec3,
        material: Arc<dyn Material>,
    ) -> Result<Self, GeomError> {
        let edge_ab = vertex_b - vertex_a;
        let edge_bc = vertex_c - vertex_b;
        let raw_normal = edge_ab.cross(edge_bc);
        if raw_normal.length_squared() < MIN_NORMAL_LENGTH_SQ {
            return Err(GeomError::DegenerateParallelogram);
        }
        let normal = raw_normal.normalize();
        let plane_coef = normal.dot(vertex_a);
        let vertex_d = vertex_a + edge_bc;

        // Dual basis for affine coordinates: s along AB, t along AD (= BC)
        let abab = edge_ab.length_squared();
        let bcbc = edge_bc.length_squared();
        let abbc = edge_ab.dot(edge_bc);
        let det = abab * bcbc - abbc * abbc;
        let u_along_ab = (edge_ab * bcbc - edge_bc * abbc) / det;
        let u_along_bc = (edge_bc * abab - edge_ab * abbc) / det;

        Ok(Self {
            vertex_a,
            vertex_b,
            vertex_c,
            vertex_d,
            normal,
            plane_coef,
            u_along_ab,
            u_along_bc,
            front_material: material.clone(),
            back_material: Some(material),
        })
    }

    pub fn set_material_front(&mut self, material: Arc<dyn Material>) {
        self.front_material = material;
    }

    pub fn set_material_back(&mut self, material: Option<Arc<dyn Material>>) {
        self.back_material = material;
    }

    pub fn vertices(&self) -> [DVec3; 4] {
        [self.vertex_a, self.vertex_b, self.vertex_c, self.vertex_d]
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

impl Viewable for Parallelogram {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let mdotn = view_dir.dot(self.normal);
        let planar_dist = view_pos.dot(self.normal) - self.plane_coef;

        let front_face = mdotn <= 0.0;
        if front_face {
            if planar_dist <= 0.0 || mdotn == 0.0 {
                return None;
            }
        } else if self.back_material.is_none() || planar_dist >= 0.0 {
            return None;
        }

        let distance = -planar_dist / mdotn;
        if distance >= max_dist || distance <= 0.0 {
            return None;
        }

        let position = view_pos + view_dir * distance;
        let rel = position - self.vertex_a;
        let s = self.u_along_ab.dot(rel);
        if !(0.0..=1.0).contains(&s) {
            return None;
        }
        let t = self.u_along_bc.dot(rel);
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        vis_point.set_position(position);
        vis_point.set_normal(self.normal);
        if front_face {
            vis_point.set_front_face();
            vis_point.set_material(self.front_material.clone());
        } else {
            vis_point.set_back_face();
            vis_point.set_material(
                self.back_material
                    .as_ref()
                    .expect("back face culled above")
                    .clone(),
            );
        }
        vis_point.set_uv(s, t);
        vis_point.set_face_number(0);
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let dots = [
            u.dot(self.vertex_a),
            u.dot(self.vertex_b),
            u.dot(self.vertex_c),
            u.dot(self.vertex_d),
        ];
        let mut min = dots[0];
        let mut max = dots[0];
        for &d in &dots[1..] {
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    fn calc_extents_in_box(&self, bounds: &Aabb) -> Option<Aabb> {
        extents::polygon_extents_in_box(
            &[self.vertex_a, self.vertex_b, self.vertex_c, self.vertex_d],
            self.normal,
            bounds,
        )
    }

    fn calc_partials(&self, _vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        Some((self.vertex_b - self.vertex_a, self.vertex_c - self.vertex_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    fn unit_square() -> Parallelogram {
        Parallelogram::new(
            DVec3::ZERO,
            DVec3::X,
            DVec3::new(1.0, 1.0, 0.0),
            Arc::new(PhongMaterial::default()),
        )
        .unwrap()
    }

    fn vp() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn fourth_vertex_completes_circuit() {
        let sq = unit_square();
        assert!((sq.vertices()[3] - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn hit_inside_with_uv() {
        let sq = unit_square();
        let mut point = vp();
        let t = sq
            .find_intersection(DVec3::new(0.25, 0.75, 3.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 3.0).abs() < 1e-10);
        assert!((point.u() - 0.25).abs() < 1e-10);
        assert!((point.v() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn hit_in_far_corner_that_a_triangle_would_miss() {
        let sq = unit_square();
        let mut point = vp();
        assert!(
            sq.find_intersection(DVec3::new(0.9, 0.9, 3.0), -DVec3::Z, f64::MAX, &mut point)
                .is_some()
        );
    }

    #[test]
    fn miss_outside_edges() {
        let sq = unit_square();
        let mut point = vp();
        assert!(
            sq.find_intersection(DVec3::new(1.5, 0.5, 3.0), -DVec3::Z, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn degenerate_rejected() {
        assert!(
            Parallelogram::new(
                DVec3::ZERO,
                DVec3::X,
                DVec3::X * 3.0,
                Arc::new(PhongMaterial::default()),
            )
            .is_err()
        );
    }

    #[test]
    fn sheared_parallelogram_uv() {
        let para = Parallelogram::new(
            DVec3::ZERO,
            DVec3::X,
            DVec3::new(1.5, 1.0, 0.0),
            Arc::new(PhongMaterial::default()),
        )
        .unwrap();
        let mut point = vp();
        // Center of the parallelogram: A + 0.5 AB + 0.5 BC
        let center = DVec3::new(0.75, 0.5, 0.0);
        para.find_intersection(center + DVec3::Z * 2.0, -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((point.u() - 0.5).abs() < 1e-10);
        assert!((point.v() - 0.5).abs() < 1e-10);
    }
}

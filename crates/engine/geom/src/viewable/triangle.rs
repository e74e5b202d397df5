//! Triangles with precomputed barycentric solvers.

use super::Viewable;
use crate::error::GeomError;
use crate::extents;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;
use vmath::Aabb;

/// Minimum squared area (via the normal cross product) for a triangle to be
/// considered well formed.
const MIN_NORMAL_LENGTH_SQ: f64 = 1.0e-24;

/// Triangle given by three vertices in counterclockwise order.
///
/// `u_beta` and `u_gamma` are precomputed so the barycentric coordinates of
/// a point `p` in the plane are `beta = u_beta . (p - a)` and
/// `gamma = u_gamma . (p - a)`, solved in constant time per ray.
pub struct Triangle {
    vertex_a: DVec3,
    vertex_b: DVec3,
    vertex_c: DVec3,

    normal: DVec3,
    plane_coef: f64,
    u_beta: DVec3,
    u_gamma: DVec3,

    front_material: Arc<dyn Material>,
    /// `None` means the back side is culled.
    back_material: Option<Arc<dyn Material>>,
}

impl Triangle {
    pub fn new(
        vertex_a: DVec3,
        vertex_b: DVec3,
        vertex_c: DVec3,
        material: Arc<dyn Material>,
    ) -> Result<Self, GeomError> {
        let edge_ab = vertex_b - vertex_a;
        let edge_ac = vertex_c - vertex_a;
        let raw_normal = edge_ab.cross(edge_ac);
        if raw_normal.length_squared() < MIN_NORMAL_LENGTH_SQ {
            return Err(GeomError::DegenerateTriangle);
        }
        let normal = raw_normal.normalize();
        let plane_coef = normal.dot(vertex_a);

        // Gram system for the barycentric solver
        let abab = edge_ab.length_squared();
        let acac = edge_ac.length_squared();
        let abac = edge_ab.dot(edge_ac);
        let det = abab * acac - abac * abac;
        let u_beta = (edge_ab * acac - edge_ac * abac) / det;
        let u_gamma = (edge_ac * abab - edge_ab * abac) / det;

        Ok(Self {
            vertex_a,
            vertex_b,
            vertex_c,
            normal,
            plane_coef,
            u_beta,
            u_gamma,
            front_material: material.clone(),
            back_material: Some(material),
        })
    }

    pub fn set_material_front(&mut self, material: Arc<dyn Material>) {
        self.front_material = material;
    }

    /// `None` culls the back face.
    pub fn set_material_back(&mut self, material: Option<Arc<dyn Material>>) {
        self.back_material = material;
    }

    pub fn is_back_face_culled(&self) -> bool {
        self.back_material.is_none()
    }

    pub fn vertices(&self) -> (DVec3, DVec3, DVec3) {
        (self.vertex_a, self.vertex_b, self.vertex_c)
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

impl Viewable for Triangle {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let mdotn = view_dir.dot(self.normal);
        let planar_dist = view_pos.dot(self.normal) - self.plane_coef;

        // Approaching from the front means moving against the normal
        let front_face = mdotn <= 0.0;
        if front_face {
            if planar_dist <= 0.0 || mdotn == 0.0 {
                return None; // behind the plane, or parallel
            }
        } else {
            if self.back_material.is_none() || planar_dist >= 0.0 {
                return None;
            }
        }

        let distance = -planar_dist / mdotn;
        if distance >= max_dist || distance <= 0.0 {
            return None;
        }

        let position = view_pos + view_dir * distance;
        let rel = position - self.vertex_a;
        let beta = self.u_beta.dot(rel);
        if !(0.0..=1.0).contains(&beta) {
            return None;
        }
        let gamma = self.u_gamma.dot(rel);
        if gamma < 0.0 || beta + gamma > 1.0 {
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
        vis_point.set_uv(beta, gamma);
        vis_point.set_face_number(0);
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let da = u.dot(self.vertex_a);
        let db = u.dot(self.vertex_b);
        let dc = u.dot(self.vertex_c);
        (da.min(db).min(dc), da.max(db).max(dc))
    }

    fn calc_extents_in_box(&self, bounds: &Aabb) -> Option<Aabb> {
        extents::polygon_extents_in_box(
            &[self.vertex_a, self.vertex_b, self.vertex_c],
            self.normal,
            bounds,
        )
    }

    fn calc_partials(&self, _vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        // (u, v) = (beta, gamma): the partials are the triangle edges
        Some((self.vertex_b - self.vertex_a, self.vertex_c - self.vertex_a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    fn xy_triangle() -> Triangle {
        Triangle::new(
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
            Arc::new(PhongMaterial::default()),
        )
        .unwrap()
    }

    fn vp() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn front_hit_inside() {
        let tri = xy_triangle();
        let mut point = vp();
        let t = tri
            .find_intersection(DVec3::new(0.25, 0.25, 5.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 5.0).abs() < 1e-10);
        assert!(point.is_front_facing());
        assert!((point.u() - 0.25).abs() < 1e-10);
        assert!((point.v() - 0.25).abs() < 1e-10);
    }

    #[test]
    fn miss_outside_barycentric_bounds() {
        let tri = xy_triangle();
        let mut point = vp();
        assert!(
            tri.find_intersection(DVec3::new(0.75, 0.75, 5.0), -DVec3::Z, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn back_hit_unless_culled() {
        let mut tri = xy_triangle();
        let mut point = vp();
        let t = tri.find_intersection(DVec3::new(0.25, 0.25, -5.0), DVec3::Z, f64::MAX, &mut point);
        assert!(t.is_some());
        assert!(point.is_back_facing());

        tri.set_material_back(None);
        assert!(
            tri.find_intersection(DVec3::new(0.25, 0.25, -5.0), DVec3::Z, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn parallel_ray_misses() {
        let tri = xy_triangle();
        let mut point = vp();
        assert!(
            tri.find_intersection(DVec3::new(-5.0, 0.2, 0.0), DVec3::X, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn degenerate_triangle_rejected() {
        let result = Triangle::new(
            DVec3::ZERO,
            DVec3::X,
            DVec3::X * 2.0,
            Arc::new(PhongMaterial::default()),
        );
        assert_eq!(result.err(), Some(GeomError::DegenerateTriangle));
    }

    #[test]
    fn edge_hit_counts() {
        let tri = xy_triangle();
        let mut point = vp();
        // Hit exactly on the hypotenuse: beta + gamma = 1
        assert!(
            tri.find_intersection(DVec3::new(0.5, 0.5, 5.0), -DVec3::Z, f64::MAX, &mut point)
                .is_some()
        );
    }
}

//! Spheres.

use super::Viewable;
use crate::error::GeomError;
use crate::extents;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::{DVec2, DVec3};
use std::f64::consts::PI;
use std::sync::Arc;
use vmath::Aabb;
use vmath::roots::solve_quadratic_safe;
use vmath::util::square;

/// UV projection used by spheres and ellipsoids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UvProjection {
    Spherical,
    Cylindrical,
}

/// Sphere with distinct inner/outer materials and configurable uv axes.
///
/// `axis_a` is the direction of u = 0.5, `axis_b` of u = 0.75, and `axis_c`
/// the polar axis for v.
pub struct Sphere {
    radius: f64,
    radius_sq: f64,
    center: DVec3,
    outer_material: Arc<dyn Material>,
    inner_material: Arc<dyn Material>,
    uv_projection: UvProjection,
    axis_a: DVec3,
    axis_b: DVec3,
    axis_c: DVec3,
}

impl Sphere {
    pub fn new(
        center: DVec3,
        radius: f64,
        material: Arc<dyn Material>,
    ) -> Result<Self, GeomError> {
        if radius <= 0.0 {
            return Err(GeomError::NonPositiveRadius(radius));
        }
        Ok(Self {
            radius,
            radius_sq: radius * radius,
            center,
            outer_material: material.clone(),
            inner_material: material,
            uv_projection: UvProjection::Spherical,
            axis_a: DVec3::Z,
            axis_b: DVec3::X,
            axis_c: DVec3::Y,
        })
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_material_outer(&mut self, material: Arc<dyn Material>) {
        self.outer_material = material;
    }

    pub fn set_material_inner(&mut self, material: Arc<dyn Material>) {
        self.inner_material = material;
    }

    pub fn set_uv_spherical(&mut self) {
        self.uv_projection = UvProjection::Spherical;
    }

    pub fn set_uv_cylindrical(&mut self) {
        self.uv_projection = UvProjection::Cylindrical;
    }

    /// Override the uv frame; `axis_a` and `axis_c` are orthogonalized.
    pub fn set_uv_axes(&mut self, axis_a: DVec3, axis_c: DVec3) {
        self.axis_a = axis_a.normalize();
        self.axis_c = axis_c.normalize();
        self.axis_b = self.axis_c.cross(self.axis_a).normalize();
    }

    /// uv from normalized coordinates in the (b, c, a) frame.
    pub(crate) fn uv_from_frame(x: f64, y: f64, z: f64, projection: UvProjection) -> DVec2 {
        let u = y_atan2(x, z) / (2.0 * PI) + 0.5;
        let v = match projection {
            UvProjection::Spherical => y.clamp(-1.0, 1.0).asin() / PI + 0.5,
            UvProjection::Cylindrical => (y + 1.0) * 0.5,
        };
        DVec2::new(u, v)
    }

    /// Bounding-sphere style quick test; used by Bezier sets. Returns the
    /// entry distance (clamped to zero inside the sphere).
    pub fn quick_intersect_test(
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        center: DVec3,
        radius_sq: f64,
    ) -> Option<f64> {
        let rel = view_pos - center;
        let c = rel.length_squared() - radius_sq;
        let half_b = rel.dot(view_dir);
        if c > 0.0 {
            if half_b >= 0.0 {
                return None; // outside, pointing away
            }
            let disc = half_b * half_b - c;
            if disc < 0.0 {
                return None;
            }
            let t = -half_b - disc.sqrt();
            if t >= max_dist { None } else { Some(t) }
        } else {
            Some(0.0) // starts inside
        }
    }
}

// atan2 guarded for the degenerate origin
#[inline]
fn y_atan2(y: f64, x: f64) -> f64 {
    if y == 0.0 && x == 0.0 { 0.0 } else { y.atan2(x) }
}

impl Viewable for Sphere {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let rel = view_pos - self.center;
        let c = rel.length_squared() - self.radius_sq;
        let b = 2.0 * rel.dot(view_dir);
        if c > 0.0 && b >= 0.0 {
            return None; // outside and pointing away
        }

        let (roots, num_roots) = solve_quadratic_safe(1.0, b, c);
        if num_roots < 2 {
            return None; // miss, or a grazing contact of zero area
        }

        let distance = if roots[0] > 0.0 {
            if roots[0] >= max_dist {
                return None;
            }
            vis_point.set_front_face();
            vis_point.set_material(self.outer_material.clone());
            roots[0]
        } else if roots[1] > 0.0 && roots[1] < max_dist {
            vis_point.set_back_face();
            vis_point.set_material(self.inner_material.clone());
            roots[1]
        } else {
            return None;
        };

        let position = view_pos + view_dir * distance;
        vis_point.set_position(position);
        let normal = (position - self.center) / self.radius;
        vis_point.set_normal(normal.normalize());

        let uv = Sphere::uv_from_frame(
            normal.dot(self.axis_b),
            normal.dot(self.axis_c),
            normal.dot(self.axis_a),
            self.uv_projection,
        );
        vis_point.set_uv(uv.x, uv.y);
        vis_point.set_face_number(0);
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let center_dot = u.dot(self.center);
        (center_dot - self.radius, center_dot + self.radius)
    }

    fn calc_extents_in_box(&self, bounds: &Aabb) -> Option<Aabb> {
        extents::sphere_extents_in_box(self.center, self.radius, bounds)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        let rel = vis_point.position() - self.center;
        let partial_u = self.axis_c.cross(rel) * (2.0 * PI);

        let phi = match self.uv_projection {
            UvProjection::Spherical => PI * (vis_point.v() - 0.5),
            UvProjection::Cylindrical => (2.0 * (vis_point.v() - 0.5)).clamp(-1.0, 1.0).asin(),
        };
        let theta = 2.0 * PI * (vis_point.u() - 0.5);
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        if cos_phi == 0.0 {
            return None; // pole
        }
        // Radial direction in the equatorial plane for this longitude
        let radial = self.axis_a * cos_theta + self.axis_b * sin_theta;
        let mut partial_v = (self.axis_c * cos_phi - radial * sin_phi) * (PI * self.radius);
        if self.uv_projection == UvProjection::Cylindrical {
            let denom = (1.0 - square(2.0 * (vis_point.v() - 0.5))).sqrt();
            if denom == 0.0 {
                return None;
            }
            partial_v /= denom;
        }
        Some((partial_u, partial_v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    fn unit_sphere() -> Sphere {
        Sphere::new(DVec3::ZERO, 1.0, Arc::new(PhongMaterial::default())).unwrap()
    }

    fn vp() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn head_on_hit_front_face() {
        let sphere = unit_sphere();
        let mut point = vp();
        let t = sphere
            .find_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 4.0).abs() < 1e-10);
        assert!(point.is_front_facing());
        assert!((point.normal() - DVec3::Z).length() < 1e-10);
        assert!((point.position() - DVec3::Z).length() < 1e-10);
    }

    #[test]
    fn interior_origin_hits_back_face() {
        let sphere = unit_sphere();
        let mut point = vp();
        let t = sphere
            .find_intersection(DVec3::ZERO, DVec3::X, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 1.0).abs() < 1e-10);
        assert!(point.is_back_facing());
    }

    #[test]
    fn tangent_ray_misses() {
        let sphere = unit_sphere();
        let mut point = vp();
        // Ray grazing the sphere at x = 1 exactly
        let hit =
            sphere.find_intersection(DVec3::new(1.0, 0.0, 5.0), -DVec3::Z, f64::MAX, &mut point);
        assert!(hit.is_none());
    }

    #[test]
    fn ray_pointing_away_misses() {
        let sphere = unit_sphere();
        let mut point = vp();
        assert!(
            sphere
                .find_intersection(DVec3::new(0.0, 0.0, 5.0), DVec3::Z, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn max_dist_respected() {
        let sphere = unit_sphere();
        let mut point = vp();
        assert!(
            sphere
                .find_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, 3.0, &mut point)
                .is_none()
        );
    }

    #[test]
    fn aabb_is_tight() {
        let sphere = Sphere::new(
            DVec3::new(1.0, 2.0, 3.0),
            0.5,
            Arc::new(PhongMaterial::default()),
        )
        .unwrap();
        let aabb = sphere.calc_aabb();
        assert!((aabb.min - DVec3::new(0.5, 1.5, 2.5)).length() < 1e-12);
        assert!((aabb.max - DVec3::new(1.5, 2.5, 3.5)).length() < 1e-12);
    }

    #[test]
    fn zero_radius_rejected() {
        assert!(Sphere::new(DVec3::ZERO, 0.0, Arc::new(PhongMaterial::default())).is_err());
    }

    #[test]
    fn uv_poles_and_equator() {
        let sphere = unit_sphere();
        let mut point = vp();
        // Hit at +AxisA (default +Z): u = 0.5, v = 0.5
        sphere
            .find_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, f64::MAX, &mut point)
            .unwrap();
        assert!((point.u() - 0.5).abs() < 1e-10);
        assert!((point.v() - 0.5).abs() < 1e-10);
    }
}

//! Ellipsoids with three independent radii.

use super::Viewable;
use super::sphere::{Sphere, UvProjection};
use crate::error::GeomError;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::f64::consts::PI;
use std::sync::Arc;
use vmath::roots::solve_quadratic_safe;
use vmath::util::{get_ortho_complements, square};

/// Ellipsoid in the frame of three orthogonal axes.
///
/// The stored axes are scaled by the inverse radii, so that
/// `|x . axis| <= 1` characterizes the interior along each axis. `axis_c`
/// is the polar (v) axis, matching the sphere's uv conventions.
pub struct Ellipsoid {
    center: DVec3,
    axis_a: DVec3,
    axis_b: DVec3,
    axis_c: DVec3,
    radius_a: f64,
    radius_b: f64,
    radius_c: f64,
    uv_projection: UvProjection,
    outer_material: Arc<dyn Material>,
    inner_material: Arc<dyn Material>,
}

impl Ellipsoid {
    pub fn new(
        center: DVec3,
        material: Arc<dyn Material>,
    ) -> Self {
        Self {
            center,
            axis_a: DVec3::Z,
            axis_b: DVec3::X,
            axis_c: DVec3::Y,
            radius_a: 1.0,
            radius_b: 1.0,
            radius_c: 1.0,
            uv_projection: UvProjection::Spherical,
            outer_material: material.clone(),
            inner_material: material,
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn set_center(&mut self, center: DVec3) {
        self.center = center;
    }

    /// Set the polar axis (c) and the u = 0.5 axis (a); b completes the
    /// frame. Radii are re-applied afterwards.
    pub fn set_axes(&mut self, axis_c: DVec3, axis_a: DVec3) -> Result<(), GeomError> {
        if axis_c == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        let c = axis_c.normalize();
        let a_raw = axis_a - c * c.dot(axis_a);
        let a = if a_raw.length_squared() < 1.0e-24 {
            get_ortho_complements(c).0
        } else {
            a_raw.normalize()
        };
        let b = c.cross(a);
        self.axis_a = a / self.radius_a;
        self.axis_b = b / self.radius_b;
        self.axis_c = c / self.radius_c;
        Ok(())
    }

    /// Radii along axes a, b, c.
    pub fn set_radii(&mut self, ra: f64, rb: f64, rc: f64) -> Result<(), GeomError> {
        for r in [ra, rb, rc] {
            if r <= 0.0 {
                return Err(GeomError::NonPositiveRadius(r));
            }
        }
        self.axis_a *= self.radius_a / ra;
        self.axis_b *= self.radius_b / rb;
        self.axis_c *= self.radius_c / rc;
        self.radius_a = ra;
        self.radius_b = rb;
        self.radius_c = rc;
        Ok(())
    }

    pub fn set_material_outer(&mut self, material: Arc<dyn Material>) {
        self.outer_material = material;
    }

    pub fn set_material_inner(&mut self, material: Arc<dyn Material>) {
        self.inner_material = material;
    }

    pub fn set_uv_cylindrical(&mut self) {
        self.uv_projection = UvProjection::Cylindrical;
    }
}

impl Viewable for Ellipsoid {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let rel = view_pos - self.center;
        let pdot_a = rel.dot(self.axis_a);
        let pdot_b = rel.dot(self.axis_b);
        let pdot_c = rel.dot(self.axis_c);
        let udot_a = view_dir.dot(self.axis_a);
        let udot_b = view_dir.dot(self.axis_b);
        let udot_c = view_dir.dot(self.axis_c);

        let c = square(pdot_a) + square(pdot_b) + square(pdot_c) - 1.0;
        let mut b = pdot_a * udot_a + pdot_b * udot_b + pdot_c * udot_c;
        if c > 0.0 && b >= 0.0 {
            return None; // pointing away from the ellipsoid
        }
        b += b;
        let a = square(udot_a) + square(udot_b) + square(udot_c);

        let (roots, num_roots) = solve_quadratic_safe(a, b, c);
        if num_roots == 0 {
            return None;
        }
        let distance = if roots[0] > 0.0 {
            if roots[0] >= max_dist {
                return None;
            }
            vis_point.set_front_face();
            vis_point.set_material(self.outer_material.clone());
            roots[0]
        } else if num_roots == 2 && roots[1] > 0.0 && roots[1] < max_dist {
            vis_point.set_back_face();
            vis_point.set_material(self.inner_material.clone());
            roots[1]
        } else {
            return None;
        };

        let position = view_pos + view_dir * distance;
        vis_point.set_position(position);

        let rel = position - self.center;
        let vdot_a = rel.dot(self.axis_a);
        let vdot_b = rel.dot(self.axis_b);
        let vdot_c = rel.dot(self.axis_c);
        let normal = (self.axis_a * vdot_a + self.axis_b * vdot_b + self.axis_c * vdot_c)
            .normalize();
        vis_point.set_normal(normal);

        let uv = Sphere::uv_from_frame(vdot_b, vdot_c, vdot_a, self.uv_projection);
        vis_point.set_uv(uv.x, uv.y);
        vis_point.set_face_number(0);
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let center_dot = u.dot(self.center);
        let delta = (square(self.radius_a * self.radius_a * u.dot(self.axis_a))
            + square(self.radius_b * self.radius_b * u.dot(self.axis_b))
            + square(self.radius_c * self.radius_c * u.dot(self.axis_c)))
        .sqrt();
        (center_dot - delta, center_dot + delta)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        let theta = 2.0 * PI * (vis_point.u() - 0.5);
        let phi = PI * (vis_point.v() - 0.5);
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let ra_sq = square(self.radius_a);
        let rb_sq = square(self.radius_b);

        let mut partial_v = self.axis_a * (-sin_phi * cos_theta * ra_sq)
            + self.axis_b * (-sin_phi * sin_theta * rb_sq)
            + self.axis_c * (cos_phi * square(self.radius_c));

        let partial_u = self.axis_a * (-cos_phi * sin_theta * ra_sq)
            + self.axis_b * (cos_phi * cos_theta * rb_sq);

        if self.uv_projection == UvProjection::Cylindrical {
            let denom = (1.0 - square(2.0 * (vis_point.v() - 0.5))).sqrt();
            if denom == 0.0 {
                return None;
            }
            partial_v /= denom;
        }
        if cos_phi == 0.0 {
            return None;
        }
        Some((partial_u, partial_v))
    }
}

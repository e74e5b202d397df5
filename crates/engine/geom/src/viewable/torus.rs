//! Tori. The ray parameter satisfies a quartic; a cheap box preclip in the
//! torus frame rejects most rays before the solve.

use super::Viewable;
use crate::error::GeomError;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::f64::consts::TAU;
use std::sync::Arc;
use vmath::roots::solve_quartic;
use vmath::util::{get_ortho_complements, square};

/// Torus around `axis_c` with major radius `R` and minor radius `r`.
pub struct Torus {
    center: DVec3,
    axis_a: DVec3,
    axis_b: DVec3,
    axis_c: DVec3,
    major_radius: f64,
    minor_radius: f64,

    center_coef_a: f64,
    center_coef_b: f64,
    center_coef_c: f64,
    outer_radius: f64,

    outer_material: Arc<dyn Material>,
    inner_material: Arc<dyn Material>,
}

impl Torus {
    pub fn new(
        center: DVec3,
        major_radius: f64,
        minor_radius: f64,
        material: Arc<dyn Material>,
    ) -> Result<Self, GeomError> {
        if major_radius <= 0.0 || minor_radius <= 0.0 {
            return Err(GeomError::BadTorusRadii {
                major: major_radius,
                minor: minor_radius,
            });
        }
        let mut torus = Self {
            center,
            axis_a: DVec3::X,
            axis_b: DVec3::Z,
            axis_c: DVec3::Y,
            major_radius,
            minor_radius,
            center_coef_a: 0.0,
            center_coef_b: 0.0,
            center_coef_c: 0.0,
            outer_radius: 0.0,
            outer_material: material.clone(),
            inner_material: material,
        };
        torus.precalc();
        Ok(torus)
    }

    /// Central (donut-hole) axis; radial axes are re-seeded from it.
    pub fn set_axis(&mut self, axis_c: DVec3) -> Result<(), GeomError> {
        if axis_c == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.axis_c = axis_c.normalize();
        let (a, b) = get_ortho_complements(self.axis_c);
        self.axis_a = a;
        self.axis_b = b;
        self.precalc();
        Ok(())
    }

    pub fn set_material_outer(&mut self, material: Arc<dyn Material>) {
        self.outer_material = material;
    }

    pub fn set_material_inner(&mut self, material: Arc<dyn Material>) {
        self.inner_material = material;
    }

    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    fn precalc(&mut self) {
        self.center_coef_a = self.center.dot(self.axis_a);
        self.center_coef_b = self.center.dot(self.axis_b);
        self.center_coef_c = self.center.dot(self.axis_c);
        self.outer_radius = self.major_radius + self.minor_radius;
    }

    /// Slab preclip along one frame axis. Updates the running front/back
    /// distances; false means the ray misses the bounding box entirely.
    fn collide_two_planes(
        pdotn: f64,
        alpha: f64,
        dimen: f64,
        inside: &mut bool,
        min_dist_back: &mut f64,
        max_dist_front: &mut f64,
    ) -> bool {
        if alpha > 0.0 {
            if pdotn >= dimen {
                return false; // beyond the far plane, heading away
            }
            let below = dimen + pdotn;
            if below < 0.0 {
                *inside = false;
                if alpha * *max_dist_front < -below {
                    *max_dist_front = -below / alpha;
                }
                let through = (dimen - pdotn) / alpha;
                if through < *min_dist_back {
                    *min_dist_back = through;
                }
                if *max_dist_front > *min_dist_back {
                    return false;
                }
            } else {
                let through = dimen - pdotn;
                if alpha * *min_dist_back > through {
                    *min_dist_back = through / alpha;
                    if *max_dist_front > *min_dist_back {
                        return false;
                    }
                }
            }
        } else if alpha < 0.0 {
            if pdotn <= -dimen {
                return false;
            }
            let above = pdotn - dimen;
            if above > 0.0 {
                *inside = false;
                if -alpha * *max_dist_front < above {
                    *max_dist_front = -above / alpha;
                }
                let through = -(pdotn + dimen) / alpha;
                if through < *min_dist_back {
                    *min_dist_back = through;
                }
                if *max_dist_front > *min_dist_back {
                    return false;
                }
            } else {
                let through = pdotn + dimen;
                if -alpha * *min_dist_back > through {
                    *min_dist_back = -through / alpha;
                    if *max_dist_front > *min_dist_back {
                        return false;
                    }
                }
            }
        } else if pdotn < -dimen || pdotn > dimen {
            return false;
        }
        true
    }
}

impl Viewable for Torus {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        // Box preclip in the torus frame:
        // [-R-r, R+r] x [-r, r] x [-R-r, R+r] around the center
        let mut inside = true;
        let mut min_dist_back = f64::MAX;
        let mut max_dist_front = f64::MIN;

        for (axis, dimen) in [
            (self.axis_c, self.minor_radius),
            (self.axis_a, self.outer_radius),
            (self.axis_b, self.outer_radius),
        ] {
            let pdotn = view_pos.dot(axis) - self.center.dot(axis);
            let alpha = view_dir.dot(axis);
            if !Self::collide_two_planes(
                pdotn,
                alpha,
                dimen,
                &mut inside,
                &mut min_dist_back,
                &mut max_dist_front,
            ) {
                return None;
            }
        }
        if max_dist_front > max_dist {
            return None;
        }

        // Quartic in t, restated from a point moved forward to the box entry
        // to reduce the coefficient magnitudes.
        let move_fwd = max_dist_front.max(0.0);
        let rel = view_pos + view_dir * move_fwd - self.center;

        let udotp = view_dir.dot(rel);
        let m_sq = square(self.major_radius);
        let n_sq = square(self.minor_radius);
        let radii_sq_sum = m_sq + n_sq;
        let ucdotp = self.axis_c.dot(rel);
        let ucdotu = self.axis_c.dot(view_dir);
        let p_sq = rel.length_squared();

        let b = 4.0 * udotp;
        let c =
            4.0 * udotp * udotp + 2.0 * p_sq - 2.0 * radii_sq_sum + 4.0 * m_sq * ucdotu * ucdotu;
        let d = 4.0 * ((p_sq - radii_sq_sum) * udotp + 2.0 * m_sq * ucdotp * ucdotu);
        let e = (p_sq - 2.0 * radii_sq_sum) * p_sq + 4.0 * m_sq * ucdotp * ucdotp
            + square(m_sq - n_sq);

        let (roots, num_roots) = solve_quartic(1.0, b, c, d, e);
        for (i, &root) in roots.iter().take(num_roots).enumerate() {
            let distance = root + move_fwd;
            if distance >= max_dist {
                return None;
            }
            if distance <= 0.0 {
                continue;
            }

            vis_point.set_position(view_pos + view_dir * distance);
            // Roots alternate front/back by parity
            if i & 1 == 1 {
                vis_point.set_back_face();
                vis_point.set_material(self.inner_material.clone());
            } else {
                vis_point.set_front_face();
                vis_point.set_material(self.outer_material.clone());
            }

            let rel = vis_point.position() - self.center;
            let x = rel.dot(self.axis_a);
            let y = rel.dot(self.axis_b);
            let z = rel.dot(self.axis_c);

            // Project to the plane of the central circle, push out to the
            // center path, and normalize the displacement from it.
            let in_plane = rel - self.axis_c * z;
            let in_plane_norm = in_plane.length();
            let mut normal = in_plane * (self.major_radius / -in_plane_norm) + rel;
            normal /= self.minor_radius;
            vis_point.set_normal(normal.normalize());

            let u = y.atan2(x) / TAU + 0.5;
            let v = z.atan2(in_plane_norm - self.major_radius) / TAU + 0.5;
            vis_point.set_uv(u, v);
            vis_point.set_face_number(0);
            return Some(distance);
        }
        None
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let center_dot = u.dot(self.center);
        let delta = self.major_radius
            * (square(u.dot(self.axis_a)) + square(u.dot(self.axis_b))).sqrt()
            + self.minor_radius;
        (center_dot - delta, center_dot + delta)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        let partial_u = (self.center - vis_point.position()).cross(self.axis_c) * TAU;

        let theta = TAU * (vis_point.u() - 0.5);
        let phi = TAU * (vis_point.v() - 0.5);
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let pi_r = std::f64::consts::PI * self.minor_radius;
        let partial_v = self.axis_a * (-pi_r * sin_phi * cos_theta)
            + self.axis_b * (-pi_r * sin_phi * sin_theta)
            + self.axis_c * (pi_r * cos_phi);
        Some((partial_u, partial_v))
    }
}

//! Cones, right or oblique, with elliptical cross sections.

use super::Viewable;
use crate::error::GeomError;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::f64::consts::TAU;
use std::sync::Arc;
use vmath::roots::{solve_quadratic, solve_quadratic_homogeneous};
use vmath::util::{get_ortho_complements, square, update_min_max};

pub const CONE_SIDE_FACE: usize = 0;
pub const CONE_BASE_FACE: usize = 1;

/// A solid cone: apex, downward-opening side surface, one base plane.
///
/// The center axis points from the base toward the apex. The radial axes
/// are stored scaled by the inverse slopes, so a surface point `x` relative
/// to the apex satisfies `(x.axis_a)^2 + (x.axis_b)^2 = (x.center_axis)^2`
/// on the half-space below the apex. The dual cone above the apex is
/// explicitly excluded during intersection.
pub struct Cone {
    apex: DVec3,
    center_axis: DVec3,
    axis_a: DVec3,
    axis_b: DVec3,
    slope_a: f64,
    slope_b: f64,
    apex_dot_center_axis: f64,

    base_normal: DVec3,
    base_plane_coef: f64,
    is_right: bool,
    height: f64,

    side_outer_mat: Arc<dyn Material>,
    side_inner_mat: Arc<dyn Material>,
    base_outer_mat: Arc<dyn Material>,
    base_inner_mat: Arc<dyn Material>,
}

impl Cone {
    pub fn new(material: Arc<dyn Material>) -> Self {
        let mut cone = Self {
            apex: DVec3::Y,
            center_axis: DVec3::Y,
            axis_a: DVec3::Z,
            axis_b: DVec3::X,
            slope_a: 1.0,
            slope_b: 1.0,
            apex_dot_center_axis: 1.0,
            base_normal: -DVec3::Y,
            base_plane_coef: 0.0,
            is_right: true,
            height: 1.0,
            side_outer_mat: material.clone(),
            side_inner_mat: material.clone(),
            base_outer_mat: material.clone(),
            base_inner_mat: material,
        };
        cone.recalc();
        cone
    }

    pub fn set_apex(&mut self, apex: DVec3) {
        self.apex = apex;
        self.recalc();
    }

    pub fn apex(&self) -> DVec3 {
        self.apex
    }

    /// Axis from the base toward the apex (normalized here).
    pub fn set_center_axis(&mut self, axis: DVec3) -> Result<(), GeomError> {
        if axis == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.center_axis = axis.normalize();
        let (a, b) = get_ortho_complements(self.center_axis);
        self.axis_a = a / self.slope_a;
        self.axis_b = b / self.slope_b;
        self.recalc();
        Ok(())
    }

    pub fn set_slope(&mut self, slope: f64) -> Result<(), GeomError> {
        self.set_slopes(slope, slope)
    }

    /// Slopes (radius growth per unit height) along the two radial axes.
    pub fn set_slopes(&mut self, slope_a: f64, slope_b: f64) -> Result<(), GeomError> {
        if slope_a <= 0.0 {
            return Err(GeomError::NonPositiveSlope(slope_a));
        }
        if slope_b <= 0.0 {
            return Err(GeomError::NonPositiveSlope(slope_b));
        }
        self.axis_a *= 1.0 / (slope_a * self.axis_a.length());
        self.axis_b *= 1.0 / (slope_b * self.axis_b.length());
        self.slope_a = slope_a;
        self.slope_b = slope_b;
        Ok(())
    }

    /// Make this a right cone of the given height below the apex.
    pub fn set_height(&mut self, height: f64) -> Result<(), GeomError> {
        if height <= 0.0 {
            return Err(GeomError::NonPositiveHeight(height));
        }
        self.is_right = true;
        self.height = height;
        self.recalc();
        Ok(())
    }

    /// Arbitrary base plane with outward (downward) unit normal.
    pub fn set_base_face(&mut self, normal: DVec3, coef: f64) -> Result<(), GeomError> {
        if normal == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.is_right = false;
        self.base_normal = normal.normalize();
        self.base_plane_coef = coef;
        Ok(())
    }

    pub fn is_right_cone(&self) -> bool {
        self.is_right
    }

    pub fn set_material(&mut self, material: Arc<dyn Material>) {
        self.side_outer_mat = material.clone();
        self.side_inner_mat = material.clone();
        self.base_outer_mat = material.clone();
        self.base_inner_mat = material;
    }

    fn recalc(&mut self) {
        self.apex_dot_center_axis = self.apex.dot(self.center_axis);
        if self.is_right {
            self.base_normal = -self.center_axis;
            self.base_plane_coef =
                self.base_normal.dot(self.apex - self.center_axis * self.height);
        }
    }
}

impl Viewable for Cone {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let mut max_front = f64::NEG_INFINITY;
        let mut min_back = f64::MAX;
        let mut front_face = CONE_BASE_FACE;
        let mut back_face = CONE_BASE_FACE;

        let udot_ctr = view_dir.dot(self.center_axis);
        if view_pos.dot(self.center_axis) > self.apex_dot_center_axis && udot_ctr >= 0.0 {
            return None; // above the apex, heading up
        }

        // Base plane
        let pdotn = self.base_normal.dot(view_pos);
        let udotn = self.base_normal.dot(view_dir);
        if pdotn > self.base_plane_coef {
            if udotn >= 0.0 {
                return None; // outside the base plane, pointing away
            }
            max_front = (self.base_plane_coef - pdotn) / udotn;
            front_face = CONE_BASE_FACE;
        } else if pdotn < self.base_plane_coef && udotn > 0.0 {
            min_back = (self.base_plane_coef - pdotn) / udotn;
            back_face = CONE_BASE_FACE;
        }

        // The cone sides
        let rel = view_pos - self.apex;
        let pdot_ctr = rel.dot(self.center_axis);
        let pdot_a = rel.dot(self.axis_a);
        let pdot_b = rel.dot(self.axis_b);
        let udot_a = view_dir.dot(self.axis_a);
        let udot_b = view_dir.dot(self.axis_b);

        let c = pdot_a * pdot_a + pdot_b * pdot_b - pdot_ctr * pdot_ctr;
        let b = 2.0 * (pdot_a * udot_a + pdot_b * udot_b - pdot_ctr * udot_ctr);
        let a = udot_a * udot_a + udot_b * udot_b - udot_ctr * udot_ctr;

        let (roots, num_roots) = solve_quadratic(a, b, c);
        if num_roots == 0 {
            return None;
        }
        let view_more_vertical = a < 0.0;
        if view_more_vertical {
            // The line leaves and then re-enters the (double) cone
            if roots[0] < min_back && pdot_ctr + roots[0] * udot_ctr <= 0.0 {
                if roots[0] < max_front {
                    return None;
                }
                min_back = roots[0];
                back_face = CONE_SIDE_FACE;
            } else if num_roots == 2
                && roots[1] > max_front
                && pdot_ctr + roots[1] * udot_ctr <= 0.0
            {
                if roots[1] > min_back {
                    return None;
                }
                max_front = roots[1];
                front_face = CONE_SIDE_FACE;
            }
        } else {
            // The line enters and then leaves
            if roots[0] > max_front {
                if pdot_ctr + roots[0] * udot_ctr > 0.0 {
                    return None; // entered the dual cone above the apex
                }
                if roots[0] > min_back {
                    return None;
                }
                max_front = roots[0];
                front_face = CONE_SIDE_FACE;
            }
            if num_roots == 2 && roots[1] < min_back {
                if pdot_ctr + roots[1] * udot_ctr > 0.0 {
                    return None; // leaving through the dual cone
                }
                if roots[1] < max_front {
                    return None;
                }
                min_back = roots[1];
                back_face = CONE_SIDE_FACE;
            }
        }

        let (distance, hit_face) = if max_front >= 0.0 {
            if max_front >= max_dist {
                return None;
            }
            vis_point.set_front_face();
            (max_front, front_face)
        } else {
            if min_back < 0.0 || min_back >= max_dist {
                return None;
            }
            vis_point.set_back_face();
            (min_back, back_face)
        };

        let position = view_pos + view_dir * distance;
        vis_point.set_position(position);

        let rel = position - self.apex;
        let vdot_a = rel.dot(self.axis_a);
        let vdot_b = rel.dot(self.axis_b);
        let vdot_ctr = rel.dot(self.center_axis);

        match hit_face {
            CONE_BASE_FACE => {
                vis_point.set_normal(self.base_normal);
                let mat = if vis_point.is_front_facing() {
                    &self.base_outer_mat
                } else {
                    &self.base_inner_mat
                };
                vis_point.set_material(mat.clone());
                // vdot_ctr is negative below the apex
                let ua = 0.5 * (1.0 - vdot_a / vdot_ctr);
                let ub = 0.5 * (1.0 - vdot_b / vdot_ctr);
                vis_point.set_uv(ub, ua);
                vis_point.set_face_number(CONE_BASE_FACE);
            }
            _ => {
                let normal = (self.axis_a * vdot_a + self.axis_b * vdot_b
                    - self.center_axis * vdot_ctr)
                    .normalize();
                vis_point.set_normal(normal);
                let mat = if vis_point.is_front_facing() {
                    &self.side_outer_mat
                } else {
                    &self.side_inner_mat
                };
                vis_point.set_material(mat.clone());

                let u = vdot_b.atan2(vdot_a) / TAU + 0.5;
                let v = if self.is_right {
                    (vdot_ctr + self.height) / self.height
                } else {
                    let dist_down = -(self.base_plane_coef - position.dot(self.base_normal))
                        / self.center_axis.dot(self.base_normal);
                    let dist_up = -vdot_ctr;
                    if dist_down + dist_up > 0.0 {
                        dist_down / (dist_down + dist_up)
                    } else {
                        0.5
                    }
                };
                vis_point.set_uv(u, v);
                vis_point.set_face_number(CONE_SIDE_FACE);
            }
        }
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        // Directions on the base ellipse extremal for u, found from a
        // homogeneous quadratic in the radial-plane coordinates.
        let perp = self.base_normal.cross(u);
        let q1 = perp.dot(self.axis_a) * self.slope_a;
        let q2 = perp.dot(self.axis_b) * self.slope_b;
        let q3 = -perp.dot(self.center_axis);

        let a = square(q1) - square(q3 * self.slope_a);
        let b = q1 * q2;
        let c = square(q2) - square(q3 * self.slope_b);

        let apex_dot = u.dot(self.apex);
        let mut min_d = apex_dot;
        let mut max_d = apex_dot;
        let apex_dot_base = self.apex.dot(self.base_normal);

        let mut try_direction = |trial: DVec3| {
            let denom = self.base_normal.dot(trial);
            if denom == 0.0 {
                return;
            }
            let delta = ((self.base_plane_coef - apex_dot_base) / denom) * trial.dot(u);
            update_min_max(apex_dot + delta, &mut min_d, &mut max_d);
        };

        if a == square(q1) || c == square(q2) {
            // q3 == 0: u lies in the base plane; one lateral direction,
            // tried with both signs of the axial component
            let (sx, sy) = if q1 == 0.0 && q2 == 0.0 {
                (1.0, 0.0) // every direction solves; pick one
            } else {
                (-q2, q1)
            };
            let sz = (square(sx * self.slope_a) + square(sy * self.slope_b)).sqrt();
            let base = self.axis_a * (sx / self.slope_a) + self.axis_b * (sy / self.slope_b);
            try_direction(base - self.center_axis * sz);
            try_direction(base + self.center_axis * sz);
        } else {
            let (mut solns, n) = solve_quadratic_homogeneous(a, b, c);
            let num_solns = match n {
                3 => {
                    solns[0] = (1.0, 0.0);
                    1
                }
                // Roundoff pushed the discriminant negative; the first slot
                // holds the extremal direction.
                0 => 1,
                n => n,
            };
            for (sx, sy) in solns.iter().take(num_solns) {
                let sz = q1 * sx + q2 * sy;
                let trial = self.axis_a * (q3 * sx / self.slope_a)
                    + self.axis_b * (q3 * sy / self.slope_b)
                    - self.center_axis * sz;
                try_direction(trial);
            }
        }
        (min_d, max_d)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        match vis_point.face_number() {
            CONE_BASE_FACE => {
                let dist_down = (self.apex - vis_point.position()).dot(self.center_axis);
                let mut partial_u = self.axis_b * (dist_down / square(self.slope_b));
                let mut partial_v = self.axis_a * (dist_down / square(self.slope_a));
                // Project into the base plane
                partial_u -= self.base_normal * partial_u.dot(self.base_normal);
                partial_v -= self.base_normal * partial_v.dot(self.base_normal);
                Some((partial_u, partial_v))
            }
            _ => {
                let phi = TAU * (vis_point.u() - 0.5);
                let rel = self.apex - vis_point.position();
                let dist_down = rel.dot(self.center_axis);

                let mut partial_u = self.axis_a * (-phi.sin() / square(self.slope_a))
                    + self.axis_b * (phi.cos() / square(self.slope_b));
                partial_u -= self.base_normal * partial_u.dot(self.base_normal);
                partial_u *= -TAU * dist_down;

                let dist_up = -(self.base_plane_coef
                    - vis_point.position().dot(self.base_normal))
                    / self.center_axis.dot(self.base_normal);
                if dist_up == 0.0 {
                    return None; // apex-side singularity
                }
                let partial_v = rel * ((dist_down + dist_up) / dist_up);
                Some((partial_u, partial_v))
            }
        }
    }
}

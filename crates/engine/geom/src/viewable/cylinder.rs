//! Cylinders, right or oblique, with elliptical cross sections.

use super::Viewable;
use crate::error::GeomError;
use crate::material::Material;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::f64::consts::TAU;
use std::sync::Arc;
use vmath::roots::solve_quadratic_safe;
use vmath::util::{get_ortho_complements, square};

/// Face numbers reported in the `VisiblePoint`.
pub const CYLINDER_SIDE_FACE: usize = 0;
pub const CYLINDER_BASE_FACE: usize = 1;
pub const CYLINDER_TOP_FACE: usize = 2;

/// A cylinder bounded by two planes.
///
/// A *right* cylinder has caps perpendicular to the center axis (set via
/// `set_height`); otherwise arbitrary top/bottom bounding planes may be
/// given. The radial axes are stored scaled by the inverse radii so the
/// side surface is `|x.axis_a|^2 + |x.axis_b|^2 = 1`.
pub struct Cylinder {
    center_axis: DVec3,
    center: DVec3,
    axis_a: DVec3,
    axis_b: DVec3,
    radius_a: f64,
    radius_b: f64,

    height: f64,
    half_height: f64,
    center_dot_axis: f64,

    top_normal: DVec3,
    top_plane_coef: f64,
    bottom_normal: DVec3,
    bottom_plane_coef: f64,
    is_right: bool,

    side_outer_mat: Arc<dyn Material>,
    side_inner_mat: Arc<dyn Material>,
    top_outer_mat: Arc<dyn Material>,
    top_inner_mat: Arc<dyn Material>,
    bottom_outer_mat: Arc<dyn Material>,
    bottom_inner_mat: Arc<dyn Material>,
}

impl Cylinder {
    pub fn new(material: Arc<dyn Material>) -> Self {
        let mut cyl = Self {
            center_axis: DVec3::Y,
            center: DVec3::ZERO,
            axis_a: DVec3::Z,
            axis_b: DVec3::X,
            radius_a: 1.0,
            radius_b: 1.0,
            height: 1.0,
            half_height: 0.5,
            center_dot_axis: 0.0,
            top_normal: DVec3::Y,
            top_plane_coef: 0.5,
            bottom_normal: -DVec3::Y,
            bottom_plane_coef: 0.5,
            is_right: true,
            side_outer_mat: material.clone(),
            side_inner_mat: material.clone(),
            top_outer_mat: material.clone(),
            top_inner_mat: material.clone(),
            bottom_outer_mat: material.clone(),
            bottom_inner_mat: material,
        };
        cyl.recalc_frame();
        cyl
    }

    /// Set the central axis. Chooses fresh radial axes; call
    /// `set_radial_axes` afterwards to override them.
    pub fn set_center_axis(&mut self, axis: DVec3) -> Result<(), GeomError> {
        if axis == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.center_axis = axis.normalize();
        let (a, b) = get_ortho_complements(self.center_axis);
        self.axis_a = a / self.radius_a;
        self.axis_b = b / self.radius_b;
        self.recalc_frame();
        Ok(())
    }

    /// Center point (right cylinders) or any point on the axis (oblique).
    pub fn set_center(&mut self, center: DVec3) {
        self.center = center;
        self.recalc_frame();
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), GeomError> {
        self.set_radii(radius, radius)
    }

    pub fn set_radii(&mut self, radius_a: f64, radius_b: f64) -> Result<(), GeomError> {
        if radius_a <= 0.0 {
            return Err(GeomError::NonPositiveRadius(radius_a));
        }
        if radius_b <= 0.0 {
            return Err(GeomError::NonPositiveRadius(radius_b));
        }
        self.axis_a *= 1.0 / (radius_a * self.axis_a.length());
        self.axis_b *= 1.0 / (radius_b * self.axis_b.length());
        self.radius_a = radius_a;
        self.radius_b = radius_b;
        Ok(())
    }

    /// Radial axes; call after `set_center_axis`. Components parallel to
    /// the center axis are projected away.
    pub fn set_radial_axes(&mut self, axis_a: DVec3, axis_b: DVec3) -> Result<(), GeomError> {
        let a = axis_a - self.center_axis * axis_a.dot(self.center_axis);
        if a.length_squared() == 0.0 {
            return Err(GeomError::ParallelRadialAxis);
        }
        self.axis_a = a / (self.radius_a * a.length());
        let b = axis_b - self.center_axis * axis_b.dot(self.center_axis);
        if b.length_squared() == 0.0 {
            return Err(GeomError::ParallelRadialAxis);
        }
        self.axis_b = b / (self.radius_b * b.length());
        Ok(())
    }

    /// Make this a right cylinder of the given height around the center.
    pub fn set_height(&mut self, height: f64) -> Result<(), GeomError> {
        if height <= 0.0 {
            return Err(GeomError::NonPositiveHeight(height));
        }
        self.is_right = true;
        self.height = height;
        self.half_height = height * 0.5;
        self.recalc_frame();
        Ok(())
    }

    /// Arbitrary top bounding plane `{x : x.normal = coef}` (oblique form).
    pub fn set_top_face(&mut self, normal: DVec3, coef: f64) -> Result<(), GeomError> {
        if normal == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.is_right = false;
        self.top_normal = normal.normalize();
        self.top_plane_coef = coef;
        Ok(())
    }

    pub fn set_bottom_face(&mut self, normal: DVec3, coef: f64) -> Result<(), GeomError> {
        if normal == DVec3::ZERO {
            return Err(GeomError::ZeroAxis);
        }
        self.is_right = false;
        self.bottom_normal = normal.normalize();
        self.bottom_plane_coef = coef;
        Ok(())
    }

    pub fn is_right_cylinder(&self) -> bool {
        self.is_right
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn center_axis(&self) -> DVec3 {
        self.center_axis
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_material(&mut self, material: Arc<dyn Material>) {
        self.set_material_outer(material.clone());
        self.set_material_inner(material);
    }

    pub fn set_material_outer(&mut self, material: Arc<dyn Material>) {
        self.side_outer_mat = material.clone();
        self.top_outer_mat = material.clone();
        self.bottom_outer_mat = material;
    }

    pub fn set_material_inner(&mut self, material: Arc<dyn Material>) {
        self.side_inner_mat = material.clone();
        self.top_inner_mat = material.clone();
        self.bottom_inner_mat = material;
    }

    fn recalc_frame(&mut self) {
        self.center_dot_axis = self.center.dot(self.center_axis);
        if self.is_right {
            self.top_normal = self.center_axis;
            self.bottom_normal = -self.center_axis;
            self.top_plane_coef = self.center_dot_axis + self.half_height;
            self.bottom_plane_coef = -(self.center_dot_axis - self.half_height);
        }
    }
}

impl Viewable for Cylinder {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let mut max_front = f64::NEG_INFINITY;
        let mut min_back = f64::MAX;
        let mut front_face = CYLINDER_SIDE_FACE;
        let mut back_face = CYLINDER_SIDE_FACE;

        if self.is_right {
            let pdotn = view_pos.dot(self.center_axis) - self.center_dot_axis;
            let udotn = view_dir.dot(self.center_axis);
            if pdotn > self.half_height {
                if udotn >= 0.0 {
                    return None; // above the top, pointing up
                }
                max_front = (self.half_height - pdotn) / udotn;
                front_face = CYLINDER_TOP_FACE;
                min_back = -(self.half_height + pdotn) / udotn;
                back_face = CYLINDER_BASE_FACE;
            } else if pdotn < -self.half_height {
                if udotn <= 0.0 {
                    return None; // below the bottom, pointing down
                }
                max_front = -(self.half_height + pdotn) / udotn;
                front_face = CYLINDER_BASE_FACE;
                min_back = (self.half_height - pdotn) / udotn;
                back_face = CYLINDER_TOP_FACE;
            } else if udotn < 0.0 {
                min_back = -(self.half_height + pdotn) / udotn;
                back_face = CYLINDER_BASE_FACE;
            } else if udotn > 0.0 {
                min_back = (self.half_height - pdotn) / udotn;
                back_face = CYLINDER_TOP_FACE;
            }
        } else {
            // Top plane
            let pdotn = self.top_normal.dot(view_pos);
            let udotn = self.top_normal.dot(view_dir);
            if pdotn > self.top_plane_coef {
                if udotn >= 0.0 {
                    return None;
                }
                max_front = (self.top_plane_coef - pdotn) / udotn;
                front_face = CYLINDER_TOP_FACE;
            } else if pdotn < self.top_plane_coef && udotn > 0.0 {
                min_back = (self.top_plane_coef - pdotn) / udotn;
                back_face = CYLINDER_TOP_FACE;
            }
            // Bottom plane
            let pdotn = self.bottom_normal.dot(view_pos);
            let udotn = self.bottom_normal.dot(view_dir);
            if pdotn < self.bottom_plane_coef {
                if udotn > 0.0 {
                    let new_back = (self.bottom_plane_coef - pdotn) / udotn;
                    if new_back < max_front {
                        return None;
                    }
                    if new_back < min_back {
                        min_back = new_back;
                        back_face = CYLINDER_BASE_FACE;
                    }
                }
            } else if pdotn > self.bottom_plane_coef {
                if udotn >= 0.0 {
                    return None;
                }
                let new_front = (self.bottom_plane_coef - pdotn) / udotn;
                if new_front > min_back {
                    return None;
                }
                if new_front > max_front {
                    max_front = new_front;
                    front_face = CYLINDER_BASE_FACE;
                }
            }
        }
        if max_front > max_dist {
            return None;
        }

        // The infinite cylinder around the sides
        let rel = view_pos - self.center;
        let pdot_a = rel.dot(self.axis_a);
        let pdot_b = rel.dot(self.axis_b);
        let udot_a = view_dir.dot(self.axis_a);
        let udot_b = view_dir.dot(self.axis_b);

        let c = pdot_a * pdot_a + pdot_b * pdot_b - 1.0;
        let mut b = pdot_a * udot_a + pdot_b * udot_b;
        if c >= 0.0 && b > 0.0 {
            return None; // outside the tube, pointing away
        }
        b += b;
        let a = udot_a * udot_a + udot_b * udot_b;

        if a == 0.0 {
            // Parallel to the axis: the side surface is never crossed and
            // the caps alone bound the hit
            if c >= 0.0 {
                return None;
            }
        } else {
            let (roots, num_roots) = solve_quadratic_safe(a, b, c);
            if num_roots == 0 {
                return None;
            }
            if roots[0] > max_front {
                if roots[0] > min_back {
                    return None;
                }
                max_front = roots[0];
                front_face = CYLINDER_SIDE_FACE;
            }
            if num_roots == 2 && roots[1] < min_back {
                if roots[1] < max_front {
                    return None;
                }
                min_back = roots[1];
                back_face = CYLINDER_SIDE_FACE;
            }
        }

        let (distance, hit_face) = if max_front > 0.0 {
            vis_point.set_front_face();
            (max_front, front_face)
        } else {
            vis_point.set_back_face();
            (min_back, back_face)
        };
        if distance >= max_dist || distance < 0.0 {
            return None;
        }

        let position = view_pos + view_dir * distance;
        vis_point.set_position(position);

        let rel = position - self.center;
        let vdot_a = rel.dot(self.axis_a);
        let vdot_b = rel.dot(self.axis_b);

        match hit_face {
            CYLINDER_TOP_FACE => {
                vis_point.set_normal(self.top_normal);
                let mat = if vis_point.is_front_facing() {
                    &self.top_outer_mat
                } else {
                    &self.top_inner_mat
                };
                vis_point.set_material(mat.clone());
                vis_point.set_uv(0.5 * (1.0 - vdot_a), 0.5 * (1.0 + vdot_b));
                vis_point.set_face_number(CYLINDER_TOP_FACE);
            }
            CYLINDER_BASE_FACE => {
                vis_point.set_normal(self.bottom_normal);
                let mat = if vis_point.is_front_facing() {
                    &self.bottom_outer_mat
                } else {
                    &self.bottom_inner_mat
                };
                vis_point.set_material(mat.clone());
                vis_point.set_uv(0.5 * (1.0 + vdot_a), 0.5 * (1.0 + vdot_b));
                vis_point.set_face_number(CYLINDER_BASE_FACE);
            }
            _ => {
                let normal = (self.axis_a * vdot_a + self.axis_b * vdot_b).normalize();
                vis_point.set_normal(normal);
                let mat = if vis_point.is_front_facing() {
                    &self.side_outer_mat
                } else {
                    &self.side_inner_mat
                };
                vis_point.set_material(mat.clone());

                let u = vdot_b.atan2(vdot_a) / TAU + 0.5;
                let v = if self.is_right {
                    (rel.dot(self.center_axis) + self.half_height) / self.height
                } else {
                    let dist_up = (self.top_plane_coef - position.dot(self.top_normal))
                        / self.center_axis.dot(self.top_normal);
                    let dist_down = -(self.bottom_plane_coef - position.dot(self.bottom_normal))
                        / self.center_axis.dot(self.bottom_normal);
                    if dist_down + dist_up > 0.0 {
                        dist_down / (dist_down + dist_up)
                    } else {
                        0.5 // at a corner
                    }
                };
                vis_point.set_uv(u, v);
                vis_point.set_face_number(CYLINDER_SIDE_FACE);
            }
        }
        Some(distance)
    }

    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64) {
        let center_dot = u.dot(self.center);
        let axis_dot_u = self.center_axis.dot(u);
        if self.is_right {
            let delta = self.half_height * axis_dot_u.abs()
                + (square(self.radius_a * self.radius_a * self.axis_a.dot(u))
                    + square(self.radius_b * self.radius_b * self.axis_b.dot(u)))
                .sqrt();
            return (center_dot - delta, center_dot + delta);
        }

        // Oblique cylinder: check the extremal points of both cap ellipses
        let mut min_d = f64::MAX;
        let mut max_d = f64::MIN;
        for (cap_normal, cap_coef) in [
            (self.top_normal, self.top_plane_coef),
            (self.bottom_normal, self.bottom_plane_coef),
        ] {
            let perp = cap_normal.cross(u);
            let alpha = perp.dot(self.axis_a) * self.radius_a;
            let beta = perp.dot(self.axis_b) * self.radius_b;
            if alpha == 0.0 && beta == 0.0 {
                // u is perpendicular to this cap
                let dot = cap_coef * u.dot(cap_normal);
                min_d = min_d.min(dot);
                max_d = max_d.max(dot);
                continue;
            }
            let ratio = (square(alpha * self.radius_b) + square(beta * self.radius_a)).sqrt();
            let soln_x = -beta * self.radius_a * self.radius_a / ratio;
            let soln_y = alpha * self.radius_b * self.radius_b / ratio;
            for sign in [1.0, -1.0] {
                let trial = self.center
                    + self.axis_a * (sign * soln_x * self.radius_a * self.radius_a)
                    + self.axis_b * (sign * soln_y * self.radius_b * self.radius_b);
                let dot = trial.dot(u)
                    + (cap_coef - trial.dot(cap_normal)) * self.center_axis.dot(u)
                        / self.center_axis.dot(cap_normal);
                min_d = min_d.min(dot);
                max_d = max_d.max(dot);
            }
        }
        (min_d, max_d)
    }

    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)> {
        match vis_point.face_number() {
            CYLINDER_SIDE_FACE => {
                let mut partial_v = self.center_axis;
                let partial_u;
                if self.is_right {
                    partial_v *= self.height;
                    partial_u =
                        (vis_point.position() - self.center).cross(self.center_axis) * (-TAU);
                } else {
                    let phi = TAU * (vis_point.u() - 0.5);
                    let radius_ab = self.radius_a * self.radius_b;
                    let mut pu = self.axis_a * (-radius_ab * phi.sin())
                        + self.axis_b * (radius_ab * phi.cos());
                    let adjust_up =
                        partial_v.dot(self.top_normal) / self.center_axis.dot(self.top_normal);
                    let adjust_down = partial_v.dot(self.bottom_normal)
                        / self.center_axis.dot(self.bottom_normal);
                    pu -= self.center_axis
                        * ((1.0 - vis_point.u()) * adjust_up + vis_point.u() * adjust_down);
                    partial_u = pu;

                    let pos = vis_point.position();
                    let dist_up = (self.top_plane_coef - pos.dot(self.top_normal))
                        / self.center_axis.dot(self.top_normal);
                    let dist_down = -(self.bottom_plane_coef - pos.dot(self.bottom_normal))
                        / self.center_axis.dot(self.bottom_normal);
                    partial_v *= dist_up + dist_down;
                }
                Some((partial_u, partial_v))
            }
            CYLINDER_BASE_FACE => {
                let mut partial_u = self.axis_b * (2.0 * square(self.radius_b));
                let mut partial_v = self.axis_a * (2.0 * square(self.radius_a));
                if !self.is_right {
                    partial_u -= self.center_axis
                        * (partial_u.dot(self.bottom_normal)
                            / self.center_axis.dot(self.bottom_normal));
                    partial_v -= self.center_axis
                        * (partial_v.dot(self.bottom_normal)
                            / self.center_axis.dot(self.bottom_normal));
                }
                Some((partial_u, partial_v))
            }
            _ => {
                let mut partial_u = self.axis_b * (2.0 * square(self.radius_b));
                let mut partial_v = self.axis_a * (-2.0 * square(self.radius_a));
                if !self.is_right {
                    partial_u -= self.center_axis
                        * (partial_u.dot(self.top_normal) / self.center_axis.dot(self.top_normal));
                    partial_v -= self.center_axis
                        * (partial_v.dot(self.top_normal) / self.center_axis.dot(self.top_normal));
                }
                Some((partial_u, partial_v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    fn unit_cylinder() -> Cylinder {
        // Radius 1, height 2, axis +Y, centered at origin
        let mut cyl = Cylinder::new(Arc::new(PhongMaterial::default()));
        cyl.set_center_axis(DVec3::Y).unwrap();
        cyl.set_center(DVec3::ZERO);
        cyl.set_radius(1.0).unwrap();
        cyl.set_height(2.0).unwrap();
        cyl
    }

    fn vp() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn side_hit_from_outside() {
        let cyl = unit_cylinder();
        let mut point = vp();
        let t = cyl
            .find_intersection(DVec3::new(5.0, 0.0, 0.0), -DVec3::X, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 4.0).abs() < 1e-10);
        assert!(point.is_front_facing());
        assert_eq!(point.face_number(), CYLINDER_SIDE_FACE);
        assert!((point.normal() - DVec3::X).length() < 1e-10);
    }

    #[test]
    fn cap_hit_from_above() {
        let cyl = unit_cylinder();
        let mut point = vp();
        let t = cyl
            .find_intersection(DVec3::new(0.0, 5.0, 0.0), -DVec3::Y, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 4.0).abs() < 1e-10);
        assert_eq!(point.face_number(), CYLINDER_TOP_FACE);
        assert!((point.normal() - DVec3::Y).length() < 1e-10);
    }

    #[test]
    fn interior_hit_is_back_face() {
        let cyl = unit_cylinder();
        let mut point = vp();
        let t = cyl
            .find_intersection(DVec3::ZERO, DVec3::X, f64::MAX, &mut point)
            .unwrap();
        assert!((t - 1.0).abs() < 1e-10);
        assert!(point.is_back_facing());
    }

    #[test]
    fn miss_above_pointing_up() {
        let cyl = unit_cylinder();
        let mut point = vp();
        assert!(
            cyl.find_intersection(DVec3::new(0.0, 5.0, 0.0), DVec3::Y, f64::MAX, &mut point)
                .is_none()
        );
    }

    #[test]
    fn side_uv_height_fraction() {
        let cyl = unit_cylinder();
        let mut point = vp();
        cyl.find_intersection(DVec3::new(5.0, 0.5, 0.0), -DVec3::X, f64::MAX, &mut point)
            .unwrap();
        // y = 0.5 of height 2 centered at 0: v = (0.5 + 1) / 2 = 0.75
        assert!((point.v() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn bounding_planes_right_cylinder() {
        let cyl = unit_cylinder();
        let (min_y, max_y) = cyl.calc_bounding_planes(DVec3::Y);
        assert!((min_y + 1.0).abs() < 1e-10);
        assert!((max_y - 1.0).abs() < 1e-10);
        let (min_x, max_x) = cyl.calc_bounding_planes(DVec3::X);
        assert!((min_x + 1.0).abs() < 1e-10);
        assert!((max_x - 1.0).abs() < 1e-10);
    }
}

//! Surface materials and local lighting models.

mod cook_torrance;
mod phong;

pub use cook_torrance::CookTorranceMaterial;
pub use phong::PhongMaterial;

use crate::light::Light;
use crate::visible_point::VisiblePoint;
use glam::DVec3;

/// Color block shared by every lighting model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialCore {
    pub ambient: DVec3,
    pub diffuse: DVec3,
    pub specular: DVec3,
    pub emissive: DVec3,
}

impl Default for MaterialCore {
    fn default() -> Self {
        Self {
            ambient: DVec3::splat(0.2),
            diffuse: DVec3::splat(0.8),
            specular: DVec3::ZERO,
            emissive: DVec3::ZERO,
        }
    }
}

/// A lighting model attached to a surface.
///
/// Implementations answer reflectivity/transmissivity queries, compute the
/// refraction direction, and evaluate their local lighting equation for a
/// single light.
pub trait Material: Send + Sync {
    fn core(&self) -> &MaterialCore;
    fn core_mut(&mut self) -> &mut MaterialCore;

    fn is_reflective(&self) -> bool;
    fn is_transmissive(&self) -> bool;

    /// Refraction direction for an incoming unit direction `in_dir` at unit
    /// normal `normal`. `None` signals total internal reflection.
    fn calc_refract_dir(&self, normal: DVec3, in_dir: DVec3) -> Option<DVec3>;

    /// Color coefficients applied to the traced reflection ray.
    fn reflection_color(&self, vis_point: &VisiblePoint, out_dir: DVec3, from_dir: DVec3) -> DVec3;

    /// Color coefficients applied to the traced transmission ray.
    fn transmission_color(&self, vis_point: &VisiblePoint, out_dir: DVec3, from_dir: DVec3)
    -> DVec3;

    /// Local lighting for one light.
    ///
    /// `n` surface normal, `v` unit vector toward the viewer, `l` unit vector
    /// toward the light, `h` an optional precomputed half vector. Ambient is
    /// included and the whole result is scaled by `attenuation`.
    #[allow(clippy::too_many_arguments)]
    fn calc_local_lighting(
        &self,
        light: &Light,
        percent_lit: DVec3,
        attenuation: f64,
        n: DVec3,
        v: DVec3,
        l: DVec3,
        h: Option<DVec3>,
    ) -> DVec3;

    /// Approximate Phong exponent (for previews and import/export).
    fn phong_shininess(&self) -> f64 {
        50.0
    }

    fn clone_box(&self) -> Box<dyn Material>;
}

/// Shared Snell-law refraction used by both lighting models.
///
/// `eta` is the material's index of refraction, `eta_inv` its inverse. The
/// incoming direction decides whether the ray enters or leaves the surface.
/// Returns `None` on total internal reflection.
pub(crate) fn refract_direction(
    eta: f64,
    eta_inv: f64,
    normal: DVec3,
    in_dir: DVec3,
) -> Option<DVec3> {
    if eta == 1.0 {
        return Some(in_dir);
    }
    let cos_in = normal.dot(in_dir);
    let from_outside = cos_in < 0.0;
    let ratio = if from_outside { eta_inv } else { eta };

    // Lateral (surface-parallel) part of the transmitted direction
    let t_lat = (in_dir - normal * cos_in) * ratio;
    let sin_sq = t_lat.length_squared();
    if sin_sq >= 1.0 {
        return None;
    }

    let axial = if from_outside { -normal } else { normal };
    Some((t_lat + axial * (1.0 - sin_sq).sqrt()).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refraction_straight_through_at_unity() {
        let d = DVec3::new(0.6, -0.8, 0.0);
        assert_eq!(refract_direction(1.0, 1.0, DVec3::Y, d), Some(d));
    }

    #[test]
    fn refraction_bends_toward_normal_entering_denser() {
        let n = DVec3::Y;
        let in_dir = DVec3::new(1.0, -1.0, 0.0).normalize();
        let t = refract_direction(1.5, 1.0 / 1.5, n, in_dir).unwrap();
        // Entering glass: transmitted ray closer to -normal than incoming
        assert!(t.y < 0.0);
        assert!(t.x.abs() < in_dir.x.abs());
        assert!((t.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn total_internal_reflection_detected() {
        let n = DVec3::Y;
        // Leaving glass at a grazing angle
        let in_dir = DVec3::new(0.95, 0.312_25, 0.0).normalize();
        assert!(refract_direction(1.5, 1.0 / 1.5, n, in_dir).is_none());
    }

    #[test]
    fn refraction_is_involutive_on_first_bounce() {
        let n = DVec3::Y;
        let in_dir = DVec3::new(0.4, -0.9, 0.2).normalize();
        let t = refract_direction(1.5, 1.0 / 1.5, n, in_dir).unwrap();
        let back = refract_direction(1.5, 1.0 / 1.5, -n, t).unwrap();
        assert!(back.dot(in_dir) > 1.0 - 1e-8);
    }
}

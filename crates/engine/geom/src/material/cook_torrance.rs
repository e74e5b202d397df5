//! Cook-Torrance microfacet lighting model.
//!
//! Three independent wavelength channels, each with its own index of
//! refraction and Fresnel term. The slope distribution is Beckmann; the
//! geometric term is Blinn's masking/shadowing factor with a secondary
//! groove term for light leaving the opposing microfacet.

use super::{Material, MaterialCore, refract_direction};
use crate::light::Light;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::f64::consts::PI;
use vmath::util::{near_zero, near_zero_vec, safe_sqrt, square};

#[derive(Debug, Clone)]
pub struct CookTorranceMaterial {
    pub core: MaterialCore,
    reflection_factor: DVec3,
    transmission_factor: DVec3,
    index_of_refraction: DVec3,
    mean_slope: f64,
    reflective: bool,
    transmissive: bool,
}

impl Default for CookTorranceMaterial {
    fn default() -> Self {
        let mut mat = Self {
            core: MaterialCore::default(),
            reflection_factor: DVec3::ZERO,
            transmission_factor: DVec3::ZERO,
            index_of_refraction: DVec3::ZERO,
            mean_slope: 0.2,
            reflective: false,
            transmissive: false,
        };
        mat.set_reflection_factor(DVec3::ONE);
        mat.set_transmission_factor(DVec3::ZERO);
        mat.set_index_of_refraction(DVec3::splat(1.3));
        mat
    }
}

impl CookTorranceMaterial {
    /// RMS microfacet slope ("m").
    pub fn set_roughness(&mut self, slope: f64) {
        self.mean_slope = slope;
    }

    pub fn roughness(&self) -> f64 {
        self.mean_slope
    }

    /// Multiplicative factor applied to reflected (and transmitted) light.
    pub fn set_reflection_factor(&mut self, factor: DVec3) {
        self.reflection_factor = factor;
        self.reflective = factor != DVec3::ZERO;
    }

    pub fn reflection_factor(&self) -> DVec3 {
        self.reflection_factor
    }

    /// Extra multiplicative factor applied to transmitted light only.
    pub fn set_transmission_factor(&mut self, factor: DVec3) {
        self.transmission_factor = factor;
        self.transmissive = factor != DVec3::ZERO;
    }

    pub fn transmission_factor(&self) -> DVec3 {
        self.transmission_factor
    }

    /// Per-channel (R, G, B) indices of refraction.
    pub fn set_index_of_refraction(&mut self, indices: DVec3) {
        self.index_of_refraction = indices;
    }

    pub fn index_of_refraction(&self) -> DVec3 {
        self.index_of_refraction
    }

    /// Cook & Torrance's conversion from normal reflectance to the index of
    /// refraction: `eta = (1 + sqrt(F0)) / (1 - sqrt(F0))`.
    pub fn set_refraction_from_reflectance(&mut self, reflectance: DVec3) {
        let conv = |f0: f64| {
            let s = f0.clamp(0.0, 1.0 - 1.0e-9).sqrt();
            (1.0 + s) / (1.0 - s)
        };
        self.set_index_of_refraction(DVec3::new(
            conv(reflectance.x),
            conv(reflectance.y),
            conv(reflectance.z),
        ));
    }

    pub fn set_color_ambient(&mut self, color: DVec3) {
        self.core.ambient = color;
    }

    pub fn set_color_diffuse(&mut self, color: DVec3) {
        self.core.diffuse = color;
    }

    pub fn set_color_specular(&mut self, color: DVec3) {
        self.core.specular = color;
    }

    pub fn set_color_emissive(&mut self, color: DVec3) {
        self.core.emissive = color;
    }

    // ------------------------------------------------------------------
    // Model internals
    // ------------------------------------------------------------------

    /// Fresnel term at one wavelength. `c` = cos(theta), `eta` = index.
    fn fresnel_term(c: f64, eta: f64) -> f64 {
        let g = safe_sqrt(c * c + eta * eta - 1.0);
        let f = 0.5
            * square((g - c) / (g + c))
            * (1.0 + square((c * (g + c) - 1.0) / (c * (g - c) + 1.0)));
        f.max(0.0)
    }

    /// Beckmann slope distribution D(cos psi).
    fn slope_distribution(&self, cos_psi: f64) -> f64 {
        let cos_sq_inv = 1.0 / square(cos_psi);
        let tan_psi_sq = cos_sq_inv - 1.0;
        let m_sq_inv = 1.0 / square(self.mean_slope);
        (-tan_psi_sq * m_sq_inv).exp() * square(cos_sq_inv) * m_sq_inv / PI
    }

    /// Mean groove normal for the masking/shadowing analysis.
    fn groove_normal(n: DVec3, l: DVec3, v: DVec3) -> DVec3 {
        if near_zero(n.dot(l.cross(v)), 1.0e-7) {
            n
        } else {
            let m = l * n.dot(l) + v * n.dot(v) - l * (v.dot(l) * v.dot(n))
                - v * (v.dot(l) * l.dot(n));
            m.normalize()
        }
    }

    /// Blinn geometric attenuation with the opposing-groove term.
    fn geometric_factor(&self, l: DVec3, n: DVec3, v: DVec3, h: DVec3) -> f64 {
        let m = Self::groove_normal(n, l, v);
        let h_prime = m * (2.0 * h.dot(m)) - h; // opposite side of the groove
        if v.dot(h_prime) >= 0.0 {
            1.0 // no masking
        } else if l.dot(h_prime) >= 0.0 {
            2.0 * m.dot(h) * m.dot(v) / h.dot(v) // masking, no shadowing
        } else if m.dot(v) < m.dot(l) {
            m.dot(v) / m.dot(l) // more masking than shadowing
        } else {
            1.0
        }
    }

    /// Transmission variant: nonshadowed fraction s, nonmasked fraction m,
    /// combined as (s + m - 1)/s when positive.
    fn geometric_xmit_factor(&self, l: DVec3, n: DVec3, v: DVec3, h: DVec3) -> f64 {
        let groove = Self::groove_normal(n, l, v);
        let h_prime = groove * (2.0 * h.dot(groove)) - h;

        let s = if l.dot(h_prime) < 0.0 {
            2.0 * groove.dot(h) * groove.dot(l) / h.dot(l)
        } else {
            1.0
        };
        let m = if v.dot(h_prime) < 0.0 {
            2.0 * groove.dot(h) * groove.dot(v) / h.dot(v)
        } else {
            1.0
        };
        if s == 0.0 || s + m <= 1.0 {
            0.0
        } else {
            (s + m - 1.0) / s
        }
    }

    fn reflection_color_same_side(&self, l: DVec3, n: DVec3, v: DVec3, above: bool) -> DVec3 {
        if n.dot(v) == 0.0 {
            return DVec3::ZERO;
        }
        let mut color = self.core.specular * self.reflection_factor * (n.dot(l) / n.dot(v));
        let h = l + v;
        if !near_zero_vec(h, 1.0e-3) {
            let h = h.normalize();
            color *= self.geometric_factor(l, n, v, h);
            color *= self.slope_distribution(h.dot(n));
            let cos_phi = h.dot(l);
            let eta = if above {
                self.index_of_refraction
            } else {
                DVec3::ONE / self.index_of_refraction
            };
            color.x *= Self::fresnel_term(cos_phi, eta.x);
            color.y *= Self::fresnel_term(cos_phi, eta.y);
            color.z *= Self::fresnel_term(cos_phi, eta.z);
        }
        color
    }

    fn transmission_color_inner(&self, l: DVec3, n: DVec3, v: DVec3) -> DVec3 {
        if n.dot(v) == 0.0 {
            return DVec3::ZERO;
        }
        let base = self.core.specular
            * self.reflection_factor
            * self.transmission_factor
            * (-n.dot(l) / n.dot(v));
        let light_above = l.dot(n) > 0.0 || (l.dot(n) <= 0.0 && v.dot(n) < 0.0);
        let factor = |eta_channel: f64| {
            let eta = if light_above {
                eta_channel
            } else {
                1.0 / eta_channel
            };
            self.transmission_channel_factor(l, n, v, eta)
        };
        DVec3::new(
            base.x * factor(self.index_of_refraction.x),
            base.y * factor(self.index_of_refraction.y),
            base.z * factor(self.index_of_refraction.z),
        )
    }

    /// One wavelength of the transmission model. The transmission half
    /// vector is `H = -(L + eta V)` and the factor uses `1 - F`.
    fn transmission_channel_factor(&self, l: DVec3, n: DVec3, v: DVec3, eta: f64) -> f64 {
        let h = -(l + v * eta);
        if near_zero_vec(h, 1.0e-3) {
            return 0.0;
        }
        let mut h = h.normalize();
        if h.dot(l) < 0.0 {
            h = -h;
        }
        let mut ret = self.geometric_xmit_factor(l, n, v, h);
        ret *= self.slope_distribution(h.dot(n).abs());
        ret *= 1.0 - Self::fresnel_term(h.dot(l), eta);
        ret
    }
}

impl Material for CookTorranceMaterial {
    fn core(&self) -> &MaterialCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MaterialCore {
        &mut self.core
    }

    fn is_reflective(&self) -> bool {
        self.reflective
    }

    fn is_transmissive(&self) -> bool {
        self.transmissive
    }

    /// Refraction direction from the mean of the three channel indices.
    fn calc_refract_dir(&self, normal: DVec3, in_dir: DVec3) -> Option<DVec3> {
        let mean_eta = (self.index_of_refraction.x
            + self.index_of_refraction.y
            + self.index_of_refraction.z)
            / 3.0;
        refract_direction(mean_eta, 1.0 / mean_eta, normal, in_dir)
    }

    fn reflection_color(&self, vis_point: &VisiblePoint, out_dir: DVec3, from_dir: DVec3) -> DVec3 {
        let n = vis_point.normal();
        let color = self.reflection_color_same_side(
            from_dir,
            n,
            out_dir,
            vis_point.is_front_facing(),
        );
        color.min(self.reflection_factor)
    }

    fn transmission_color(
        &self,
        vis_point: &VisiblePoint,
        out_dir: DVec3,
        from_dir: DVec3,
    ) -> DVec3 {
        self.transmission_color_inner(from_dir, vis_point.normal(), out_dir)
    }

    fn calc_local_lighting(
        &self,
        light: &Light,
        percent_lit: DVec3,
        attenuation: f64,
        n: DVec3,
        v: DVec3,
        l: DVec3,
        _h: Option<DVec3>,
    ) -> DVec3 {
        let mut color;
        if near_zero_vec(percent_lit, 1.0e-6) {
            color = DVec3::ZERO;
        } else {
            let facing_viewer = n.dot(v) >= 0.0;
            let facing_light = n.dot(l) >= 0.0;
            let opposite_sides = facing_light != facing_viewer;
            if opposite_sides && !self.transmissive {
                color = DVec3::ZERO;
            } else {
                let facing_normal = if facing_light { n } else { -n };
                color = self.core.diffuse * light.color_diffuse() * l.dot(facing_normal);

                let specular = if !opposite_sides {
                    self.reflection_color_same_side(l, n, v, facing_light)
                } else {
                    self.transmission_color_inner(l, n, v)
                };
                color += specular * light.color_specular();
                color *= percent_lit;
            }
        }

        color += self.core.ambient * light.color_ambient();
        color * attenuation
    }

    /// Fake a Phong exponent from the roughness, for preview renderers.
    fn phong_shininess(&self) -> f64 {
        if self.mean_slope <= 0.2 {
            400.0 * self.mean_slope
        } else {
            (127.0f64).min((127.0 - 80.0) * (self.mean_slope - 0.2) / 0.8)
        }
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresnel_at_normal_incidence_matches_reflectance() {
        // eta derived from F0 = 0.04 should give F(1) ~= 0.04
        let mut mat = CookTorranceMaterial::default();
        mat.set_refraction_from_reflectance(DVec3::splat(0.04));
        let eta = mat.index_of_refraction().x;
        let f0 = CookTorranceMaterial::fresnel_term(1.0, eta);
        assert!((f0 - 0.04).abs() < 1e-6);
    }

    #[test]
    fn fresnel_grazing_approaches_one() {
        let f = CookTorranceMaterial::fresnel_term(1.0e-3, 1.5);
        assert!(f > 0.98);
    }

    #[test]
    fn beckmann_peaks_at_facet_alignment() {
        let mat = CookTorranceMaterial::default();
        assert!(mat.slope_distribution(1.0) > mat.slope_distribution(0.9));
        assert!(mat.slope_distribution(0.9) > mat.slope_distribution(0.6));
    }

    #[test]
    fn geometric_factor_bounded() {
        let mat = CookTorranceMaterial::default();
        let n = DVec3::Z;
        let l = DVec3::new(0.3, 0.1, 0.9).normalize();
        let v = DVec3::new(-0.5, 0.2, 0.8).normalize();
        let h = (l + v).normalize();
        let g = mat.geometric_factor(l, n, v, h);
        assert!((0.0..=1.0 + 1e-12).contains(&g));
    }

    #[test]
    fn transmissive_flag_follows_factor() {
        let mut mat = CookTorranceMaterial::default();
        assert!(!mat.is_transmissive());
        mat.set_transmission_factor(DVec3::splat(0.9));
        assert!(mat.is_transmissive());
    }
}

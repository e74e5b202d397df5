//! Phong lighting model.

use super::{Material, MaterialCore, refract_direction};
use crate::light::Light;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use vmath::util::near_zero_vec;

/// Classic Phong material: shared color block plus a shininess exponent and
/// a single isotropic index of refraction.
#[derive(Debug, Clone)]
pub struct PhongMaterial {
    pub core: MaterialCore,
    transmissive_color: DVec3,
    reflective_color: DVec3,
    index_of_refraction: f64,
    index_of_refraction_inv: f64,
    transmissive: bool,
    reflective: bool,
    shininess: f64,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        let mut mat = Self {
            core: MaterialCore::default(),
            transmissive_color: DVec3::ZERO,
            reflective_color: DVec3::ZERO,
            index_of_refraction: 1.0,
            index_of_refraction_inv: 1.0,
            transmissive: false,
            reflective: false,
            shininess: 0.0,
        };
        mat.set_color_reflective(DVec3::splat(0.2));
        mat.set_color_transmissive(DVec3::ZERO);
        mat
    }
}

impl PhongMaterial {
    pub fn set_shininess(&mut self, exponent: f64) {
        self.shininess = exponent;
    }

    pub fn shininess(&self) -> f64 {
        self.shininess
    }

    pub fn set_index_of_refraction(&mut self, index: f64) {
        self.index_of_refraction = index;
        self.index_of_refraction_inv = 1.0 / index;
    }

    pub fn index_of_refraction(&self) -> f64 {
        self.index_of_refraction
    }

    /// Non-black transmission turns the material transmissive.
    pub fn set_color_transmissive(&mut self, color: DVec3) {
        self.transmissive_color = color;
        self.transmissive = color != DVec3::ZERO;
    }

    pub fn color_transmissive(&self) -> DVec3 {
        self.transmissive_color
    }

    /// Non-black reflection turns the material reflective.
    pub fn set_color_reflective(&mut self, color: DVec3) {
        self.reflective_color = color;
        self.reflective = color != DVec3::ZERO;
    }

    pub fn color_reflective(&self) -> DVec3 {
        self.reflective_color
    }

    pub fn set_color_ambient(&mut self, color: DVec3) {
        self.core.ambient = color;
    }

    pub fn set_color_diffuse(&mut self, color: DVec3) {
        self.core.diffuse = color;
    }

    pub fn set_color_ambient_diffuse(&mut self, color: DVec3) {
        self.core.ambient = color;
        self.core.diffuse = color;
    }

    pub fn set_color_specular(&mut self, color: DVec3) {
        self.core.specular = color;
    }

    pub fn set_color_emissive(&mut self, color: DVec3) {
        self.core.emissive = color;
    }
}

impl Material for PhongMaterial {
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

    fn calc_refract_dir(&self, normal: DVec3, in_dir: DVec3) -> Option<DVec3> {
        refract_direction(
            self.index_of_refraction,
            self.index_of_refraction_inv,
            normal,
            in_dir,
        )
    }

    fn reflection_color(&self, _vis_point: &VisiblePoint, _out: DVec3, _from: DVec3) -> DVec3 {
        self.reflective_color
    }

    fn transmission_color(&self, _vis_point: &VisiblePoint, _out: DVec3, _from: DVec3) -> DVec3 {
        self.transmissive_color
    }

    fn calc_local_lighting(
        &self,
        light: &Light,
        percent_lit: DVec3,
        attenuation: f64,
        n: DVec3,
        v: DVec3,
        l: DVec3,
        h: Option<DVec3>,
    ) -> DVec3 {
        let mut color;
        if near_zero_vec(percent_lit, 1.0e-6) {
            color = DVec3::ZERO; // light entirely hidden
        } else {
            let facing_viewer = n.dot(v) >= 0.0;
            let facing_light = n.dot(l) >= 0.0;
            let opposite_sides = facing_light != facing_viewer;
            if opposite_sides && !self.transmissive {
                color = DVec3::ZERO;
            } else {
                let facing_normal = if facing_light { n } else { -n };

                // Diffuse
                color = self.core.diffuse * light.color_diffuse() * l.dot(facing_normal);

                // Specular
                let specular_factor = if !opposite_sides {
                    match h {
                        Some(h) => h.dot(facing_normal),
                        // R.V = 2(L.N)(V.N) - V.L for the reflected light dir
                        None => 2.0 * l.dot(n) * v.dot(n) - v.dot(l),
                    }
                } else {
                    // Light seen through the surface: use the refracted
                    // light direction for the highlight
                    match self.calc_refract_dir(n, -v) {
                        Some(t) => t.dot(l),
                        None => 0.0,
                    }
                };
                if specular_factor > 0.0 {
                    let factor = if self.shininess != 0.0 {
                        specular_factor.powf(self.shininess)
                    } else {
                        specular_factor
                    };
                    color += self.core.specular * light.color_specular() * factor;
                }

                color *= percent_lit;

                if opposite_sides {
                    color *= self.transmissive_color;
                }
            }
        }

        // Ambient contribution, attenuated along with the rest
        color += self.core.ambient * light.color_ambient();
        color * attenuation
    }

    fn phong_shininess(&self) -> f64 {
        self.shininess
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_light() -> Light {
        let mut light = Light::default();
        light.set_directional(DVec3::Z);
        light
    }

    #[test]
    fn lambertian_head_on() {
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient(DVec3::ZERO);
        mat.set_color_diffuse(DVec3::new(1.0, 0.5, 0.25));
        let c = mat.calc_local_lighting(
            &white_light(),
            DVec3::ONE,
            1.0,
            DVec3::Z,
            DVec3::Z,
            DVec3::Z,
            None,
        );
        assert!((c - DVec3::new(1.0, 0.5, 0.25)).length() < 1e-12);
    }

    #[test]
    fn shadowed_point_gets_ambient_only() {
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient(DVec3::splat(0.1));
        let c = mat.calc_local_lighting(
            &white_light(),
            DVec3::ZERO,
            1.0,
            DVec3::Z,
            DVec3::Z,
            DVec3::Z,
            None,
        );
        assert!((c - DVec3::splat(0.1)).length() < 1e-12);
    }

    #[test]
    fn opaque_surface_dark_from_behind() {
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient(DVec3::ZERO);
        // Viewer in front, light behind the surface
        let c = mat.calc_local_lighting(
            &white_light(),
            DVec3::ONE,
            1.0,
            DVec3::Z,
            DVec3::Z,
            -DVec3::Z,
            None,
        );
        assert_eq!(c, DVec3::ZERO);
    }

    #[test]
    fn reflective_flag_follows_color() {
        let mut mat = PhongMaterial::default();
        assert!(mat.is_reflective());
        mat.set_color_reflective(DVec3::ZERO);
        assert!(!mat.is_reflective());
        mat.set_color_transmissive(DVec3::splat(0.5));
        assert!(mat.is_transmissive());
    }
}

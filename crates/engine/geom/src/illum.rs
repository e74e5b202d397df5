//! Direct illumination of a surface point by a single light.

use crate::light::{Light, calc_light_factors};
use crate::material::Material;
use glam::DVec3;

/// Direct illumination for a viewer at an explicit position.
pub fn direct_illuminate_view_pos(
    position: DVec3,
    normal: DVec3,
    view_pos: DVec3,
    light: &Light,
    material: &dyn Material,
    percent_lit: DVec3,
) -> DVec3 {
    let factors = calc_light_factors(light, position);
    if !factors.shining {
        return ambient_only(material, light, factors.attenuation);
    }
    let view_vector = (view_pos - position).normalize();
    material.calc_local_lighting(
        light,
        percent_lit,
        factors.attenuation,
        normal,
        view_vector,
        factors.toward_light,
        None,
    )
}

/// Direct illumination for a non-local viewer; `view_dir` is a unit vector
/// toward the viewer.
pub fn direct_illuminate_view_dir(
    position: DVec3,
    normal: DVec3,
    view_dir: DVec3,
    light: &Light,
    material: &dyn Material,
    percent_lit: DVec3,
) -> DVec3 {
    let factors = calc_light_factors(light, position);
    if !factors.shining {
        return ambient_only(material, light, factors.attenuation);
    }
    material.calc_local_lighting(
        light,
        percent_lit,
        factors.attenuation,
        normal,
        view_dir,
        factors.toward_light,
        None,
    )
}

/// Response to the ambient light alone (spotlight-hidden surfaces).
fn ambient_only(material: &dyn Material, light: &Light, attenuation: f64) -> DVec3 {
    material.core().ambient * light.color_ambient() * attenuation
}

/// A light paired with a non-local viewer direction, caching the half vector
/// so directional-light/directional-viewer shading skips the
/// normalize-per-hit work.
pub struct LightView<'a> {
    light: &'a Light,
    /// Unit direction toward the (non-local) viewer.
    view_dir: DVec3,
    h: DVec3,
}

impl<'a> LightView<'a> {
    /// `view_direction` is the camera's viewing direction (away from the
    /// viewer); the cached H uses its negation.
    pub fn new(light: &'a Light, view_direction: DVec3) -> Self {
        debug_assert!(light.is_directional());
        let toward_viewer = -view_direction;
        let h = (light.position() + toward_viewer).normalize();
        Self {
            light,
            view_dir: toward_viewer,
            h,
        }
    }

    pub fn light(&self) -> &Light {
        self.light
    }

    pub fn h(&self) -> DVec3 {
        self.h
    }

    /// Direct illumination using the cached half vector.
    pub fn illuminate(
        &self,
        position: DVec3,
        normal: DVec3,
        material: &dyn Material,
        percent_lit: DVec3,
    ) -> DVec3 {
        let factors = calc_light_factors(self.light, position);
        if !factors.shining {
            return ambient_only(material, self.light, factors.attenuation);
        }
        material.calc_local_lighting(
            self.light,
            percent_lit,
            factors.attenuation,
            normal,
            self.view_dir,
            factors.toward_light,
            Some(self.h),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    #[test]
    fn fully_lit_diffuse_plane() {
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient(DVec3::ZERO);
        mat.set_color_diffuse(DVec3::ONE);
        let mut light = Light::default();
        light.set_directional(DVec3::Z);

        let c = direct_illuminate_view_pos(
            DVec3::ZERO,
            DVec3::Z,
            DVec3::new(0.0, 0.0, 5.0),
            &light,
            &mat,
            DVec3::ONE,
        );
        assert!((c - DVec3::ONE).length() < 1e-12);
    }

    #[test]
    fn light_view_matches_direct_path_head_on() {
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient(DVec3::ZERO);
        mat.set_color_diffuse(DVec3::splat(0.5));
        mat.set_color_specular(DVec3::splat(0.25));
        mat.set_shininess(8.0);
        let mut light = Light::default();
        light.set_directional(DVec3::Z);

        // Viewer looking straight down -Z: H is exactly Z
        let lv = LightView::new(&light, -DVec3::Z);
        let via_cache = lv.illuminate(DVec3::ZERO, DVec3::Z, &mat, DVec3::ONE);
        let direct =
            direct_illuminate_view_dir(DVec3::ZERO, DVec3::Z, DVec3::Z, &light, &mat, DVec3::ONE);
        assert!((via_cache - direct).length() < 1e-9);
    }
}

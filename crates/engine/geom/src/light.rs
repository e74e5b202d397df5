//! Point and directional light sources.

use glam::DVec3;

/// A light source, either positional or directional.
///
/// For a directional light, `position` stores the unit vector *pointing at*
/// the light (the light shines along its negation). Positional lights may
/// carry quadratic distance attenuation and a spotlight cutoff.
#[derive(Debug, Clone)]
pub struct Light {
    directional: bool,
    position: DVec3,

    color_ambient: DVec3,
    color_diffuse: DVec3,
    color_specular: DVec3,

    attenuate_active: bool,
    attenuate_constant: f64,
    attenuate_linear: f64,
    attenuate_quadratic: f64,

    spot_active: bool,
    spot_direction: DVec3,
    spot_cutoff_cosine: f64,
    spot_exponent: f64,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            directional: true,
            position: DVec3::Z,
            color_ambient: DVec3::ONE,
            color_diffuse: DVec3::ONE,
            color_specular: DVec3::ONE,
            attenuate_active: false,
            attenuate_constant: 1.0,
            attenuate_linear: 0.0,
            attenuate_quadratic: 0.0,
            spot_active: false,
            spot_direction: -DVec3::Z,
            spot_cutoff_cosine: -1.0,
            spot_exponent: 0.0,
        }
    }
}

impl Light {
    /// Make the light positional at `pos`.
    pub fn set_position(&mut self, pos: DVec3) {
        self.directional = false;
        self.position = pos;
    }

    /// Make the light directional; `toward` points at the light and is
    /// normalized here.
    pub fn set_directional(&mut self, toward: DVec3) {
        self.directional = true;
        self.position = toward.normalize();
    }

    pub fn is_directional(&self) -> bool {
        self.directional
    }

    pub fn is_positional(&self) -> bool {
        !self.directional
    }

    /// Position (positional) or unit direction toward the light (directional).
    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn set_color(&mut self, color: DVec3) {
        self.color_ambient = color;
        self.color_diffuse = color;
        self.color_specular = color;
    }

    pub fn set_color_ambient(&mut self, color: DVec3) {
        self.color_ambient = color;
    }

    pub fn set_color_diffuse(&mut self, color: DVec3) {
        self.color_diffuse = color;
    }

    pub fn set_color_specular(&mut self, color: DVec3) {
        self.color_specular = color;
    }

    pub fn color_ambient(&self) -> DVec3 {
        self.color_ambient
    }

    pub fn color_diffuse(&self) -> DVec3 {
        self.color_diffuse
    }

    pub fn color_specular(&self) -> DVec3 {
        self.color_specular
    }

    /// Quadratic attenuation `1 / (k0 + k1 d + k2 d^2)`. Coefficients must
    /// be non-negative. The identity coefficients disable attenuation.
    pub fn set_attenuation(&mut self, constant: f64, linear: f64, quadratic: f64) {
        debug_assert!(constant >= 0.0 && linear >= 0.0 && quadratic >= 0.0);
        self.attenuate_constant = constant;
        self.attenuate_linear = linear;
        self.attenuate_quadratic = quadratic;
        self.attenuate_active = constant != 1.0 || linear != 0.0 || quadratic != 0.0;
    }

    pub fn attenuation_active(&self) -> bool {
        self.attenuate_active
    }

    pub fn attenuation_at(&self, dist: f64, dist_sq: f64) -> f64 {
        1.0 / (self.attenuate_constant
            + dist * self.attenuate_linear
            + dist_sq * self.attenuate_quadratic)
    }

    /// Spotlight pointing along `dir` (normalized here).
    pub fn set_spot_direction(&mut self, dir: DVec3) {
        self.spot_direction = dir.normalize();
        self.spot_active = true;
    }

    /// Cutoff as a cosine threshold in `[-1, 1]`.
    pub fn set_spot_cutoff(&mut self, cos_value: f64) {
        debug_assert!((-1.0..=1.0).contains(&cos_value));
        self.spot_cutoff_cosine = cos_value;
        self.spot_active = true;
    }

    pub fn set_spot_exponent(&mut self, exponent: f64) {
        self.spot_exponent = exponent;
        self.spot_active = true;
    }

    pub fn spot_active(&self) -> bool {
        self.spot_active
    }

    pub fn spot_direction(&self) -> DVec3 {
        self.spot_direction
    }

    pub fn spot_cutoff(&self) -> f64 {
        self.spot_cutoff_cosine
    }

    pub fn spot_exponent(&self) -> f64 {
        self.spot_exponent
    }
}

/// Result of resolving a light against a surface position.
pub struct LightFactors {
    /// Unit vector from the surface toward the light.
    pub toward_light: DVec3,
    /// Net attenuation (distance and spotlight exponent combined).
    pub attenuation: f64,
    /// False when the surface lies outside a spotlight's cutoff cone; only
    /// the ambient term applies in that case.
    pub shining: bool,
}

/// Direction to the light and net attenuation for a surface point.
pub fn calc_light_factors(light: &Light, position: DVec3) -> LightFactors {
    if light.is_directional() {
        return LightFactors {
            toward_light: light.position(),
            attenuation: 1.0,
            shining: true,
        };
    }

    let offset = light.position() - position;
    let dist_sq = offset.length_squared();
    let dist = dist_sq.sqrt();
    let toward_light = offset / dist;

    let mut attenuation = 1.0;
    if light.attenuation_active() {
        attenuation = light.attenuation_at(dist, dist_sq);
    }

    if light.spot_active() {
        let cosine = -toward_light.dot(light.spot_direction());
        if cosine < light.spot_cutoff() {
            return LightFactors {
                toward_light,
                attenuation,
                shining: false,
            };
        }
        if light.spot_exponent() != 0.0 {
            attenuation *= if light.spot_exponent() == 1.0 {
                cosine
            } else {
                cosine.powf(light.spot_exponent())
            };
        }
    }

    LightFactors {
        toward_light,
        attenuation,
        shining: true,
    }
}

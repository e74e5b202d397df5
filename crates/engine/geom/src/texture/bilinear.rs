//! Bilinear warps of texture coordinates.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::{DVec2, DVec3};

/// Warps uv coordinates bilinearly onto the quadrilateral with texture
/// corners A, B, C, D (images of the four unit-square corners).
pub struct BilinearXformTexture {
    coord_a: DVec2,
    coord_b: DVec2,
    coord_c: DVec2,
    coord_d: DVec2,
}

impl Default for BilinearXformTexture {
    fn default() -> Self {
        Self {
            coord_a: DVec2::new(0.0, 0.0),
            coord_b: DVec2::new(1.0, 0.0),
            coord_c: DVec2::new(1.0, 1.0),
            coord_d: DVec2::new(0.0, 1.0),
        }
    }
}

impl BilinearXformTexture {
    pub fn new(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> Self {
        Self {
            coord_a: a,
            coord_b: b,
            coord_c: c,
            coord_d: d,
        }
    }
}

impl Texture for BilinearXformTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, _view_dir: DVec3, _object: &dyn Viewable) {
        let u = vis_point.u();
        let v = vis_point.v();
        let warped = (self.coord_a * (1.0 - v) + self.coord_d * v) * (1.0 - u)
            + (self.coord_b * (1.0 - v) + self.coord_c * v) * u;
        vis_point.set_uv(warped.x, warped.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;
    use crate::viewable::Sphere;
    use std::sync::Arc;

    #[test]
    fn corners_map_to_corners() {
        let tex = BilinearXformTexture::new(
            DVec2::new(0.1, 0.1),
            DVec2::new(0.9, 0.2),
            DVec2::new(0.8, 0.8),
            DVec2::new(0.2, 0.7),
        );
        let dummy = Sphere::new(DVec3::ZERO, 1.0, Arc::new(PhongMaterial::default())).unwrap();
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        vp.set_uv(0.0, 0.0);
        tex.apply(&mut vp, DVec3::Z, &dummy);
        assert!((vp.uv() - DVec2::new(0.1, 0.1)).length() < 1e-12);

        vp.set_uv(1.0, 1.0);
        tex.apply(&mut vp, DVec3::Z, &dummy);
        assert!((vp.uv() - DVec2::new(0.8, 0.8)).length() < 1e-12);
    }
}

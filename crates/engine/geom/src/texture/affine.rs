//! Affine warps of texture coordinates.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;

/// Warps uv coordinates by a 2D affine transformation.
pub struct AffineXformTexture {
    m11: f64,
    m21: f64,
    m12: f64,
    m22: f64,
    m13: f64,
    m23: f64,
}

impl Default for AffineXformTexture {
    fn default() -> Self {
        Self {
            m11: 1.0,
            m21: 0.0,
            m12: 0.0,
            m22: 1.0,
            m13: 0.0,
            m23: 0.0,
        }
    }
}

impl AffineXformTexture {
    pub fn scaling(u_factor: f64, v_factor: f64) -> Self {
        Self {
            m11: u_factor,
            m22: v_factor,
            ..Self::default()
        }
    }

    /// Entries in column order, with an optional translation column.
    pub fn with_matrix(a11: f64, a21: f64, a12: f64, a22: f64, a13: f64, a23: f64) -> Self {
        Self {
            m11: a11,
            m21: a21,
            m12: a12,
            m22: a22,
            m13: a13,
            m23: a23,
        }
    }

    /// Map the default triangle texture coordinates to the given images of
    /// `(0,0)`, `(1,0)` and `(0,1)`.
    pub fn for_triangle_coords(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> Self {
        Self {
            m13: ax,
            m23: ay,
            m11: bx - ax,
            m21: by - ay,
            m12: cx - ax,
            m22: cy - ay,
        }
    }
}

impl Texture for AffineXformTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, _view_dir: DVec3, _object: &dyn Viewable) {
        let u = vis_point.u();
        let v = vis_point.v();
        vis_point.set_uv(
            self.m11 * u + self.m12 * v + self.m13,
            self.m21 * u + self.m22 * v + self.m23,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;
    use crate::viewable::Sphere;
    use glam::DVec2;
    use std::sync::Arc;

    fn dummy() -> Sphere {
        Sphere::new(DVec3::ZERO, 1.0, Arc::new(PhongMaterial::default())).unwrap()
    }

    fn warped(tex: &AffineXformTexture, u: f64, v: f64) -> DVec2 {
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        vp.set_uv(u, v);
        tex.apply(&mut vp, DVec3::Z, &dummy());
        vp.uv()
    }

    #[test]
    fn scaling_multiplies_each_coordinate() {
        let tex = AffineXformTexture::scaling(4.0, 0.5);
        assert!((warped(&tex, 0.25, 0.5) - DVec2::new(1.0, 0.25)).length() < 1e-12);
        assert!((warped(&tex, 0.0, 0.0) - DVec2::ZERO).length() < 1e-12);
    }

    #[test]
    fn matrix_with_translation_column() {
        // Rotate u into v plus a fixed offset
        let tex = AffineXformTexture::with_matrix(0.0, 1.0, -1.0, 0.0, 0.5, 0.25);
        assert!((warped(&tex, 1.0, 0.0) - DVec2::new(0.5, 1.25)).length() < 1e-12);
        assert!((warped(&tex, 0.0, 1.0) - DVec2::new(-0.5, 0.25)).length() < 1e-12);
    }

    #[test]
    fn triangle_coords_map_the_default_corners() {
        let tex = AffineXformTexture::for_triangle_coords(0.1, 0.2, 0.9, 0.3, 0.4, 0.8);
        assert!((warped(&tex, 0.0, 0.0) - DVec2::new(0.1, 0.2)).length() < 1e-12);
        assert!((warped(&tex, 1.0, 0.0) - DVec2::new(0.9, 0.3)).length() < 1e-12);
        assert!((warped(&tex, 0.0, 1.0) - DVec2::new(0.4, 0.8)).length() < 1e-12);
    }

    #[test]
    fn default_is_the_identity() {
        let tex = AffineXformTexture::default();
        assert!((warped(&tex, 0.37, 0.81) - DVec2::new(0.37, 0.81)).length() < 1e-12);
    }
}

//! Per-face texture dispatch.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;

/// Applies a different texture per face number. A `None` slot (or a face
/// number past the end) is the identity.
pub struct MultiFaceTexture {
    textures: Vec<Option<Arc<dyn Texture>>>,
}

impl MultiFaceTexture {
    pub fn new(textures: Vec<Option<Arc<dyn Texture>>>) -> Self {
        Self { textures }
    }

    pub fn set_texture(&mut self, face: usize, texture: Option<Arc<dyn Texture>>) {
        if face >= self.textures.len() {
            self.textures.resize_with(face + 1, || None);
        }
        self.textures[face] = texture;
    }
}

impl Texture for MultiFaceTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, view_dir: DVec3, object: &dyn Viewable) {
        if let Some(Some(texture)) = self.textures.get(vis_point.face_number()) {
            texture.apply(vis_point, view_dir, object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;
    use crate::texture::AffineXformTexture;
    use crate::viewable::Sphere;
    use glam::DVec2;

    fn dummy() -> Sphere {
        Sphere::new(DVec3::ZERO, 1.0, Arc::new(PhongMaterial::default())).unwrap()
    }

    fn apply_at_face(tex: &MultiFaceTexture, face: usize) -> DVec2 {
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        vp.set_uv(0.25, 0.5);
        vp.set_face_number(face);
        tex.apply(&mut vp, DVec3::Z, &dummy());
        vp.uv()
    }

    fn shift(du: f64, dv: f64) -> Arc<dyn Texture> {
        Arc::new(AffineXformTexture::with_matrix(1.0, 0.0, 0.0, 1.0, du, dv))
    }

    #[test]
    fn dispatches_by_face_number() {
        let tex = MultiFaceTexture::new(vec![Some(shift(1.0, 0.0)), Some(shift(0.0, 1.0))]);
        assert!((apply_at_face(&tex, 0) - DVec2::new(1.25, 0.5)).length() < 1e-12);
        assert!((apply_at_face(&tex, 1) - DVec2::new(0.25, 1.5)).length() < 1e-12);
    }

    #[test]
    fn empty_slot_and_out_of_range_face_are_identity() {
        let tex = MultiFaceTexture::new(vec![Some(shift(1.0, 0.0)), None]);
        assert!((apply_at_face(&tex, 1) - DVec2::new(0.25, 0.5)).length() < 1e-12);
        assert!((apply_at_face(&tex, 7) - DVec2::new(0.25, 0.5)).length() < 1e-12);
    }

    #[test]
    fn set_texture_grows_the_face_table() {
        let mut tex = MultiFaceTexture::new(Vec::new());
        tex.set_texture(3, Some(shift(0.0, 2.0)));
        assert!((apply_at_face(&tex, 0) - DVec2::new(0.25, 0.5)).length() < 1e-12);
        assert!((apply_at_face(&tex, 3) - DVec2::new(0.25, 2.5)).length() < 1e-12);
    }
}

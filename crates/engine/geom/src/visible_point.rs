//! The record handed from an intersector to the shader.

use crate::material::Material;
use glam::{DVec2, DVec3};
use std::sync::Arc;

/// Material reference held by a [`VisiblePoint`].
///
/// By default the point shares the primitive's material. A texture that needs
/// to change material properties for a single hit first calls
/// [`VisiblePoint::make_material_mutable`], which clones the shared material
/// into an owned one. Callers always read through
/// [`VisiblePoint::material`], so the distinction stays invisible.
pub enum MaterialSlot {
    Shared(Arc<dyn Material>),
    Owned(Box<dyn Material>),
}

impl MaterialSlot {
    #[inline]
    pub fn get(&self) -> &dyn Material {
        match self {
            MaterialSlot::Shared(m) => m.as_ref(),
            MaterialSlot::Owned(m) => m.as_ref(),
        }
    }
}

impl Clone for MaterialSlot {
    fn clone(&self) -> Self {
        match self {
            MaterialSlot::Shared(m) => MaterialSlot::Shared(m.clone()),
            MaterialSlot::Owned(m) => MaterialSlot::Owned(m.clone_box()),
        }
    }
}

/// Everything the shader needs to know about a surface hit.
#[derive(Clone)]
pub struct VisiblePoint {
    position: DVec3,
    normal: DVec3,
    uv: DVec2,
    /// Sub-surface index for multi-face primitives. 0 is the main face.
    face_number: usize,
    /// Index of the hit primitive in the scene's viewable list.
    object_id: usize,
    front_face: bool,
    material: MaterialSlot,
}

impl VisiblePoint {
    pub fn new(default_material: Arc<dyn Material>) -> Self {
        Self {
            position: DVec3::ZERO,
            normal: DVec3::Z,
            uv: DVec2::ZERO,
            face_number: 0,
            object_id: usize::MAX,
            front_face: true,
            material: MaterialSlot::Shared(default_material),
        }
    }

    #[inline]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[inline]
    pub fn set_position(&mut self, pos: DVec3) {
        self.position = pos;
    }

    /// Outward unit normal at the hit.
    #[inline]
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    #[inline]
    pub fn set_normal(&mut self, normal: DVec3) {
        self.normal = normal;
    }

    #[inline]
    pub fn uv(&self) -> DVec2 {
        self.uv
    }

    #[inline]
    pub fn u(&self) -> f64 {
        self.uv.x
    }

    #[inline]
    pub fn v(&self) -> f64 {
        self.uv.y
    }

    #[inline]
    pub fn set_uv(&mut self, u: f64, v: f64) {
        self.uv = DVec2::new(u, v);
    }

    #[inline]
    pub fn face_number(&self) -> usize {
        self.face_number
    }

    #[inline]
    pub fn set_face_number(&mut self, face: usize) {
        self.face_number = face;
    }

    #[inline]
    pub fn object_id(&self) -> usize {
        self.object_id
    }

    #[inline]
    pub fn set_object_id(&mut self, id: usize) {
        self.object_id = id;
    }

    #[inline]
    pub fn is_front_facing(&self) -> bool {
        self.front_face
    }

    #[inline]
    pub fn is_back_facing(&self) -> bool {
        !self.front_face
    }

    #[inline]
    pub fn set_front_face(&mut self) {
        self.front_face = true;
    }

    #[inline]
    pub fn set_back_face(&mut self) {
        self.front_face = false;
    }

    #[inline]
    pub fn material(&self) -> &dyn Material {
        self.material.get()
    }

    /// Replace the material with a shared reference (drops any owned clone).
    #[inline]
    pub fn set_material(&mut self, material: Arc<dyn Material>) {
        self.material = MaterialSlot::Shared(material);
    }

    /// Clone the shared material into an owned one so a texture may mutate
    /// it for this hit alone. Idempotent.
    pub fn make_material_mutable(&mut self) -> &mut dyn Material {
        if let MaterialSlot::Shared(shared) = &self.material {
            self.material = MaterialSlot::Owned(shared.clone_box());
        }
        match &mut self.material {
            MaterialSlot::Owned(m) => m.as_mut(),
            MaterialSlot::Shared(_) => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PhongMaterial;

    fn test_point() -> VisiblePoint {
        VisiblePoint::new(Arc::new(PhongMaterial::default()))
    }

    #[test]
    fn material_mutation_does_not_touch_shared() {
        let shared: Arc<dyn Material> = Arc::new(PhongMaterial::default());
        let mut vp = test_point();
        vp.set_material(shared.clone());

        let owned = vp.make_material_mutable();
        owned.core_mut().diffuse = DVec3::new(1.0, 0.0, 0.0);

        assert_eq!(vp.material().core().diffuse, DVec3::new(1.0, 0.0, 0.0));
        assert_ne!(shared.core().diffuse, DVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn make_mutable_is_idempotent() {
        let mut vp = test_point();
        vp.make_material_mutable().core_mut().ambient = DVec3::ONE;
        vp.make_material_mutable();
        assert_eq!(vp.material().core().ambient, DVec3::ONE);
    }

    #[test]
    fn front_back_flag_roundtrip() {
        let mut vp = test_point();
        assert!(vp.is_front_facing());
        vp.set_back_face();
        assert!(vp.is_back_facing());
        vp.set_front_face();
        assert!(vp.is_front_facing());
    }
}

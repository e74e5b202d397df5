//! Sequential texture composition.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;

/// Applies a series of textures in order (e.g. a coordinate warp followed
/// by an image map). `None` slots are the identity.
pub struct SequenceTexture {
    textures: Vec<Option<Arc<dyn Texture>>>,
}

impl SequenceTexture {
    pub fn new(textures: Vec<Option<Arc<dyn Texture>>>) -> Self {
        Self { textures }
    }
}

impl Texture for SequenceTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, view_dir: DVec3, object: &dyn Viewable) {
        for texture in self.textures.iter().flatten() {
            texture.apply(vis_point, view_dir, object);
        }
    }
}

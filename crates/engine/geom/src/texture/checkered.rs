//! Checkerboard material texture.

use super::Texture;
use crate::material::Material;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;

/// Checkerboard over the uv plane. One or two materials replace the hit
/// material on alternating subsquares; a `None` slot leaves the original
/// material in place there. The pattern tiles the whole uv plane.
pub struct CheckerTexture {
    u_width: f64,
    v_width: f64,
    material1: Option<Arc<dyn Material>>,
    material2: Option<Arc<dyn Material>>,
}

impl CheckerTexture {
    pub fn new(material1: Option<Arc<dyn Material>>, material2: Option<Arc<dyn Material>>) -> Self {
        Self {
            u_width: 0.5,
            v_width: 0.5,
            material1,
            material2,
        }
    }

    pub fn set_widths(&mut self, u_width: f64, v_width: f64) {
        self.u_width = u_width;
        self.v_width = v_width;
    }

    fn in_odd_square(&self, mut u: f64, mut v: f64) -> bool {
        let mut odd = false;
        if u < 0.0 {
            odd = true;
            u = -u;
        }
        odd ^= ((u / self.u_width) as i64) & 1 == 1;
        if v < 0.0 {
            odd = !odd;
            v = -v;
        }
        odd ^= ((v / self.v_width) as i64) & 1 == 1;
        odd
    }
}

impl Texture for CheckerTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, _view_dir: DVec3, _object: &dyn Viewable) {
        let slot = if self.in_odd_square(vis_point.u(), vis_point.v()) {
            &self.material1
        } else {
            &self.material2
        };
        if let Some(material) = slot {
            vis_point.set_material(material.clone());
        }
    }
}

//! Image-backed color textures.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;
use image::RgbImage;
use std::path::Path;

/// How uv coordinates outside `[0,1]` are handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageWrapMode {
    Wrap,
    Clamp,
    /// Out-of-range lookups return this color instead of sampling.
    Background(DVec3),
}

/// Paints the color sampled from an RGB image into the ambient and diffuse
/// material channels. Bilinear interpolation by default.
pub struct ImageTexture {
    image: RgbImage,
    bilinear: bool,
    wrap_mode: ImageWrapMode,
}

impl ImageTexture {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            bilinear: true,
            wrap_mode: ImageWrapMode::Wrap,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, image::ImageError> {
        let image = image::open(path)?.to_rgb8();
        Ok(Self::new(image))
    }

    pub fn set_bilinear(&mut self, bilinear: bool) {
        self.bilinear = bilinear;
    }

    pub fn set_wrap_mode(&mut self, mode: ImageWrapMode) {
        self.wrap_mode = mode;
    }

    fn texel(&self, x: u32, y: u32) -> DVec3 {
        // v = 0 is the bottom row
        let px = self.image.get_pixel(x, self.image.height() - 1 - y);
        DVec3::new(
            px.0[0] as f64 / 255.0,
            px.0[1] as f64 / 255.0,
            px.0[2] as f64 / 255.0,
        )
    }

    pub fn sample(&self, u: f64, v: f64) -> DVec3 {
        let (mut u, mut v) = (u, v);
        match self.wrap_mode {
            ImageWrapMode::Wrap => {
                u -= u.floor();
                v -= v.floor();
            }
            ImageWrapMode::Clamp => {
                u = u.clamp(0.0, 1.0);
                v = v.clamp(0.0, 1.0);
            }
            ImageWrapMode::Background(color) => {
                if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
                    return color;
                }
            }
        }
        let width = self.image.width();
        let height = self.image.height();
        let fx = u * (width - 1) as f64;
        let fy = v * (height - 1) as f64;
        if !self.bilinear {
            return self.texel(fx.round() as u32, fy.round() as u32);
        }
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let ax = fx - x0 as f64;
        let ay = fy - y0 as f64;
        let bottom = self.texel(x0, y0) * (1.0 - ax) + self.texel(x1, y0) * ax;
        let top = self.texel(x0, y1) * (1.0 - ax) + self.texel(x1, y1) * ax;
        bottom * (1.0 - ay) + top * ay
    }
}

impl Texture for ImageTexture {
    fn apply(&self, vis_point: &mut VisiblePoint, _view_dir: DVec3, _object: &dyn Viewable) {
        let color = self.sample(vis_point.u(), vis_point.v());
        let material = vis_point.make_material_mutable();
        material.core_mut().ambient = color;
        material.core_mut().diffuse = color;
    }
}

//! The render target: an f64 RGB pixel rectangle.

use glam::DVec3;
use image::{Rgb, RgbImage};

/// Row-major RGB buffer. `(i, j)` addressing matches the camera: `i` left
/// to right, `j` bottom to top. Values are stored unclamped; clamping to
/// `[0, 1]` happens on export.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<DVec3>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![DVec3::ZERO; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, i: u32, j: u32) -> usize {
        debug_assert!(i < self.width && j < self.height);
        (j as usize) * (self.width as usize) + (i as usize)
    }

    #[inline]
    pub fn set_pixel(&mut self, i: u32, j: u32, color: DVec3) {
        let index = self.index(i, j);
        self.pixels[index] = color;
    }

    #[inline]
    pub fn pixel(&self, i: u32, j: u32) -> DVec3 {
        self.pixels[self.index(i, j)]
    }

    /// Rows from bottom to top, for scan-line-parallel rendering.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, DVec3> {
        self.pixels.chunks_mut(self.width as usize)
    }

    /// The raw row-major pixel storage (row 0 at the bottom).
    pub fn raw_mut(&mut self) -> &mut [DVec3] {
        &mut self.pixels
    }

    /// Clamp to `[0, 1]` and convert; image row 0 is the top scan line.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut image = RgbImage::new(self.width, self.height);
        for j in 0..self.height {
            for i in 0..self.width {
                let c = self.pixel(i, j).clamp(DVec3::ZERO, DVec3::ONE);
                let to_byte = |v: f64| (v * 255.0).round() as u8;
                image.put_pixel(
                    i,
                    self.height - 1 - j,
                    Rgb([to_byte(c.x), to_byte(c.y), to_byte(c.z)]),
                );
            }
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut buffer = PixelBuffer::new(4, 3);
        buffer.set_pixel(2, 1, DVec3::new(0.5, 0.25, 1.0));
        assert_eq!(buffer.pixel(2, 1), DVec3::new(0.5, 0.25, 1.0));
        assert_eq!(buffer.pixel(0, 0), DVec3::ZERO);
    }

    #[test]
    fn export_clamps_and_flips() {
        let mut buffer = PixelBuffer::new(2, 2);
        buffer.set_pixel(0, 0, DVec3::new(2.0, -1.0, 0.5));
        let image = buffer.to_rgb_image();
        // (0, 0) is the bottom-left: lands on image row 1
        assert_eq!(image.get_pixel(0, 1).0, [255, 0, 128]);
    }

    #[test]
    fn rows_iterate_bottom_up() {
        let mut buffer = PixelBuffer::new(2, 2);
        buffer.set_pixel(0, 1, DVec3::ONE);
        let rows: Vec<_> = buffer.rows_mut().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], DVec3::ONE);
    }
}

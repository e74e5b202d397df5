//! The camera: a viewer plus the screen geometry for per-pixel rays.

use glam::DVec3;

/// Perspective (or orthographic-capable) camera.
///
/// Pixel `(i, j)` has `i` running left to right and `j` bottom to top;
/// `pixel_direction` produces the unit primary-ray direction through the
/// pixel center. A non-local viewer treats all view rays as parallel to the
/// camera direction (orthographic shading conventions).
#[derive(Debug, Clone)]
pub struct CameraView {
    position: DVec3,
    direction: DVec3,
    local_viewer: bool,

    width_pixels: u32,
    height_pixels: u32,
    screen_width: f64,
    screen_height: f64,
    screen_distance: f64,
    screen_center: DVec3,
    /// Displacement from one pixel to its right neighbor.
    pixel_du: DVec3,
    /// Displacement from one pixel to the pixel above it.
    pixel_dv: DVec3,
}

impl Default for CameraView {
    fn default() -> Self {
        let mut camera = Self {
            position: DVec3::ZERO,
            direction: -DVec3::Z,
            local_viewer: true,
            width_pixels: 2,
            height_pixels: 2,
            screen_width: 1.0,
            screen_height: 1.0,
            screen_distance: 10.0,
            screen_center: DVec3::ZERO,
            pixel_du: DVec3::X,
            pixel_dv: DVec3::Y,
        };
        camera.calc_screen_center();
        camera.pixel_dir_precalc();
        camera
    }
}

impl CameraView {
    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn is_local_viewer(&self) -> bool {
        self.local_viewer
    }

    pub fn set_local_viewer(&mut self, local: bool) {
        self.local_viewer = local;
    }

    pub fn screen_width(&self) -> f64 {
        self.screen_width
    }

    pub fn screen_height(&self) -> f64 {
        self.screen_height
    }

    pub fn screen_distance(&self) -> f64 {
        self.screen_distance
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.screen_width / self.screen_height
    }

    pub fn width_pixels(&self) -> u32 {
        self.width_pixels
    }

    pub fn height_pixels(&self) -> u32 {
        self.height_pixels
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.calc_screen_center();
    }

    pub fn set_direction(&mut self, direction: DVec3) {
        self.direction = direction.normalize();
        self.calc_screen_center();
        self.pixel_dir_precalc();
    }

    pub fn set_screen_distance(&mut self, distance: f64) {
        self.screen_distance = distance;
        self.calc_screen_center();
    }

    pub fn set_screen_dimensions(&mut self, width: f64, height: f64) {
        self.screen_width = width;
        self.screen_height = height;
        self.recalc_pixel_du_dv();
    }

    pub fn set_screen_pixel_size(&mut self, width: u32, height: u32) {
        self.width_pixels = width.max(1);
        self.height_pixels = height.max(1);
        self.recalc_pixel_du_dv();
    }

    /// Position the camera from eye point, look-at point, and up direction.
    pub fn set_look_at(&mut self, eye: DVec3, look_at: DVec3, up: DVec3) {
        self.local_viewer = true;
        self.position = eye;
        self.screen_center = look_at;
        let view = look_at - eye;
        self.screen_distance = view.length();
        debug_assert!(self.screen_distance != 0.0);
        self.direction = view / self.screen_distance;
        self.pixel_dv = up - self.direction * up.dot(self.direction);
        self.pixel_du = self.direction.cross(up);
        self.recalc_pixel_du_dv();
    }

    /// Screen dimensions from an aspect ratio and a vertical field of view
    /// (radians). Call after the screen distance is established.
    pub fn set_view_frustum(&mut self, aspect_ratio: f64, fovy: f64) {
        self.screen_height = 2.0 * self.screen_distance * (fovy * 0.5).tan();
        self.screen_width = aspect_ratio * self.screen_height;
        self.recalc_pixel_du_dv();
    }

    /// Unit direction from the camera through the center of pixel `(i, j)`.
    pub fn pixel_direction(&self, i: f64, j: f64) -> DVec3 {
        debug_assert!(self.local_viewer);
        (self.pixel_position(i, j) - self.position).normalize()
    }

    /// World position of the center of pixel `(i, j)` on the screen.
    pub fn pixel_position(&self, i: f64, j: f64) -> DVec3 {
        let i_offset = i - (self.width_pixels as f64 - 1.0) / 2.0;
        let j_offset = j - (self.height_pixels as f64 - 1.0) / 2.0;
        self.screen_center + self.pixel_du * i_offset + self.pixel_dv * j_offset
    }

    /// Eye position for an orthographic view of pixel `(i, j)`.
    pub fn view_position(&self, i: f64, j: f64) -> DVec3 {
        let i_offset = i - (self.width_pixels as f64 - 1.0) / 2.0;
        let j_offset = j - (self.height_pixels as f64 - 1.0) / 2.0;
        self.position + self.pixel_du * i_offset + self.pixel_dv * j_offset
    }

    fn calc_screen_center(&mut self) {
        self.screen_center = self.position + self.direction * self.screen_distance;
    }

    /// Seed the screen axes from the view direction alone.
    fn pixel_dir_precalc(&mut self) {
        let mut u = DVec3::new(-self.direction.z, 0.0, self.direction.x);
        if u == DVec3::ZERO {
            u = DVec3::Y;
        }
        let v = u.cross(self.direction);
        self.pixel_du = u;
        self.pixel_dv = v;
        self.recalc_pixel_du_dv();
    }

    /// Rescale the pixel step vectors after a screen or resolution change.
    fn recalc_pixel_du_dv(&mut self) {
        self.pixel_du = self.pixel_du.normalize();
        if self.width_pixels > 1 {
            self.pixel_du *= self.screen_width / (self.width_pixels - 1) as f64;
        }
        self.pixel_dv = self.pixel_dv.normalize();
        if self.height_pixels > 1 {
            self.pixel_dv *= self.screen_height / (self.height_pixels - 1) as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_camera() -> CameraView {
        let mut camera = CameraView::default();
        camera.set_position(DVec3::new(0.0, 0.0, 5.0));
        camera.set_direction(-DVec3::Z);
        camera.set_screen_distance(5.0);
        camera.set_screen_dimensions(2.0, 2.0);
        camera.set_screen_pixel_size(3, 3);
        camera
    }

    #[test]
    fn center_pixel_looks_along_view_direction() {
        let camera = simple_camera();
        let dir = camera.pixel_direction(1.0, 1.0);
        assert!((dir + DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn corner_pixels_diverge_symmetrically() {
        let camera = simple_camera();
        let lower_left = camera.pixel_direction(0.0, 0.0);
        let upper_right = camera.pixel_direction(2.0, 2.0);
        assert!((lower_left.x + upper_right.x).abs() < 1e-12);
        assert!((lower_left.y + upper_right.y).abs() < 1e-12);
        assert!((lower_left.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn look_at_fixes_screen_distance() {
        let mut camera = CameraView::default();
        camera.set_look_at(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y);
        assert!((camera.screen_distance() - 5.0).abs() < 1e-12);
        assert!((camera.direction() + DVec3::Z).length() < 1e-12);
        // Up stays up
        assert!(camera.pixel_dv.dot(DVec3::Y) > 0.0);
    }

    #[test]
    fn frustum_sets_dimensions_from_fov() {
        let mut camera = CameraView::default();
        camera.set_look_at(DVec3::new(0.0, 0.0, 4.0), DVec3::ZERO, DVec3::Y);
        camera.set_view_frustum(1.0, std::f64::consts::FRAC_PI_2);
        // Height = 2 * d * tan(45 deg) = 2 * 4
        assert!((camera.screen_height() - 8.0).abs() < 1e-12);
        assert!((camera.screen_width() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn j_increases_upward() {
        let camera = simple_camera();
        let low = camera.pixel_position(1.0, 0.0);
        let high = camera.pixel_position(1.0, 2.0);
        assert!(high.y > low.y);
    }
}

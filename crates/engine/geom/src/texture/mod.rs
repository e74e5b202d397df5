//! Texture maps applied to a `VisiblePoint` after intersection.

mod affine;
mod bilinear;
mod bump;
mod checkered;
mod multifaces;
mod rgb_image;
mod sequence;

pub use affine::AffineXformTexture;
pub use bilinear::BilinearXformTexture;
pub use bump::{BumpBorderMode, BumpMap};
pub use checkered::CheckerTexture;
pub use multifaces::MultiFaceTexture;
pub use rgb_image::{ImageTexture, ImageWrapMode};
pub use sequence::SequenceTexture;

use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::DVec3;

/// A texture modifies a visible point in place: its material, its uv
/// coordinates, or its normal. `object` is the primitive that produced the
/// hit, for partial-derivative queries.
pub trait Texture: Send + Sync {
    fn apply(&self, vis_point: &mut VisiblePoint, view_dir: DVec3, object: &dyn Viewable);
}

/// Map a unit reflection direction onto cross-layout cube map coordinates.
///
/// The cube cross occupies `[0,1] x [0,1]` as a 4-wide, 3-tall grid of
/// faces; the returned uv addresses the face the direction exits through.
pub fn reflect_dir_to_cube_map(reflect_dir: glam::DVec3) -> glam::DVec2 {
    let d = reflect_dir;
    let abs = d.abs();
    // Face-local coordinates in [-1, 1], then placed into the cross
    let (cell_x, cell_y, s, t) = if abs.x >= abs.y && abs.x >= abs.z {
        if d.x > 0.0 {
            (2, 1, -d.z / abs.x, d.y / abs.x) // +x: right of front
        } else {
            (0, 1, d.z / abs.x, d.y / abs.x) // -x: left of front
        }
    } else if abs.y >= abs.z {
        if d.y > 0.0 {
            (1, 2, d.x / abs.y, -d.z / abs.y) // +y: above front
        } else {
            (1, 0, d.x / abs.y, d.z / abs.y) // -y: below front
        }
    } else if d.z > 0.0 {
        (3, 1, -d.x / abs.z, d.y / abs.z) // +z: far column
    } else {
        (1, 1, d.x / abs.z, d.y / abs.z) // -z: front face
    };
    glam::DVec2::new(
        (cell_x as f64 + 0.5 * (s + 1.0)) / 4.0,
        (cell_y as f64 + 0.5 * (t + 1.0)) / 3.0,
    )
}

#[cfg(test)]
mod tests {
    use super::reflect_dir_to_cube_map;
    use glam::DVec3;

    #[test]
    fn face_centers_land_in_distinct_cells() {
        let dirs = [
            DVec3::X,
            -DVec3::X,
            DVec3::Y,
            -DVec3::Y,
            DVec3::Z,
            -DVec3::Z,
        ];
        let mut cells = Vec::new();
        for dir in dirs {
            let uv = reflect_dir_to_cube_map(dir);
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
            let cell = ((uv.x * 4.0) as u32, (uv.y * 3.0) as u32);
            assert!(!cells.contains(&cell), "duplicate cell {cell:?}");
            cells.push(cell);
        }
    }

    #[test]
    fn off_axis_direction_stays_inside_its_face() {
        let uv = reflect_dir_to_cube_map(DVec3::new(0.9, 0.3, 0.2).normalize());
        // +x face occupies the third column, middle row
        assert!(uv.x > 0.5 && uv.x < 0.75);
        assert!(uv.y > 1.0 / 3.0 && uv.y < 2.0 / 3.0);
    }
}

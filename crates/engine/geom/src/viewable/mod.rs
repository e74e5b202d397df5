//! Viewable surface primitives.

mod bezier;
mod cone;
mod cylinder;
mod ellipsoid;
mod parallelepiped;
mod parallelogram;
mod sphere;
mod torus;
mod triangle;

pub use bezier::{BezierPatch, BezierSet};
pub use cone::{CONE_BASE_FACE, CONE_SIDE_FACE, Cone};
pub use cylinder::{CYLINDER_BASE_FACE, CYLINDER_SIDE_FACE, CYLINDER_TOP_FACE, Cylinder};
pub use ellipsoid::Ellipsoid;
pub use parallelepiped::{
    PPD_BACK_FACE, PPD_BOTTOM_FACE, PPD_FRONT_FACE, PPD_LEFT_FACE, PPD_RIGHT_FACE, PPD_TOP_FACE,
    Parallelepiped,
};
pub use parallelogram::Parallelogram;
pub use sphere::Sphere;
pub use torus::Torus;
pub use triangle::Triangle;

use crate::visible_point::VisiblePoint;
use glam::DVec3;
use vmath::Aabb;

/// A surface that can be hit by a ray.
///
/// `find_intersection` performs the full intersection: on a hit it returns
/// the distance along the ray (in `(0, max_dist]`) and fills `vis_point`
/// with position, outward unit normal, uv, face number, orientation, and the
/// material for the hit side. Textures are applied by the caller afterwards.
pub trait Viewable: Send + Sync {
    fn find_intersection(
        &self,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64>;

    /// Extent of the surface along the unit direction `u`: returns
    /// `(min, max)` of `u . x` over points `x` on the surface.
    fn calc_bounding_planes(&self, u: DVec3) -> (f64, f64);

    /// Axis-aligned bounding box, by default from the three axis extents.
    fn calc_aabb(&self) -> Aabb {
        let (x0, x1) = self.calc_bounding_planes(DVec3::X);
        let (y0, y1) = self.calc_bounding_planes(DVec3::Y);
        let (z0, z1) = self.calc_bounding_planes(DVec3::Z);
        Aabb::new(DVec3::new(x0, y0, z0), DVec3::new(x1, y1, z1))
    }

    /// Bounding box of the surface clipped to `bounds`; `None` when empty.
    ///
    /// The default intersects the surface's own AABB with the clip box.
    /// Planar primitives and spheres override this with exact extents.
    fn calc_extents_in_box(&self, bounds: &Aabb) -> Option<Aabb> {
        let isect = self.calc_aabb().intersection(bounds);
        if isect.is_empty() { None } else { Some(isect) }
    }

    /// First partial derivatives of the surface parameterization at a hit.
    ///
    /// Returns `None` at parameterization singularities; bump mapping then
    /// leaves the normal unmodified.
    fn calc_partials(&self, vis_point: &VisiblePoint) -> Option<(DVec3, DVec3)>;
}

// Geometry crate - visible points, materials, lights, textures, and the
// viewable surface primitives of the ray tracer

pub mod error;
pub mod illum;
pub mod light;
pub mod material;
pub mod texture;
pub mod viewable;
pub mod visible_point;

mod extents;

pub use error::GeomError;
pub use illum::{LightView, direct_illuminate_view_dir, direct_illuminate_view_pos};
pub use light::Light;
pub use material::{CookTorranceMaterial, Material, MaterialCore, PhongMaterial};
pub use texture::Texture;
pub use viewable::{
    BezierSet, Cone, Cylinder, Ellipsoid, Parallelepiped, Parallelogram, Sphere, Torus, Triangle,
    Viewable,
};
pub use visible_point::{MaterialSlot, VisiblePoint};

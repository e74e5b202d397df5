// Vector math crate - f64 geometry primitives shared by the render engine

pub mod aabb;
pub mod polygon;
pub mod ppd;
pub mod roots;
pub mod util;

pub use aabb::Aabb;
pub use polygon::{
    clip_convex_polygon_against_box, clip_convex_polygon_against_plane,
    clip_convex_polygon_against_slab,
};
pub use ppd::Parallelepiped;
pub use roots::{
    solve_cubic, solve_quadratic, solve_quadratic_homogeneous, solve_quadratic_safe, solve_quartic,
};
pub use util::{get_ortho_complements, set_from_hg};

// Re-export glam for convenience
pub use glam;
pub use glam::{DVec2, DVec3, DVec4};

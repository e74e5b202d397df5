use thiserror::Error;

/// Construction-time geometry failures.
///
/// Intersection itself never fails; degenerate shapes are rejected here so
/// the intersectors can assume well-formed parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    #[error("sphere radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("degenerate triangle (area below tolerance)")]
    DegenerateTriangle,

    #[error("degenerate parallelogram (area below tolerance)")]
    DegenerateParallelogram,

    #[error("cylinder height must be positive, got {0}")]
    NonPositiveHeight(f64),

    #[error("cone slope must be positive, got {0}")]
    NonPositiveSlope(f64),

    #[error("torus radii must satisfy 0 < minor, 0 < major, got major {major} minor {minor}")]
    BadTorusRadii { major: f64, minor: f64 },

    #[error("axis must be nonzero")]
    ZeroAxis,

    #[error("radial axis parallel to the center axis")]
    ParallelRadialAxis,

    #[error("parallelepiped edges are coplanar")]
    CoplanarEdges,

    #[error("Bezier patch order {0}x{1} not supported (only 3 or 4)")]
    BadPatchOrder(usize, usize),
}

//! Small numeric helpers shared across the engine crates.

use glam::{DVec3, DVec4};

/// Project a homogeneous point to cartesian coordinates (`xyz / w`).
#[inline]
pub fn set_from_hg(hg: DVec4) -> DVec3 {
    hg.truncate() / hg.w
}

/// Two unit vectors completing `w` to an orthonormal right-handed frame.
///
/// `w` must be a unit vector. The returned pair `(u, v)` satisfies
/// `u x v = w` up to sign conventions used by the radial-axis setters.
pub fn get_ortho_complements(w: DVec3) -> (DVec3, DVec3) {
    // Pick the seed axis least aligned with w
    let seed = if w.x.abs() <= w.y.abs() && w.x.abs() <= w.z.abs() {
        DVec3::X
    } else if w.y.abs() <= w.z.abs() {
        DVec3::Y
    } else {
        DVec3::Z
    };
    let u = (seed - w * seed.dot(w)).normalize();
    let v = w.cross(u);
    (u, v)
}

#[inline]
pub fn near_zero(x: f64, tolerance: f64) -> bool {
    x.abs() <= tolerance
}

#[inline]
pub fn near_zero_vec(v: DVec3, tolerance: f64) -> bool {
    v.x.abs() <= tolerance && v.y.abs() <= tolerance && v.z.abs() <= tolerance
}

/// True when `x` and `y` are both strictly positive or both strictly negative.
#[inline]
pub fn same_sign_nonzero(x: f64, y: f64) -> bool {
    if x < 0.0 {
        y < 0.0
    } else if x > 0.0 {
        y > 0.0
    } else {
        false
    }
}

#[inline]
pub fn square(x: f64) -> f64 {
    x * x
}

/// `sqrt(max(x, 0))` - guards tiny negative values produced by roundoff.
#[inline]
pub fn safe_sqrt(x: f64) -> f64 {
    if x <= 0.0 { 0.0 } else { x.sqrt() }
}

/// Update `min`/`max` in place; returns 1/-1/0 for above/below/inside.
#[inline]
pub fn update_min_max(x: f64, min: &mut f64, max: &mut f64) -> i32 {
    if x > *max {
        *max = x;
        1
    } else if x < *min {
        *min = x;
        -1
    } else {
        0
    }
}

/// Interpolate `a -> b`; exact at both endpoints even under roundoff.
#[inline]
pub fn lerp_delta(a: DVec3, b: DVec3, alpha: f64) -> DVec3 {
    if alpha <= 0.5 {
        a + (b - a) * alpha
    } else {
        b + (a - b) * (1.0 - alpha)
    }
}

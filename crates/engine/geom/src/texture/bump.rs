//! Bump mapping from a height function or explicit height derivatives.

use super::Texture;
use crate::viewable::Viewable;
use crate::visible_point::VisiblePoint;
use glam::{DVec2, DVec3};

/// Behavior of height lookups outside the `[0,1]` uv square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpBorderMode {
    /// Out-of-range hits are left untouched.
    Clamp,
    /// Coordinates wrap modulo 1.
    Wrap,
    /// The height function is evaluated as-is outside the square.
    Extend,
}

type HeightFn = dyn Fn(f64, f64) -> f64 + Send + Sync;
type DerivFn = dyn Fn(f64, f64) -> DVec2 + Send + Sync;

/// Perturbs the hit normal from a scalar height field over uv.
///
/// The derivative may be given explicitly; otherwise it is estimated by
/// central differences of the height function. Requires the primitive's
/// surface partials; at a parameterization singularity the normal is left
/// unmodified.
pub struct BumpMap {
    height_fn: Option<Box<HeightFn>>,
    deriv_fn: Option<Box<DerivFn>>,
    border_mode: BumpBorderMode,
    epsilon: f64,
}

impl BumpMap {
    pub fn from_height(height: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            height_fn: Some(Box::new(height)),
            deriv_fn: None,
            border_mode: BumpBorderMode::Extend,
            epsilon: 1.0e-6,
        }
    }

    pub fn from_derivative(deriv: impl Fn(f64, f64) -> DVec2 + Send + Sync + 'static) -> Self {
        Self {
            height_fn: None,
            deriv_fn: Some(Box::new(deriv)),
            border_mode: BumpBorderMode::Extend,
            epsilon: 1.0e-6,
        }
    }

    pub fn set_border_mode(&mut self, mode: BumpBorderMode) {
        self.border_mode = mode;
    }

    fn wrap_low(&self, m: &mut f64) {
        if *m < 0.0 {
            match self.border_mode {
                BumpBorderMode::Clamp => *m = 0.0,
                BumpBorderMode::Wrap => *m += 1.0,
                BumpBorderMode::Extend => {}
            }
        }
    }

    fn wrap_high(&self, m: &mut f64) {
        if *m > 1.0 {
            match self.border_mode {
                BumpBorderMode::Clamp => *m = 1.0,
                BumpBorderMode::Wrap => *m -= 1.0,
                BumpBorderMode::Extend => {}
            }
        }
    }

    /// Height derivative at `(u, v)`, or `None` when the border mode clips
    /// the lookup away entirely.
    fn height_derivative(&self, mut u: f64, mut v: f64) -> Option<DVec2> {
        if let Some(deriv) = &self.deriv_fn {
            return Some(deriv(u, v));
        }
        let height = self.height_fn.as_ref()?;
        for coord in [&mut u, &mut v] {
            if *coord < 0.0 || *coord > 1.0 {
                match self.border_mode {
                    BumpBorderMode::Clamp => return None,
                    BumpBorderMode::Wrap => *coord -= coord.floor(),
                    BumpBorderMode::Extend => {}
                }
            }
        }
        let mut u_minus = u - self.epsilon;
        let mut u_plus = u + self.epsilon;
        let mut v_minus = v - self.epsilon;
        let mut v_plus = v + self.epsilon;
        if self.border_mode != BumpBorderMode::Extend {
            self.wrap_low(&mut u_minus);
            self.wrap_high(&mut u_plus);
            self.wrap_low(&mut v_minus);
            self.wrap_high(&mut v_plus);
        }
        Some(DVec2::new(
            (height(u_plus, v) - height(u_minus, v)) / (u_plus - u_minus),
            (height(u, v_plus) - height(u, v_minus)) / (v_plus - v_minus),
        ))
    }
}

impl Texture for BumpMap {
    fn apply(&self, vis_point: &mut VisiblePoint, view_dir: DVec3, object: &dyn Viewable) {
        let Some(deriv) = self.height_derivative(vis_point.u(), vis_point.v()) else {
            return;
        };
        let Some((partial_u, partial_v)) = object.calc_partials(vis_point) else {
            return; // singular parameterization: leave the normal alone
        };

        let old_normal = vis_point.normal();
        let bent_u = partial_u + old_normal * deriv.x;
        let bent_v = partial_v + old_normal * deriv.y;
        let mut new_normal = bent_u.cross(bent_v);

        // Keep the perturbed normal on the same side relative to the viewer
        let new_dot = new_normal.dot(view_dir);
        let old_dot = old_normal.dot(view_dir);
        if new_dot * old_dot < 0.0 {
            new_normal -= view_dir * new_dot;
        }
        let norm = new_normal.length();
        if norm != 0.0 {
            vis_point.set_normal(new_normal / norm);
        }
    }
}

//! Real-root solvers for low-degree polynomials.
//!
//! The quadric primitives need robust quadratic roots; the torus intersector
//! needs the full quartic. All solvers return roots in ascending order.

/// Discriminants in `(-SAFE_DISCRIMINANT_CLAMP, 0)` are treated as zero.
/// Grazing rays otherwise flicker between zero and two roots under roundoff.
const SAFE_DISCRIMINANT_CLAMP: f64 = 1.0e-13;

/// Real roots of `a*t^2 + b*t + c = 0`, ascending. Degenerate (linear)
/// equations are handled; a constant equation reports no roots.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> ([f64; 2], usize) {
    solve_quadratic_inner(a, b, c, 0.0)
}

/// Like [`solve_quadratic`], but clamps a barely-negative discriminant to
/// zero so tangent rays produce a (single) root instead of none.
pub fn solve_quadratic_safe(a: f64, b: f64, c: f64) -> ([f64; 2], usize) {
    solve_quadratic_inner(a, b, c, SAFE_DISCRIMINANT_CLAMP)
}

fn solve_quadratic_inner(a: f64, b: f64, c: f64, clamp: f64) -> ([f64; 2], usize) {
    if a == 0.0 {
        if b == 0.0 {
            return ([0.0; 2], 0);
        }
        return ([-c / b, 0.0], 1);
    }
    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if -disc < clamp {
            disc = 0.0;
        } else {
            return ([0.0; 2], 0);
        }
    }
    if disc == 0.0 {
        return ([-b / (2.0 * a), 0.0], 1);
    }
    // Citardauq form on the smaller-magnitude root avoids cancellation
    let sqrt_disc = disc.sqrt();
    let q = if b >= 0.0 {
        -0.5 * (b + sqrt_disc)
    } else {
        -0.5 * (b - sqrt_disc)
    };
    let r0 = q / a;
    let r1 = c / q;
    if r0 <= r1 {
        ([r0, r1], 2)
    } else {
        ([r1, r0], 2)
    }
}

/// Nontrivial solutions of the homogeneous `a*x^2 + 2b*x*y + c*y^2 = 0`.
///
/// Returns up to two direction pairs `(x, y)` and a count:
/// * `0` - no real solution; the first pair still holds the extremal
///   direction (useful when roundoff pushed the discriminant negative),
/// * `1` or `2` - that many independent solution directions,
/// * `3` - every direction solves the equation (all coefficients zero).
pub fn solve_quadratic_homogeneous(a: f64, b: f64, c: f64) -> ([(f64, f64); 2], usize) {
    if a == 0.0 && c == 0.0 {
        if b == 0.0 {
            return ([(1.0, 0.0), (0.0, 1.0)], 3);
        }
        return ([(1.0, 0.0), (0.0, 1.0)], 2);
    }
    if a == 0.0 {
        // y * (2b*x + c*y) = 0
        if b == 0.0 {
            return ([(1.0, 0.0), (0.0, 0.0)], 1);
        }
        return ([(1.0, 0.0), (c, -2.0 * b)], 2);
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return ([(-b, a), (0.0, 0.0)], 0);
    }
    if disc == 0.0 {
        return ([(-b, a), (0.0, 0.0)], 1);
    }
    let sq = disc.sqrt();
    ([(-b - sq, a), (-b + sq, a)], 2)
}

/// Real roots of `a*t^3 + b*t^2 + c*t + d = 0`, ascending.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> ([f64; 3], usize) {
    if a == 0.0 {
        let (r, n) = solve_quadratic(b, c, d);
        return ([r[0], r[1], 0.0], n);
    }
    // Depressed form t = y - b/(3a):  y^3 + p*y + q = 0
    let binv = 1.0 / a;
    let b1 = b * binv;
    let c1 = c * binv;
    let d1 = d * binv;
    let shift = b1 / 3.0;
    let p = c1 - b1 * b1 / 3.0;
    let q = d1 - b1 * c1 / 3.0 + 2.0 * b1 * b1 * b1 / 27.0;

    let half_q = 0.5 * q;
    let third_p = p / 3.0;
    let disc = half_q * half_q + third_p * third_p * third_p;

    let mut roots = [0.0f64; 3];
    let count;
    if disc > 0.0 {
        // One real root (Cardano)
        let sq = disc.sqrt();
        let u = (-half_q + sq).cbrt();
        let v = (-half_q - sq).cbrt();
        roots[0] = u + v - shift;
        count = 1;
    } else if disc == 0.0 {
        let u = (-half_q).cbrt();
        roots[0] = 2.0 * u - shift;
        roots[1] = -u - shift;
        count = if u == 0.0 { 1 } else { 2 };
        roots[..count].sort_by(f64::total_cmp);
    } else {
        // Three real roots (trigonometric form)
        let rho = (-third_p).sqrt();
        let theta = (half_q / (rho * rho * rho)).clamp(-1.0, 1.0).acos() / 3.0;
        let two_rho = 2.0 * rho;
        for (k, slot) in roots.iter_mut().enumerate() {
            let angle = theta - 2.0 * std::f64::consts::PI * k as f64 / 3.0;
            *slot = -two_rho * angle.cos() - shift;
        }
        roots.sort_by(f64::total_cmp);
        count = 3;
    }
    (roots, count)
}

/// Real roots of `a*t^4 + b*t^3 + c*t^2 + d*t + e = 0`, ascending.
///
/// Ferrari's method via the resolvent cubic, with one Newton polish per root.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> ([f64; 4], usize) {
    if a == 0.0 {
        let (r, n) = solve_cubic(b, c, d, e);
        return ([r[0], r[1], r[2], 0.0], n);
    }
    let inv = 1.0 / a;
    let b1 = b * inv;
    let c1 = c * inv;
    let d1 = d * inv;
    let e1 = e * inv;

    // Depressed form t = y - b1/4:  y^4 + p*y^2 + q*y + r = 0
    let shift = b1 * 0.25;
    let b1sq = b1 * b1;
    let p = c1 - 0.375 * b1sq;
    let q = d1 - 0.5 * b1 * c1 + 0.125 * b1sq * b1;
    let r = e1 - 0.25 * b1 * d1 + 0.0625 * b1sq * c1 - 3.0 * b1sq * b1sq / 256.0;

    let mut roots = [0.0f64; 4];
    let mut count = 0usize;

    if q.abs() < 1.0e-14 {
        // Biquadratic: y^2 = z with z^2 + p*z + r = 0
        let (zr, zn) = solve_quadratic_safe(1.0, p, r);
        for &z in zr.iter().take(zn) {
            if z < 0.0 {
                continue;
            }
            let y = z.sqrt();
            roots[count] = y - shift;
            count += 1;
            if y != 0.0 {
                roots[count] = -y - shift;
                count += 1;
            }
        }
    } else {
        // Resolvent: m^3 + p*m^2 + (p^2/4 - r)*m - q^2/8 = 0, need m > 0
        let (mr, mn) = solve_cubic(1.0, p, 0.25 * p * p - r, -0.125 * q * q);
        let mut m = 0.0;
        for &cand in mr.iter().take(mn) {
            if cand > m {
                m = cand;
            }
        }
        if m <= 0.0 {
            return (roots, 0);
        }
        let u = (2.0 * m).sqrt();
        let base = 0.5 * (p + 2.0 * m);
        let offset = 0.5 * q / u;
        let (ra, na) = solve_quadratic_safe(1.0, u, base - offset);
        for &y in ra.iter().take(na) {
            roots[count] = y - shift;
            count += 1;
        }
        let (rb, nb) = solve_quadratic_safe(1.0, -u, base + offset);
        for &y in rb.iter().take(nb) {
            roots[count] = y - shift;
            count += 1;
        }
    }

    // Newton polish against the original (monic) quartic
    for root in roots.iter_mut().take(count) {
        let t = *root;
        let f = (((t + b1) * t + c1) * t + d1) * t + e1;
        let df = ((4.0 * t + 3.0 * b1) * t + 2.0 * c1) * t + d1;
        if df != 0.0 {
            let step = f / df;
            if step.abs() < 1.0 {
                *root = t - step;
            }
        }
    }

    roots[..count].sort_by(f64::total_cmp);
    (roots, count)
}

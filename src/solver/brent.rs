//! Brent's method for 1D root finding.
//!
//! Combines bisection, secant, and inverse quadratic interpolation; the
//! interpolation branch explicitly guards a vanishing denominator and falls
//! back to bisection, so a degenerate triple can never produce an infinite
//! step.
use crate::core::{EPSILON, Float};

/// Finds a root of f on [a, b], where fa and fb already bracket it.
///
/// The function may decline to evaluate a point (for example, a probe ray
/// that no longer traces); the search aborts with None in that case and the
/// caller keeps its previous best estimate.
pub(crate) fn brent_root<F>(
    mut f: F,
    a: Float,
    b: Float,
    fa: Float,
    fb: Float,
    tol: Float,
    max_iter: usize,
) -> Option<Float>
where
    F: FnMut(Float) -> Option<Float>,
{
    if fa * fb > 0.0 {
        return None;
    }

    let (mut a, mut b, mut fa, mut fb) = (a, b, fa, fb);
    let (mut c, mut fc) = (b, fb);
    let mut d = 0.0;
    let mut e = 0.0;

    for _ in 0..max_iter {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Some(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Attempt inverse quadratic interpolation (secant when a == c).
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * xm * s;
                q = 1.0 - s;
            } else {
                let r0 = fa / fc;
                let r1 = fb / fc;
                p = s * (2.0 * xm * r0 * (r0 - r1) - (b - a) * (r1 - 1.0));
                q = (r0 - 1.0) * (r1 - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if q != 0.0 && 2.0 * p < Float::min(min1, min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += if xm >= 0.0 { tol1 } else { -tol1 };
        }
        fb = f(b)?;
    }

    Some(b)
}

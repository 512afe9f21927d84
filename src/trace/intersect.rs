//! Ray-surface intersection and redirection.
//!
//! The intersection distance t solves f(t) = z(t) - sag(r(t)) = 0 in the
//! surface's local frame. A plane hit seeds a guarded Newton iteration;
//! bisection takes over when Newton wanders or the sag turns NaN under the
//! current estimate.
use crate::backend::SagSource;
use crate::core::{Float, math::vec3::Vec3};

/// Convergence threshold on |f|, in mm.
const SAG_TOL: Float = 1e-9;

/// Convergence threshold on the Newton step.
const STEP_TOL: Float = 1e-11;

const MAX_NEWTON_ITERS: usize = 40;
const MAX_BISECTION_ITERS: usize = 80;

/// Roots closer than this are behind the ray.
const MIN_T: Float = 1e-9;

/// Direction cosines below this cannot seed the plane hit.
const GRAZING_DIR: Float = 1e-12;

/// Samples used to recover a bracket when the sag is NaN at the estimate.
const SCAN_SAMPLES: usize = 128;

#[derive(Debug)]
pub(crate) struct Intersection {
    /// The hit point in the surface's local frame.
    pub pos: Vec3,
    /// The unit surface normal at the hit, local frame.
    pub normal: Vec3,
    pub t: Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntersectFailure {
    GrazingIncidence,
    NoIntersection,
    BehindSurface,
}

/// Finds the intersection of a local-frame ray with a surface.
pub(crate) fn intersect(
    sag: &SagSource,
    pos: Vec3,
    dir: Vec3,
) -> Result<Intersection, IntersectFailure> {
    if dir.z().abs() < GRAZING_DIR {
        return Err(IntersectFailure::GrazingIncidence);
    }

    let seed = -pos.z() / dir.z();
    let mut t = seed;

    // Endpoints of a sign-change bracket, recorded as iterations proceed.
    let mut below: Option<Float> = None; // f < 0
    let mut above: Option<Float> = None; // f > 0

    let mut root = None;
    for _ in 0..MAX_NEWTON_ITERS {
        let p = pos + dir * t;
        let r = p.transverse_radius();
        let s = sag.sag(r);
        if s.is_nan() {
            // The estimate left the surface's extent; rebuild from a scan.
            root = Some(scan_and_bisect(sag, pos, dir, seed)?);
            break;
        }

        let f = p.z() - s;
        if f.abs() < SAG_TOL {
            root = Some(t);
            break;
        }
        if f < 0.0 {
            below = Some(t);
        } else {
            above = Some(t);
        }

        let slope = if r > 1e-12 { sag.dsag_dr(r) } else { 0.0 };
        let dfdt = dir.z() - slope * (p.x() * dir.x() + p.y() * dir.y()) / r.max(1e-12);

        let mut t_next = if dfdt.abs() > 1e-14 && dfdt.is_finite() {
            t - f / dfdt
        } else {
            Float::NAN
        };

        // A Newton step that leaves a known bracket is replaced by its
        // midpoint.
        if let (Some(b), Some(a)) = (below, above) {
            let (lo, hi) = if b < a { (b, a) } else { (a, b) };
            if !t_next.is_finite() || t_next < lo || t_next > hi {
                t_next = 0.5 * (lo + hi);
            }
        } else if !t_next.is_finite() {
            root = Some(scan_and_bisect(sag, pos, dir, seed)?);
            break;
        }

        if (t_next - t).abs() < STEP_TOL {
            root = Some(t_next);
            break;
        }
        t = t_next;
    }

    let t_root = match root {
        Some(t) => t,
        // Newton ran out of iterations.
        None => match (below, above) {
            (Some(b), Some(a)) => bisect(sag, pos, dir, b, a)?,
            _ => return Err(IntersectFailure::NoIntersection),
        },
    };

    if t_root < MIN_T {
        return Err(IntersectFailure::BehindSurface);
    }

    let p = pos + dir * t_root;
    Ok(Intersection {
        pos: p,
        normal: sag.normal_at(p.x(), p.y()),
        t: t_root,
    })
}

/// Scans the forward t-range for a sign change and bisects it.
///
/// Radii are evaluated in one pooled call so an installed backend sees the
/// batched form. A range that never produces a finite sag means the ray
/// misses the surface entirely.
fn scan_and_bisect(
    sag: &SagSource,
    pos: Vec3,
    dir: Vec3,
    seed: Float,
) -> Result<Float, IntersectFailure> {
    let t_hi = Float::max(2.0 * seed.abs(), 100.0);
    let step = (t_hi - MIN_T) / (SCAN_SAMPLES - 1) as Float;

    let ts: Vec<Float> = (0..SCAN_SAMPLES).map(|i| MIN_T + step * i as Float).collect();
    let radii: Vec<Float> = ts
        .iter()
        .map(|t| (pos + dir * *t).transverse_radius())
        .collect();
    let sags = sag.batch_sag(&radii);

    let mut prev: Option<(Float, Float)> = None;
    for (t, s) in ts.iter().zip(sags.iter()) {
        if s.is_nan() {
            // The surface ends somewhere between the last finite sample and
            // here; the root may hide against that rim.
            if let Some((t_prev, f_prev)) = prev {
                if let Some(root) = probe_rim(sag, pos, dir, t_prev, f_prev, *t)? {
                    return Ok(root);
                }
            }
            continue;
        }
        let f = pos.z() + dir.z() * t - s;
        if f.abs() < SAG_TOL {
            return Ok(*t);
        }
        if let Some((t_prev, f_prev)) = prev {
            if f_prev * f < 0.0 {
                return bisect(sag, pos, dir, t_prev, *t);
            }
        }
        prev = Some((*t, f));
    }

    Err(IntersectFailure::NoIntersection)
}

/// Walks from a finite sample toward a NaN one, looking for a sign change
/// against the rim of the surface.
///
/// Returns Ok(None) when f keeps its sign all the way to the rim.
fn probe_rim(
    sag: &SagSource,
    pos: Vec3,
    dir: Vec3,
    t_finite: Float,
    f_finite: Float,
    t_nan: Float,
) -> Result<Option<Float>, IntersectFailure> {
    let f_at = |t: Float| {
        let p = pos + dir * t;
        p.z() - sag.sag(p.transverse_radius())
    };

    let mut lo = t_finite;
    let mut f_lo = f_finite;
    let mut hi = t_nan;

    for _ in 0..40 {
        let mid = 0.5 * (lo + hi);
        let f_mid = f_at(mid);
        if f_mid.is_nan() {
            hi = mid;
            continue;
        }
        if f_mid.abs() < SAG_TOL {
            return Ok(Some(mid));
        }
        if f_lo * f_mid < 0.0 {
            return bisect(sag, pos, dir, lo, mid).map(Some);
        }
        lo = mid;
        f_lo = f_mid;
    }

    Ok(None)
}

/// Bisection between two t-values whose f-signs differ.
///
/// A NaN midpoint shrinks the interval from above, toward the endpoint that
/// is known to lie on the surface.
fn bisect(sag: &SagSource, pos: Vec3, dir: Vec3, a: Float, b: Float) -> Result<Float, IntersectFailure> {
    let f_at = |t: Float| {
        let p = pos + dir * t;
        p.z() - sag.sag(p.transverse_radius())
    };

    let (mut lo, mut hi) = if a < b { (a, b) } else { (b, a) };
    let mut f_lo = f_at(lo);
    if f_lo.is_nan() {
        return Err(IntersectFailure::NoIntersection);
    }

    for _ in 0..MAX_BISECTION_ITERS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f_at(mid);

        if f_mid.is_nan() {
            hi = mid;
            continue;
        }
        if f_mid.abs() < SAG_TOL || (hi - lo) < STEP_TOL {
            return Ok(mid);
        }

        if f_lo * f_mid <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    Err(IntersectFailure::NoIntersection)
}

/// Redirects a ray across a refracting boundary using Snell's law in vector
/// form.
///
/// The normal is re-oriented against the incident ray before use, so either
/// normal orientation is accepted. On total internal reflection the
/// incidence cosine is returned as the error value.
pub(crate) fn refract(dir: Vec3, normal: Vec3, n1: Float, n2: Float) -> Result<Vec3, Float> {
    let mut n = normal;
    let mut cos1 = -dir.dot(n);
    if cos1 < 0.0 {
        n = -n;
        cos1 = -cos1;
    }

    let mu = n1 / n2;
    let k = 1.0 - mu * mu * (1.0 - cos1 * cos1);
    if k < 0.0 {
        return Err(cos1);
    }

    Ok((dir * mu + n * (mu * cos1 - k.sqrt())).normalize())
}

/// Specular reflection. Mirrors always reflect; there is no TIR branch.
pub(crate) fn reflect(dir: Vec3, normal: Vec3) -> Vec3 {
    (dir - normal * (2.0 * dir.dot(normal))).normalize()
}

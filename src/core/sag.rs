//! Aspheric sag, slope, and surface normal evaluation.
//!
//! The sag is the axial departure z(r) of a rotationally symmetric surface
//! from its vertex tangent plane. A NaN sag means the radius lies beyond the
//! geometric extent of the conic; callers treat it as "the ray missed the
//! surface" rather than an error.
use crate::core::{Float, math::vec3::Vec3};
use crate::specs::surfaces::{AsphericProfile, SagMode};

/// Step scale for the finite-difference slope.
const DERIVATIVE_H: Float = 1e-6;

/// Radii below this evaluate as the vertex.
const VERTEX_RADIUS: Float = 1e-12;

/// The surface sag at radial distance r from the vertex.
pub(crate) fn sag(profile: &AsphericProfile, r: Float) -> Float {
    let base = if profile.radius.is_infinite() {
        0.0
    } else {
        let roc = profile.radius;
        let r2 = r * r;
        let arg = 1.0 - (1.0 + profile.conic) * r2 / (roc * roc);
        if arg < 0.0 {
            return Float::NAN;
        }
        let rho = r2 / (roc.abs() * (1.0 + arg.sqrt()));
        if roc < 0.0 { -rho } else { rho }
    };

    base + polynomial(profile, r)
}

/// The polynomial part of the sag.
fn polynomial(profile: &AsphericProfile, r: Float) -> Float {
    if profile.coef.iter().all(|c| *c == 0.0) {
        return 0.0;
    }

    let r2 = r * r;
    // Even terms start at r^4, odd terms at r^3; both step by r^2.
    let mut power = match profile.mode {
        SagMode::Even => r2 * r2,
        SagMode::Odd => r2 * r,
    };

    let mut acc = 0.0;
    for c in profile.coef.iter() {
        acc += c * power;
        power *= r2;
    }
    acc
}

/// The radial slope ds/dr by central finite differences.
///
/// The sag is even in r, so the backward sample reflects through the vertex
/// when r < h.
pub(crate) fn dsag_dr(profile: &AsphericProfile, r: Float) -> Float {
    let h = DERIVATIVE_H * Float::max(1.0, r.abs());
    let forward = sag(profile, r + h);
    let backward = sag(profile, (r - h).abs());
    (forward - backward) / (2.0 * h)
}

/// The unit surface normal at a local point (x, y) on the surface.
///
/// Points toward +z; the vertex singularity resolves to the axis.
pub(crate) fn normal_at(profile: &AsphericProfile, x: Float, y: Float) -> Vec3 {
    let r = x.hypot(y);
    if r < VERTEX_RADIUS {
        return Vec3::new(0.0, 0.0, 1.0);
    }

    let slope = dsag_dr(profile, r);
    if !slope.is_finite() {
        return Vec3::new(0.0, 0.0, 1.0);
    }

    Vec3::new(-x * slope / r, -y * slope / r, 1.0).normalize()
}

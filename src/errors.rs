//! Error types for the ray tracing and solver layers.
//!
//! Failures that are part of normal operation (vignetting, total internal
//! reflection, an unreachable stop) are modeled as enum variants so that
//! downstream consumers can match on them rather than parse messages. The
//! spec-ingest boundary uses `anyhow` instead; nothing there is ever matched
//! on.
use serde::Serialize;
use thiserror::Error;

use crate::core::Float;
use crate::specs::surfaces::ApertureKind;

/// Configuration problems detected when building an optical system.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum SystemError {
    #[error("the system has no stop surface")]
    NoStopSurface,

    #[error("bad thickness on surface {surface}: {reason}")]
    BadThickness { surface: usize, reason: String },

    #[error("bad coordinate break on surface {surface}: {reason}")]
    BadCoordBreak { surface: usize, reason: String },

    #[error("unknown material: {name}")]
    UnknownMaterial { name: String },

    #[error("invalid surface {surface}: {reason}")]
    InvalidSurface { surface: usize, reason: String },
}

/// Reasons a ray stops short of the final surface.
///
/// A failed trace is not an exceptional condition; marginal-ray searches
/// produce them by the thousands.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum TraceError {
    #[error("surface {surface} cannot be intersected")]
    InvalidSurface { surface: usize },

    #[error("grazing incidence at surface {surface}")]
    GrazingIncidence { surface: usize },

    #[error("no intersection with surface {surface}")]
    NoIntersection { surface: usize },

    #[error("intersection with surface {surface} lies behind the ray")]
    BehindSurface { surface: usize },

    #[error("total internal reflection at surface {surface} (cos theta = {cos_theta})")]
    TotalInternalReflection { surface: usize, cos_theta: Float },

    #[error(
        "ray blocked at surface {surface}: hit radius {hit_radius} mm > aperture limit {aperture_limit} mm"
    )]
    ApertureBlocked {
        surface: usize,
        hit_radius: Float,
        aperture_limit: Float,
        shape: ApertureKind,
    },

    #[error("trace cancelled")]
    Cancelled,

    #[error(transparent)]
    Configuration(#[from] SystemError),
}

/// Failures of the chief-ray solver.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ChiefError {
    #[error("no ray from object {object_index} reaches the stop")]
    StopUnreachable { object_index: usize },

    #[error("chief-ray search stalled at residual {residual} mm after {iters} iterations")]
    ConvergenceNotReached { residual: Float, iters: usize },

    #[error("no sign change bracketed for the chief-ray root")]
    BracketNotFound,

    #[error(transparent)]
    Configuration(#[from] SystemError),
}

/// Failures of cross-beam generation.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum CrossBeamError {
    #[error("cross beams require ray_count >= 3, got {0}")]
    BadRayCount(usize),

    #[error(transparent)]
    Chief(#[from] ChiefError),
}

//! Spot aggregation.
//!
//! Traces every ray of a cross beam to a target surface and projects the
//! hits into that surface's local frame, ready for a spot-diagram plot.
//! Rays that vignette or reflect internally are recorded with their reason
//! and simply left out of the point cloud.
use serde::Serialize;

use crate::core::Float;
use crate::errors::TraceError;
use crate::system::OpticalSystem;
use crate::trace::{CancelToken, TraceOptions, trace};
use crate::views::cross_beam::{CrossBeam, Role};

/// One plottable hit in the target surface's local frame, mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpotPoint {
    pub role: Role,
    pub x: Float,
    pub y: Float,
}

/// A ray that never reached the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotFailure {
    pub role: Role,
    /// The surface at which the ray stopped.
    pub surface: usize,
    pub error: TraceError,
}

/// The spot of one cross beam on one surface.
#[derive(Debug, Clone, Serialize)]
pub struct SpotDiagram {
    pub object_index: usize,
    pub target_surface: usize,
    pub points: Vec<SpotPoint>,
    pub failures: Vec<SpotFailure>,
    /// The host cancelled mid-beam; points and failures cover only the rays
    /// traced before the signal.
    pub cancelled: bool,
}

/// Traces a cross beam to `target_surface` and aggregates the hits.
///
/// Cancellation is honored between rays; the ray in flight when the token
/// fires is completed normally and nothing partial is recorded for the
/// rest.
pub fn spot_diagram(
    system: &OpticalSystem,
    beam: &CrossBeam,
    target_surface: usize,
    opts: &TraceOptions,
    cancel: &CancelToken,
) -> SpotDiagram {
    let target = target_surface.min(system.surfaces().len() - 1);
    let frame = &system.frames()[target];
    let expected_len = system.path_index(target);

    let mut points = Vec::with_capacity(beam.rays.len());
    let mut failures = Vec::new();
    let mut cancelled = false;

    for (ray, role) in beam.tagged_rays() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        match trace(system, ray, Some(target), opts) {
            Ok(path) => {
                // The target must itself be drawable for a hit to exist.
                if expected_len == 0 || path.len() < expected_len {
                    continue;
                }
                let local = frame.to_local(path.points()[expected_len - 1]);
                points.push(SpotPoint {
                    role,
                    x: local.x(),
                    y: local.y(),
                });
            }
            Err(failure) => {
                failures.push(SpotFailure {
                    role,
                    surface: failure.surface,
                    error: failure.error,
                });
            }
        }
    }

    tracing::debug!(
        object = beam.object_index,
        hits = points.len(),
        failures = failures.len(),
        cancelled,
        "spot aggregated"
    );

    SpotDiagram {
        object_index: beam.object_index,
        target_surface: target,
        points,
        failures,
        cancelled,
    }
}

//! Aperture-boundary search.
//!
//! Starting from a solved chief ray, finds how far the emission can be
//! offset in each of four directions of the chief-perpendicular plane before
//! the offset ray stops tracing. The four offsets bound the beam that the
//! cross-beam generator fills in.
use serde::Serialize;

use crate::core::{Float, math::vec3::Vec3};
use crate::solver::chief::ChiefSolution;
use crate::system::OpticalSystem;
use crate::trace::{Ray, TraceOptions, trace};

/// Offset tolerance of the stop-mode binary search, mm.
const SEARCH_TOL: Float = 1e-3;
const MAX_SEARCH_ITERS: usize = 50;

/// Fixed iteration count of the entrance-pupil mode per-axis search.
const PUPIL_SEARCH_ITERS: usize = 12;

/// Which surface bounds the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoundaryMode {
    /// Probe rays must reach the stop. The default for spot generation.
    Stop,
    /// Probe rays must reach the evaluation target; preferred when the
    /// consumer evaluates on the entrance-pupil plane.
    EntrancePupil,
}

/// The outcome of one boundary direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryOffset {
    /// Probe direction in the chief-perpendicular (e_u, e_v) basis.
    pub u: Float,
    pub v: Float,

    /// The largest offset that still traces, or None when even the chief
    /// position fails in this configuration.
    pub offset: Option<Float>,

    /// The search hit its range cap without ever failing.
    pub range_limited: bool,
}

/// An orthonormal basis (e_u, e_v) perpendicular to the chief direction.
///
/// The helper vector swaps off the z-axis when the chief is nearly axial so
/// the cross products stay well conditioned.
pub(crate) fn chief_basis(dir: Vec3) -> (Vec3, Vec3) {
    let helper = if dir.z().abs() > 0.95 {
        Vec3::new(0.0, 1.0, 0.0)
    } else {
        Vec3::new(0.0, 0.0, 1.0)
    };
    let e_u = helper.cross(dir).normalize();
    let e_v = dir.cross(e_u);
    (e_u, e_v)
}

/// Searches the four boundary offsets around a chief ray.
///
/// Results are ordered upper (0, +1), lower (0, -1), right (+1, 0),
/// left (-1, 0). A direction whose zero offset already fails reports no
/// boundary; the other directions are unaffected.
pub fn find_aperture_boundaries(
    system: &OpticalSystem,
    chief: &ChiefSolution,
    wavelength: Float,
    mode: BoundaryMode,
    target: Option<usize>,
    opts: &TraceOptions,
) -> [BoundaryOffset; 4] {
    let (e_u, e_v) = chief_basis(chief.direction);
    let target = target.unwrap_or(match mode {
        BoundaryMode::Stop => system.stop_index(),
        BoundaryMode::EntrancePupil => system.surfaces().len() - 1,
    });
    let s_max = match mode {
        BoundaryMode::Stop => 2.0 * system.stop_semidia(),
        BoundaryMode::EntrancePupil => 2.0 * system.largest_aperture_limit(),
    };

    let reaches = |s: Float, du: Float, dv: Float| -> bool {
        let offset = (e_u * du + e_v * dv) * s;
        let ray = Ray::new_unchecked(chief.emission_pos + offset, chief.direction, wavelength);
        trace(system, &ray, Some(target), opts).is_ok()
    };

    let directions: [(Float, Float); 4] = [(0.0, 1.0), (0.0, -1.0), (1.0, 0.0), (-1.0, 0.0)];

    directions.map(|(du, dv)| {
        if !reaches(0.0, du, dv) {
            tracing::debug!(du, dv, "no boundary: the chief offset itself fails");
            return BoundaryOffset {
                u: du,
                v: dv,
                offset: None,
                range_limited: false,
            };
        }

        if reaches(s_max, du, dv) {
            // The whole range traces; the caller sees the cap, flagged.
            return BoundaryOffset {
                u: du,
                v: dv,
                offset: Some(s_max),
                range_limited: true,
            };
        }

        let mut lo = 0.0;
        let mut hi = s_max;
        match mode {
            BoundaryMode::Stop => {
                for _ in 0..MAX_SEARCH_ITERS {
                    if hi - lo <= SEARCH_TOL {
                        break;
                    }
                    let mid = 0.5 * (lo + hi);
                    if reaches(mid, du, dv) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
            }
            BoundaryMode::EntrancePupil => {
                for _ in 0..PUPIL_SEARCH_ITERS {
                    let mid = 0.5 * (lo + hi);
                    if reaches(mid, du, dv) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
            }
        }

        BoundaryOffset {
            u: du,
            v: dv,
            offset: Some(lo),
            range_limited: false,
        }
    })
}

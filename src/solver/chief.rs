//! The chief-ray solver.
//!
//! For an object field, finds the emission whose traced ray pierces the
//! center of the aperture stop. The search runs in three stages over a 2D
//! unknown (u, v):
//!
//! 1. a coarse grid seeded by the no-refraction straight-line guess,
//! 2. per-axis Brent refinement bracketed around the grid best,
//! 3. an alternating micro line-search polish with residual-scaled ranges.
//!
//! Every stage accepts improvements only, so the residual is monotone
//! non-increasing from grid to polish. For finite conjugates the unknown is
//! the aim point on the stop plane; for infinite conjugates it is the
//! emission point on a fixed plane in front of the system.
use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::core::{Float, math::vec3::Vec3};
use crate::errors::{ChiefError, SystemError};
use crate::specs::fields::ObjectField;
use crate::system::OpticalSystem;
use crate::trace::{Ray, TraceOptions, trace};
use crate::solver::brent::brent_root;

/// Number of grid points per axis in the coarse stage.
const GRID_SIZE: usize = 51;

/// Tolerance of the Brent refinement, mm.
const BRENT_TOL: Float = 1e-8;
const BRENT_MAX_ITERS: usize = 100;

/// Bracket expansion factors tried before giving up on an axis.
const BRACKET_EXPANSIONS: [Float; 5] = [1.0, 2.0, 4.0, 8.0, 10.0];

/// Outer iterations of the polish stage.
const POLISH_OUTER_ITERS: usize = 100;

/// Samples per axis in one polish line search.
const POLISH_STEPS: usize = 25;

/// Convergence threshold on residual or coordinate change, mm.
const POLISH_TOL: Float = 1e-12;

/// Options for the chief-ray solve.
#[derive(Debug, Clone)]
pub struct ChiefOptions {
    /// Index of the object field being solved; tags errors and cache keys.
    pub object_index: usize,

    /// Global z of the emission plane used for infinite conjugates.
    pub emission_plane_z: Float,

    /// Grid points per axis in the coarse stage.
    pub grid_size: usize,

    pub trace: TraceOptions,
}

impl Default for ChiefOptions {
    fn default() -> Self {
        Self {
            object_index: 0,
            emission_plane_z: -25.0,
            grid_size: GRID_SIZE,
            trace: TraceOptions::default(),
        }
    }
}

/// How far the solver got before settling on its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChiefMethod {
    /// Neither axis bracketed a sign change; the grid best stands.
    GridOnly,
    /// Grid seed refined by Brent and polish.
    GridBrentHybrid,
}

/// A coarse report of how trustworthy the residual is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChiefQuality {
    Excellent,
    Good,
    NeedsWork,
    Poor,
}

impl ChiefQuality {
    fn from_residual(residual_mm: Float) -> Self {
        if residual_mm < 1e-2 {
            Self::Excellent
        } else if residual_mm < 0.1 {
            Self::Good
        } else if residual_mm < 1.0 {
            Self::NeedsWork
        } else {
            Self::Poor
        }
    }
}

/// A solved chief ray.
#[derive(Debug, Clone, Serialize)]
pub struct ChiefSolution {
    pub emission_pos: Vec3,
    pub direction: Vec3,

    /// Distance of the traced stop hit from the stop center, mm.
    pub residual: Float,

    pub method: ChiefMethod,
    pub quality: ChiefQuality,

    /// Residual after each stage (grid, Brent, polish), for regression
    /// checks of stage monotonicity.
    pub stage_residuals: Vec<Float>,
}

/// Maps the 2D unknown onto launchable rays.
enum ParamMode {
    /// Unknown: the emission point (u, v) on the plane z = emission_plane_z.
    Infinite { dir: Vec3, plane_z: Float },
    /// Unknown: the aim point (u, v) on the stop plane, stop-local
    /// transverse coordinates.
    Finite { pos: Vec3 },
}

struct Parametrization<'a> {
    system: &'a OpticalSystem,
    wavelength: Float,
    trace_opts: &'a TraceOptions,
    mode: ParamMode,
}

impl<'a> Parametrization<'a> {
    fn new(
        system: &'a OpticalSystem,
        field: &ObjectField,
        wavelength: Float,
        opts: &'a ChiefOptions,
    ) -> Result<Self, ChiefError> {
        let mode = match field {
            ObjectField::Angle { .. } => {
                if !system.is_object_at_infinity() {
                    return Err(ChiefError::Configuration(SystemError::BadThickness {
                        surface: 0,
                        reason: "angle fields require an infinite object distance".to_string(),
                    }));
                }
                ParamMode::Infinite {
                    dir: field.direction().expect("angle fields always have a direction"),
                    plane_z: opts.emission_plane_z,
                }
            }
            ObjectField::Point { x, y } => {
                if system.is_object_at_infinity() {
                    return Err(ChiefError::Configuration(SystemError::BadThickness {
                        surface: 0,
                        reason: "point fields require a finite object distance".to_string(),
                    }));
                }
                let object_frame = &system.frames()[0];
                ParamMode::Finite {
                    pos: object_frame.to_global(Vec3::new(*x, *y, 0.0)),
                }
            }
        };

        Ok(Self {
            system,
            wavelength,
            trace_opts: &opts.trace,
            mode,
        })
    }

    /// The straight-line seed: where the unknown would sit if the ray never
    /// refracted on its way to the stop center.
    fn seed(&self) -> (Float, Float) {
        match &self.mode {
            ParamMode::Infinite { dir, plane_z } => {
                let stop = self.system.stop_center();
                let dz = stop.z() - plane_z;
                (
                    stop.x() - dir.x() / dir.z() * dz,
                    stop.y() - dir.y() / dir.z() * dz,
                )
            }
            // Aiming straight at the stop center.
            ParamMode::Finite { .. } => (0.0, 0.0),
        }
    }

    fn ray(&self, u: Float, v: Float) -> Ray {
        match &self.mode {
            ParamMode::Infinite { dir, plane_z } => {
                Ray::new_unchecked(Vec3::new(u, v, *plane_z), *dir, self.wavelength)
            }
            ParamMode::Finite { pos } => {
                let stop_frame = &self.system.frames()[self.system.stop_index()];
                let aim = stop_frame.to_global(Vec3::new(u, v, 0.0));
                Ray::new_unchecked(*pos, (aim - *pos).normalize(), self.wavelength)
            }
        }
    }

    /// Traces the candidate and reads the stop-plane hit in stop-local
    /// transverse coordinates.
    ///
    /// The stop's own aperture is deliberately not consulted: the solver
    /// needs the miss distance even when the hit lies outside the stop.
    fn stop_hit(&self, u: Float, v: Float) -> Option<(Float, Float)> {
        let stop_index = self.system.stop_index();
        let ray = self.ray(u, v);

        let path = trace(self.system, &ray, Some(stop_index - 1), self.trace_opts).ok()?;
        let exit = path.exit();

        let frame = &self.system.frames()[stop_index];
        let pos = frame.to_local(exit.pos());
        let dir = frame.dir_to_local(exit.dir());

        if dir.z().abs() < 1e-12 {
            return None;
        }
        let t = -pos.z() / dir.z();
        if t < 0.0 {
            return None;
        }

        let hit = pos + dir * t;
        Some((hit.x(), hit.y()))
    }

    /// Distance of the stop hit from the stop center, mm.
    fn error(&self, u: Float, v: Float) -> Option<Float> {
        self.stop_hit(u, v).map(|(x, y)| x.hypot(y))
    }
}

/// Solves the chief ray for one object field.
pub fn solve_chief(
    system: &OpticalSystem,
    field: &ObjectField,
    wavelength: Float,
    opts: &ChiefOptions,
) -> Result<ChiefSolution, ChiefError> {
    let span = tracing::debug_span!("solve_chief", object = opts.object_index, wavelength);
    let _entered = span.enter();

    let param = Parametrization::new(system, field, wavelength, opts)?;
    let (u0, v0) = param.seed();

    // Stage 1: coarse grid around the straight-line seed.
    let half_width = Float::max(
        50.0,
        u0.abs() + v0.abs() + 2.0 * system.stop_semidia() + 10.0,
    );
    let grid_size = opts.grid_size.max(3);
    let step = 2.0 * half_width / (grid_size - 1) as Float;

    let best = (0..grid_size)
        .into_par_iter()
        .filter_map(|i| {
            let u = u0 - half_width + step * i as Float;
            let mut row_best: Option<(Float, Float, Float)> = None;
            for j in 0..grid_size {
                let v = v0 - half_width + step * j as Float;
                if let Some(err) = param.error(u, v) {
                    if row_best.map(|(_, _, e)| err < e).unwrap_or(true) {
                        row_best = Some((u, v, err));
                    }
                }
            }
            row_best
        })
        // Ties break on coordinates so the reduction is deterministic
        // regardless of rayon's work splitting.
        .min_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then(a.0.total_cmp(&b.0))
                .then(a.1.total_cmp(&b.1))
        });

    let Some((mut u, mut v, mut residual)) = best else {
        tracing::warn!(object = opts.object_index, "no grid point reached the stop");
        return Err(ChiefError::StopUnreachable {
            object_index: opts.object_index,
        });
    };
    let mut stage_residuals = vec![residual];
    tracing::debug!(u, v, residual, "grid stage complete");

    // Stage 2: per-axis Brent refinement. The method records whether any
    // axis bracketed a root; the refined point is adopted only when it does
    // not worsen the residual.
    let mut bracketed = false;

    if let Some(root) = refine_axis(&param, Axis2::U, u, v, step) {
        bracketed = true;
        if let Some(err) = param.error(root, v) {
            if err <= residual {
                u = root;
                residual = err;
            }
        }
    }
    if let Some(root) = refine_axis(&param, Axis2::V, u, v, step) {
        bracketed = true;
        if let Some(err) = param.error(u, root) {
            if err <= residual {
                v = root;
                residual = err;
            }
        }
    }

    let method = if bracketed {
        ChiefMethod::GridBrentHybrid
    } else {
        ChiefMethod::GridOnly
    };
    if method == ChiefMethod::GridOnly {
        // The caller still gets the grid best; the degradation is recorded
        // on the method field.
        tracing::warn!(
            object = opts.object_index,
            residual,
            "{}",
            ChiefError::ConvergenceNotReached {
                residual,
                iters: BRENT_MAX_ITERS,
            }
        );
    }
    stage_residuals.push(residual);
    tracing::debug!(u, v, residual, ?method, "brent stage complete");

    // Stage 3: alternating micro line searches.
    polish(&param, &mut u, &mut v, &mut residual);
    stage_residuals.push(residual);

    // Verification trace with the final emission.
    let residual = param.error(u, v).unwrap_or(residual);
    let ray = param.ray(u, v);
    let quality = ChiefQuality::from_residual(residual);
    tracing::debug!(residual, ?quality, "chief solve complete");

    Ok(ChiefSolution {
        emission_pos: ray.pos(),
        direction: ray.dir(),
        residual,
        method,
        quality,
        stage_residuals,
    })
}

#[derive(Clone, Copy)]
enum Axis2 {
    U,
    V,
}

/// Brackets and runs Brent on one axis of the stop-hit error.
///
/// The bracket starts one grid step around the current best and expands up
/// to ten times before reporting failure.
fn refine_axis(
    param: &Parametrization,
    axis: Axis2,
    u: Float,
    v: Float,
    step: Float,
) -> Option<Float> {
    let center = match axis {
        Axis2::U => u,
        Axis2::V => v,
    };
    let f = |x: Float| -> Option<Float> {
        let hit = match axis {
            Axis2::U => param.stop_hit(x, v),
            Axis2::V => param.stop_hit(u, x),
        }?;
        Some(match axis {
            Axis2::U => hit.0,
            Axis2::V => hit.1,
        })
    };

    for expansion in BRACKET_EXPANSIONS {
        let half = step * expansion;
        let (lo, hi) = (center - half, center + half);
        let (Some(f_lo), Some(f_hi)) = (f(lo), f(hi)) else {
            continue;
        };
        if f_lo * f_hi <= 0.0 {
            return brent_root(f, lo, hi, f_lo, f_hi, BRENT_TOL, BRENT_MAX_ITERS);
        }
    }

    None
}

/// The half-range of a polish line search for a given residual.
///
/// Four hand-tuned tiers; tighter residuals search narrower windows.
fn polish_range(residual: Float) -> Float {
    if residual > 0.1 {
        0.05
    } else if residual > 0.01 {
        0.02
    } else if residual > 1e-3 {
        0.005
    } else {
        1e-3
    }
}

/// Alternating per-axis line searches. Accepts improvements only, so the
/// residual can never regress.
fn polish(param: &Parametrization, u: &mut Float, v: &mut Float, residual: &mut Float) {
    for _ in 0..POLISH_OUTER_ITERS {
        let range = polish_range(*residual);
        let prev_u = *u;
        let prev_v = *v;
        let prev_residual = *residual;

        if let Some((best_u, best_err)) =
            line_search(|x| param.error(x, *v), *u, range)
        {
            if best_err < *residual {
                *u = best_u;
                *residual = best_err;
            }
        }
        if let Some((best_v, best_err)) =
            line_search(|y| param.error(*u, y), *v, range)
        {
            if best_err < *residual {
                *v = best_v;
                *residual = best_err;
            }
        }

        let improved = *residual < prev_residual;
        if !improved {
            break;
        }
        if (prev_residual - *residual) < POLISH_TOL {
            break;
        }
        if (prev_u - *u).abs() < POLISH_TOL && (prev_v - *v).abs() < POLISH_TOL {
            break;
        }
    }
}

/// Evaluates a fixed-count sample sweep over [center - range, center + range]
/// and returns the best point.
fn line_search<F>(f: F, center: Float, range: Float) -> Option<(Float, Float)>
where
    F: Fn(Float) -> Option<Float>,
{
    let step = 2.0 * range / (POLISH_STEPS - 1) as Float;

    let mut best: Option<(Float, Float)> = None;
    for k in 0..POLISH_STEPS {
        let x = center - range + step * k as Float;
        if let Some(err) = f(x) {
            if best.map(|(_, e)| err < e).unwrap_or(true) {
                best = Some((x, err));
            }
        }
    }
    best
}

/// A per-snapshot cache of chief solutions.
///
/// Keyed by (object index, wavelength bits); the whole cache clears when the
/// system fingerprint changes.
#[derive(Debug, Default)]
pub struct ChiefCache {
    fingerprint: u32,
    entries: HashMap<(usize, u64), ChiefSolution>,
}

impl ChiefCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_solve(
        &mut self,
        system: &OpticalSystem,
        field: &ObjectField,
        wavelength: Float,
        opts: &ChiefOptions,
    ) -> Result<ChiefSolution, ChiefError> {
        if self.fingerprint != system.fingerprint() {
            if !self.entries.is_empty() {
                tracing::debug!(
                    fingerprint = system.fingerprint(),
                    "system changed; chief cache cleared"
                );
            }
            self.entries.clear();
            self.fingerprint = system.fingerprint();
        }

        let key = (opts.object_index, wavelength.to_bits());
        if let Some(solution) = self.entries.get(&key) {
            return Ok(solution.clone());
        }

        let solution = solve_chief(system, field, wavelength, opts)?;
        self.entries.insert(key, solution.clone());
        Ok(solution)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::specs::materials::{ConstantIndexTable, IndexModel, Material};
    use crate::specs::surfaces::{ApertureShape, AsphericProfile, SurfaceSpec};

    fn index_model() -> Arc<dyn IndexModel> {
        Arc::new(ConstantIndexTable::new().with("N-BK7", 1.5168))
    }

    fn finite_singlet() -> OpticalSystem {
        let specs = vec![
            SurfaceSpec::object(ApertureShape::unbounded(), 100.0),
            SurfaceSpec::standard(
                AsphericProfile::conic(50.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Named("N-BK7".to_string()),
                2.5,
            ),
            SurfaceSpec::stop(
                ApertureShape::Circular { semidia: 5.0 },
                Material::Named("N-BK7".to_string()),
                2.5,
            ),
            SurfaceSpec::standard(
                AsphericProfile::conic(-50.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Air,
                95.0,
            ),
            SurfaceSpec::image(ApertureShape::unbounded()),
        ];
        OpticalSystem::new(specs, index_model()).unwrap()
    }

    fn front_stop_system() -> OpticalSystem {
        let specs = vec![
            SurfaceSpec::object(ApertureShape::unbounded(), Float::INFINITY),
            SurfaceSpec::stop(
                ApertureShape::Circular { semidia: 5.0 },
                Material::Air,
                5.0,
            ),
            SurfaceSpec::standard(
                AsphericProfile::conic(100.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Named("N-BK7".to_string()),
                10.0,
            ),
            SurfaceSpec::standard(
                AsphericProfile::conic(-100.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Air,
                90.0,
            ),
            SurfaceSpec::image(ApertureShape::unbounded()),
        ];
        OpticalSystem::new(specs, index_model()).unwrap()
    }

    #[test]
    fn test_on_axis_finite_chief_is_the_axis() {
        let system = finite_singlet();
        let field = ObjectField::Point { x: 0.0, y: 0.0 };

        let solution =
            solve_chief(&system, &field, 0.5876, &ChiefOptions::default()).unwrap();

        assert!(solution.residual < 1e-9);
        assert_abs_diff_eq!(solution.direction.x(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.direction.y(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.direction.z(), 1.0, epsilon = 1e-9);
        assert_eq!(solution.quality, ChiefQuality::Excellent);
    }

    #[test]
    fn test_off_axis_finite_chief_hits_stop_center() {
        let system = finite_singlet();
        let field = ObjectField::Point { x: 0.0, y: 5.0 };

        let solution =
            solve_chief(&system, &field, 0.5876, &ChiefOptions::default()).unwrap();

        assert!(solution.residual < 1e-6);
        assert_eq!(solution.method, ChiefMethod::GridBrentHybrid);
        // Emission is pinned to the field point on the object plane.
        assert_eq!(solution.emission_pos, Vec3::new(0.0, 5.0, 0.0));
        // The ray must aim downward to cross the axis at the stop.
        assert!(solution.direction.y() < 0.0);
    }

    #[test]
    fn test_tilted_infinite_chief() {
        let system = front_stop_system();
        let field = ObjectField::Angle {
            alpha_x: 5.0,
            alpha_y: 0.0,
        };

        let solution =
            solve_chief(&system, &field, 0.5876, &ChiefOptions::default()).unwrap();

        assert!(solution.residual < 1e-6);
        assert_eq!(solution.method, ChiefMethod::GridBrentHybrid);
        assert_eq!(solution.emission_pos.z(), -25.0);
        // Direction is fixed by the field angle, not solved.
        assert_abs_diff_eq!(
            solution.direction.x(),
            (5.0 as Float).to_radians().sin(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_stage_residuals_are_monotone() {
        let system = finite_singlet();
        let field = ObjectField::Point { x: 2.0, y: -3.0 };

        let solution =
            solve_chief(&system, &field, 0.5876, &ChiefOptions::default()).unwrap();

        for pair in solution.stage_residuals.windows(2) {
            assert!(
                pair[1] <= pair[0],
                "stage residuals regressed: {:?}",
                solution.stage_residuals
            );
        }
    }

    #[test]
    fn test_point_field_with_infinite_object_is_a_config_error() {
        let system = front_stop_system();
        let field = ObjectField::Point { x: 0.0, y: 1.0 };

        let result = solve_chief(&system, &field, 0.5876, &ChiefOptions::default());
        assert!(matches!(result, Err(ChiefError::Configuration(_))));
    }

    #[test]
    fn test_stop_unreachable_when_everything_vignettes() {
        // A tiny first-surface aperture far off the object's line of sight.
        let specs = vec![
            SurfaceSpec::object(ApertureShape::unbounded(), 100.0),
            SurfaceSpec::standard(
                AsphericProfile::plane(),
                ApertureShape::Circular { semidia: 0.1 },
                Material::Air,
                10.0,
            ),
            SurfaceSpec::stop(
                ApertureShape::Circular { semidia: 5.0 },
                Material::Air,
                10.0,
            ),
            SurfaceSpec::image(ApertureShape::unbounded()),
        ];
        let system = OpticalSystem::new(specs, index_model()).unwrap();

        // An object point so far off axis that no aim direction clears the
        // pinhole and still reaches the stop plane going forward.
        let field = ObjectField::Point { x: 0.0, y: 4000.0 };
        let opts = ChiefOptions {
            object_index: 3,
            ..ChiefOptions::default()
        };

        match solve_chief(&system, &field, 0.5876, &opts) {
            Err(ChiefError::StopUnreachable { object_index }) => {
                assert_eq!(object_index, 3)
            }
            other => panic!("expected StopUnreachable, got {:?}", other),
        }
    }

    #[test]
    fn test_chief_cache_reuses_and_invalidates() {
        let system = finite_singlet();
        let field = ObjectField::Point { x: 0.0, y: 0.0 };
        let opts = ChiefOptions::default();

        let mut cache = ChiefCache::new();
        let first = cache.get_or_solve(&system, &field, 0.5876, &opts).unwrap();
        let second = cache.get_or_solve(&system, &field, 0.5876, &opts).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(first.residual.to_bits(), second.residual.to_bits());

        // A different wavelength is a different cache entry.
        cache.get_or_solve(&system, &field, 0.6563, &opts).unwrap();
        assert_eq!(cache.len(), 2);
    }
}

//! Sequential ray tracing through an optical system.
pub(crate) mod intersect;
mod ray;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::backend::{NumericsBackend, SagSource};
use crate::core::{Float, math::vec3::Vec3};
use crate::errors::TraceError;
use crate::specs::surfaces::SurfaceKind;
use crate::system::OpticalSystem;
use self::intersect::{IntersectFailure, intersect, reflect, refract};

pub use self::ray::Ray;

/// Per-tracer construction options.
#[derive(Clone, Default)]
pub struct TraceOptions {
    /// Collect per-surface diagnostics on the returned path.
    pub debug: bool,
    /// An accelerated sag implementation, if the host has one.
    pub backend: Option<Arc<dyn NumericsBackend>>,
}

impl std::fmt::Debug for TraceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceOptions")
            .field("debug", &self.debug)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

/// A structured diagnostic emitted while tracing.
///
/// Consumers match on the variant; the Display form exists only for logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagnosticEvent {
    SurfaceHit {
        surface: usize,
        x: Float,
        y: Float,
        cos_theta: Float,
        n1: Float,
        n2: Float,
    },
    ApertureBlock {
        surface: usize,
        hit_radius: Float,
        limit: Float,
    },
    /// The numerics backend produced a non-finite value and the pure math
    /// was used instead.
    BackendFallback { surface: usize },
}

impl std::fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SurfaceHit {
                surface,
                x,
                y,
                cos_theta,
                n1,
                n2,
            } => write!(
                f,
                "Surface {}: hit ({}, {}), cos theta {}, n {} -> {}",
                surface, x, y, cos_theta, n1, n2
            ),
            Self::ApertureBlock {
                hit_radius, limit, ..
            } => write!(f, "Hit radius: {}mm > Aperture limit: {}mm", hit_radius, limit),
            Self::BackendFallback { surface } => {
                write!(f, "Numerics backend unavailable at surface {}", surface)
            }
        }
    }
}

/// The trace of one ray: global intersection points for every drawable
/// surface reached, in order.
///
/// Object and coordinate-break rows never contribute a point; use
/// [OpticalSystem::path_index] to map surface indices into this list.
#[derive(Debug, Clone)]
pub struct RayPath {
    points: Vec<Vec3>,
    exit: Ray,
    diagnostics: Vec<DiagnosticEvent>,
}

impl RayPath {
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// The ray state after the last surface reached.
    pub fn exit(&self) -> &Ray {
        &self.exit
    }

    pub fn diagnostics(&self) -> &[DiagnosticEvent] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A trace that terminated early: the truncated path and the reason.
#[derive(Debug, Clone)]
pub struct TraceFailure {
    pub path: RayPath,
    /// The surface at which the ray stopped.
    pub surface: usize,
    pub error: TraceError,
}

impl std::fmt::Display for TraceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for TraceFailure {}

/// A host-supplied cancellation flag, honored between rays.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Traces a ray through the system up to and including `max_surface`
/// (default: the image surface).
///
/// A failure carries the truncated path; nothing is swallowed. The trace of
/// a single ray is atomic: cancellation applies only between rays, at the
/// bundle level.
pub fn trace(
    system: &OpticalSystem,
    ray: &Ray,
    max_surface: Option<usize>,
    opts: &TraceOptions,
) -> Result<RayPath, TraceFailure> {
    let surfaces = system.surfaces();
    let last = max_surface.unwrap_or(surfaces.len() - 1).min(surfaces.len() - 1);
    let model = system.index_model();

    let wavelength = ray.wavelength();
    let mut cur_pos = ray.pos();
    let mut cur_dir = ray.dir();
    let mut points: Vec<Vec3> = Vec::with_capacity(system.drawable_count());
    let mut diagnostics: Vec<DiagnosticEvent> = Vec::new();

    macro_rules! fail {
        ($surface:expr, $error:expr) => {
            return Err(TraceFailure {
                path: RayPath {
                    points,
                    exit: Ray::new_unchecked(cur_pos, cur_dir, wavelength),
                    diagnostics,
                },
                surface: $surface,
                error: $error,
            })
        };
    }

    for i in 1..=last {
        let spec = &surfaces[i];
        // Coordinate breaks are already folded into the frames.
        if !spec.is_drawable() {
            continue;
        }

        let frame = &system.frames()[i];
        let local_pos = frame.to_local(cur_pos);
        let local_dir = frame.dir_to_local(cur_dir);

        let profile = spec.profile();
        let source = SagSource::new(&profile, opts.backend.as_deref());

        let hit = match intersect(&source, local_pos, local_dir) {
            Ok(hit) => hit,
            Err(IntersectFailure::GrazingIncidence) => {
                fail!(i, TraceError::GrazingIncidence { surface: i })
            }
            Err(IntersectFailure::NoIntersection) => {
                fail!(i, TraceError::NoIntersection { surface: i })
            }
            Err(IntersectFailure::BehindSurface) => {
                fail!(i, TraceError::BehindSurface { surface: i })
            }
        };

        if source.fell_back() {
            tracing::warn!(surface = i, "numerics backend returned non-finite sag");
            diagnostics.push(DiagnosticEvent::BackendFallback { surface: i });
        }

        let aperture = spec
            .aperture()
            .expect("drawable surfaces always carry an aperture");
        if !aperture.contains(hit.pos.x(), hit.pos.y()) {
            let hit_radius = hit.pos.transverse_radius();
            let limit = aperture.limit();
            diagnostics.push(DiagnosticEvent::ApertureBlock {
                surface: i,
                hit_radius,
                limit,
            });
            fail!(
                i,
                TraceError::ApertureBlocked {
                    surface: i,
                    hit_radius,
                    aperture_limit: limit,
                    shape: aperture.kind(),
                }
            );
        }

        let global_hit = frame.to_global(hit.pos);

        let n1 = match model.index(system.incoming_medium(i), wavelength) {
            Ok(n) => n,
            Err(e) => fail!(i, TraceError::Configuration(e)),
        };

        let new_local_dir = match &spec.kind {
            SurfaceKind::Standard { material_next, .. }
            | SurfaceKind::Stop { material_next, .. } => {
                let n2 = match model.index(material_next, wavelength) {
                    Ok(n) => n,
                    Err(e) => fail!(i, TraceError::Configuration(e)),
                };
                if opts.debug {
                    diagnostics.push(DiagnosticEvent::SurfaceHit {
                        surface: i,
                        x: hit.pos.x(),
                        y: hit.pos.y(),
                        cos_theta: local_dir.dot(hit.normal).abs(),
                        n1,
                        n2,
                    });
                }
                match refract(local_dir, hit.normal, n1, n2) {
                    Ok(dir) => dir,
                    Err(cos_theta) => fail!(
                        i,
                        TraceError::TotalInternalReflection {
                            surface: i,
                            cos_theta,
                        }
                    ),
                }
            }
            SurfaceKind::Mirror { .. } => {
                if opts.debug {
                    diagnostics.push(DiagnosticEvent::SurfaceHit {
                        surface: i,
                        x: hit.pos.x(),
                        y: hit.pos.y(),
                        cos_theta: local_dir.dot(hit.normal).abs(),
                        n1,
                        n2: -n1,
                    });
                }
                reflect(local_dir, hit.normal)
            }
            SurfaceKind::Image { .. } => {
                if opts.debug {
                    diagnostics.push(DiagnosticEvent::SurfaceHit {
                        surface: i,
                        x: hit.pos.x(),
                        y: hit.pos.y(),
                        cos_theta: local_dir.dot(hit.normal).abs(),
                        n1,
                        n2: n1,
                    });
                }
                local_dir
            }
            SurfaceKind::Object { .. } | SurfaceKind::CoordBreak { .. } => {
                unreachable!("non-drawable surfaces are skipped above")
            }
        };

        // The point joins the path only once the surface interaction has
        // succeeded; a ray lost to TIR contributes nothing at the surface
        // that killed it.
        points.push(global_hit);
        cur_pos = global_hit;
        cur_dir = frame.dir_to_global(new_local_dir);
    }

    Ok(RayPath {
        points,
        exit: Ray::new_unchecked(cur_pos, cur_dir, wavelength),
        diagnostics,
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::specs::materials::{ConstantIndexTable, IndexModel, Material};
    use crate::specs::surfaces::{
        ApertureShape, AsphericProfile, BreakOrder, CoordBreakSpec, SurfaceSpec,
    };

    fn index_model() -> Arc<dyn IndexModel> {
        Arc::new(ConstantIndexTable::new().with("N-BK7", 1.5168))
    }

    fn singlet_specs() -> Vec<SurfaceSpec> {
        vec![
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
        ]
    }

    fn system() -> OpticalSystem {
        OpticalSystem::new(singlet_specs(), index_model()).unwrap()
    }

    fn axial_ray() -> Ray {
        Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), 0.5876).unwrap()
    }

    #[test]
    fn test_axial_ray_stays_on_axis() {
        let system = system();
        let path = trace(&system, &axial_ray(), None, &TraceOptions::default()).unwrap();

        assert_eq!(path.len(), system.drawable_count());
        for point in path.points() {
            assert_abs_diff_eq!(point.x(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(point.y(), 0.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(path.exit().dir().z(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_max_surface_truncates_the_path() {
        let system = system();
        let path = trace(&system, &axial_ray(), Some(2), &TraceOptions::default()).unwrap();

        assert_eq!(path.len(), 2); // first lens surface and the stop
    }

    #[test]
    fn test_marginal_ray_bends_toward_the_axis() {
        let system = system();
        let ray = Ray::new(Vec3::new(0.0, 4.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 0.5876).unwrap();

        let path = trace(&system, &ray, None, &TraceOptions::default()).unwrap();
        let image_hit = path.points().last().unwrap();

        // A positive singlet pulls the ray below its entry height.
        assert!(image_hit.y() < 4.0);
    }

    #[test]
    fn test_blocked_ray_returns_truncated_path() {
        let system = system();
        // Inside the lens aperture, outside the 5 mm stop.
        let ray = Ray::new(Vec3::new(0.0, 9.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 0.5876).unwrap();

        let failure = trace(&system, &ray, None, &TraceOptions::default()).unwrap_err();

        assert_eq!(failure.surface, 2);
        assert!(matches!(
            failure.error,
            TraceError::ApertureBlocked { surface: 2, .. }
        ));
        assert_eq!(failure.path.len(), 1); // only the first lens surface
    }

    #[test]
    fn test_coord_break_emits_no_path_point() {
        let mut specs = singlet_specs();
        specs.insert(
            3,
            SurfaceSpec::coord_break(
                CoordBreakSpec {
                    decenter: Vec3::new(0.0, 1.0, 0.0),
                    tilt: Vec3::zero(),
                    order: BreakOrder::DecenterThenTilt,
                },
                0.0,
            ),
        );
        let plain = system();
        let broken = OpticalSystem::new(specs, index_model()).unwrap();

        let plain_path = trace(&plain, &axial_ray(), None, &TraceOptions::default()).unwrap();
        let broken_path = trace(&broken, &axial_ray(), None, &TraceOptions::default()).unwrap();

        assert_eq!(plain_path.len(), broken_path.len());
    }

    #[test]
    fn test_debug_diagnostics_record_every_surface() {
        let system = system();
        let opts = TraceOptions {
            debug: true,
            backend: None,
        };

        let path = trace(&system, &axial_ray(), None, &opts).unwrap();
        let hits = path
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, DiagnosticEvent::SurfaceHit { .. }))
            .count();

        assert_eq!(hits, system.drawable_count());
    }

    #[test]
    fn test_aperture_block_event_display_form() {
        let event = DiagnosticEvent::ApertureBlock {
            surface: 2,
            hit_radius: 9.0,
            limit: 5.0,
        };
        assert_eq!(event.to_string(), "Hit radius: 9mm > Aperture limit: 5mm");
    }

    #[test]
    fn test_cancel_token_round_trip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }
}

//! The validated, immutable snapshot of an optical system.
pub(crate) mod frames;

use std::sync::Arc;

use crate::core::{Float, fingerprint::fingerprint_specs, math::vec3::Vec3};
use crate::errors::SystemError;
use crate::specs::materials::{IndexModel, Material};
use crate::specs::surfaces::{SurfaceKind, SurfaceSpec};
use self::frames::{SurfaceFrame, compute_frames};

/// A sequential optical system, validated and frozen for tracing.
///
/// Construction computes the surface frames, caches the stop index, and
/// fingerprints the table; all three are immutable afterwards. Hosts that
/// edit the table build a new snapshot, and caches keyed on the fingerprint
/// invalidate themselves.
pub struct OpticalSystem {
    specs: Vec<SurfaceSpec>,
    frames: Vec<SurfaceFrame>,
    /// The medium each surface is approached through.
    incoming: Vec<Material>,
    stop_index: usize,
    fingerprint: u32,
    index_model: Arc<dyn IndexModel>,
}

impl std::fmt::Debug for OpticalSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpticalSystem")
            .field("surfaces", &self.specs.len())
            .field("stop_index", &self.stop_index)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl OpticalSystem {
    pub fn new(
        specs: Vec<SurfaceSpec>,
        index_model: Arc<dyn IndexModel>,
    ) -> Result<Self, SystemError> {
        Self::validate(&specs)?;

        let frames = compute_frames(&specs);
        let incoming = incoming_media(&specs);
        let stop_index = specs
            .iter()
            .position(|s| s.is_stop())
            .ok_or(SystemError::NoStopSurface)?;
        let fingerprint = fingerprint_specs(&specs);

        Ok(Self {
            specs,
            frames,
            incoming,
            stop_index,
            fingerprint,
            index_model,
        })
    }

    pub fn surfaces(&self) -> &[SurfaceSpec] {
        &self.specs
    }

    pub fn frames(&self) -> &[SurfaceFrame] {
        &self.frames
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    /// The center of the stop surface in the global frame.
    pub fn stop_center(&self) -> Vec3 {
        self.frames[self.stop_index].origin
    }

    /// The aperture radius of the stop used for chief-ray targeting.
    pub fn stop_semidia(&self) -> Float {
        self.specs[self.stop_index]
            .aperture()
            .map(|a| a.limit())
            .unwrap_or(Float::INFINITY)
    }

    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    pub fn is_object_at_infinity(&self) -> bool {
        self.specs[0].thickness.is_infinite()
    }

    /// Maps a surface index into the ray-path index space.
    ///
    /// Object and coordinate-break rows emit no path point and map to 0;
    /// drawable surfaces map to their 1-based position among drawable rows.
    pub fn path_index(&self, surface_index: usize) -> usize {
        if surface_index >= self.specs.len() || !self.specs[surface_index].is_drawable() {
            return 0;
        }
        self.specs[..=surface_index]
            .iter()
            .filter(|s| s.is_drawable())
            .count()
    }

    /// The number of surfaces that can contribute a path point.
    pub fn drawable_count(&self) -> usize {
        self.specs.iter().filter(|s| s.is_drawable()).count()
    }

    /// The largest finite aperture limit of any surface, or the stop radius
    /// when every aperture is unbounded.
    pub fn largest_aperture_limit(&self) -> Float {
        self.specs
            .iter()
            .filter_map(|s| s.aperture().map(|a| a.limit()))
            .filter(|limit| limit.is_finite())
            .fold(self.stop_semidia(), |acc, x| acc.max(x))
    }

    pub(crate) fn incoming_medium(&self, surface_index: usize) -> &Material {
        &self.incoming[surface_index]
    }

    pub(crate) fn index_model(&self) -> &dyn IndexModel {
        self.index_model.as_ref()
    }

    fn validate(specs: &[SurfaceSpec]) -> Result<(), SystemError> {
        if specs.len() < 3 {
            return Err(SystemError::InvalidSurface {
                surface: 0,
                reason: "a system needs at least an object, one surface, and an image".to_string(),
            });
        }

        if !matches!(specs[0].kind, SurfaceKind::Object { .. }) {
            return Err(SystemError::InvalidSurface {
                surface: 0,
                reason: "the first surface must be the object".to_string(),
            });
        }

        if !matches!(specs[specs.len() - 1].kind, SurfaceKind::Image { .. }) {
            return Err(SystemError::InvalidSurface {
                surface: specs.len() - 1,
                reason: "the last surface must be the image".to_string(),
            });
        }

        for (i, spec) in specs.iter().enumerate() {
            if spec.thickness.is_nan() {
                return Err(SystemError::BadThickness {
                    surface: i,
                    reason: "thickness is NaN".to_string(),
                });
            }
            if spec.thickness.is_infinite() && i != 0 {
                return Err(SystemError::BadThickness {
                    surface: i,
                    reason: "only the object row may have an infinite thickness".to_string(),
                });
            }

            match &spec.kind {
                SurfaceKind::Standard { profile, .. } | SurfaceKind::Mirror { profile, .. } => {
                    if profile.radius == 0.0 || profile.radius.is_nan() {
                        return Err(SystemError::InvalidSurface {
                            surface: i,
                            reason: "radius must be nonzero (use INF for a plane)".to_string(),
                        });
                    }
                    if !profile.conic.is_finite()
                        || profile.coef.iter().any(|c| !c.is_finite())
                    {
                        return Err(SystemError::InvalidSurface {
                            surface: i,
                            reason: "conic and polynomial coefficients must be finite".to_string(),
                        });
                    }
                }
                SurfaceKind::CoordBreak { transform } => {
                    if !transform.decenter.x().is_finite()
                        || !transform.decenter.y().is_finite()
                        || !transform.decenter.z().is_finite()
                        || !transform.tilt.x().is_finite()
                        || !transform.tilt.y().is_finite()
                        || !transform.tilt.z().is_finite()
                    {
                        return Err(SystemError::BadCoordBreak {
                            surface: i,
                            reason: "decenter and tilt must be finite".to_string(),
                        });
                    }
                }
                _ => {}
            }

            if let Some(aperture) = spec.aperture() {
                if aperture.limit() <= 0.0 || aperture.limit().is_nan() {
                    return Err(SystemError::InvalidSurface {
                        surface: i,
                        reason: "aperture dimensions must be positive".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// The medium each surface is approached through, walking the table from
/// object space.
fn incoming_media(specs: &[SurfaceSpec]) -> Vec<Material> {
    let mut media = Vec::with_capacity(specs.len());
    let mut current = Material::Air;

    for spec in specs {
        media.push(current.clone());
        if let Some(next) = spec.material_next() {
            current = next.clone();
        }
    }

    media
}

//! Pluggable numerics backend.
//!
//! Hosts may install an accelerated sag implementation (historically a WASM
//! shim). The tracer queries it through [SagSource]; any non-finite backend
//! value falls back to the in-crate math so a flaky backend can never change
//! trace results, only slow them down.
use std::cell::Cell;

use crate::core::{Float, math::vec3::Vec3, sag};
use crate::specs::surfaces::{AsphericProfile, SagMode};

/// An accelerated implementation of even-mode aspheric sag.
///
/// `curvature` is the vertex curvature c = 1/R (0 for a plane); `coefs` are
/// the polynomial coefficients of r^4 through r^22. Implementations must be
/// re-entrant and thread-safe.
pub trait NumericsBackend: Send + Sync {
    fn sag(&self, r: Float, curvature: Float, conic: Float, coefs: &[Float; 10]) -> Float;

    /// Pooled evaluation over many radii.
    fn batch_sag(
        &self,
        radii: &[Float],
        curvature: Float,
        conic: Float,
        coefs: &[Float; 10],
    ) -> Vec<Float> {
        radii
            .iter()
            .map(|r| self.sag(*r, curvature, conic, coefs))
            .collect()
    }
}

/// Per-surface sag evaluation with optional backend acceleration.
///
/// Odd-mode profiles always use the pure path; the backend contract only
/// covers even exponents.
pub(crate) struct SagSource<'a> {
    profile: &'a AsphericProfile,
    backend: Option<&'a dyn NumericsBackend>,
    fell_back: Cell<bool>,
}

impl<'a> SagSource<'a> {
    pub(crate) fn new(
        profile: &'a AsphericProfile,
        backend: Option<&'a dyn NumericsBackend>,
    ) -> Self {
        let backend = match profile.mode {
            SagMode::Even => backend,
            SagMode::Odd => None,
        };
        Self {
            profile,
            backend,
            fell_back: Cell::new(false),
        }
    }

    pub(crate) fn sag(&self, r: Float) -> Float {
        if let Some(backend) = self.backend {
            let value = backend.sag(r, self.profile.curvature(), self.profile.conic, &self.profile.coef);
            if value.is_finite() {
                return value;
            }

            let pure = sag::sag(self.profile, r);
            if pure.is_finite() {
                // The backend disagreed with the pure math on a radius the
                // surface actually covers.
                self.fell_back.set(true);
            }
            return pure;
        }

        sag::sag(self.profile, r)
    }

    pub(crate) fn batch_sag(&self, radii: &[Float]) -> Vec<Float> {
        if let Some(backend) = self.backend {
            let values = backend.batch_sag(
                radii,
                self.profile.curvature(),
                self.profile.conic,
                &self.profile.coef,
            );
            return values
                .into_iter()
                .zip(radii.iter())
                .map(|(value, r)| {
                    if value.is_finite() {
                        value
                    } else {
                        let pure = sag::sag(self.profile, *r);
                        if pure.is_finite() {
                            self.fell_back.set(true);
                        }
                        pure
                    }
                })
                .collect();
        }

        radii.iter().map(|r| sag::sag(self.profile, *r)).collect()
    }

    pub(crate) fn dsag_dr(&self, r: Float) -> Float {
        sag::dsag_dr(self.profile, r)
    }

    pub(crate) fn normal_at(&self, x: Float, y: Float) -> Vec3 {
        sag::normal_at(self.profile, x, y)
    }

    /// Whether any evaluation had to ignore the backend.
    pub(crate) fn fell_back(&self) -> bool {
        self.fell_back.get()
    }
}

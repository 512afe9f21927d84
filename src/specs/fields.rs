//! Object field and wavelength specifications.
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_WAVELENGTH, Float, math::vec3::Vec3};

/// Specifies an object field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ObjectField {
    /// A point (x, y) on the object plane, in mm. Finite conjugates only.
    Point { x: Float, y: Float },

    /// Field angles (alpha_x, alpha_y) with respect to the optical axis, in
    /// degrees. Infinite conjugates only.
    Angle { alpha_x: Float, alpha_y: Float },
}

impl ObjectField {
    /// Validate the field specification.
    pub fn validate(&self) -> Result<()> {
        match self {
            ObjectField::Point { x, y } => {
                if !x.is_finite() || !y.is_finite() {
                    anyhow::bail!("Object field points must be finite");
                }
            }
            ObjectField::Angle { alpha_x, alpha_y } => {
                if !alpha_x.is_finite() || !alpha_y.is_finite() {
                    anyhow::bail!("Field angles must be finite");
                }
                if alpha_x.abs() >= 90.0 || alpha_y.abs() >= 90.0 {
                    anyhow::bail!("Field angles must lie in (-90, 90) degrees");
                }
            }
        }
        Ok(())
    }

    /// The propagation direction of an angle field.
    ///
    /// Returns None for point fields; their direction is an unknown solved
    /// by the chief-ray search.
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            ObjectField::Point { .. } => None,
            ObjectField::Angle { alpha_x, alpha_y } => {
                let (sin_x, cos_x) = alpha_x.to_radians().sin_cos();
                let (sin_y, cos_y) = alpha_y.to_radians().sin_cos();
                Some(Vec3::new(sin_x * cos_y, sin_y * cos_x, cos_x * cos_y).normalize())
            }
        }
    }

    /// Whether the field is on the optical axis.
    pub fn is_on_axis(&self) -> bool {
        match self {
            ObjectField::Point { x, y } => *x == 0.0 && *y == 0.0,
            ObjectField::Angle { alpha_x, alpha_y } => *alpha_x == 0.0 && *alpha_y == 0.0,
        }
    }
}

/// A source wavelength in micrometers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WavelengthSpec {
    pub value_um: Float,
    /// The primary wavelength feeds every single-wavelength operation, such
    /// as the chief-ray solve.
    #[serde(default)]
    pub primary: bool,
}

impl WavelengthSpec {
    pub fn validate(&self) -> Result<()> {
        if !self.value_um.is_finite() || self.value_um <= 0.0 {
            anyhow::bail!("Wavelengths must be finite and positive");
        }
        Ok(())
    }
}

/// The wavelength used for single-wavelength operations.
///
/// The first entry flagged primary wins; absent a flag, the first entry;
/// absent any entries, the d-line default.
pub fn primary_wavelength(wavelengths: &[WavelengthSpec]) -> Float {
    wavelengths
        .iter()
        .find(|w| w.primary)
        .or_else(|| wavelengths.first())
        .map(|w| w.value_um)
        .unwrap_or(DEFAULT_WAVELENGTH)
}

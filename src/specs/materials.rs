//! Materials and refractive index lookup.
//!
//! Dispersion data lives outside this crate. Hosts supply an [IndexModel]
//! that resolves a named glass to its refractive index at a wavelength;
//! everything else in the crate consumes indices through that trait.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::Float;
use crate::errors::SystemError;

/// The material filling the gap behind a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Air,
    /// Rays reflect instead of refract; no index is ever looked up.
    Mirror,
    /// A named glass resolved through the host's [IndexModel].
    Named(String),
}

impl Material {
    /// Parses the material cell of a surface row.
    ///
    /// An empty cell means air. The match on "mirror" is case-insensitive
    /// because catalogs disagree on capitalization.
    pub fn from_row_value(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("air") {
            Material::Air
        } else if trimmed.eq_ignore_ascii_case("mirror") {
            Material::Mirror
        } else {
            Material::Named(trimmed.to_string())
        }
    }
}

/// Resolves refractive indices for named materials.
///
/// Implementations must be pure: the same (material, wavelength) pair must
/// always produce the same index during the lifetime of a system snapshot.
pub trait IndexModel: Send + Sync {
    /// The refractive index of a named glass at a wavelength in micrometers.
    fn named_index(&self, name: &str, wavelength_um: Float) -> Result<Float, SystemError>;

    /// The refractive index of any material at a wavelength in micrometers.
    ///
    /// Air is exactly 1. Mirrors never refract, so their index is reported
    /// as 1 and ignored by the tracer.
    fn index(&self, material: &Material, wavelength_um: Float) -> Result<Float, SystemError> {
        match material {
            Material::Air => Ok(1.0),
            Material::Mirror => Ok(1.0),
            Material::Named(name) => self.named_index(name, wavelength_um),
        }
    }
}

/// A dispersion-free index model backed by a name → index map.
///
/// Suitable for tests and for hosts that evaluate their glass catalog
/// elsewhere and hand the core a snapshot of constants.
#[derive(Debug, Clone, Default)]
pub struct ConstantIndexTable {
    indices: HashMap<String, Float>,
}

impl ConstantIndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, index: Float) -> Self {
        self.indices.insert(name.to_string(), index);
        self
    }
}

impl IndexModel for ConstantIndexTable {
    fn named_index(&self, name: &str, _wavelength_um: Float) -> Result<Float, SystemError> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| SystemError::UnknownMaterial {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_air_is_exactly_one() {
        let table = ConstantIndexTable::new();
        assert_eq!(table.index(&Material::Air, 0.5876).unwrap(), 1.0);
    }

    #[test]
    fn test_named_lookup() {
        let table = ConstantIndexTable::new().with("N-BK7", 1.5168);
        let n = table
            .index(&Material::Named("N-BK7".to_string()), 0.5876)
            .unwrap();
        assert_eq!(n, 1.5168);
    }

    #[test]
    fn test_unknown_material_fails() {
        let table = ConstantIndexTable::new();
        let result = table.index(&Material::Named("UNOBTAINIUM".to_string()), 0.5876);
        assert_eq!(
            result,
            Err(SystemError::UnknownMaterial {
                name: "UNOBTAINIUM".to_string()
            })
        );
    }

    #[test]
    fn test_from_row_value() {
        assert_eq!(Material::from_row_value(""), Material::Air);
        assert_eq!(Material::from_row_value("  "), Material::Air);
        assert_eq!(Material::from_row_value("MIRROR"), Material::Mirror);
        assert_eq!(
            Material::from_row_value("N-SF11"),
            Material::Named("N-SF11".to_string())
        );
    }
}

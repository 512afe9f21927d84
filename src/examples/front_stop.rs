//! A biconvex lens behind a front aperture stop, infinite conjugates.
//!
//! Because nothing refracts before the stop, the chief-ray geometric seed
//! is already exact and the solver stages only confirm it.
use std::sync::Arc;

use crate::core::Float;
use crate::specs::materials::{ConstantIndexTable, Material};
use crate::specs::surfaces::{ApertureShape, AsphericProfile, SurfaceSpec};
use crate::system::OpticalSystem;

pub const STOP_SEMIDIA: Float = 5.0;
pub const WAVELENGTH: Float = 0.5876;

pub fn system() -> OpticalSystem {
    let glass = Material::Named("N-BK7".to_string());
    let specs = vec![
        SurfaceSpec::object(ApertureShape::unbounded(), Float::INFINITY),
        SurfaceSpec::stop(
            ApertureShape::Circular {
                semidia: STOP_SEMIDIA,
            },
            Material::Air,
            5.0,
        ),
        SurfaceSpec::standard(
            AsphericProfile::conic(100.0, 0.0),
            ApertureShape::Circular { semidia: 12.5 },
            glass,
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

    let index_model = Arc::new(ConstantIndexTable::new().with("N-BK7", 1.5168));
    OpticalSystem::new(specs, index_model).expect("the example system is valid")
}

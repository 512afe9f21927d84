//! A high-index hemisphere that totally internally reflects off-axis rays
//! at its curved exit face.
use std::sync::Arc;

use crate::core::Float;
use crate::specs::materials::{ConstantIndexTable, Material};
use crate::specs::surfaces::{ApertureShape, AsphericProfile, SurfaceSpec};
use crate::system::OpticalSystem;

pub const GLASS_INDEX: Float = 2.0;
pub const EXIT_RADIUS: Float = -5.0;
pub const WAVELENGTH: Float = 0.5876;

/// The exit surface index in the table.
pub const EXIT_SURFACE: usize = 2;

pub fn system() -> OpticalSystem {
    let glass = Material::Named("S-LAH79".to_string());
    let specs = vec![
        SurfaceSpec::object(ApertureShape::unbounded(), 10.0),
        // The flat entrance doubles as the stop.
        SurfaceSpec::stop(ApertureShape::Circular { semidia: 6.0 }, glass, 5.0),
        SurfaceSpec::standard(
            AsphericProfile::conic(EXIT_RADIUS, 0.0),
            ApertureShape::Circular { semidia: 5.0 },
            Material::Air,
            10.0,
        ),
        SurfaceSpec::image(ApertureShape::unbounded()),
    ];

    let index_model = Arc::new(ConstantIndexTable::new().with("S-LAH79", GLASS_INDEX));
    OpticalSystem::new(specs, index_model).expect("the example system is valid")
}

//! A plane-parallel glass slab behind a front stop, infinite conjugates.
//!
//! Useful because everything about it is analytic: an oblique beam exits
//! parallel to itself, displaced by t sin(theta) (1 - cos(theta) /
//! sqrt(n^2 - sin^2(theta))).
use std::sync::Arc;

use crate::core::Float;
use crate::specs::materials::{ConstantIndexTable, Material};
use crate::specs::surfaces::{ApertureShape, AsphericProfile, SurfaceSpec};
use crate::system::OpticalSystem;

pub const SLAB_THICKNESS: Float = 10.0;
pub const SLAB_INDEX: Float = 1.5;
pub const WAVELENGTH: Float = 0.5876;

pub fn system() -> OpticalSystem {
    let glass = Material::Named("GLASS".to_string());
    let specs = vec![
        SurfaceSpec::object(ApertureShape::unbounded(), Float::INFINITY),
        SurfaceSpec::stop(
            ApertureShape::Circular { semidia: 8.0 },
            Material::Air,
            5.0,
        ),
        SurfaceSpec::standard(
            AsphericProfile::plane(),
            ApertureShape::Circular { semidia: 15.0 },
            glass,
            SLAB_THICKNESS,
        ),
        SurfaceSpec::standard(
            AsphericProfile::plane(),
            ApertureShape::Circular { semidia: 15.0 },
            Material::Air,
            50.0,
        ),
        SurfaceSpec::image(ApertureShape::unbounded()),
    ];

    let index_model = Arc::new(ConstantIndexTable::new().with("GLASS", SLAB_INDEX));
    OpticalSystem::new(specs, index_model).expect("the example system is valid")
}

/// The analytic lateral displacement of a beam crossing the slab at
/// `theta` radians.
pub fn lateral_displacement(theta: Float) -> Float {
    let sin = theta.sin();
    let cos = theta.cos();
    SLAB_THICKNESS * sin * (1.0 - cos / (SLAB_INDEX * SLAB_INDEX - sin * sin).sqrt())
}

//! An f ~ 48 mm biconvex singlet at finite conjugates, with the stop buried
//! between the two lens surfaces.
use std::sync::Arc;

use crate::specs::materials::{ConstantIndexTable, Material};
use crate::specs::surfaces::{
    ApertureShape, AsphericProfile, BreakOrder, CoordBreakSpec, SurfaceSpec,
};
use crate::system::OpticalSystem;
use crate::core::math::vec3::Vec3;

pub const STOP_SEMIDIA: f64 = 5.0;
pub const LENS_SEMIDIA: f64 = 12.5;
pub const WAVELENGTH: f64 = 0.5876;

fn glass() -> Material {
    Material::Named("N-BK7".to_string())
}

fn index_model() -> Arc<ConstantIndexTable> {
    Arc::new(ConstantIndexTable::new().with("N-BK7", 1.5168))
}

fn specs() -> Vec<SurfaceSpec> {
    vec![
        SurfaceSpec::object(ApertureShape::unbounded(), 100.0),
        SurfaceSpec::standard(
            AsphericProfile::conic(50.0, 0.0),
            ApertureShape::Circular {
                semidia: LENS_SEMIDIA,
            },
            glass(),
            2.5,
        ),
        SurfaceSpec::stop(
            ApertureShape::Circular {
                semidia: STOP_SEMIDIA,
            },
            glass(),
            2.5,
        ),
        SurfaceSpec::standard(
            AsphericProfile::conic(-50.0, 0.0),
            ApertureShape::Circular {
                semidia: LENS_SEMIDIA,
            },
            Material::Air,
            95.0,
        ),
        SurfaceSpec::image(ApertureShape::unbounded()),
    ]
}

/// The plain singlet.
pub fn system() -> OpticalSystem {
    OpticalSystem::new(specs(), index_model()).expect("the example system is valid")
}

/// The singlet with its rear surface clipped to a wide, short rectangle, so
/// vertical marginals vignette while horizontal ones survive.
pub fn vignetted_system() -> OpticalSystem {
    let mut specs = specs();
    if let crate::specs::surfaces::SurfaceKind::Standard { aperture, .. } = &mut specs[3].kind {
        *aperture = ApertureShape::Rectangular {
            width: 30.0,
            height: 4.0,
        };
    }
    OpticalSystem::new(specs, index_model()).expect("the example system is valid")
}

/// The singlet with a 1 mm y-decenter applied to everything after the stop.
pub fn decentered_system() -> OpticalSystem {
    let mut specs = specs();
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
    OpticalSystem::new(specs, index_model()).expect("the example system is valid")
}

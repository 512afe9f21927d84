//! Quince is a library for sequential geometric ray tracing and beam
//! generation in optical system design.
//!
//! The central structure is the [OpticalSystem](struct@OpticalSystem): an
//! ordered, validated table of surfaces with their 3D frames computed once
//! and frozen. On top of it the crate offers four operations:
//!
//! - [trace](fn@trace) - propagate a single ray through the system and get
//!   back its intersection path, or a truncated path plus the reason it
//!   stopped.
//! - [solve_chief](fn@solve_chief) - for an object field, find the emission
//!   whose ray pierces the center of the aperture stop.
//! - [find_aperture_boundaries](fn@find_aperture_boundaries) - find how far
//!   the chief emission can be offset in four directions before the beam
//!   vignettes.
//! - [generate_cross_beam](fn@generate_cross_beam) /
//!   [spot_diagram](fn@spot_diagram) - compose chief, marginal, and
//!   interpolated rays into a bundle and project it onto a target surface.
//!
//! Inputs arrive either as [SurfaceSpec](struct@SurfaceSpec) values built in
//! code or as editor-shaped [SurfaceRow](struct@SurfaceRow) records
//! normalized once at the ingest boundary. Refractive indices come from a
//! host-supplied [IndexModel](trait@IndexModel); the crate assumes nothing
//! about dispersion formulas.
//!
//! # Quick Start
//! ```rust
//! use std::sync::Arc;
//!
//! use quince_rs::{
//!     ApertureShape, AsphericProfile, ChiefOptions, ConstantIndexTable, Material, ObjectField,
//!     OpticalSystem, SurfaceSpec, solve_chief,
//! };
//!
//! // A biconvex singlet with the stop buried between its two surfaces.
//! let glass = Material::Named("N-BK7".to_string());
//! let surfaces = vec![
//!     SurfaceSpec::object(ApertureShape::unbounded(), 100.0),
//!     SurfaceSpec::standard(
//!         AsphericProfile::conic(50.0, 0.0),
//!         ApertureShape::Circular { semidia: 12.5 },
//!         glass.clone(),
//!         2.5,
//!     ),
//!     SurfaceSpec::stop(ApertureShape::Circular { semidia: 5.0 }, glass, 2.5),
//!     SurfaceSpec::standard(
//!         AsphericProfile::conic(-50.0, 0.0),
//!         ApertureShape::Circular { semidia: 12.5 },
//!         Material::Air,
//!         95.0,
//!     ),
//!     SurfaceSpec::image(ApertureShape::unbounded()),
//! ];
//!
//! let index_model = Arc::new(ConstantIndexTable::new().with("N-BK7", 1.5168));
//! let system = OpticalSystem::new(surfaces, index_model).unwrap();
//!
//! // Solve the chief ray for an off-axis object point.
//! let field = ObjectField::Point { x: 0.0, y: 5.0 };
//! let chief = solve_chief(&system, &field, 0.5876, &ChiefOptions::default()).unwrap();
//!
//! assert!(chief.residual < 1e-6);
//! ```

mod backend;
mod core;
mod errors;
mod solver;
mod specs;
mod system;
mod trace;
mod views;

// API
pub mod examples;
pub use crate::backend::NumericsBackend;
pub use crate::core::{
    DEFAULT_WAVELENGTH,
    math::{mat3::Mat3, vec3::Vec3},
};
pub use crate::errors::{ChiefError, CrossBeamError, SystemError, TraceError};
pub use crate::solver::{
    boundary::{BoundaryMode, BoundaryOffset, find_aperture_boundaries},
    chief::{ChiefCache, ChiefMethod, ChiefOptions, ChiefQuality, ChiefSolution, solve_chief},
};
pub use crate::specs::{
    fields::{ObjectField, WavelengthSpec, primary_wavelength},
    materials::{ConstantIndexTable, IndexModel, Material},
    rows::{SurfaceRow, rows_into_specs},
    surfaces::{
        ApertureKind, ApertureShape, AsphericProfile, BreakOrder, CoordBreakSpec, SagMode,
        SurfaceKind, SurfaceSpec,
    },
};
pub use crate::system::{
    OpticalSystem,
    frames::{SurfaceFrame, compute_frames},
};
pub use crate::trace::{
    CancelToken, DiagnosticEvent, Ray, RayPath, TraceFailure, TraceOptions, trace,
};
pub use crate::views::{
    cross_beam::{CrossBeam, CrossBeamOptions, CrossType, Role, generate_cross_beam},
    spot::{SpotDiagram, SpotFailure, SpotPoint, spot_diagram},
};

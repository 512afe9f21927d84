//! Vignetting behind the stop: individual marginals fail, the beam
//! survives.
use quince_rs::examples::singlet::{self, WAVELENGTH};
use quince_rs::{
    CancelToken, CrossBeamOptions, ObjectField, Role, TraceError, TraceOptions,
    generate_cross_beam, spot_diagram,
};

/// Index of the rectangular rear lens surface in the vignetted singlet.
const CLIPPED_SURFACE: usize = 3;

#[test]
fn test_vertical_marginals_block_while_horizontal_survive() {
    let system = singlet::vignetted_system();
    let field = ObjectField::Point { x: 0.0, y: 0.0 };

    let beam = generate_cross_beam(
        &system,
        0,
        &field,
        WAVELENGTH,
        &CrossBeamOptions {
            ray_count: 7,
            ..CrossBeamOptions::default()
        },
    )
    .unwrap();

    // ray_count = 7 with symmetric boundaries: the interpolated midpoints
    // coincide with the chief and are skipped.
    assert_eq!(beam.rays.len(), 5);

    let spot = spot_diagram(
        &system,
        &beam,
        system.surfaces().len() - 1,
        &TraceOptions::default(),
        &CancelToken::new(),
    );

    // The wide, short rectangle passes the horizontal marginals and blocks
    // the vertical ones.
    let surviving: Vec<Role> = spot.points.iter().map(|p| p.role).collect();
    assert!(surviving.contains(&Role::Chief));
    assert!(surviving.contains(&Role::LeftMarginal));
    assert!(surviving.contains(&Role::RightMarginal));
    assert_eq!(surviving.len(), 3);

    let blocked: Vec<Role> = spot.failures.iter().map(|f| f.role).collect();
    assert!(blocked.contains(&Role::UpperMarginal));
    assert!(blocked.contains(&Role::LowerMarginal));
    assert_eq!(blocked.len(), 2);

    for failure in &spot.failures {
        assert_eq!(failure.surface, CLIPPED_SURFACE);
        assert!(matches!(
            failure.error,
            TraceError::ApertureBlocked {
                surface: CLIPPED_SURFACE,
                ..
            }
        ));
    }
}

#[test]
fn test_unvignetted_system_keeps_all_marginals() {
    let system = singlet::system();
    let field = ObjectField::Point { x: 0.0, y: 0.0 };

    let beam = generate_cross_beam(
        &system,
        0,
        &field,
        WAVELENGTH,
        &CrossBeamOptions {
            ray_count: 7,
            ..CrossBeamOptions::default()
        },
    )
    .unwrap();

    let spot = spot_diagram(
        &system,
        &beam,
        system.surfaces().len() - 1,
        &TraceOptions::default(),
        &CancelToken::new(),
    );

    assert_eq!(spot.points.len(), 5);
    assert!(spot.failures.is_empty());
}

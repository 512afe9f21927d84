//! A decenter between stop and rear lens: frames shift, paths keep their
//! shape.
use approx::assert_abs_diff_eq;

use quince_rs::examples::singlet::{self, WAVELENGTH};
use quince_rs::{ChiefOptions, ObjectField, Ray, TraceOptions, Vec3, compute_frames, solve_chief, trace};

/// Index of the inserted break row in the decentered singlet.
const BREAK_INDEX: usize = 3;

#[test]
fn test_frames_after_the_break_carry_the_decenter() {
    let plain = singlet::system();
    let decentered = singlet::decentered_system();

    for (i, frame) in decentered.frames().iter().enumerate() {
        if i < BREAK_INDEX {
            assert_abs_diff_eq!(frame.origin.y(), 0.0, epsilon = 1e-12);
        } else {
            assert_abs_diff_eq!(frame.origin.y(), 1.0, epsilon = 1e-12);
        }
    }

    // The break adds a row but no z-extent.
    assert_eq!(decentered.frames().len(), plain.frames().len() + 1);
    assert_abs_diff_eq!(
        decentered.frames().last().unwrap().origin.z(),
        plain.frames().last().unwrap().origin.z(),
        epsilon = 1e-12
    );
}

#[test]
fn test_ray_path_length_is_unchanged() {
    let plain = singlet::system();
    let decentered = singlet::decentered_system();
    let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), WAVELENGTH).unwrap();

    let plain_path = trace(&plain, &ray, None, &TraceOptions::default()).unwrap();
    let decentered_path = trace(&decentered, &ray, None, &TraceOptions::default()).unwrap();

    assert_eq!(plain_path.len(), decentered_path.len());
    assert_eq!(decentered.drawable_count(), plain.drawable_count());
}

#[test]
fn test_decentered_rear_lens_deflects_the_axial_ray() {
    let plain = singlet::system();
    let decentered = singlet::decentered_system();
    let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), WAVELENGTH).unwrap();

    let plain_hit = *trace(&plain, &ray, None, &TraceOptions::default())
        .unwrap()
        .points()
        .last()
        .unwrap();
    let shifted_hit = *trace(&decentered, &ray, None, &TraceOptions::default())
        .unwrap()
        .points()
        .last()
        .unwrap();

    assert_abs_diff_eq!(plain_hit.y(), 0.0, epsilon = 1e-9);
    // The decentered rear surface refracts the axial ray off the axis.
    assert!(shifted_hit.y().abs() > 1e-3);
    assert!(shifted_hit.y().is_finite());
}

#[test]
fn test_chief_still_solves_through_the_break() {
    // The stop sits before the break, so the on-axis chief is unaffected.
    let decentered = singlet::decentered_system();
    let field = ObjectField::Point { x: 0.0, y: 0.0 };

    let chief = solve_chief(&decentered, &field, WAVELENGTH, &ChiefOptions::default()).unwrap();
    assert!(chief.residual < 1e-9);
}

#[test]
fn test_compute_frames_matches_the_snapshot() {
    let system = singlet::decentered_system();
    let recomputed = compute_frames(system.surfaces());

    for (a, b) in system.frames().iter().zip(recomputed.iter()) {
        assert_eq!(a.origin.x().to_bits(), b.origin.x().to_bits());
        assert_eq!(a.origin.y().to_bits(), b.origin.y().to_bits());
        assert_eq!(a.origin.z().to_bits(), b.origin.z().to_bits());
    }
}

#[test]
fn test_path_index_mapping_over_the_break() {
    let system = singlet::decentered_system();

    assert_eq!(system.path_index(0), 0); // object
    assert_eq!(system.path_index(1), 1); // front lens
    assert_eq!(system.path_index(2), 2); // stop
    assert_eq!(system.path_index(BREAK_INDEX), 0); // the break itself
    assert_eq!(system.path_index(4), 3); // rear lens
    assert_eq!(system.path_index(5), 4); // image
}

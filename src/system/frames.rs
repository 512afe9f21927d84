//! Reference frames for 3D positioning of surfaces in a sequential system.
//!
//! Frames are built the way a system is assembled: start at the object and
//! walk the table, advancing along the local z-axis by each row's thickness
//! and letting coordinate breaks re-anchor everything downstream. The
//! alternative of asking the user for global surface coordinates detaches
//! placement from the sequence, which is harder to reason about.
use serde::Serialize;

use crate::core::math::{mat3::Mat3, vec3::Vec3};
use crate::specs::surfaces::{BreakOrder, CoordBreakSpec, SurfaceKind, SurfaceSpec};

/// The position and orientation of a surface in the global frame.
///
/// The rotation maps local coordinates to global ones.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SurfaceFrame {
    pub origin: Vec3,
    #[serde(skip)]
    pub rotation: Mat3,
}

impl SurfaceFrame {
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        self.rotation.transpose() * (p - self.origin)
    }

    pub fn to_global(&self, p: Vec3) -> Vec3 {
        self.origin + self.rotation * p
    }

    pub fn dir_to_local(&self, d: Vec3) -> Vec3 {
        self.rotation.transpose() * d
    }

    pub fn dir_to_global(&self, d: Vec3) -> Vec3 {
        self.rotation * d
    }
}

/// Computes the global frame of every surface in the table.
///
/// The object surface sits at the global origin with an identity rotation.
/// A coordinate break transforms the running frame before its own row is
/// recorded, so `frames[i]` of a break row is the frame it establishes. An
/// infinite object thickness re-roots the first physical surface at the
/// global origin; it is legal nowhere else.
pub fn compute_frames(specs: &[SurfaceSpec]) -> Vec<SurfaceFrame> {
    let mut frames = Vec::with_capacity(specs.len());
    let mut origin = Vec3::zero();
    let mut rotation = Mat3::identity();

    for spec in specs {
        if let SurfaceKind::CoordBreak { transform } = &spec.kind {
            apply_break(transform, &mut origin, &mut rotation);
        }

        frames.push(SurfaceFrame { origin, rotation });

        if spec.thickness.is_infinite() {
            origin = Vec3::zero();
        } else {
            origin += rotation * Vec3::new(0.0, 0.0, spec.thickness);
        }
    }

    frames
}

/// Applies one coordinate break to the running frame.
///
/// The decenter is expressed in the frame current at its application point,
/// which is what makes the two orders genuinely different.
fn apply_break(transform: &CoordBreakSpec, origin: &mut Vec3, rotation: &mut Mat3) {
    let tilt = transform.tilt;

    match transform.order {
        BreakOrder::DecenterThenTilt => {
            *origin += *rotation * transform.decenter;
            *rotation = *rotation
                * (Mat3::rotation_x(tilt.x()) * Mat3::rotation_y(tilt.y()) * Mat3::rotation_z(tilt.z()));
        }
        BreakOrder::TiltThenDecenter => {
            *rotation = *rotation
                * (Mat3::rotation_z(tilt.z()) * Mat3::rotation_y(tilt.y()) * Mat3::rotation_x(tilt.x()));
            *origin += *rotation * transform.decenter;
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::{Float, PI};
    use crate::specs::materials::Material;
    use crate::specs::surfaces::{ApertureShape, AsphericProfile};

    fn plain_system() -> Vec<SurfaceSpec> {
        vec![
            SurfaceSpec::object(ApertureShape::unbounded(), 100.0),
            SurfaceSpec::standard(
                AsphericProfile::conic(50.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Named("N-BK7".to_string()),
                5.0,
            ),
            SurfaceSpec::standard(
                AsphericProfile::conic(-50.0, 0.0),
                ApertureShape::Circular { semidia: 12.5 },
                Material::Air,
                95.0,
            ),
            SurfaceSpec::image(ApertureShape::unbounded()),
        ]
    }

    #[test]
    fn test_frames_accumulate_thickness() {
        let frames = compute_frames(&plain_system());

        assert_eq!(frames[0].origin, Vec3::zero());
        assert_eq!(frames[1].origin, Vec3::new(0.0, 0.0, 100.0));
        assert_eq!(frames[2].origin, Vec3::new(0.0, 0.0, 105.0));
        assert_eq!(frames[3].origin, Vec3::new(0.0, 0.0, 200.0));
    }

    #[test]
    fn test_infinite_object_roots_first_surface_at_origin() {
        let mut specs = plain_system();
        specs[0].thickness = Float::INFINITY;

        let frames = compute_frames(&specs);
        assert_eq!(frames[1].origin, Vec3::zero());
        assert_eq!(frames[2].origin, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_decenter_shifts_downstream_frames() {
        let mut specs = plain_system();
        specs.insert(
            2,
            SurfaceSpec::coord_break(
                CoordBreakSpec {
                    decenter: Vec3::new(0.0, 1.0, 0.0),
                    tilt: Vec3::zero(),
                    order: BreakOrder::DecenterThenTilt,
                },
                0.0,
            ),
        );

        let frames = compute_frames(&specs);

        // Upstream frames untouched.
        assert_eq!(frames[1].origin, Vec3::new(0.0, 0.0, 100.0));
        // The break and everything after it carry the decenter.
        assert_eq!(frames[2].origin, Vec3::new(0.0, 1.0, 105.0));
        assert_eq!(frames[3].origin, Vec3::new(0.0, 1.0, 105.0));
        assert_eq!(frames[4].origin, Vec3::new(0.0, 1.0, 200.0));
    }

    #[test]
    fn test_tilt_redirects_the_advance() {
        // Tilt 90 degrees about x: the local z-axis becomes global -y, so a
        // following thickness advances along -y.
        let specs = vec![
            SurfaceSpec::object(ApertureShape::unbounded(), 10.0),
            SurfaceSpec::coord_break(
                CoordBreakSpec {
                    decenter: Vec3::zero(),
                    tilt: Vec3::new(PI / 2.0, 0.0, 0.0),
                    order: BreakOrder::DecenterThenTilt,
                },
                10.0,
            ),
            SurfaceSpec::image(ApertureShape::unbounded()),
        ];

        let frames = compute_frames(&specs);
        let image = frames[2].origin;

        assert_abs_diff_eq!(image.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(image.y(), -10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(image.z(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_break_orders_differ_when_tilted() {
        let tilt = Vec3::new(0.3, 0.0, 0.0);
        let decenter = Vec3::new(0.0, 2.0, 0.0);

        let build = |order| {
            vec![
                SurfaceSpec::object(ApertureShape::unbounded(), 10.0),
                SurfaceSpec::coord_break(
                    CoordBreakSpec {
                        decenter,
                        tilt,
                        order,
                    },
                    0.0,
                ),
                SurfaceSpec::image(ApertureShape::unbounded()),
            ]
        };

        let dt = compute_frames(&build(BreakOrder::DecenterThenTilt));
        let td = compute_frames(&build(BreakOrder::TiltThenDecenter));

        // Decenter-then-tilt shifts along the pre-tilt axes; tilt-then-
        // decenter shifts along the tilted ones.
        assert_eq!(dt[1].origin, Vec3::new(0.0, 2.0, 10.0));
        assert_ne!(td[1].origin, dt[1].origin);
    }

    #[test]
    fn test_local_global_round_trip() {
        let mut specs = plain_system();
        specs.insert(
            2,
            SurfaceSpec::coord_break(
                CoordBreakSpec {
                    decenter: Vec3::new(0.5, -1.5, 0.2),
                    tilt: Vec3::new(0.1, -0.2, 0.3),
                    order: BreakOrder::TiltThenDecenter,
                },
                1.0,
            ),
        );

        let frames = compute_frames(&specs);
        let p = Vec3::new(1.2, -3.4, 5.6);

        for frame in frames {
            let round_trip = frame.to_local(frame.to_global(p));
            assert_abs_diff_eq!(round_trip.x(), p.x(), epsilon = 1e-12);
            assert_abs_diff_eq!(round_trip.y(), p.y(), epsilon = 1e-12);
            assert_abs_diff_eq!(round_trip.z(), p.z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_compute_frames_is_deterministic() {
        let specs = plain_system();
        let a = compute_frames(&specs);
        let b = compute_frames(&specs);

        for (fa, fb) in a.iter().zip(b.iter()) {
            assert_eq!(fa.origin.x().to_bits(), fb.origin.x().to_bits());
            assert_eq!(fa.origin.y().to_bits(), fb.origin.y().to_bits());
            assert_eq!(fa.origin.z().to_bits(), fb.origin.z().to_bits());
            assert_eq!(fa.rotation, fb.rotation);
        }
    }
}

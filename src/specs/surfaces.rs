//! Surface specifications for sequential optical systems.
use serde::{Deserialize, Serialize};

use crate::core::{Float, math::vec3::Vec3};
use crate::specs::materials::Material;

/// Selects which polynomial exponents an aspheric profile uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SagMode {
    /// Coefficients multiply r^4, r^6, ... r^22.
    Even,
    /// Coefficients multiply r^3, r^5, ... r^21.
    Odd,
}

/// A rotationally symmetric surface profile: conic base plus up to ten
/// polynomial terms.
///
/// An infinite radius means a plane; a radius of exactly zero is rejected
/// when the system is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsphericProfile {
    pub radius: Float,
    pub conic: Float,
    pub coef: [Float; 10],
    pub mode: SagMode,
}

impl AsphericProfile {
    pub fn plane() -> Self {
        Self {
            radius: Float::INFINITY,
            conic: 0.0,
            coef: [0.0; 10],
            mode: SagMode::Even,
        }
    }

    pub fn conic(radius: Float, conic: Float) -> Self {
        Self {
            radius,
            conic,
            coef: [0.0; 10],
            mode: SagMode::Even,
        }
    }

    pub fn is_plane(&self) -> bool {
        self.radius.is_infinite() && self.coef.iter().all(|c| *c == 0.0)
    }

    /// The vertex curvature c = 1/R; zero for a plane.
    pub(crate) fn curvature(&self) -> Float {
        if self.radius.is_infinite() {
            0.0
        } else {
            1.0 / self.radius
        }
    }
}

/// The shape tag of an aperture, without its dimensions.
///
/// Carried on aperture-block errors so consumers can report the shape
/// without owning the full spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApertureKind {
    Circular,
    Square,
    Rectangular,
}

/// The clear aperture of a surface. Dimensions are in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ApertureShape {
    Circular { semidia: Float },
    Square { side: Float },
    Rectangular { width: Float, height: Float },
}

impl ApertureShape {
    /// An aperture that never clips.
    pub fn unbounded() -> Self {
        Self::Circular {
            semidia: Float::INFINITY,
        }
    }

    /// Whether a transverse point in the surface's local frame passes the
    /// aperture.
    pub fn contains(&self, x: Float, y: Float) -> bool {
        match self {
            Self::Circular { semidia } => x * x + y * y <= semidia * semidia,
            Self::Square { side } => x.abs() <= side / 2.0 && y.abs() <= side / 2.0,
            Self::Rectangular { width, height } => {
                x.abs() <= width / 2.0 && y.abs() <= height / 2.0
            }
        }
    }

    /// The radial limit reported on aperture-block diagnostics.
    ///
    /// For non-circular shapes this is the limit of the tighter axis.
    pub fn limit(&self) -> Float {
        match self {
            Self::Circular { semidia } => *semidia,
            Self::Square { side } => side / 2.0,
            Self::Rectangular { width, height } => width.min(*height) / 2.0,
        }
    }

    pub fn kind(&self) -> ApertureKind {
        match self {
            Self::Circular { .. } => ApertureKind::Circular,
            Self::Square { .. } => ApertureKind::Square,
            Self::Rectangular { .. } => ApertureKind::Rectangular,
        }
    }
}

/// The order in which a coordinate break composes its decenter and tilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakOrder {
    DecenterThenTilt,
    TiltThenDecenter,
}

/// A rigid transform applied to the frame of every following surface.
///
/// Tilts are in radians. With [BreakOrder::DecenterThenTilt] the rotation
/// composes intrinsically about z, then y, then x after the decenter;
/// [BreakOrder::TiltThenDecenter] applies the reversed rotation sequence
/// first, so a matched pair of breaks around a tilted element cancels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordBreakSpec {
    pub decenter: Vec3,
    pub tilt: Vec3,
    pub order: BreakOrder,
}

/// The role a surface plays in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// The emitting surface. Always first; never intersected.
    Object { aperture: ApertureShape },

    /// A refracting surface.
    Standard {
        profile: AsphericProfile,
        aperture: ApertureShape,
        material_next: Material,
    },

    /// The aperture stop. Geometrically a plane refracting surface; its
    /// center is the chief-ray target.
    Stop {
        aperture: ApertureShape,
        material_next: Material,
    },

    /// A reflecting surface. Surfaces behind a mirror are laid out with
    /// signed (negative) thicknesses.
    Mirror {
        profile: AsphericProfile,
        aperture: ApertureShape,
        material_next: Material,
    },

    /// The terminal surface. Never refracts.
    Image { aperture: ApertureShape },

    /// A pure frame transform. Emits no path point.
    CoordBreak { transform: CoordBreakSpec },
}

/// One row of the system table: a surface and the signed axial gap to the
/// next surface's origin.
///
/// An infinite thickness is legal only on the object row and means an
/// infinite conjugate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    pub kind: SurfaceKind,
    pub thickness: Float,
}

impl SurfaceSpec {
    pub fn object(aperture: ApertureShape, thickness: Float) -> Self {
        Self {
            kind: SurfaceKind::Object { aperture },
            thickness,
        }
    }

    pub fn standard(
        profile: AsphericProfile,
        aperture: ApertureShape,
        material_next: Material,
        thickness: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::Standard {
                profile,
                aperture,
                material_next,
            },
            thickness,
        }
    }

    pub fn stop(aperture: ApertureShape, material_next: Material, thickness: Float) -> Self {
        Self {
            kind: SurfaceKind::Stop {
                aperture,
                material_next,
            },
            thickness,
        }
    }

    pub fn mirror(
        profile: AsphericProfile,
        aperture: ApertureShape,
        material_next: Material,
        thickness: Float,
    ) -> Self {
        Self {
            kind: SurfaceKind::Mirror {
                profile,
                aperture,
                material_next,
            },
            thickness,
        }
    }

    pub fn image(aperture: ApertureShape) -> Self {
        Self {
            kind: SurfaceKind::Image { aperture },
            thickness: 0.0,
        }
    }

    pub fn coord_break(transform: CoordBreakSpec, thickness: Float) -> Self {
        Self {
            kind: SurfaceKind::CoordBreak { transform },
            thickness,
        }
    }

    /// Whether the surface contributes a point to ray-path output.
    pub fn is_drawable(&self) -> bool {
        !matches!(
            self.kind,
            SurfaceKind::Object { .. } | SurfaceKind::CoordBreak { .. }
        )
    }

    pub fn is_stop(&self) -> bool {
        matches!(self.kind, SurfaceKind::Stop { .. })
    }

    pub fn aperture(&self) -> Option<&ApertureShape> {
        match &self.kind {
            SurfaceKind::Object { aperture }
            | SurfaceKind::Standard { aperture, .. }
            | SurfaceKind::Stop { aperture, .. }
            | SurfaceKind::Mirror { aperture, .. }
            | SurfaceKind::Image { aperture } => Some(aperture),
            SurfaceKind::CoordBreak { .. } => None,
        }
    }

    /// The sag profile used for intersection. Plane-like surfaces (object,
    /// stop, image) intersect as planes.
    pub fn profile(&self) -> AsphericProfile {
        match &self.kind {
            SurfaceKind::Standard { profile, .. } | SurfaceKind::Mirror { profile, .. } => {
                profile.clone()
            }
            _ => AsphericProfile::plane(),
        }
    }

    /// The material behind the surface, when the surface changes media.
    pub fn material_next(&self) -> Option<&Material> {
        match &self.kind {
            SurfaceKind::Standard { material_next, .. }
            | SurfaceKind::Stop { material_next, .. }
            | SurfaceKind::Mirror { material_next, .. } => Some(material_next),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_circular_aperture_contains() {
        let ap = ApertureShape::Circular { semidia: 2.0 };
        assert!(ap.contains(1.0, 1.0));
        assert!(ap.contains(0.0, 2.0));
        assert!(!ap.contains(1.5, 1.5));
    }

    #[test]
    fn test_square_aperture_contains_corner() {
        let ap = ApertureShape::Square { side: 4.0 };
        // A square admits corner points a circle of the same half-width
        // would clip.
        assert!(ap.contains(2.0, 2.0));
        assert!(!ap.contains(2.1, 0.0));
    }

    #[test]
    fn test_rectangular_aperture_limit_is_tighter_axis() {
        let ap = ApertureShape::Rectangular {
            width: 30.0,
            height: 4.0,
        };
        assert!(ap.contains(14.0, 1.9));
        assert!(!ap.contains(0.0, 2.1));
        assert_eq!(ap.limit(), 2.0);
    }

    #[test]
    fn test_unbounded_aperture_never_clips() {
        let ap = ApertureShape::unbounded();
        assert!(ap.contains(1e9, -1e9));
    }

    #[test]
    fn test_plane_profile() {
        let plane = AsphericProfile::plane();
        assert!(plane.is_plane());
        assert_eq!(plane.curvature(), 0.0);

        let sphere = AsphericProfile::conic(50.0, 0.0);
        assert!(!sphere.is_plane());
        assert_eq!(sphere.curvature(), 0.02);
    }

    #[test]
    fn test_drawable_surfaces() {
        let object = SurfaceSpec::object(ApertureShape::unbounded(), 10.0);
        let stop = SurfaceSpec::stop(
            ApertureShape::Circular { semidia: 5.0 },
            Material::Air,
            5.0,
        );
        let cb = SurfaceSpec::coord_break(
            CoordBreakSpec {
                decenter: Vec3::zero(),
                tilt: Vec3::zero(),
                order: BreakOrder::DecenterThenTilt,
            },
            0.0,
        );

        assert!(!object.is_drawable());
        assert!(stop.is_drawable());
        assert!(!cb.is_drawable());
    }
}

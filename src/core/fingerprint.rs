//! System fingerprinting for cache invalidation.
//!
//! A 32-bit FNV-1a hash over the ordered, normalized surface table keys the
//! frame and chief-ray caches. Two snapshots with the same fingerprint are
//! treated as the same system.
use crate::core::Float;
use crate::specs::surfaces::{ApertureShape, SurfaceKind, SurfaceSpec};

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

pub(crate) struct Fnv1a32 {
    hash: u32,
}

impl Fnv1a32 {
    pub(crate) fn new() -> Self {
        Self {
            hash: FNV_OFFSET_BASIS,
        }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash ^= u32::from(*byte);
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.write(&[value]);
    }

    pub(crate) fn write_f64(&mut self, value: Float) {
        self.write(&value.to_bits().to_le_bytes());
    }

    pub(crate) fn finish(&self) -> u32 {
        self.hash
    }
}

/// Fingerprints an ordered surface table.
pub(crate) fn fingerprint_specs(specs: &[SurfaceSpec]) -> u32 {
    let mut hasher = Fnv1a32::new();

    for spec in specs {
        hasher.write_f64(spec.thickness);

        match &spec.kind {
            SurfaceKind::Object { aperture } => {
                hasher.write_u8(0);
                write_aperture(&mut hasher, aperture);
            }
            SurfaceKind::Standard {
                profile,
                aperture,
                material_next,
            } => {
                hasher.write_u8(1);
                hasher.write_f64(profile.radius);
                hasher.write_f64(profile.conic);
                for c in profile.coef.iter() {
                    hasher.write_f64(*c);
                }
                hasher.write_u8(matches!(
                    profile.mode,
                    crate::specs::surfaces::SagMode::Odd
                ) as u8);
                write_aperture(&mut hasher, aperture);
                write_material(&mut hasher, material_next);
            }
            SurfaceKind::Stop {
                aperture,
                material_next,
            } => {
                hasher.write_u8(2);
                write_aperture(&mut hasher, aperture);
                write_material(&mut hasher, material_next);
            }
            SurfaceKind::Mirror {
                profile,
                aperture,
                material_next,
            } => {
                hasher.write_u8(3);
                hasher.write_f64(profile.radius);
                hasher.write_f64(profile.conic);
                for c in profile.coef.iter() {
                    hasher.write_f64(*c);
                }
                hasher.write_u8(matches!(
                    profile.mode,
                    crate::specs::surfaces::SagMode::Odd
                ) as u8);
                write_aperture(&mut hasher, aperture);
                write_material(&mut hasher, material_next);
            }
            SurfaceKind::Image { aperture } => {
                hasher.write_u8(4);
                write_aperture(&mut hasher, aperture);
            }
            SurfaceKind::CoordBreak { transform } => {
                hasher.write_u8(5);
                hasher.write_f64(transform.decenter.x());
                hasher.write_f64(transform.decenter.y());
                hasher.write_f64(transform.decenter.z());
                hasher.write_f64(transform.tilt.x());
                hasher.write_f64(transform.tilt.y());
                hasher.write_f64(transform.tilt.z());
                hasher.write_u8(matches!(
                    transform.order,
                    crate::specs::surfaces::BreakOrder::TiltThenDecenter
                ) as u8);
            }
        }
    }

    hasher.finish()
}

fn write_aperture(hasher: &mut Fnv1a32, aperture: &ApertureShape) {
    match aperture {
        ApertureShape::Circular { semidia } => {
            hasher.write_u8(0);
            hasher.write_f64(*semidia);
        }
        ApertureShape::Square { side } => {
            hasher.write_u8(1);
            hasher.write_f64(*side);
        }
        ApertureShape::Rectangular { width, height } => {
            hasher.write_u8(2);
            hasher.write_f64(*width);
            hasher.write_f64(*height);
        }
    }
}

fn write_material(hasher: &mut Fnv1a32, material: &crate::specs::materials::Material) {
    use crate::specs::materials::Material;

    match material {
        Material::Air => hasher.write_u8(0),
        Material::Mirror => hasher.write_u8(1),
        Material::Named(name) => {
            hasher.write_u8(2);
            hasher.write(name.as_bytes());
        }
    }
}

//! A single ray traced through an optical system.
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::{Float, math::vec3::Vec3};

/// A ray: position in mm, unit direction, wavelength in micrometers.
///
/// Rays are cheap value types; nothing in the crate shares or mutates them
/// across traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ray {
    pos: Vec3,
    dir: Vec3,
    wavelength: Float,
}

impl Ray {
    pub fn new(pos: Vec3, dir: Vec3, wavelength: Float) -> Result<Self> {
        if !dir.is_unit() {
            bail!("Ray direction must be a unit vector");
        }
        if !wavelength.is_finite() || wavelength <= 0.0 {
            bail!("Ray wavelength must be finite and positive");
        }
        Ok(Self {
            pos,
            dir,
            wavelength,
        })
    }

    /// Constructs a ray whose direction is already known to be unit length.
    pub(crate) fn new_unchecked(pos: Vec3, dir: Vec3, wavelength: Float) -> Self {
        Self {
            pos,
            dir,
            wavelength,
        }
    }

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn dir(&self) -> Vec3 {
        self.dir
    }

    pub fn wavelength(&self) -> Float {
        self.wavelength
    }

    /// The point a distance t along the ray.
    pub fn at(&self, t: Float) -> Vec3 {
        self.pos + self.dir * t
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ray_new() {
        let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), 0.5876);
        assert!(ray.is_ok());
    }

    #[test]
    fn test_ray_new_non_unit_dir() {
        let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 2.0), 0.5876);
        assert!(ray.is_err());
    }

    #[test]
    fn test_ray_new_bad_wavelength() {
        let dir = Vec3::new(0.0, 0.0, 1.0);
        assert!(Ray::new(Vec3::zero(), dir, 0.0).is_err());
        assert!(Ray::new(Vec3::zero(), dir, Float::NAN).is_err());
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 2.0), Vec3::new(0.0, 0.0, 1.0), 0.5876).unwrap();
        assert_eq!(ray.at(3.0), Vec3::new(0.0, 1.0, 5.0));
    }
}

//! The canonical surface-row schema at the ingest boundary.
//!
//! Table editors ship rows with loosely typed cells: thickness may be the
//! string "INF", tilts arrive in degrees, and aperture fields use the
//! editor's historical names. All of that is normalized exactly once, here;
//! past this point the crate only sees [SurfaceSpec] values.
use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{Float, math::vec3::Vec3};
use crate::specs::materials::Material;
use crate::specs::surfaces::{
    ApertureShape, AsphericProfile, BreakOrder, CoordBreakSpec, SagMode, SurfaceSpec,
};

/// One row of the surface table, as serialized by the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceRow {
    pub object_type: String,

    /// One of "even", "odd", "plane", or "Coord Break".
    #[serde(default)]
    pub surf_type: Option<String>,

    #[serde(default = "infinity", deserialize_with = "num_or_inf")]
    pub radius: Float,

    #[serde(default)]
    pub conic: Float,

    #[serde(default)]
    pub coef1: Float,
    #[serde(default)]
    pub coef2: Float,
    #[serde(default)]
    pub coef3: Float,
    #[serde(default)]
    pub coef4: Float,
    #[serde(default)]
    pub coef5: Float,
    #[serde(default)]
    pub coef6: Float,
    #[serde(default)]
    pub coef7: Float,
    #[serde(default)]
    pub coef8: Float,
    #[serde(default)]
    pub coef9: Float,
    #[serde(default)]
    pub coef10: Float,

    /// A number, or the string "INF" on the object row.
    #[serde(default, deserialize_with = "num_or_inf")]
    pub thickness: Float,

    #[serde(default)]
    pub material: String,

    #[serde(default)]
    pub semidia: Option<Float>,

    #[serde(rename = "_apertureShape", default)]
    pub aperture_shape: Option<String>,

    #[serde(rename = "_apertureWidth", default)]
    pub aperture_width: Option<Float>,

    #[serde(rename = "_apertureHeight", default)]
    pub aperture_height: Option<Float>,

    #[serde(rename = "decenterX", default)]
    pub decenter_x: Float,
    #[serde(rename = "decenterY", default)]
    pub decenter_y: Float,
    #[serde(rename = "decenterZ", default)]
    pub decenter_z: Float,

    /// Tilts are in degrees in the row schema and converted here.
    #[serde(rename = "tiltX", default)]
    pub tilt_x: Float,
    #[serde(rename = "tiltY", default)]
    pub tilt_y: Float,
    #[serde(rename = "tiltZ", default)]
    pub tilt_z: Float,

    /// 0 = decenter then tilt, 1 = tilt then decenter.
    #[serde(default)]
    pub order: u8,
}

fn infinity() -> Float {
    Float::INFINITY
}

/// Accepts a number or the strings "INF" / "Infinity".
fn num_or_inf<'de, D>(deserializer: D) -> Result<Float, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(Float),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(value) => Ok(value),
        Raw::Text(text) => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("inf") || trimmed.eq_ignore_ascii_case("infinity") {
                Ok(Float::INFINITY)
            } else {
                trimmed.parse::<Float>().map_err(serde::de::Error::custom)
            }
        }
    }
}

impl SurfaceRow {
    /// Converts the row into a canonical surface spec.
    pub fn into_spec(self) -> Result<SurfaceSpec> {
        let aperture = self.aperture()?;
        let material = Material::from_row_value(&self.material);

        let spec = match self.object_type.as_str() {
            "Object" => SurfaceSpec::object(aperture, self.thickness),
            "Standard" => {
                SurfaceSpec::standard(self.profile()?, aperture, material, self.thickness)
            }
            "Stop" => SurfaceSpec::stop(aperture, material, self.thickness),
            "Mirror" => SurfaceSpec::mirror(self.profile()?, aperture, material, self.thickness),
            "Image" => SurfaceSpec::image(aperture),
            "CoordBreak" | "Coord Break" => {
                let order = match self.order {
                    0 => BreakOrder::DecenterThenTilt,
                    1 => BreakOrder::TiltThenDecenter,
                    other => bail!("Unknown coordinate break order: {}", other),
                };
                SurfaceSpec::coord_break(
                    CoordBreakSpec {
                        decenter: Vec3::new(self.decenter_x, self.decenter_y, self.decenter_z),
                        tilt: Vec3::new(
                            self.tilt_x.to_radians(),
                            self.tilt_y.to_radians(),
                            self.tilt_z.to_radians(),
                        ),
                        order,
                    },
                    self.thickness,
                )
            }
            other => bail!("Unknown object type: {}", other),
        };

        Ok(spec)
    }

    fn profile(&self) -> Result<AsphericProfile> {
        let mode = match self.surf_type.as_deref() {
            Some("even") => SagMode::Even,
            Some("odd") => SagMode::Odd,
            Some("plane") => return Ok(AsphericProfile::plane()),
            // Rows predating the surf_type column are conics.
            None => {
                if self.radius.is_infinite() {
                    return Ok(AsphericProfile::plane());
                }
                SagMode::Even
            }
            Some(other) => bail!("Unknown surface type: {}", other),
        };

        Ok(AsphericProfile {
            radius: self.radius,
            conic: self.conic,
            coef: [
                self.coef1,
                self.coef2,
                self.coef3,
                self.coef4,
                self.coef5,
                self.coef6,
                self.coef7,
                self.coef8,
                self.coef9,
                self.coef10,
            ],
            mode,
        })
    }

    fn aperture(&self) -> Result<ApertureShape> {
        let semidia = self.semidia.unwrap_or(Float::INFINITY);

        let shape = match self.aperture_shape.as_deref() {
            None | Some("Circular") => ApertureShape::Circular { semidia },
            Some("Square") => {
                let side = self
                    .aperture_width
                    .or(self.aperture_height)
                    .unwrap_or(2.0 * semidia);
                ApertureShape::Square { side }
            }
            Some("Rectangular") => {
                let width = self.aperture_width.unwrap_or(2.0 * semidia);
                let height = self.aperture_height.unwrap_or(2.0 * semidia);
                ApertureShape::Rectangular { width, height }
            }
            Some(other) => bail!("Unknown aperture shape: {}", other),
        };

        Ok(shape)
    }
}

/// Converts an ordered row list into specs, failing on the first bad row.
pub fn rows_into_specs(rows: Vec<SurfaceRow>) -> Result<Vec<SurfaceSpec>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_spec()
                .map_err(|e| e.context(format!("surface row {}", i)))
        })
        .collect()
}

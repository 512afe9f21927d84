//! Cross-beam generation.
//!
//! A cross beam is the structured bundle used for aberration evaluation:
//! the chief ray, the four directional marginals found by the boundary
//! search, and evenly interpolated rays between opposing marginals. All
//! rays share the chief direction; only their emission points differ.
use serde::Serialize;

use crate::core::{Float, math::vec3::Vec3};
use crate::errors::CrossBeamError;
use crate::solver::boundary::{BoundaryMode, BoundaryOffset, chief_basis, find_aperture_boundaries};
use crate::solver::chief::{ChiefOptions, ChiefSolution, solve_chief};
use crate::specs::fields::ObjectField;
use crate::system::OpticalSystem;
use crate::trace::Ray;

/// Interpolated positions closer than this to the chief emission are
/// dropped as duplicates.
const DUPLICATE_TOL: Float = 1e-9;

/// The role a ray plays within a cross beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Chief,
    UpperMarginal,
    LowerMarginal,
    LeftMarginal,
    RightMarginal,
    /// The i-th interpolated ray of the vertical bundle.
    VerticalCross(usize),
    /// The i-th interpolated ray of the horizontal bundle.
    HorizontalCross(usize),
}

/// Which bundles a cross beam carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossType {
    Both,
    Vertical,
    Horizontal,
}

/// Options for cross-beam generation.
#[derive(Debug, Clone)]
pub struct CrossBeamOptions {
    /// Total requested rays; each bundle gets floor(ray_count / 2) of them.
    /// Must be at least 3.
    pub ray_count: usize,

    pub cross_type: CrossType,

    pub pupil_mode: BoundaryMode,

    /// The surface the boundary search must reach; defaults per mode.
    pub target_surface: Option<usize>,

    pub chief: ChiefOptions,
}

impl Default for CrossBeamOptions {
    fn default() -> Self {
        Self {
            ray_count: 9,
            cross_type: CrossType::Both,
            pupil_mode: BoundaryMode::Stop,
            target_surface: None,
            chief: ChiefOptions::default(),
        }
    }
}

/// A generated cross beam for one object field.
#[derive(Debug, Clone)]
pub struct CrossBeam {
    pub object_index: usize,
    pub object_field: ObjectField,
    pub chief: ChiefSolution,
    pub rays: Vec<Ray>,
    pub ray_roles: Vec<Role>,
}

impl CrossBeam {
    /// The rays of the beam paired with their roles.
    pub fn tagged_rays(&self) -> impl Iterator<Item = (&Ray, Role)> {
        self.rays.iter().zip(self.ray_roles.iter().copied())
    }

    pub fn role_count(&self, role: Role) -> usize {
        self.ray_roles.iter().filter(|r| **r == role).count()
    }
}

/// Generates the cross beam for one object field.
///
/// A boundary direction that reports no offset drops its marginal ray (and
/// the interpolated rays that would need it) without failing the beam; a
/// chief-solve failure fails the whole object.
pub fn generate_cross_beam(
    system: &OpticalSystem,
    object_index: usize,
    field: &ObjectField,
    wavelength: Float,
    options: &CrossBeamOptions,
) -> Result<CrossBeam, CrossBeamError> {
    if options.ray_count < 3 {
        return Err(CrossBeamError::BadRayCount(options.ray_count));
    }

    let mut chief_opts = options.chief.clone();
    chief_opts.object_index = object_index;
    let chief = solve_chief(system, field, wavelength, &chief_opts)?;

    let boundaries = find_aperture_boundaries(
        system,
        &chief,
        wavelength,
        options.pupil_mode,
        options.target_surface,
        &options.chief.trace,
    );
    let (e_u, e_v) = chief_basis(chief.direction);

    let mut rays = vec![Ray::new_unchecked(
        chief.emission_pos,
        chief.direction,
        wavelength,
    )];
    let mut roles = vec![Role::Chief];

    let per_bundle = options.ray_count / 2;

    if matches!(options.cross_type, CrossType::Both | CrossType::Vertical) {
        emit_bundle(
            &chief,
            wavelength,
            e_v,
            &boundaries[0],
            &boundaries[1],
            (Role::UpperMarginal, Role::LowerMarginal),
            Role::VerticalCross,
            per_bundle,
            &mut rays,
            &mut roles,
        );
    }
    if matches!(options.cross_type, CrossType::Both | CrossType::Horizontal) {
        emit_bundle(
            &chief,
            wavelength,
            e_u,
            &boundaries[2],
            &boundaries[3],
            (Role::RightMarginal, Role::LeftMarginal),
            Role::HorizontalCross,
            per_bundle,
            &mut rays,
            &mut roles,
        );
    }

    tracing::debug!(
        object = object_index,
        rays = rays.len(),
        "cross beam generated"
    );

    Ok(CrossBeam {
        object_index,
        object_field: *field,
        chief,
        rays,
        ray_roles: roles,
    })
}

/// Emits one bundle: two marginals plus interpolated rays between them.
///
/// Interpolation is linear in 3D position between the marginal emissions; a
/// sample landing on the chief emission is skipped rather than duplicated.
#[allow(clippy::too_many_arguments)]
fn emit_bundle(
    chief: &ChiefSolution,
    wavelength: Float,
    axis: Vec3,
    positive: &BoundaryOffset,
    negative: &BoundaryOffset,
    marginal_roles: (Role, Role),
    cross_role: fn(usize) -> Role,
    per_bundle: usize,
    rays: &mut Vec<Ray>,
    roles: &mut Vec<Role>,
) {
    let positive_pos = positive
        .offset
        .map(|s| chief.emission_pos + axis * s);
    let negative_pos = negative
        .offset
        .map(|s| chief.emission_pos + axis * -s);

    if let Some(pos) = positive_pos {
        rays.push(Ray::new_unchecked(pos, chief.direction, wavelength));
        roles.push(marginal_roles.0);
    }
    if let Some(pos) = negative_pos {
        rays.push(Ray::new_unchecked(pos, chief.direction, wavelength));
        roles.push(marginal_roles.1);
    }

    // Interpolation needs both endpoints.
    let (Some(start), Some(end)) = (positive_pos, negative_pos) else {
        return;
    };
    if per_bundle < 3 {
        return;
    }

    let mut cross_index = 0;
    for k in 1..per_bundle - 1 {
        let frac = k as Float / (per_bundle - 1) as Float;
        let pos = start + (end - start) * frac;
        if (pos - chief.emission_pos).length() < DUPLICATE_TOL {
            continue;
        }
        rays.push(Ray::new_unchecked(pos, chief.direction, wavelength));
        roles.push(cross_role(cross_index));
        cross_index += 1;
    }
}

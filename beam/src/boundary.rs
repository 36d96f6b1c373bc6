use crate::geometry::Geometry;
use crate::state::{Vec3Quat, Vec3Vec3};
use nalgebra::Vector3;
use rotations::prelude::*;
use serde::{Deserialize, Serialize};

/// Built-in boundary condition cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum BcCase {
    Free,
    /// First node clamped.
    #[default]
    Cantilever,
    /// Translations of the first and last node fixed.
    Pinned,
    ClampedClamped,
    /// First node fixed in translation and driven about the first
    /// element's axis at a constant rate (rad/s).
    RotatingTop { angular_velocity: f64 },
}

fn clamp(u: &mut Vec3Quat, v: &mut Vec3Vec3) {
    u.trans = Vector3::zeros();
    u.rot = Quaternion::IDENTITY;
    v.set_zero();
}

fn pin(u: &mut Vec3Quat, v: &mut Vec3Vec3) {
    u.trans = Vector3::zeros();
    v.trans = Vector3::zeros();
}

/// Overwrites the constrained degrees of freedom of `u` and `v` for time
/// `t`. Unconstrained degrees of freedom are left untouched.
pub fn set_simple_bc(
    bc_case: BcCase,
    t: f64,
    geometry: &impl Geometry,
    u: &mut [Vec3Quat],
    v: &mut [Vec3Vec3],
) {
    let Some(last) = u.len().checked_sub(1) else {
        return;
    };

    match bc_case {
        BcCase::Free => {}
        BcCase::Cantilever => clamp(&mut u[0], &mut v[0]),
        BcCase::Pinned => {
            pin(&mut u[0], &mut v[0]);
            pin(&mut u[last], &mut v[last]);
        }
        BcCase::ClampedClamped => {
            clamp(&mut u[0], &mut v[0]);
            clamp(&mut u[last], &mut v[last]);
        }
        BcCase::RotatingTop { angular_velocity } => {
            pin(&mut u[0], &mut v[0]);
            let axis = if geometry.n_elements() > 0 {
                geometry.reference_triad(0).column(0).into_owned()
            } else {
                Vector3::x()
            };
            u[0].rot = Quaternion::from_pseudo_vector(&(axis * (angular_velocity * t)));
            // the axis is fixed by the rotation, so it reads the same in the body frame
            v[0].rot = axis * angular_velocity;
        }
    }
}

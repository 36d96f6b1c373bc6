use crate::state::{RotationalInertia, Vec3Quat, Vec3Vec3};
use rayon::prelude::*;

/// Advances every node by one central difference step.
///
/// Velocities are updated first from the assembled forces `r` plus the
/// prescribed loads `r_ext`, then translations and triads are advanced with
/// the new velocities. Angular velocities stay in the body frame. The triad
/// is renormalized every step.
///
/// Stable only for `dt` at or below the critical timestep.
pub fn step_central_differences(
    dt: f64,
    u: &mut [Vec3Quat],
    v: &mut [Vec3Vec3],
    m_inv: &[f64],
    j_u: &[RotationalInertia],
    r: &[Vec3Vec3],
    r_ext: &[Vec3Vec3],
) {
    u.par_iter_mut()
        .zip(v.par_iter_mut())
        .zip(m_inv.par_iter())
        .zip(j_u.par_iter())
        .zip(r.par_iter())
        .zip(r_ext.par_iter())
        .for_each(|(((((u, v), m_inv), j_u), r), r_ext)| {
            v.trans += (r.trans + r_ext.trans) * (dt * m_inv);
            u.trans += v.trans * dt;

            let omega = v.rot;
            let gyroscopic = omega.cross(&(j_u.j * omega));
            v.rot += j_u.j_inv * (r.rot + r_ext.rot - gyroscopic) * dt;

            u.rot.exponential_map_body_frame(&(v.rot * dt));
            u.rot.normalize();
        });
}

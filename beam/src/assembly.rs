use crate::config::Config;
use crate::geometry::Geometry;
use crate::state::{BeamSystem, Vec3Quat};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use rotations::prelude::*;

/// Internal forces of one element, spatial frame, acting on its nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementForces {
    pub nodes: (usize, usize),
    pub force_i: Vector3<f64>,
    pub force_j: Vector3<f64>,
    pub moment_i: Vector3<f64>,
    pub moment_j: Vector3<f64>,
    pub strain_energy: f64,
}

/// Element stiffness constants.
#[derive(Debug, Clone, Copy)]
pub struct ElementStiffness {
    pub ea: f64,
    pub gj: f64,
    pub ei: f64,
}

impl ElementStiffness {
    pub fn new(config: &Config, geometry: &impl Geometry, ie: usize) -> Self {
        Self {
            ea: config.youngs_modulus * geometry.a_e(ie),
            gj: config.shear_modulus() * geometry.j_e(ie),
            ei: config.youngs_modulus * geometry.i_e(ie),
        }
    }
}

/// Corotated element frame `[e1 e2 e3]`. `e1` follows the chord, `e2` is
/// the second axis of the mean nodal triad projected off `e1`.
fn element_frame(chord: &Vector3<f64>, mean_triad: &Matrix3<f64>) -> Matrix3<f64> {
    let l = chord.norm();
    let e1 = if l > f64::EPSILON {
        chord / l
    } else {
        // collapsed chord
        mean_triad.column(0).into_owned()
    };

    let t2 = mean_triad.column(1).into_owned();
    let mut e2 = t2 - e1 * e1.dot(&t2);
    if e2.norm() < 1e-12 {
        // mean triad bent a quarter turn off the chord
        let t3 = mean_triad.column(2).into_owned();
        e2 = t3.cross(&e1);
    }
    let e2 = e2.normalize();
    let e3 = e1.cross(&e2);
    Matrix3::from_columns(&[e1, e2, e3])
}

/// Internal forces of element `ie` in the configuration `u`.
pub fn element_internal_forces(
    ie: usize,
    geometry: &impl Geometry,
    stiffness: &ElementStiffness,
    u: &[Vec3Quat],
) -> ElementForces {
    let (i, j) = geometry.element_nodes(ie);
    let l0 = geometry.dx_e(ie);
    let e0 = geometry.reference_triad(ie);

    let chord = (geometry.x0(j) + u[j].trans) - (geometry.x0(i) + u[i].trans);
    let l = chord.norm().max(f64::EPSILON);

    let qi = u[i].rot;
    let qj = if qi.dot(&u[j].rot) < 0.0 {
        -u[j].rot
    } else {
        u[j].rot
    };
    let mut q_mean = qi + qj;
    q_mean.normalize();
    let frame = element_frame(&chord, &(q_mean.to_matrix() * e0));

    let local_rotation = |q: &Quaternion| {
        Quaternion::from_matrix(&(frame.transpose() * q.to_matrix() * e0)).to_pseudo_vector()
    };
    let theta_i = local_rotation(&qi);
    let theta_j = local_rotation(&qj);

    let ElementStiffness { ea, gj, ei } = *stiffness;
    let stretch = l - l0;
    let twist = theta_j.x - theta_i.x;
    let axial = ea * stretch / l0;
    let torque = gj * twist / l0;
    let k = ei / l0;

    let m_i = Vector3::new(
        -torque,
        k * (4.0 * theta_i.y + 2.0 * theta_j.y),
        k * (4.0 * theta_i.z + 2.0 * theta_j.z),
    );
    let m_j = Vector3::new(
        torque,
        k * (2.0 * theta_i.y + 4.0 * theta_j.y),
        k * (2.0 * theta_i.z + 4.0 * theta_j.z),
    );

    let e1 = frame.column(0).into_owned();
    let e2 = frame.column(1).into_owned();
    let e3 = frame.column(2).into_owned();

    let moment_i = frame * m_i;
    let moment_j = frame * m_j;
    let moment_sum = moment_i + moment_j;

    // shear carried by the end moments, plus the axial force
    let force_j = e1 * axial + (e3 * moment_sum.dot(&e2) - e2 * moment_sum.dot(&e3)) / l;

    let bending = |a: f64, b: f64| 2.0 * k * (a * a + a * b + b * b);
    let strain_energy = 0.5 * ea * stretch * stretch / l0
        + 0.5 * gj * twist * twist / l0
        + bending(theta_i.y, theta_j.y)
        + bending(theta_i.z, theta_j.z);

    ElementForces {
        nodes: (i, j),
        force_i: -force_j,
        force_j,
        moment_i,
        moment_j,
        strain_energy,
    }
}

/// Fills `system.r` with the static loads minus the internal and damping
/// forces of the current state. Rotational entries are body-frame moments.
///
/// Elements are evaluated in parallel into the system's element buffer and
/// scattered onto the nodes afterwards on the calling thread.
///
/// # Returns
///
/// The total strain energy of the current configuration.
pub fn assemble(config: &Config, geometry: &impl Geometry, system: &mut BeamSystem) -> f64 {
    let u = &system.u;
    system
        .element_forces
        .par_iter_mut()
        .enumerate()
        .for_each(|(ie, forces)| {
            let stiffness = ElementStiffness::new(config, geometry, ie);
            *forces = element_internal_forces(ie, geometry, &stiffness, u);
        });

    system
        .r
        .par_iter_mut()
        .zip(system.r_static.par_iter())
        .zip(system.v.par_iter())
        .zip(system.m_inv.par_iter())
        .zip(system.j_u.par_iter())
        .for_each(|((((r, r_static), v), m_inv), j_u)| {
            *r = *r_static;
            if config.damping > 0.0 {
                if *m_inv > 0.0 {
                    r.trans -= v.trans * (config.damping / m_inv);
                }
                r.rot -= j_u.j * v.rot * config.damping;
            }
        });

    let mut strain_energy = 0.0;
    for forces in &system.element_forces {
        let (i, j) = forces.nodes;
        system.r[i].trans -= forces.force_i;
        system.r[j].trans -= forces.force_j;
        system.r[i].rot -= system.u[i].rot.rotate_vector_reversed(&forces.moment_i);
        system.r[j].rot -= system.u[j].rot.rotate_vector_reversed(&forces.moment_j);
        strain_energy += forces.strain_energy;
    }
    strain_energy
}

/// Strain energy of the configuration `u`, without touching any forces.
pub fn strain_energy(config: &Config, geometry: &impl Geometry, u: &[Vec3Quat]) -> f64 {
    (0..geometry.n_elements())
        .into_par_iter()
        .map(|ie| {
            let stiffness = ElementStiffness::new(config, geometry, ie);
            element_internal_forces(ie, geometry, &stiffness, u).strain_energy
        })
        .sum()
}

use crate::assembly::ElementForces;
use crate::config::Config;
use crate::geometry::Geometry;
use nalgebra::{Matrix3, Vector3};
use rotations::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, SubAssign};

/// Generalized displacement of a node: translation plus the triad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Quat {
    pub trans: Vector3<f64>,
    pub rot: Quaternion,
}

impl Vec3Quat {
    pub fn new(trans: Vector3<f64>, rot: Quaternion) -> Self {
        Self { trans, rot }
    }
}

/// Translational and rotational pair: velocities, forces and moments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Vec3 {
    pub trans: Vector3<f64>,
    pub rot: Vector3<f64>,
}

impl Vec3Vec3 {
    pub fn new(trans: Vector3<f64>, rot: Vector3<f64>) -> Self {
        Self { trans, rot }
    }

    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn set_zero(&mut self) {
        self.trans.fill(0.0);
        self.rot.fill(0.0);
    }
}

impl Add for Vec3Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            trans: self.trans + rhs.trans,
            rot: self.rot + rhs.rot,
        }
    }
}

impl AddAssign for Vec3Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.trans += rhs.trans;
        self.rot += rhs.rot;
    }
}

impl SubAssign for Vec3Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        self.trans -= rhs.trans;
        self.rot -= rhs.rot;
    }
}

impl Mul<f64> for Vec3Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            trans: self.trans * rhs,
            rot: self.rot * rhs,
        }
    }
}

/// Rotational inertia of a node in its body frame, with its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationalInertia {
    pub j: Matrix3<f64>,
    pub j_inv: Matrix3<f64>,
}

impl RotationalInertia {
    /// A singular `j` leaves the inverse at zero, so the node cannot spin.
    pub fn new(j: Matrix3<f64>) -> Self {
        let j_inv = j.try_inverse().unwrap_or_else(Matrix3::zeros);
        Self { j, j_inv }
    }
}

impl Default for RotationalInertia {
    fn default() -> Self {
        Self {
            j: Matrix3::zeros(),
            j_inv: Matrix3::zeros(),
        }
    }
}

/// Nodal state of the whole beam. All vectors are indexed by node, except
/// the element buffer which is indexed by element.
#[derive(Debug, Clone)]
pub struct BeamSystem {
    pub u: Vec<Vec3Quat>,
    pub v: Vec<Vec3Vec3>,
    pub m_inv: Vec<f64>,
    pub j_u: Vec<RotationalInertia>,
    pub r: Vec<Vec3Vec3>,
    pub r_static: Vec<Vec3Vec3>,
    pub(crate) element_forces: Vec<ElementForces>,
}

impl BeamSystem {
    /// Allocates the zeroed state and lumps the element masses onto the
    /// nodes. Each element end receives half the element mass and a
    /// rotational inertia `rho L0 / 2 * E0 diag(J, I', I') E0^T`, where
    /// `I' = max(I, A L0^2 / 12)` keeps the rotational modes of a free
    /// element no stiffer than its bending bound.
    pub fn new(config: &Config, geometry: &impl Geometry) -> Self {
        let n_nodes = geometry.n_nodes();
        let n_elements = geometry.n_elements();

        let mut mass = vec![0.0; n_nodes];
        let mut inertia = vec![Matrix3::zeros(); n_nodes];

        for ie in 0..n_elements {
            let (i, j) = geometry.element_nodes(ie);
            let l0 = geometry.dx_e(ie);
            let area = geometry.a_e(ie);
            let rotary = geometry.i_e(ie).max(area * l0 * l0 / 12.0);
            let e0 = geometry.reference_triad(ie);

            let half = 0.5 * config.density * l0;
            let local = Matrix3::from_diagonal(&Vector3::new(geometry.j_e(ie), rotary, rotary));
            let j_element = e0 * local * e0.transpose() * half;

            for node in [i, j] {
                mass[node] += half * area;
                inertia[node] += j_element;
            }
        }

        let m_inv = mass
            .iter()
            .map(|&m| if m > f64::EPSILON { 1.0 / m } else { 0.0 })
            .collect();

        Self {
            u: vec![Vec3Quat::default(); n_nodes],
            v: vec![Vec3Vec3::zeros(); n_nodes],
            m_inv,
            j_u: inertia.into_iter().map(RotationalInertia::new).collect(),
            r: vec![Vec3Vec3::zeros(); n_nodes],
            r_static: vec![Vec3Vec3::zeros(); n_nodes],
            element_forces: vec![ElementForces::default(); n_elements],
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.u.len()
    }

    /// Lumped translational mass of node `i`, zero for an unattached node.
    pub fn mass(&self, i: usize) -> f64 {
        if self.m_inv[i] > 0.0 {
            1.0 / self.m_inv[i]
        } else {
            0.0
        }
    }

    pub fn total_mass(&self) -> f64 {
        (0..self.n_nodes()).map(|i| self.mass(i)).sum()
    }

    /// Kinetic energy of the current velocities, translational plus
    /// rotational.
    pub fn kinetic_energy(&self) -> f64 {
        self.v
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let omega = v.rot;
                0.5 * self.mass(i) * v.trans.norm_squared()
                    + 0.5 * omega.dot(&(self.j_u[i].j * omega))
            })
            .sum()
    }

    /// Current position of node `i`.
    pub fn position(&self, geometry: &impl Geometry, i: usize) -> Vector3<f64> {
        geometry.x0(i) + self.u[i].trans
    }

    /// Current triad of node `i` as a rotation matrix.
    pub fn triad(&self, i: usize) -> RotationMatrix {
        RotationMatrix::from(&self.u[i].rot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::geometry::{CrossSection, StraightBeam};
    use approx::assert_abs_diff_eq;
    const TOL: f64 = 1e-12;

    fn beam(n_elements: usize) -> (Config, StraightBeam) {
        let config = ConfigBuilder::steel(1.0).build().unwrap();
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = StraightBeam::along_x(1.0, n_elements, section).unwrap();
        (config, geometry)
    }

    #[test]
    fn test_lumped_mass() {
        let (config, geometry) = beam(4);
        let system = BeamSystem::new(&config, &geometry);
        let area = geometry.section().area;
        let element_mass = config.density * area * 0.25;

        assert_eq!(system.n_nodes(), 5);
        assert_abs_diff_eq!(system.mass(0), 0.5 * element_mass, epsilon = TOL);
        assert_abs_diff_eq!(system.mass(2), element_mass, epsilon = TOL);
        assert_abs_diff_eq!(system.mass(4), 0.5 * element_mass, epsilon = TOL);
        assert_abs_diff_eq!(system.total_mass(), config.density * area, epsilon = TOL);
    }

    #[test]
    fn test_rotary_inertia_scaling() {
        let (config, geometry) = beam(1);
        let system = BeamSystem::new(&config, &geometry);
        let section = geometry.section();

        // slender element: A L^2 / 12 dominates the second moment
        let rotary = section.area / 12.0;
        assert!(rotary > section.second_moment);
        let j = system.j_u[1].j;
        assert_abs_diff_eq!(j[(0, 0)], 0.5 * config.density * section.polar_moment, epsilon = TOL);
        assert_abs_diff_eq!(j[(1, 1)], 0.5 * config.density * rotary, epsilon = TOL);
        assert_abs_diff_eq!(j[(2, 2)], 0.5 * config.density * rotary, epsilon = TOL);
        assert_abs_diff_eq!(system.j_u[1].j * system.j_u[1].j_inv, Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_singular_inertia_has_zero_inverse() {
        let inertia = RotationalInertia::new(Matrix3::zeros());
        assert_eq!(inertia.j_inv, Matrix3::zeros());
    }

    #[test]
    fn test_kinetic_energy() {
        let (config, geometry) = beam(2);
        let mut system = BeamSystem::new(&config, &geometry);
        assert_abs_diff_eq!(system.kinetic_energy(), 0.0, epsilon = TOL);

        for v in system.v.iter_mut() {
            v.trans = Vector3::new(0.0, 2.0, 0.0);
        }
        let expected = 0.5 * system.total_mass() * 4.0;
        assert_abs_diff_eq!(system.kinetic_energy(), expected, epsilon = TOL);

        system.v[1].rot = Vector3::new(3.0, 0.0, 0.0);
        let spin = 0.5 * system.j_u[1].j[(0, 0)] * 9.0;
        assert_abs_diff_eq!(system.kinetic_energy(), expected + spin, epsilon = TOL);
    }

    #[test]
    fn test_vec3vec3_arithmetic() {
        let mut a = Vec3Vec3::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.0, 1.0));
        let b = a * 2.0;
        a += b;
        assert_abs_diff_eq!(a.trans, Vector3::new(3.0, 6.0, 9.0), epsilon = TOL);
        a -= b;
        assert_abs_diff_eq!(a.rot, Vector3::new(-1.0, 0.0, 1.0), epsilon = TOL);
        a.set_zero();
        assert_eq!(a, Vec3Vec3::zeros());
    }
}

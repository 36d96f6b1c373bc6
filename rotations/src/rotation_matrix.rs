use super::*;
use crate::quaternion::Quaternion;
use nalgebra::{Matrix3, Vector3};
use std::ops::Mul;
use tolerance::is_close;

/// A 3x3 rotation matrix. Derived on demand from a `Quaternion`, which stays
/// the canonical representation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RotationMatrix(pub Matrix3<f64>);

impl RotationMatrix {
    pub fn get_value(&self) -> Matrix3<f64> {
        self.0
    }

    /// Matrix entries in row-major order.
    pub fn row_major(&self) -> [f64; 9] {
        let m = &self.0;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }
}

impl From<&Quaternion> for RotationMatrix {
    fn from(q: &Quaternion) -> Self {
        Self(q.to_matrix())
    }
}

impl From<&RotationMatrix> for Quaternion {
    fn from(m: &RotationMatrix) -> Self {
        Quaternion::from_matrix(&m.0)
    }
}

impl Mul<RotationMatrix> for RotationMatrix {
    type Output = Self;
    fn mul(self, rhs: RotationMatrix) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl RotationTrait for RotationMatrix {
    fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0 * v
    }

    fn rotate_vector_reversed(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0.tr_mul(v)
    }

    fn inv(&self) -> Self {
        Self(self.0.transpose())
    }

    fn identity() -> Self {
        Self(Matrix3::identity())
    }
}

/// Skew-symmetric cross-product matrix, `skew(a) * b == a × b`.
pub fn skew(a: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -a.z, a.y, a.z, 0.0, -a.x, -a.y, a.x, 0.0)
}

/// True if `r` has unit determinant and `rᵀ == r⁻¹`, both within `tol`.
pub fn is_orthogonal(r: &Matrix3<f64>, tol: f64) -> bool {
    let Some(r_inv) = r.try_inverse() else {
        return false;
    };
    is_close(r.determinant(), 1.0, tol) && is_close((r.transpose() - r_inv).norm(), 0.0, tol)
}

/// Rodrigues' formula for the rotation by `|theta|` about `theta / |theta|`.
pub fn rodrigues(theta: &Vector3<f64>) -> Matrix3<f64> {
    let angle = theta.norm();
    if angle < f64::EPSILON {
        return Matrix3::identity();
    }
    let k = skew(&(theta / angle));
    Matrix3::identity() + k * angle.sin() + k * k * (1.0 - angle.cos())
}

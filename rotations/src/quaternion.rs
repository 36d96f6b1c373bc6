use super::*;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg};

/// Below this rotation angle the pseudo-vector conversions switch to their
/// Taylor series to avoid dividing by the angle.
const SMALL_ANGLE: f64 = 1e-8;

/// A quaternion with scalar part `q0` and vector part `q`.
///
/// When used as a nodal triad it is a unit quaternion describing the rotation
/// relative to the undeformed reference triad.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub q0: f64,
    pub q: Vector3<f64>,
}

impl Quaternion {
    /// Quaternion representing no rotation.
    pub const IDENTITY: Self = Self {
        q0: 1.0,
        q: Vector3::new(0.0, 0.0, 0.0),
    };

    /// Creates a new `Quaternion` from its four components. No normalization
    /// is performed.
    ///
    /// # Arguments
    ///
    /// * `q0` - The scalar component.
    /// * `q1`, `q2`, `q3` - The vector components.
    pub fn new(q0: f64, q1: f64, q2: f64, q3: f64) -> Self {
        Self {
            q0,
            q: Vector3::new(q1, q2, q3),
        }
    }

    /// Builds the unit quaternion of a rotation by `|theta|` about
    /// `theta / |theta|`.
    ///
    /// A zero pseudo-vector gives the identity; small angles use the series
    /// expansion of `sin(|theta|/2) / |theta|` so nothing is divided by zero.
    ///
    /// # Arguments
    ///
    /// * `theta` - The rotation pseudo-vector (axis times angle).
    pub fn from_pseudo_vector(theta: &Vector3<f64>) -> Self {
        let angle_sqr = theta.norm_squared();
        let angle = angle_sqr.sqrt();
        if angle < SMALL_ANGLE {
            let mut quat = Self {
                q0: 1.0 - angle_sqr / 8.0,
                q: theta * (0.5 - angle_sqr / 48.0),
            };
            quat.normalize();
            return quat;
        }
        let half = 0.5 * angle;
        Self {
            q0: half.cos(),
            q: theta * (half.sin() / angle),
        }
    }

    /// Logarithm map, the inverse of `from_pseudo_vector`.
    ///
    /// Returns the rotation vector with an angle in `[0, pi]`. The identity
    /// maps to the zero vector.
    pub fn to_pseudo_vector(&self) -> Vector3<f64> {
        // q and -q are the same rotation, pick the short way around
        let (q0, q) = if self.q0 < 0.0 {
            (-self.q0, -self.q)
        } else {
            (self.q0, self.q)
        };
        let s = q.norm();
        if s < SMALL_ANGLE {
            return q * (2.0 / q0);
        }
        let angle = 2.0 * s.atan2(q0);
        q * (angle / s)
    }

    /// Converts an orthogonal rotation matrix to a unit quaternion.
    ///
    /// The branch is chosen from the largest of the trace and the diagonal
    /// entries so the pivot is never small. The result has `q0 >= 0`.
    ///
    /// # Arguments
    ///
    /// * `m` - The rotation matrix to be converted.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        let trace = m.trace();
        let (m00, m11, m22) = (m[(0, 0)], m[(1, 1)], m[(2, 2)]);

        let mut quat = if trace >= m00 && trace >= m11 && trace >= m22 {
            let q0 = 0.5 * (1.0 + trace).sqrt();
            let f = 0.25 / q0;
            Quaternion::new(
                q0,
                (m[(2, 1)] - m[(1, 2)]) * f,
                (m[(0, 2)] - m[(2, 0)]) * f,
                (m[(1, 0)] - m[(0, 1)]) * f,
            )
        } else if m00 >= m11 && m00 >= m22 {
            let q1 = 0.5 * (1.0 + m00 - m11 - m22).sqrt();
            let f = 0.25 / q1;
            Quaternion::new(
                (m[(2, 1)] - m[(1, 2)]) * f,
                q1,
                (m[(0, 1)] + m[(1, 0)]) * f,
                (m[(0, 2)] + m[(2, 0)]) * f,
            )
        } else if m11 >= m22 {
            let q2 = 0.5 * (1.0 - m00 + m11 - m22).sqrt();
            let f = 0.25 / q2;
            Quaternion::new(
                (m[(0, 2)] - m[(2, 0)]) * f,
                (m[(0, 1)] + m[(1, 0)]) * f,
                q2,
                (m[(1, 2)] + m[(2, 1)]) * f,
            )
        } else {
            let q3 = 0.5 * (1.0 - m00 - m11 + m22).sqrt();
            let f = 0.25 / q3;
            Quaternion::new(
                (m[(1, 0)] - m[(0, 1)]) * f,
                (m[(0, 2)] + m[(2, 0)]) * f,
                (m[(1, 2)] + m[(2, 1)]) * f,
                q3,
            )
        };

        quat.normalize();
        if quat.q0 < 0.0 {
            quat = -quat;
        }
        quat
    }

    /// The rotation matrix `R(q) = (q0² - q·q) I + 2 q qᵀ + 2 q0 [q]×`.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let q0 = self.q0;
        let q = &self.q;
        Matrix3::identity() * (q0 * q0 - q.dot(q))
            + q * q.transpose() * 2.0
            + rotation_matrix::skew(q) * (2.0 * q0)
    }

    /// Hamilton product `self ⊗ a`.
    ///
    /// IMPORTANT: composition convention used throughout the solver.
    /// `to_matrix(self ⊗ a) = to_matrix(self) * to_matrix(a)`, i.e. `a` is a
    /// rotation expressed in the body frame of `self` and is applied after
    /// it. Not commutative.
    ///
    /// # Arguments
    ///
    /// * `a` - The right-hand side quaternion.
    pub fn product(&self, a: &Quaternion) -> Quaternion {
        Quaternion {
            q0: self.q0 * a.q0 - self.q.dot(&a.q),
            q: a.q * self.q0 + self.q * a.q0 + self.q.cross(&a.q),
        }
    }

    /// Updates the rotation in place as `U_{n+1} = U_n ⊗ exp(theta_u)`.
    ///
    /// `theta_u` is an incremental rotation vector expressed in the body
    /// (rotated) frame. Does not renormalize, call `normalize` after
    /// repeated updates.
    pub fn exponential_map_body_frame(&mut self, theta_u: &Vector3<f64>) {
        let increment = Quaternion::from_pseudo_vector(theta_u);
        *self = self.product(&increment);
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            q0: self.q0,
            q: -self.q,
        }
    }

    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.q0 * other.q0 + self.q.dot(&other.q)
    }

    pub fn norm_sqr(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    /// Rescales to unit norm. A zero-magnitude quaternion carries no
    /// rotation information and is reset to the identity.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm < f64::EPSILON {
            *self = Quaternion::IDENTITY;
            return;
        }
        self.q0 /= norm;
        self.q /= norm;
    }
}

impl RotationTrait for Quaternion {
    /// Rotates a vector by the quaternion without forming the matrix.
    /// `v + 2 q0 (q × v) + 2 q × (q × v)`
    fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let t = self.q.cross(v);
        v + t * (2.0 * self.q0) + self.q.cross(&t) * 2.0
    }

    /// Applies the transposed rotation without forming the matrix.
    fn rotate_vector_reversed(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let t = self.q.cross(v);
        v - t * (2.0 * self.q0) + self.q.cross(&t) * 2.0
    }

    fn inv(&self) -> Self {
        // unit quaternion, the conjugate is the inverse
        self.conjugate()
    }

    fn identity() -> Self {
        Self::IDENTITY
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;

    /// Same as `product`, see there for the composition convention.
    fn mul(self, rhs: Self) -> Self {
        self.product(&rhs)
    }
}

impl Mul<f64> for Quaternion {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Quaternion {
            q0: self.q0 * rhs,
            q: self.q * rhs,
        }
    }
}

impl Add<Quaternion> for Quaternion {
    type Output = Self;

    /// Component-wise sum. Not a composition of rotations, only used for
    /// averaging nearby rotations before renormalizing.
    fn add(self, rhs: Self) -> Self {
        Quaternion {
            q0: self.q0 + rhs.q0,
            q: self.q + rhs.q,
        }
    }
}

impl Neg for Quaternion {
    type Output = Self;
    fn neg(self) -> Self {
        Quaternion {
            q0: -self.q0,
            q: -self.q,
        }
    }
}

impl fmt::Debug for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quaternion ")?;
        writeln!(f, "   q0: {: >10.6}", self.q0)?;
        writeln!(f, "   q1: {: >10.6}", self.q[0])?;
        writeln!(f, "   q2: {: >10.6}", self.q[1])?;
        writeln!(f, "   q3: {: >10.6}", self.q[2])?;
        Ok(())
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "q0={}, q1={}, q2={}, q3={}",
            self.q0, self.q[0], self.q[1], self.q[2]
        )
    }
}

pub mod quaternion;
pub mod rotation_matrix;

use nalgebra::Vector3;

pub mod prelude {
    pub use crate::quaternion::*;
    pub use crate::rotation_matrix::*;
    pub use crate::RotationTrait;
}

/// Trait defining how a rotation acts on vectors.
pub trait RotationTrait {
    /// Rotates a vector by the rotation, `R·v`.
    /// aka Active Rotation or "Alibi"
    ///
    /// # Arguments
    ///
    /// * `v` - The vector to be rotated.
    ///
    /// # Returns
    ///
    /// The rotated vector.
    fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64>;

    /// Applies the reversed rotation, `Rᵀ·v`.
    /// Maps a vector given in the global frame into the rotated (body) frame.
    ///
    /// # Arguments
    ///
    /// * `v` - The vector to be transformed.
    ///
    /// # Returns
    ///
    /// The vector expressed in the body frame.
    fn rotate_vector_reversed(&self, v: &Vector3<f64>) -> Vector3<f64>;

    fn inv(&self) -> Self;

    fn identity() -> Self;
}

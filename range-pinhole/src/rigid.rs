use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use range_core::nalgebra::{
    IsometryMatrix3, Matrix3, Point3, Rotation3, Translation3, Vector3,
};
use range_core::Rodrigues;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A rigid transform between two 3d frames, `p' = R * p + t`.
///
/// This is the extrinsic calibration between two sensors (for instance the range camera and
/// the color camera of the same head) or the pose of a camera. Build it once from the
/// calibration and reuse it for every point; the Rodrigues vector is only converted into a
/// rotation matrix on construction.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidTransform(pub IsometryMatrix3<f64>);

impl RigidTransform {
    pub fn identity() -> Self {
        Self(IsometryMatrix3::identity())
    }

    /// Create the transform from rotation and translation.
    pub fn from_parts(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self(IsometryMatrix3::from_parts(
            Translation3::from(translation),
            rotation,
        ))
    }

    /// Create the transform from a rotation matrix as delivered by a calibration provider.
    ///
    /// The matrix is assumed to be orthonormal and is not checked or re-orthogonalized. An
    /// ill-conditioned matrix produces wrong (but finite) results.
    pub fn from_matrix_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        Self::from_parts(Rotation3::from_matrix_unchecked(*rotation), *translation)
    }

    /// Create the transform from a Rodrigues (axis-angle) vector and a translation.
    pub fn from_rodrigues(rotation: Rodrigues, translation: Vector3<f64>) -> Self {
        Self::from_parts(rotation.rotation(), translation)
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        self.0.rotation
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// The rotation as a Rodrigues vector.
    pub fn rodrigues(&self) -> Rodrigues {
        self.0.rotation.into()
    }

    /// Takes the inverse of the transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Composes two transforms, applying `other` first.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self(self.0 * other.0)
    }

    /// Computes `R * p + t`.
    #[inline(always)]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0 * point
    }

    /// Computes `R^T * (p - t)`.
    #[inline(always)]
    pub fn transform_point_inverse(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0.inverse_transform_point(point)
    }
}

/// Applies `p' = R * p + t` with a raw rotation matrix.
///
/// ```
/// use range_core::nalgebra::{Matrix3, Point3, Vector3};
/// let r = Matrix3::new(
///     0.0, -1.0, 0.0,
///     1.0, 0.0, 0.0,
///     0.0, 0.0, 1.0,
/// );
/// let t = Vector3::new(0.5, 0.0, 2.0);
/// let p = range_pinhole::transform_point(&Point3::new(1.0, 0.0, 0.0), &r, &t);
/// assert_eq!(p, Point3::new(0.5, 1.0, 2.0));
/// ```
pub fn transform_point(
    point: &Point3<f64>,
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
) -> Point3<f64> {
    Point3::from(rotation * point.coords + translation)
}

/// Applies `p = R^T * (p' - t)`, the inverse of [`transform_point`] for orthonormal `R`.
pub fn transform_point_inverse(
    point: &Point3<f64>,
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
) -> Point3<f64> {
    Point3::from(rotation.tr_mul(&(point.coords - translation)))
}

/// Same as [`transform_point`] with the rotation given as a Rodrigues vector.
pub fn transform_point_rodrigues(
    point: &Point3<f64>,
    rotation: &Rodrigues,
    translation: &Vector3<f64>,
) -> Point3<f64> {
    transform_point(point, rotation.rotation().matrix(), translation)
}

/// Same as [`transform_point_inverse`] with the rotation given as a Rodrigues vector.
pub fn transform_point_rodrigues_inverse(
    point: &Point3<f64>,
    rotation: &Rodrigues,
    translation: &Vector3<f64>,
) -> Point3<f64> {
    transform_point_inverse(point, rotation.rotation().matrix(), translation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matches_raw_matrix_form() {
        let rodrigues = Rodrigues::new(0.1, -0.4, 0.25);
        let t = Vector3::new(-0.3, 0.2, 1.5);
        let transform = RigidTransform::from_rodrigues(rodrigues, t);
        let p = Point3::new(0.7, -1.1, 3.2);
        assert_relative_eq!(
            transform.transform_point(&p),
            transform_point_rodrigues(&p, &rodrigues, &t),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            transform.transform_point_inverse(&p),
            transform_point_rodrigues_inverse(&p, &rodrigues, &t),
            epsilon = 1e-12
        );
    }

    #[test]
    fn inverse_and_compose() {
        let a = RigidTransform::from_rodrigues(
            Rodrigues::new(0.0, 0.3, 0.0),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let identity = a.compose(&a.inverse());
        let p = Point3::new(-2.0, 0.5, 4.0);
        assert_relative_eq!(identity.transform_point(&p), p, epsilon = 1e-12);
        assert_relative_eq!(a.rodrigues().0, Vector3::new(0.0, 0.3, 0.0), epsilon = 1e-12);
    }
}

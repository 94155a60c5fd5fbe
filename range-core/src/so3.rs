use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use num_traits::Float;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A Rodrigues (axis-angle) rotation vector.
///
/// The direction of the vector is the rotation axis and its norm is the rotation angle in
/// radians. This is the compact rotation format that calibration tools write out next to
/// a translation vector. It is a member of the lie algebra so(3); convert it into a
/// [`Rotation3`] (the exponential map) before rotating many points.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Rodrigues(pub Vector3<f64>);

impl Rodrigues {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The rotation angle in radians.
    pub fn angle(self) -> f64 {
        self.0.norm()
    }

    /// Converts the Rodrigues vector to a rotation matrix.
    pub fn rotation(self) -> Rotation3<f64> {
        self.into()
    }

    /// Converts the Rodrigues vector into a rotation matrix using the first order
    /// approximation `I + hat(r)`, which is only accurate when the angle is very small.
    pub fn rotation_small(self) -> Rotation3<f64> {
        Rotation3::from_matrix(&(Matrix3::identity() + self.hat()))
    }

    /// This converts the vector into its skew-symmetric matrix form.
    pub fn hat(self) -> Matrix3<f64> {
        self.0.cross_matrix()
    }
}

/// This is the exponential map.
impl From<Rodrigues> for Rotation3<f64> {
    fn from(r: Rodrigues) -> Self {
        // The axis is undefined near an angle of zero.
        let theta2 = r.0.norm_squared();
        if theta2 <= f64::epsilon() {
            r.rotation_small()
        } else {
            let theta = theta2.sqrt();
            let axis = Unit::new_unchecked(r.0 / theta);
            Self::from_axis_angle(&axis, theta)
        }
    }
}

/// This is the log map.
impl From<Rotation3<f64>> for Rodrigues {
    fn from(r: Rotation3<f64>) -> Self {
        let vector = r.scaled_axis();
        let vector = if vector.iter().any(|n| n.is_nan()) {
            Vector3::zeros()
        } else {
            vector
        };
        Self(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quarter_turn_about_z() {
        let rotation = Rodrigues::new(0.0, 0.0, core::f64::consts::FRAC_PI_2).rotation();
        assert_relative_eq!(
            rotation * Vector3::x(),
            Vector3::y(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_vector_is_identity() {
        let rotation = Rodrigues::new(0.0, 0.0, 0.0).rotation();
        assert_relative_eq!(rotation, Rotation3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn log_map_inverts_exp_map() {
        let r = Rodrigues::new(0.3, -0.2, 0.9);
        let back: Rodrigues = r.rotation().into();
        assert_relative_eq!(back.0, r.0, epsilon = 1e-12);
        assert_relative_eq!(back.angle(), r.angle(), epsilon = 1e-12);
    }
}

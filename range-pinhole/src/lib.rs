//! This crate plugs into `range-core` and provides the calibrated geometry of a range camera:
//! a pinhole camera model with plumb-bob lens distortion, rigid transforms between 3d frames
//! (rotation matrix or Rodrigues vector), perspective projection and back-projection,
//! undistortion maps and the reconstruction of coordinate images from raw range images.
//!
//! Calibration is never estimated here. The intrinsic matrix, the distortion coefficients and
//! the extrinsic transforms come from the caller and every function is a pure function of its
//! inputs.
//!
//! ## Reconstruction
//!
//! Undistorting every pixel of every frame would be expensive. Instead the camera geometry is
//! folded once into five per-pixel coefficient images ([`CalibrationMaps`]) and each frame is
//! reconstructed with a handful of multiply-adds per pixel:
//!
//! ```text
//! z = AZ * r^2 + BZ * r + CZ
//! x = X * z
//! y = Y * z
//! ```

mod camera;
mod distortion;
mod reconstruction;
mod rigid;
mod undistort;

pub use camera::*;
pub use distortion::*;
pub use reconstruction::*;
pub use rigid::*;
pub use undistort::*;

use range_core::nalgebra::{Matrix3, Point2, Vector2};
use range_core::{Error, Result};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// This is the intrinsic matrix `A` of the camera. Lens distortion is described separately
/// by [`PlumbBob`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    /// This would imply that the pixel positions have an origin at `0,0`,
    /// the pixel distance unit is the focal length, pixels are square,
    /// and there is no skew.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    /// Reads the intrinsics out of a 3x3 intrinsic matrix.
    ///
    /// The matrix is normalized by its bottom right element. It must be upper triangular with
    /// non-zero focal lengths, otherwise it cannot be inverted and [`Error::NotInvertible`]
    /// is returned.
    ///
    /// ```
    /// use range_core::nalgebra::{Matrix3, Point2, Vector2};
    /// use range_pinhole::CameraIntrinsics;
    /// let a = Matrix3::new(
    ///     250.0, 0.0, 88.0,
    ///     0.0, 251.0, 72.0,
    ///     0.0, 0.0, 1.0,
    /// );
    /// let intrinsics = CameraIntrinsics::from_matrix(&a).unwrap();
    /// assert_eq!(intrinsics.focals, Vector2::new(250.0, 251.0));
    /// assert_eq!(intrinsics.principal_point, Point2::new(88.0, 72.0));
    /// assert_eq!(intrinsics.matrix(), a);
    /// ```
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self> {
        let scale = matrix.m33;
        if scale == 0.0 || matrix.m21 != 0.0 || matrix.m31 != 0.0 || matrix.m32 != 0.0 {
            return Err(Error::NotInvertible);
        }
        let matrix = matrix / scale;
        let intrinsics = Self {
            focals: Vector2::new(matrix.m11, matrix.m22),
            principal_point: Point2::new(matrix.m13, matrix.m23),
            skew: matrix.m12,
        };
        let invertible = intrinsics.focals.iter().all(|f| f.is_finite() && *f != 0.0)
            && intrinsics.principal_point.iter().all(|c| c.is_finite())
            && intrinsics.skew.is_finite();
        if invertible {
            Ok(intrinsics)
        } else {
            Err(Error::NotInvertible)
        }
    }

    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and applies `A^-1` to it.
    ///
    /// The result is still affected by lens distortion.
    ///
    /// ```
    /// use range_core::nalgebra::{Point2, Vector2};
    /// use range_pinhole::CameraIntrinsics;
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let pixel = Point2::new(471.0, 322.0);
    /// let normalized = intrinsics.calibrate(pixel);
    /// let distance = (pixel.to_homogeneous() - intrinsics.matrix() * normalized.push(1.0)).norm();
    /// assert!(distance < 1e-9);
    /// ```
    pub fn calibrate(&self, pixel: Point2<f64>) -> Vector2<f64> {
        let centered = pixel - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        Vector2::new(x, y)
    }

    /// Converts a normalized image coordinate back into pixel coordinates by applying `A`.
    pub fn uncalibrate(&self, normalized: Vector2<f64>) -> Point2<f64> {
        let y = normalized.y * self.focals.y;
        let x = normalized.x * self.focals.x + self.skew * normalized.y;
        Point2::new(x, y) + self.principal_point.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrate_roundtrip() {
        let intrinsics = CameraIntrinsics::identity()
            .focals(Vector2::new(800.0, 900.0))
            .principal_point(Point2::new(500.0, 600.0))
            .skew(1.7);
        let pixel = Point2::new(471.0, 322.0);
        let back = intrinsics.uncalibrate(intrinsics.calibrate(pixel));
        assert!((pixel - back).norm() < 1e-9);
    }

    #[test]
    fn singular_matrices_are_rejected() {
        let zero_focal = CameraIntrinsics::identity().focal(0.0).matrix();
        assert_eq!(
            CameraIntrinsics::from_matrix(&zero_focal),
            Err(Error::NotInvertible)
        );
        let mut lower = CameraIntrinsics::identity().matrix();
        lower.m31 = 0.5;
        assert_eq!(
            CameraIntrinsics::from_matrix(&lower),
            Err(Error::NotInvertible)
        );
    }

    #[test]
    fn homogeneous_scale_is_removed() {
        let intrinsics = CameraIntrinsics::identity()
            .focal(300.0)
            .principal_point(Point2::new(80.0, 60.0));
        let scaled = intrinsics.matrix() * 2.0;
        assert_eq!(CameraIntrinsics::from_matrix(&scaled), Ok(intrinsics));
    }
}

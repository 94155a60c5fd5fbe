use crate::{CameraIntrinsics, PlumbBob, UndistortCriteria};
use range_core::nalgebra::{Matrix3, Point2, Point3, Vector2};
use range_core::{Error, Result};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A pinhole camera with plumb-bob lens distortion.
///
/// Points in camera coordinates are mapped to pixels by
///
/// 1. dividing by depth to get normalized image coordinates $(x/z, y/z)$,
/// 2. applying the lens distortion ([`PlumbBob::distort`]),
/// 3. applying the intrinsic matrix `A` ([`CameraIntrinsics::uncalibrate`]).
///
/// Going the other way needs the iterative inversion of the distortion, configured by
/// [`UndistortCriteria`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PinholeCamera {
    pub intrinsics: CameraIntrinsics,
    pub distortion: PlumbBob,
    pub criteria: UndistortCriteria,
}

impl PinholeCamera {
    pub fn new(intrinsics: CameraIntrinsics, distortion: PlumbBob) -> Self {
        Self {
            intrinsics,
            distortion,
            criteria: UndistortCriteria::default(),
        }
    }

    /// A camera without lens distortion.
    pub fn linear(intrinsics: CameraIntrinsics) -> Self {
        Self::new(intrinsics, PlumbBob::zero())
    }

    /// Builds the camera from a raw intrinsic matrix and OpenCV ordered distortion
    /// coefficients (4 or 5 of them).
    pub fn from_matrix(matrix: &Matrix3<f64>, coefficients: &[f64]) -> Result<Self> {
        Ok(Self::new(
            CameraIntrinsics::from_matrix(matrix)?,
            PlumbBob::from_coefficients(coefficients)?,
        ))
    }

    /// Replaces the termination criteria used whenever distortion is inverted.
    pub fn criteria(self, criteria: UndistortCriteria) -> Self {
        Self { criteria, ..self }
    }

    /// Projects a point in camera coordinates onto the image plane.
    ///
    /// A point with `z == 0` (or a non-finite `z`) has no projection and returns
    /// [`Error::ZeroDepth`]. Points behind the camera are projected like any other point.
    ///
    /// ```
    /// use range_core::nalgebra::{Point2, Point3};
    /// use range_pinhole::{CameraIntrinsics, PinholeCamera};
    /// let camera = PinholeCamera::linear(
    ///     CameraIntrinsics::identity()
    ///         .focal(100.0)
    ///         .principal_point(Point2::new(80.0, 60.0)),
    /// );
    /// let pixel = camera.project(&Point3::new(0.5, -0.25, 2.0)).unwrap();
    /// assert_eq!(pixel, Point2::new(105.0, 47.5));
    /// assert!(camera.project(&Point3::new(1.0, 1.0, 0.0)).is_err());
    /// ```
    pub fn project(&self, point: &Point3<f64>) -> Result<Point2<f64>> {
        let z = point.z;
        if z == 0.0 || !z.is_finite() {
            return Err(Error::ZeroDepth { z });
        }
        let normalized = Vector2::new(point.x / z, point.y / z);
        Ok(self
            .intrinsics
            .uncalibrate(self.distortion.distort(normalized)))
    }

    /// Turns a pixel into undistorted normalized image coordinates, the ray `(x, y, 1)`.
    ///
    /// The second value is `false` when the inversion of the distortion did not converge.
    pub fn normalize_ext(&self, pixel: Point2<f64>) -> (Vector2<f64>, bool) {
        self.distortion
            .undistort_ext(self.intrinsics.calibrate(pixel), self.criteria)
    }

    /// Turns a pixel into undistorted normalized image coordinates.
    pub fn normalize(&self, pixel: Point2<f64>) -> Vector2<f64> {
        self.normalize_ext(pixel).0
    }

    /// Back-projects a pixel with known depth `z` into camera coordinates.
    ///
    /// This is the inverse of [`PinholeCamera::project`] for points with that depth.
    pub fn back_project(&self, pixel: Point2<f64>, z: f64) -> Point3<f64> {
        let ray = self.normalize(pixel);
        Point3::new(ray.x * z, ray.y * z, z)
    }
}

/// Projects `point` with the intrinsic matrix `a` and the OpenCV ordered distortion
/// coefficients.
///
/// This is a convenience over [`PinholeCamera::project`] for one-off calls with raw
/// calibration values.
pub fn perspective_projection(
    point: &Point3<f64>,
    a: &Matrix3<f64>,
    coefficients: &[f64],
) -> Result<Point2<f64>> {
    PinholeCamera::from_matrix(a, coefficients)?.project(point)
}

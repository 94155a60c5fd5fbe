use range_core::nalgebra::Vector2;
use range_core::{Error, Result};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Plumb-bob (Brown-Conrady) lens distortion with three radial and two tangential
/// coefficients, in the layout used by OpenCV and ROS: `[k1, k2, p1, p2, k3]`.
///
/// Given normalized image coordinates $(x, y)$ and $r^2 = x^2 + y^2$ the distorted
/// coordinates are
///
/// $$
/// \begin{aligned}
/// x'' &= x ⋅ (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + 2 p_1 x y + p_2 (r^2 + 2 x^2) \\\\
/// y'' &= y ⋅ (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + p_1 (r^2 + 2 y^2) + 2 p_2 x y
/// \end{aligned}
/// $$
///
/// Extreme coefficients can push points far outside of the image or produce non-finite
/// values. Those values are passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PlumbBob {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

/// Termination criteria for the iterative inversion of the distortion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct UndistortCriteria {
    /// Maximum number of fixed-point iterations.
    pub max_iterations: usize,

    /// Stop once an iteration moves the estimate less than this (normalized units).
    pub epsilon: f64,
}

impl Default for UndistortCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-14,
        }
    }
}

impl PlumbBob {
    /// No distortion at all.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Reads the coefficients in OpenCV order, `[k1, k2, p1, p2]` or `[k1, k2, p1, p2, k3]`.
    ///
    /// ```
    /// use range_pinhole::PlumbBob;
    /// let d = PlumbBob::from_coefficients(&[-0.2, 0.05, 0.001, -0.002]).unwrap();
    /// assert_eq!(d.k3, 0.0);
    /// assert!(PlumbBob::from_coefficients(&[0.1; 8]).is_err());
    /// ```
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        match *coefficients {
            [k1, k2, p1, p2] => Ok(Self {
                k1,
                k2,
                p1,
                p2,
                k3: 0.0,
            }),
            [k1, k2, p1, p2, k3] => Ok(Self { k1, k2, p1, p2, k3 }),
            _ => Err(Error::DistortionCoefficients(coefficients.len())),
        }
    }

    /// The coefficients in OpenCV order.
    pub fn coefficients(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Checks whether this distortion is the identity.
    pub fn is_linear(&self) -> bool {
        self.coefficients().iter().all(|&c| c == 0.0)
    }

    /// The radial factor $1 + k_1 r^2 + k_2 r^4 + k_3 r^6$.
    #[inline(always)]
    fn radial(&self, r2: f64) -> f64 {
        1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2
    }

    /// The tangential offset.
    #[inline(always)]
    fn tangential(&self, point: Vector2<f64>, r2: f64) -> Vector2<f64> {
        let (x, y) = (point.x, point.y);
        let a1 = 2.0 * x * y;
        Vector2::new(
            self.p1 * a1 + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + self.p2 * a1,
        )
    }

    /// Apply distortion to a normalized image coordinate.
    ///
    /// This models the action of the real lens and is what a projection needs.
    pub fn distort(&self, point: Vector2<f64>) -> Vector2<f64> {
        let r2 = point.norm_squared();
        point * self.radial(r2) + self.tangential(point, r2)
    }

    /// Undo distortion of a normalized image coordinate using [`UndistortCriteria::default`].
    pub fn undistort(&self, distorted: Vector2<f64>) -> Vector2<f64> {
        self.undistort_ext(distorted, UndistortCriteria::default()).0
    }

    /// Undo distortion of a normalized image coordinate.
    ///
    /// # Method
    ///
    /// The distortion has no closed form inverse. Starting from $\vec x_0 = \vec x''$ the
    /// fixed-point iteration
    ///
    /// $$
    /// \vec x_{i+1} = \frac{\vec x'' - \vec t(\vec x_i)}{f_r(r_i^2)}
    /// $$
    ///
    /// is run until it moves less than `criteria.epsilon`. The second value returned is
    /// `false` when the iteration ran out of iterations first.
    pub fn undistort_ext(
        &self,
        distorted: Vector2<f64>,
        criteria: UndistortCriteria,
    ) -> (Vector2<f64>, bool) {
        if self.is_linear() {
            return (distorted, true);
        }
        let mut point = distorted;
        for _ in 0..criteria.max_iterations {
            let r2 = point.norm_squared();
            let next = (distorted - self.tangential(point, r2)) / self.radial(r2);
            let delta = (next - point).norm();
            point = next;
            if delta <= criteria.epsilon {
                return (point, true);
            }
        }
        (point, false)
    }
}

//! Scale-adaptive differential estimators for range camera images.
//!
//! * [`IntegralImage`] answers window sum queries in constant time. Build it with
//!   [`IntegralImage::with_sentinel`] when the source is a raw range raster.
//! * [`GradientEstimator`] estimates intensity gradients over a neighborhood of any radius.
//! * [`NormalEstimator`] estimates surface normals from a coordinate image.
//!
//! Every estimator returns a degenerate result (zero gradient, zero normal) instead of a
//! fabricated value when its neighborhood contains an invalid sample. Neighborhoods are never
//! clamped at the image border: single pixel calls fail with [`Error::OutOfBounds`] and the
//! whole image drivers [`gradient_image_into`] and [`normal_image`] leave the border degenerate.
//! The drivers write into caller owned rasters of any sample type; [`gradient_image`] is a
//! shorthand that allocates single precision images.
//!
//! ```
//! use range_core::GrayFloatImage;
//! use range_features::{gradient_image, GradientEstimator, IntegralImage};
//!
//! let intensity = GrayFloatImage::from_fn(32, 24, |x, y| (x + y) as f32);
//! let integral = IntegralImage::new(&intensity, 0).unwrap();
//! let (magnitude, _phase) = gradient_image(&integral, GradientEstimator::BoxSum, 4).unwrap();
//! assert_eq!(magnitude.get(0, 0), 0.0);
//! assert!((magnitude.get(16, 12) - 2f32.sqrt()).abs() < 1e-5);
//! ```

mod gradient;
mod integral;
mod normal;

pub use gradient::*;
pub use integral::*;
pub use normal::*;

pub use range_core::{Error, Result};

/// Threshold below which a gradient or a normal is considered degenerate, relative to the
/// magnitude of the values it was computed from.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

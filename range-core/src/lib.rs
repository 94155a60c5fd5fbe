//! # Range Core
//!
//! Common abstractions and types shared by the crates of the range camera pipeline.
//! This includes the raster access traits, the float image types produced by a range
//! camera (range, intensity and coordinate images), the convention used to mark pixels
//! without a valid measurement, the Rodrigues rotation vector and the error type that every
//! operation in the pipeline reports.
//!
//! ## Coordinate convention
//!
//! All geometry is expressed in a right-handed frame where the positive X axis points
//! right, the positive Y axis points down and the positive Z axis points forwards out of
//! the optical center of the camera, so `z` is the depth of a point.
//!
//! ## Invalid samples
//!
//! Range cameras report pixels without a return. Such pixels are never turned into a real
//! zero. A range sample is invalid when it equals the sentinel chosen by the caller (see
//! [`is_valid_range`]) and a coordinate pixel is invalid when it holds
//! [`INVALID_COORDINATE`] in its channels. Every estimator downstream returns its
//! degenerate result when it touches an invalid sample.
//!
//! ```text
//!          z (depth)
//!         /
//!        /
//!       O-------- x
//!       |
//!       |
//!       y
//! ```

mod coordinate;
mod error;
mod image;
mod raster;
mod so3;

pub use self::image::*;
pub use coordinate::*;
pub use error::*;
pub use nalgebra;
pub use raster::*;
pub use so3::*;

//! # `range-cv`
//!
//! Batteries-included range camera processing
//!
//! This crate gathers the range camera crates of this workspace in one place and adds a
//! [`FrameProcessor`](frame::FrameProcessor) that runs the whole per-frame data flow:
//!
//! ```text
//! range image --(calibration maps)--> coordinate image --> surface normals
//! intensity image --(integral image)--> gradient magnitude and phase
//! ```
//!
//! For a production application import the individual crates instead, or disable default
//! features and enable only what you need.
//!
//! ## Modules
//! * [`camera`] - the pinhole camera model, lens distortion and reconstruction
//! * [`feature`] - gradient and surface normal estimation
//! * [`frame`] - per-frame processing
//! * [`image`] - image buffers

pub use range_core::*;

/// Camera models, rigid transforms and range image reconstruction
pub mod camera {
    /// The pinhole camera model
    #[cfg(feature = "range-pinhole")]
    pub use range_pinhole as pinhole;
}

/// Differential features of intensity and coordinate images
pub mod feature {
    #[cfg(feature = "range-features")]
    pub use range_features::*;
}

/// Image buffers
pub mod image {
    /// Re-export of [`image`] to create and convert image buffers
    #[cfg(feature = "image")]
    #[allow(clippy::module_inception)]
    pub mod image {
        pub use image::*;
    }
}

/// Per-frame processing
#[cfg(all(feature = "range-pinhole", feature = "range-features"))]
pub mod frame;

/// Errors reported by the operations of the range pipeline.
///
/// Every variant is a precondition violated by the caller. Degenerate geometry (a flat
/// gradient, a missing normal, an invalid range sample) is never reported through this
/// type; it is returned as a well defined sentinel value instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(
        "raster dimensions differ: expected {expected_width}x{expected_height}, found {width}x{height}"
    )]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    #[error("window x in [{left}, {right}], y in [{top}, {bottom}] exceeds the {width}x{height} raster")]
    OutOfBounds {
        left: isize,
        right: isize,
        top: isize,
        bottom: isize,
        width: usize,
        height: usize,
    },
    #[error("channel {channel} requested from a raster with {channels} channels")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("radius must be at least {minimum}, got {radius}")]
    InvalidRadius { radius: usize, minimum: usize },
    #[error("cannot project a point with depth {z}")]
    ZeroDepth { z: f64 },
    #[error("expected 4 or 5 distortion coefficients (k1, k2, p1, p2[, k3]), got {0}")]
    DistortionCoefficients(usize),
    #[error("the intrinsic matrix is not invertible")]
    NotInvertible,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

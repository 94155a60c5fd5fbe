use crate::{Error, Result};
use image::{ImageBuffer, Pixel, Primitive};

/// A channel value a [`Raster`] may store.
///
/// Range cameras deliver single or double precision floats, so only `f32` and `f64`
/// implement this trait.
pub trait Sample: Primitive + 'static {
    fn to_f64(self) -> f64;

    /// Converts back from the double precision used for all computation.
    ///
    /// `NaN` stays `NaN`, which is how invalid samples travel through a raster.
    fn from_f64(value: f64) -> Self;
}

impl Sample for f32 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Sample for f64 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Read access to a 2D grid of samples with one or more channels.
///
/// The raster is owned by the caller. Operations in this workspace only read from it
/// (or write to it through [`RasterMut`]) and never reallocate it.
pub trait Raster {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn channels(&self) -> usize;

    /// Retrieves a channel value as `f64`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the raster or `channel` does not exist.
    /// Use [`Raster::try_get`] when the position has not been validated.
    fn get(&self, x: usize, y: usize, channel: usize) -> f64;

    /// Rounds `value` to the precision the raster stores its samples in.
    ///
    /// Compare a sample against a constant only after passing the constant through this,
    /// otherwise `0.1` never matches a single precision sample.
    fn round_to_sample(&self, value: f64) -> f64 {
        value
    }

    /// Retrieve `(width, height)`.
    fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Checks whether the signed position `(x, y)` lies inside of the raster.
    fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    /// Retrieves a channel value, failing instead of panicking on a bad position or channel.
    fn try_get(&self, x: usize, y: usize, channel: usize) -> Result<f64> {
        check_channel(self, channel)?;
        check_window(self, x as isize, x as isize, y as isize, y as isize)?;
        Ok(self.get(x, y, channel))
    }
}

/// Write access to a [`Raster`].
pub trait RasterMut: Raster {
    /// Stores a channel value, converting it to the sample type of the raster.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the raster or `channel` does not exist.
    fn set(&mut self, x: usize, y: usize, channel: usize, value: f64);
}

impl<P> Raster for ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
    P::Subpixel: Sample,
{
    fn width(&self) -> usize {
        ImageBuffer::width(self) as usize
    }

    fn height(&self) -> usize {
        ImageBuffer::height(self) as usize
    }

    fn channels(&self) -> usize {
        P::CHANNEL_COUNT as usize
    }

    #[inline(always)]
    fn get(&self, x: usize, y: usize, channel: usize) -> f64 {
        self.get_pixel(x as u32, y as u32).channels()[channel].to_f64()
    }

    #[inline(always)]
    fn round_to_sample(&self, value: f64) -> f64 {
        P::Subpixel::from_f64(value).to_f64()
    }
}

impl<P> RasterMut for ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
    P::Subpixel: Sample,
{
    #[inline(always)]
    fn set(&mut self, x: usize, y: usize, channel: usize, value: f64) {
        self.get_pixel_mut(x as u32, y as u32).channels_mut()[channel] = Sample::from_f64(value);
    }
}

/// Fails with [`Error::DimensionMismatch`] unless both rasters have the same width and height.
pub fn check_same_dimensions<A, B>(expected: &A, other: &B) -> Result<()>
where
    A: Raster + ?Sized,
    B: Raster + ?Sized,
{
    if expected.dimensions() == other.dimensions() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected_width: expected.width(),
            expected_height: expected.height(),
            width: other.width(),
            height: other.height(),
        })
    }
}

/// Fails with [`Error::ChannelOutOfRange`] unless `channel` exists in the raster.
pub fn check_channel<R: Raster + ?Sized>(raster: &R, channel: usize) -> Result<()> {
    if channel < raster.channels() {
        Ok(())
    } else {
        Err(Error::ChannelOutOfRange {
            channel,
            channels: raster.channels(),
        })
    }
}

/// Fails with [`Error::OutOfBounds`] unless the inclusive window
/// `[left, right] x [top, bottom]` lies completely inside of the raster.
///
/// This never clamps. A window hanging over the border is a bug in the caller.
pub fn check_window<R: Raster + ?Sized>(
    raster: &R,
    left: isize,
    right: isize,
    top: isize,
    bottom: isize,
) -> Result<()> {
    if left <= right && top <= bottom && raster.contains(left, top) && raster.contains(right, bottom)
    {
        Ok(())
    } else {
        Err(Error::OutOfBounds {
            left,
            right,
            top,
            bottom,
            width: raster.width(),
            height: raster.height(),
        })
    }
}

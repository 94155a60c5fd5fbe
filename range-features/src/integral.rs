use log::*;
use ndarray::Array2;
use range_core::{check_channel, is_valid_range, Error, Raster, Result};

/// A summed-area table of one channel of a raster.
///
/// Both tables have one more row and column than the source. The first row and column
/// are zero, so entry `[[y, x]]` holds the sum over the source rectangle `[0, x) x [0, y)`.
///
/// Non-finite source samples are invalid, and so are sentinel samples when the table is
/// built from a range raster with [`IntegralImage::with_sentinel`]. Invalid samples add
/// nothing to the sum table and are counted in a second table instead, so one invalid sample
/// only affects the windows that contain it.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralImage {
    sums: Array2<f64>,
    invalid: Array2<u32>,
}

impl IntegralImage {
    /// Builds the tables for `channel` of `raster`.
    pub fn new<R: Raster + ?Sized>(raster: &R, channel: usize) -> Result<Self> {
        Self::build(raster, channel, f64::is_finite)
    }

    /// Builds the tables for `channel` of a range raster.
    ///
    /// Samples equal to `sentinel` (compared at the precision of the raster), negative or
    /// not finite are invalid, see [`range_core::is_valid_range`].
    pub fn with_sentinel<R: Raster + ?Sized>(
        raster: &R,
        channel: usize,
        sentinel: f64,
    ) -> Result<Self> {
        let sentinel = raster.round_to_sample(sentinel);
        Self::build(raster, channel, |value| is_valid_range(value, sentinel))
    }

    fn build<R, F>(raster: &R, channel: usize, is_valid: F) -> Result<Self>
    where
        R: Raster + ?Sized,
        F: Fn(f64) -> bool,
    {
        check_channel(raster, channel)?;
        let (width, height) = raster.dimensions();
        trace!("Building {}x{} integral image", width, height);
        let mut sums = Array2::zeros((height + 1, width + 1));
        let mut invalid = Array2::zeros((height + 1, width + 1));
        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_invalid = 0;
            for x in 0..width {
                let value = raster.get(x, y, channel);
                if is_valid(value) {
                    row_sum += value;
                } else {
                    row_invalid += 1;
                }
                sums[[y + 1, x + 1]] = sums[[y, x + 1]] + row_sum;
                invalid[[y + 1, x + 1]] = invalid[[y, x + 1]] + row_invalid;
            }
        }
        Ok(Self { sums, invalid })
    }

    /// Width of the source raster.
    pub fn width(&self) -> usize {
        self.sums.ncols() - 1
    }

    /// Height of the source raster.
    pub fn height(&self) -> usize {
        self.sums.nrows() - 1
    }

    fn check(&self, left: isize, right: isize, top: isize, bottom: isize) -> Result<()> {
        let inside = |low: isize, high: isize, size: usize| {
            low >= 0 && low <= high && (high as usize) < size
        };
        if inside(left, right, self.width()) && inside(top, bottom, self.height()) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                left,
                right,
                top,
                bottom,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Four corner lookup on an already validated window.
    #[inline(always)]
    fn corners<T>(table: &Array2<T>, left: usize, right: usize, top: usize, bottom: usize) -> [T; 4]
    where
        T: Copy,
    {
        [
            table[[bottom + 1, right + 1]],
            table[[top, right + 1]],
            table[[bottom + 1, left]],
            table[[top, left]],
        ]
    }

    /// Number of invalid samples in the inclusive rectangle `[left, right] x [top, bottom]`.
    pub fn invalid_count_rect(
        &self,
        left: isize,
        right: isize,
        top: isize,
        bottom: isize,
    ) -> Result<u32> {
        self.check(left, right, top, bottom)?;
        let [a, b, c, d] = Self::corners(
            &self.invalid,
            left as usize,
            right as usize,
            top as usize,
            bottom as usize,
        );
        Ok(a + d - b - c)
    }

    /// Sum over the inclusive rectangle `[left, right] x [top, bottom]`.
    ///
    /// The rectangle must lie completely inside of the source raster, otherwise
    /// [`Error::OutOfBounds`] is returned. It is never clamped. The sum is `NaN` when the
    /// rectangle contains an invalid sample.
    ///
    /// ```
    /// use range_core::GrayFloatImage;
    /// use range_features::IntegralImage;
    /// let image = GrayFloatImage::filled(8, 6, 0.5);
    /// let integral = IntegralImage::new(&image, 0).unwrap();
    /// assert_eq!(integral.box_sum_rect(1, 4, 2, 5).unwrap(), 0.5 * 16.0);
    /// assert!(integral.box_sum_rect(-1, 4, 2, 5).is_err());
    /// ```
    pub fn box_sum_rect(&self, left: isize, right: isize, top: isize, bottom: isize) -> Result<f64> {
        if self.invalid_count_rect(left, right, top, bottom)? != 0 {
            return Ok(f64::NAN);
        }
        let [a, b, c, d] = Self::corners(
            &self.sums,
            left as usize,
            right as usize,
            top as usize,
            bottom as usize,
        );
        Ok(a - b - c + d)
    }

    /// Sum over the square window of side `2 * radius + 1` centered at `(x, y)`.
    pub fn box_sum(&self, x: usize, y: usize, radius: usize) -> Result<f64> {
        let [left, right, top, bottom] = window(x, y, radius);
        self.box_sum_rect(left, right, top, bottom)
    }

    /// Mean over the inclusive rectangle, `NaN` if it contains an invalid sample.
    pub fn box_mean_rect(
        &self,
        left: isize,
        right: isize,
        top: isize,
        bottom: isize,
    ) -> Result<f64> {
        let sum = self.box_sum_rect(left, right, top, bottom)?;
        let area = ((right - left + 1) * (bottom - top + 1)) as f64;
        Ok(sum / area)
    }
}

/// The inclusive bounds `[left, right, top, bottom]` of the square window of side
/// `2 * radius + 1` centered at `(x, y)`.
///
/// Saturates instead of overflowing, so a huge radius gives a window that fails the bounds
/// check.
pub(crate) fn window(x: usize, y: usize, radius: usize) -> [isize; 4] {
    let signed = |v: usize| isize::try_from(v).unwrap_or(isize::MAX);
    let (x, y, r) = (signed(x), signed(y), signed(radius));
    [
        x.saturating_sub(r),
        x.saturating_add(r),
        y.saturating_sub(r),
        y.saturating_add(r),
    ]
}

/// Sum over the square window of side `2 * radius + 1` centered at `(x, y)`.
pub fn box_sum(integral: &IntegralImage, x: usize, y: usize, radius: usize) -> Result<f64> {
    integral.box_sum(x, y, radius)
}

/// Sum over the inclusive rectangle `[left, right] x [top, bottom]`.
pub fn box_sum_rect(
    integral: &IntegralImage,
    left: isize,
    right: isize,
    top: isize,
    bottom: isize,
) -> Result<f64> {
    integral.box_sum_rect(left, right, top, bottom)
}

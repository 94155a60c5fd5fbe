use crate::integral::window;
use crate::{IntegralImage, DEGENERATE_EPSILON};
use core::f64::consts::PI;
use log::*;
use range_core::{
    check_channel, check_same_dimensions, check_window, Error, GrayFloatImage, Raster, RasterMut,
    Result,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2d intensity gradient in polar form.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gradient {
    /// Always `>= 0`.
    pub magnitude: f64,
    /// Radians in `(-π, π]`. `0` points toward increasing `x` and `π / 2` toward
    /// increasing `y` (down in the image).
    pub phase: f64,
}

impl Gradient {
    /// The result for flat regions and windows touching an invalid sample.
    pub fn degenerate() -> Self {
        Self::default()
    }

    pub fn is_degenerate(&self) -> bool {
        self.magnitude == 0.0
    }

    /// Builds the polar form of `(dx, dy)`.
    ///
    /// `scale` is the magnitude of the intensities involved. Gradients that are tiny compared
    /// to it, or not finite, are degenerate.
    pub fn from_components(dx: f64, dy: f64, scale: f64) -> Self {
        let magnitude = dx.hypot(dy);
        if !magnitude.is_finite() || magnitude <= DEGENERATE_EPSILON * (1.0 + scale.abs()) {
            return Self::degenerate();
        }
        let mut phase = dy.atan2(dx);
        if phase <= -PI {
            phase += 2.0 * PI;
        }
        Self { magnitude, phase }
    }

    /// The cartesian form `(dx, dy)`.
    pub fn components(&self) -> (f64, f64) {
        (
            self.magnitude * self.phase.cos(),
            self.magnitude * self.phase.sin(),
        )
    }
}

/// The gradient strategies that work on an [`IntegralImage`].
///
/// All of them measure intensity change per pixel, so a unit ramp along `x` has magnitude
/// `1` and phase `0` regardless of the strategy or the radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GradientEstimator {
    /// Difference of the means of two half windows of radius `r`.
    ///
    /// The halves `[x - r, x - 1]` and `[x + 1, x + r]` (rows `y - r ..= y + r`) have centers
    /// `r + 1` pixels apart. Larger radii smooth away more noise.
    BoxSum,
    /// Weighted average of column (row) strip differences at every offset `d` in `1 ..= r`,
    /// with weight `d`.
    Iterative,
    /// The 3x3 Sobel kernel, normalized by 8. The radius is ignored.
    Sobel,
}

impl Default for GradientEstimator {
    fn default() -> Self {
        Self::BoxSum
    }
}

impl GradientEstimator {
    /// The half size of the window the estimator reads for a given radius.
    pub fn reach(&self, radius: usize) -> usize {
        match self {
            Self::BoxSum | Self::Iterative => radius,
            Self::Sobel => 1,
        }
    }

    fn check_radius(&self, radius: usize) -> Result<()> {
        if radius == 0 && *self != Self::Sobel {
            Err(Error::InvalidRadius { radius, minimum: 1 })
        } else {
            Ok(())
        }
    }

    /// Estimates the gradient at `(x, y)` using a neighborhood of the given radius.
    ///
    /// The window must lie inside of the image, otherwise [`Error::OutOfBounds`] is returned.
    /// A window containing an invalid sample gives [`Gradient::degenerate`].
    ///
    /// ```
    /// use range_core::GrayFloatImage;
    /// use range_features::{GradientEstimator, IntegralImage};
    /// let ramp = GrayFloatImage::from_fn(16, 16, |x, _| 2.0 * x as f32);
    /// let integral = IntegralImage::new(&ramp, 0).unwrap();
    /// let gradient = GradientEstimator::BoxSum.estimate(&integral, 8, 8, 3).unwrap();
    /// assert!((gradient.magnitude - 2.0).abs() < 1e-9);
    /// assert!(gradient.phase.abs() < 1e-9);
    /// ```
    pub fn estimate(
        &self,
        integral: &IntegralImage,
        x: usize,
        y: usize,
        radius: usize,
    ) -> Result<Gradient> {
        self.check_radius(radius)?;
        let [left, right, top, bottom] = window(x, y, self.reach(radius));
        let mean = integral.box_mean_rect(left, right, top, bottom)?;
        if mean.is_nan() {
            return Ok(Gradient::degenerate());
        }
        // The window is inside of the image, so none of these overflow.
        let (xi, yi, reach) = (x as isize, y as isize, self.reach(radius) as isize);
        let (dx, dy) = match self {
            Self::BoxSum => box_sum_components(integral, xi, yi, reach)?,
            Self::Iterative => iterative_components(integral, xi, yi, reach)?,
            Self::Sobel => sobel_components(|dx, dy| {
                integral.box_sum_rect(xi + dx, xi + dx, yi + dy, yi + dy)
            })?,
        };
        Ok(Gradient::from_components(dx, dy, mean))
    }
}

fn box_sum_components(integral: &IntegralImage, x: isize, y: isize, r: isize) -> Result<(f64, f64)> {
    let distance = (r + 1) as f64;
    let left = integral.box_mean_rect(x - r, x - 1, y - r, y + r)?;
    let right = integral.box_mean_rect(x + 1, x + r, y - r, y + r)?;
    let top = integral.box_mean_rect(x - r, x + r, y - r, y - 1)?;
    let bottom = integral.box_mean_rect(x - r, x + r, y + 1, y + r)?;
    Ok(((right - left) / distance, (bottom - top) / distance))
}

fn iterative_components(
    integral: &IntegralImage,
    x: isize,
    y: isize,
    r: isize,
) -> Result<(f64, f64)> {
    let strip = (2 * r + 1) as f64;
    let (mut dx, mut dy, mut weights) = (0.0, 0.0, 0.0);
    for d in 1..=r {
        let column = |cx| integral.box_sum_rect(cx, cx, y - r, y + r);
        let row = |cy| integral.box_sum_rect(x - r, x + r, cy, cy);
        let span = (2 * d) as f64 * strip;
        let weight = d as f64;
        dx += weight * (column(x + d)? - column(x - d)?) / span;
        dy += weight * (row(y + d)? - row(y - d)?) / span;
        weights += weight;
    }
    Ok((dx / weights, dy / weights))
}

/// Applies the Sobel kernel to the samples returned by `sample(dx, dy)`.
fn sobel_components<F>(mut sample: F) -> Result<(f64, f64)>
where
    F: FnMut(isize, isize) -> Result<f64>,
{
    let mut p = [[0.0; 3]; 3];
    for (row, dy) in p.iter_mut().zip(-1..=1) {
        for (value, dx) in row.iter_mut().zip(-1..=1) {
            *value = sample(dx, dy)?;
        }
    }
    let dx = (p[0][2] + 2.0 * p[1][2] + p[2][2]) - (p[0][0] + 2.0 * p[1][0] + p[2][0]);
    let dy = (p[2][0] + 2.0 * p[2][1] + p[2][2]) - (p[0][0] + 2.0 * p[0][1] + p[0][2]);
    Ok((dx / 8.0, dy / 8.0))
}

/// The 3x3 Sobel derivative `(dx, dy)` of `channel` of a raster at `(x, y)`, normalized by 8.
///
/// Unlike [`GradientEstimator::Sobel`] this reads the raster directly and needs no integral
/// image. If any of the nine samples is not finite the result is `(0, 0)`.
pub fn sobel_gradient<R>(raster: &R, channel: usize, x: usize, y: usize) -> Result<(f64, f64)>
where
    R: Raster + ?Sized,
{
    check_channel(raster, channel)?;
    let [left, right, top, bottom] = window(x, y, 1);
    check_window(raster, left, right, top, bottom)?;
    let (xi, yi) = (x as isize, y as isize);
    let (dx, dy) = sobel_components(|dx, dy| {
        Ok(raster.get((xi + dx) as usize, (yi + dy) as usize, channel))
    })?;
    if dx.is_finite() && dy.is_finite() {
        Ok((dx, dy))
    } else {
        Ok((0.0, 0.0))
    }
}

/// Estimates the gradient of every pixel of the integral image's source.
///
/// Allocates and returns the magnitude and the phase image, see [`gradient_image_into`].
pub fn gradient_image(
    integral: &IntegralImage,
    estimator: GradientEstimator,
    radius: usize,
) -> Result<(GrayFloatImage, GrayFloatImage)> {
    let mut magnitude = GrayFloatImage::new(integral.width(), integral.height());
    let mut phase = GrayFloatImage::new(integral.width(), integral.height());
    gradient_image_into(integral, estimator, radius, &mut magnitude, &mut phase)?;
    Ok((magnitude, phase))
}

/// Estimates the gradient of every pixel of the integral image's source into channel `0` of
/// `magnitude` and `phase`.
///
/// Both rasters must have the size of the source. Every pixel is written; pixels closer than
/// the estimator's reach to the border get the degenerate gradient. A single precision phase
/// raster cannot hold `π` without rounding past it, so phases are clamped to the largest
/// magnitude the raster stores inside of `[-π, π]`.
pub fn gradient_image_into<D>(
    integral: &IntegralImage,
    estimator: GradientEstimator,
    radius: usize,
    magnitude: &mut D,
    phase: &mut D,
) -> Result<()>
where
    D: RasterMut + ?Sized,
{
    estimator.check_radius(radius)?;
    check_channel(&*magnitude, 0)?;
    check_channel(&*phase, 0)?;
    check_same_dimensions(&*magnitude, &*phase)?;
    let (width, height) = (integral.width(), integral.height());
    if magnitude.dimensions() != (width, height) {
        return Err(Error::DimensionMismatch {
            expected_width: width,
            expected_height: height,
            width: magnitude.width(),
            height: magnitude.height(),
        });
    }
    let reach = estimator.reach(radius);
    debug!(
        "Estimating {}x{} gradient image with {:?} and radius {}",
        width, height, estimator, radius
    );

    let interior = |v: usize, size: usize| v >= reach && size - v > reach;
    let estimate_row = |y: usize| -> Result<Vec<Gradient>> {
        (0..width)
            .map(|x| {
                if interior(x, width) && interior(y, height) {
                    estimator.estimate(integral, x, y, radius)
                } else {
                    Ok(Gradient::degenerate())
                }
            })
            .collect()
    };
    #[cfg(not(feature = "rayon"))]
    let rows = (0..height).map(estimate_row).collect::<Result<Vec<_>>>()?;
    #[cfg(feature = "rayon")]
    let rows = (0..height)
        .into_par_iter()
        .map(estimate_row)
        .collect::<Result<Vec<_>>>()?;

    let bound = phase_bound(&*phase);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, gradient) in row.into_iter().enumerate() {
            magnitude.set(x, y, 0, gradient.magnitude);
            phase.set(x, y, 0, gradient.phase.clamp(-bound, bound));
        }
    }
    Ok(())
}

/// The largest phase the raster stores without exceeding `π`.
fn phase_bound<D: Raster + ?Sized>(raster: &D) -> f64 {
    if raster.round_to_sample(PI) > PI {
        // Single precision, the only sample type that rounds π up.
        f64::from(f32::from_bits(core::f32::consts::PI.to_bits() - 1))
    } else {
        PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_y() -> IntegralImage {
        IntegralImage::new(&GrayFloatImage::from_fn(12, 12, |_, y| 0.5 * y as f32), 0).unwrap()
    }

    #[test]
    fn ramp_along_y_points_down() {
        let integral = ramp_y();
        for estimator in [
            GradientEstimator::BoxSum,
            GradientEstimator::Iterative,
            GradientEstimator::Sobel,
        ] {
            let gradient = estimator.estimate(&integral, 6, 5, 2).unwrap();
            assert!((gradient.magnitude - 0.5).abs() < 1e-9, "{:?}", estimator);
            assert!((gradient.phase - PI / 2.0).abs() < 1e-9, "{:?}", estimator);
        }
    }

    #[test]
    fn phase_is_half_open() {
        assert_eq!(Gradient::from_components(-1.0, -0.0, 0.0).phase, PI);
        assert_eq!(Gradient::from_components(-1.0, 0.0, 0.0).phase, PI);
        assert!(Gradient::from_components(1e-12, 0.0, 1.0).is_degenerate());
    }

    #[test]
    fn radius_zero_is_rejected() {
        let integral = ramp_y();
        assert_eq!(
            GradientEstimator::BoxSum.estimate(&integral, 5, 5, 0),
            Err(Error::InvalidRadius {
                radius: 0,
                minimum: 1
            })
        );
        assert!(GradientEstimator::Sobel.estimate(&integral, 5, 5, 0).is_ok());
    }

    #[test]
    fn border_is_an_error() {
        let integral = ramp_y();
        assert!(matches!(
            GradientEstimator::Iterative.estimate(&integral, 1, 6, 2),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn raw_sobel_matches_integral_sobel() {
        let image = GrayFloatImage::from_fn(7, 7, |x, y| (x * x) as f32 + 0.25 * (y * x) as f32);
        let integral = IntegralImage::new(&image, 0).unwrap();
        let (dx, dy) = sobel_gradient(&image, 0, 3, 3).unwrap();
        let expected = Gradient::from_components(dx, dy, 0.0);
        let gradient = GradientEstimator::Sobel.estimate(&integral, 3, 3, 1).unwrap();
        assert!((gradient.magnitude - expected.magnitude).abs() < 1e-9);
        assert!((gradient.phase - expected.phase).abs() < 1e-9);
    }

    #[test]
    fn components_invert_the_polar_form() {
        let gradient = Gradient::from_components(-0.3, 0.4, 1.0);
        assert!((gradient.magnitude - 0.5).abs() < 1e-12);
        let (dx, dy) = gradient.components();
        assert!((dx + 0.3).abs() < 1e-12);
        assert!((dy - 0.4).abs() < 1e-12);
        assert_eq!(Gradient::degenerate().components(), (0.0, 0.0));
    }

    #[test]
    fn huge_radius_is_an_error() {
        let integral = ramp_y();
        for estimator in [GradientEstimator::BoxSum, GradientEstimator::Iterative] {
            for radius in [isize::MAX as usize, usize::MAX] {
                assert!(matches!(
                    estimator.estimate(&integral, 6, 5, radius),
                    Err(Error::OutOfBounds { .. })
                ));
            }
        }
        assert!(matches!(
            sobel_gradient(&GrayFloatImage::new(4, 4), 0, isize::MAX as usize, 2),
            Err(Error::OutOfBounds { .. })
        ));
        let (magnitude, _) =
            gradient_image(&integral, GradientEstimator::BoxSum, usize::MAX / 2 + 1).unwrap();
        assert!(magnitude.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn stored_phase_stays_in_range() {
        let ramp = GrayFloatImage::from_fn(12, 12, |x, _| -(x as f32));
        let integral = IntegralImage::new(&ramp, 0).unwrap();
        let (magnitude, phase) = gradient_image(&integral, GradientEstimator::BoxSum, 2).unwrap();
        assert!((magnitude.get(5, 5) - 1.0).abs() < 1e-6);
        let stored = f64::from(phase.get(5, 5));
        assert!(stored.abs() <= PI);
        assert!(stored.abs() > PI - 1e-6);
    }

    #[test]
    fn image_border_is_degenerate() {
        let (magnitude, phase) = gradient_image(&ramp_y(), GradientEstimator::BoxSum, 2).unwrap();
        assert_eq!(magnitude.get(0, 5), 0.0);
        assert_eq!(magnitude.get(11, 11), 0.0);
        assert!((magnitude.get(5, 5) - 0.5).abs() < 1e-6);
        assert!((phase.get(5, 5) - core::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}

use crate::PinholeCamera;
use log::*;
use range_core::nalgebra::{Matrix3, Point2};
use range_core::{check_channel, check_same_dimensions, GrayFloatImage, Raster, RasterMut, Result};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

impl PinholeCamera {
    /// The location in the distorted (raw) image that an undistorted pixel sees.
    pub fn distorted_pixel(&self, pixel: Point2<f64>) -> Point2<f64> {
        let normalized = self.intrinsics.calibrate(pixel);
        self.intrinsics
            .uncalibrate(self.distortion.distort(normalized))
    }

    /// Computes the undistortion maps for an image of the given size.
    ///
    /// See [`PinholeCamera::init_undistort_map_into`].
    pub fn init_undistort_map(&self, width: usize, height: usize) -> (GrayFloatImage, GrayFloatImage) {
        let mut map_x = GrayFloatImage::new(width, height);
        let mut map_y = GrayFloatImage::new(width, height);
        self.fill_undistort_map(&mut map_x, &mut map_y);
        (map_x, map_y)
    }

    /// Fills the undistortion maps in place.
    ///
    /// For every pixel `(u, v)` of the undistorted destination image, `map_x(u, v)` and
    /// `map_y(u, v)` receive the sub-pixel position in the distorted source image that has
    /// to be sampled. Feed them to [`remap`] to undistort an image. The destination camera
    /// uses the same intrinsic matrix as the source.
    pub fn init_undistort_map_into(
        &self,
        map_x: &mut GrayFloatImage,
        map_y: &mut GrayFloatImage,
    ) -> Result<()> {
        check_same_dimensions(&*map_x, &*map_y)?;
        self.fill_undistort_map(map_x, map_y);
        Ok(())
    }

    fn fill_undistort_map(&self, map_x: &mut GrayFloatImage, map_y: &mut GrayFloatImage) {
        let width = map_x.width();
        trace!(
            "Computing {}x{} undistortion maps",
            width,
            map_x.height()
        );
        if width == 0 || map_x.height() == 0 {
            return;
        }
        let fill_row = |(v, (row_x, row_y)): (usize, (&mut [f32], &mut [f32]))| {
            for (u, (mx, my)) in row_x.iter_mut().zip(row_y.iter_mut()).enumerate() {
                let source = self.distorted_pixel(Point2::new(u as f64, v as f64));
                *mx = source.x as f32;
                *my = source.y as f32;
            }
        };
        #[cfg(not(feature = "rayon"))]
        map_x
            .chunks_mut(width)
            .zip(map_y.chunks_mut(width))
            .enumerate()
            .for_each(fill_row);
        #[cfg(feature = "rayon")]
        map_x
            .par_chunks_mut(width)
            .zip(map_y.par_chunks_mut(width))
            .enumerate()
            .for_each(fill_row);
    }
}

/// Fills undistortion maps from a raw intrinsic matrix `a` and OpenCV ordered distortion
/// coefficients.
pub fn init_undistort_map(
    a: &Matrix3<f64>,
    coefficients: &[f64],
    map_x: &mut GrayFloatImage,
    map_y: &mut GrayFloatImage,
) -> Result<()> {
    PinholeCamera::from_matrix(a, coefficients)?.init_undistort_map_into(map_x, map_y)
}

/// Samples `channel` of `raster` at the sub-pixel position `(x, y)` with bilinear
/// interpolation.
///
/// Returns `NaN` when the position lies outside of the raster. Neighbours that get a zero
/// weight are never read, so sampling exactly on the last row or column works.
pub fn interpolate<R: Raster + ?Sized>(raster: &R, channel: usize, x: f64, y: f64) -> f64 {
    let max_x = raster.width() as f64 - 1.0;
    let max_y = raster.height() as f64 - 1.0;
    if !(x >= 0.0 && y >= 0.0 && x <= max_x && y <= max_y) {
        return f64::NAN;
    }
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as usize, y0 as usize);
    let mut value = 0.0;
    for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
        for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
            let weight = wx * wy;
            if weight > 0.0 {
                value += weight * raster.get(x0 + dx, y0 + dy, channel);
            }
        }
    }
    value
}

/// Resamples every channel of `source` through the maps of
/// [`PinholeCamera::init_undistort_map`] into `destination`.
///
/// `destination` must have the size of the maps and at least as many channels as `source`.
/// Destination pixels whose source position lies outside of `source` become `NaN`.
pub fn remap<S, D>(
    source: &S,
    map_x: &GrayFloatImage,
    map_y: &GrayFloatImage,
    destination: &mut D,
) -> Result<()>
where
    S: Raster + ?Sized,
    D: RasterMut + ?Sized,
{
    check_same_dimensions(map_x, map_y)?;
    check_same_dimensions(map_x, destination)?;
    if source.channels() > 0 {
        check_channel(destination, source.channels() - 1)?;
    }
    for v in 0..map_x.height() {
        for u in 0..map_x.width() {
            let x = f64::from(map_x.get(u, v));
            let y = f64::from(map_y.get(u, v));
            for channel in 0..source.channels() {
                destination.set(u, v, channel, interpolate(source, channel, x, y));
            }
        }
    }
    Ok(())
}

use crate::{check_channel, Raster, RasterMut, Result, XyzImage};
use image::Rgb;
use log::*;
use nalgebra::Point3;

/// The value stored in every channel of a coordinate pixel without a measurement.
pub const INVALID_COORDINATE: f32 = f32::NAN;

/// The range sentinel most range cameras use to report a pixel without a return.
pub const DEFAULT_RANGE_SENTINEL: f64 = 0.0;

/// Checks whether a raw range sample is a real measurement.
///
/// Ranges are non-negative distances. A sample is invalid when it is equal to `sentinel`,
/// negative or not finite.
#[inline(always)]
pub fn is_valid_range(range: f64, sentinel: f64) -> bool {
    range.is_finite() && range >= 0.0 && range != sentinel
}

/// Checks whether all three channels of a coordinate are finite.
#[inline(always)]
pub fn is_valid_coordinate(coordinate: &[f32; 3]) -> bool {
    coordinate.iter().all(|c| c.is_finite())
}

/// Fails with [`crate::Error::ChannelOutOfRange`] unless the raster has the three channels
/// of a coordinate raster.
pub fn check_coordinate_raster<R: Raster + ?Sized>(raster: &R) -> Result<()> {
    check_channel(raster, 2)
}

/// Reads the point stored in channels `0..3` of pixel `(x, y)` of any coordinate raster.
///
/// Returns `None` if one of the channels is not finite.
///
/// # Panics
///
/// Panics if `(x, y)` lies outside of the raster or it has fewer than three channels.
#[inline]
pub fn read_point<R: Raster + ?Sized>(raster: &R, x: usize, y: usize) -> Option<Point3<f64>> {
    let p = Point3::new(raster.get(x, y, 0), raster.get(x, y, 1), raster.get(x, y, 2));
    if p.iter().all(|c| c.is_finite()) {
        Some(p)
    } else {
        None
    }
}

/// Writes a point into channels `0..3` of pixel `(x, y)`, or marks the pixel invalid.
#[inline]
pub fn write_point<D>(raster: &mut D, x: usize, y: usize, point: Option<Point3<f64>>)
where
    D: RasterMut + ?Sized,
{
    let coordinate = point.map_or([f64::from(INVALID_COORDINATE); 3], |p| [p.x, p.y, p.z]);
    for (channel, value) in coordinate.into_iter().enumerate() {
        raster.set(x, y, channel, value);
    }
}

impl XyzImage {
    /// Retrieves the point seen through pixel `(x, y)`, or `None` if the pixel is invalid.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the image.
    pub fn point(&self, x: usize, y: usize) -> Option<Point3<f64>> {
        let Rgb(coordinate) = *self.get_pixel(x as u32, y as u32);
        if is_valid_coordinate(&coordinate) {
            Some(Point3::new(
                f64::from(coordinate[0]),
                f64::from(coordinate[1]),
                f64::from(coordinate[2]),
            ))
        } else {
            None
        }
    }

    /// Stores a point, or marks the pixel invalid when `point` is `None`.
    pub fn set_point(&mut self, x: usize, y: usize, point: Option<Point3<f64>>) {
        let coordinate = match point {
            Some(p) => [p.x as f32, p.y as f32, p.z as f32],
            None => [INVALID_COORDINATE; 3],
        };
        self.put_pixel(x as u32, y as u32, Rgb(coordinate));
    }

    /// Collects every valid pixel into a point cloud, in row-major pixel order.
    pub fn points(&self) -> Vec<Point3<f64>> {
        let points: Vec<Point3<f64>> = self
            .pixels()
            .filter(|Rgb(c)| is_valid_coordinate(c))
            .map(|Rgb(c)| Point3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2])))
            .collect();
        debug!(
            "Collected {} valid points out of {} pixels",
            points.len(),
            self.width() * self.height()
        );
        points
    }

    /// Finds the per-axis minimum and maximum over all valid pixels.
    ///
    /// Returns `None` when the image has no valid pixel.
    pub fn min_max(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        self.pixels()
            .filter(|Rgb(c)| is_valid_coordinate(c))
            .map(|Rgb(c)| Point3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2])))
            .fold(None, |bounds, p| match bounds {
                None => Some((p, p)),
                Some((min, max)) => Some((min.inf(&p), max.sup(&p))),
            })
    }
}

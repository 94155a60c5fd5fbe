use crate::integral::window;
use crate::DEGENERATE_EPSILON;
use log::*;
use range_core::nalgebra::{Point3, Vector3};
use range_core::{
    check_coordinate_raster, check_same_dimensions, check_window, read_point, write_point, Error,
    Raster, RasterMut, Result,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The surface normal strategies that work on a coordinate raster.
///
/// A coordinate raster is any [`Raster`] with the `(x, y, z)` position of a pixel in
/// channels `0..3`, such as [`range_core::XyzImage`] or a double precision
/// `ImageBuffer<Rgb<f64>, Vec<f64>>`.
///
/// Every strategy builds two tangent vectors from neighboring points and returns their
/// normalized cross product, oriented toward the camera (`n · P <= 0` for the center point
/// `P`). The zero vector means there is no reliable normal: a sampled pixel is invalid, a
/// tangent vanishes or the tangents are parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormalEstimator {
    /// Central differences `P(x + k, y) - P(x - k, y)` and `P(x, y + k) - P(x, y - k)`.
    Central { k: usize },
    /// Sobel weighted differences over the 3x3 neighborhood.
    Sobel,
    /// Diagonal differences `P(x + k, y + k) - P(x - k, y - k)` and
    /// `P(x + k, y - k) - P(x - k, y + k)`.
    Diagonal { k: usize },
}

impl Default for NormalEstimator {
    fn default() -> Self {
        Self::Central { k: 1 }
    }
}

impl NormalEstimator {
    /// The half size of the window the estimator reads.
    pub fn reach(&self) -> usize {
        match *self {
            Self::Central { k } | Self::Diagonal { k } => k,
            Self::Sobel => 1,
        }
    }

    fn check_offset(&self) -> Result<()> {
        match self.reach() {
            0 => Err(Error::InvalidRadius {
                radius: 0,
                minimum: 1,
            }),
            _ => Ok(()),
        }
    }

    /// Estimates the unit normal at pixel `(x, y)`.
    ///
    /// The neighborhood must lie inside of the image, otherwise [`Error::OutOfBounds`] is
    /// returned. A raster with fewer than three channels is [`Error::ChannelOutOfRange`].
    pub fn estimate<R>(&self, xyz: &R, x: usize, y: usize) -> Result<Vector3<f64>>
    where
        R: Raster + ?Sized,
    {
        self.check_offset()?;
        check_coordinate_raster(xyz)?;
        let [left, right, top, bottom] = window(x, y, self.reach());
        check_window(xyz, left, right, top, bottom)?;
        Ok(self
            .estimate_unchecked(xyz, x as isize, y as isize)
            .unwrap_or_else(Vector3::zeros))
    }

    /// Estimation on a validated window. `None` is the degenerate result.
    fn estimate_unchecked<R>(&self, xyz: &R, x: isize, y: isize) -> Option<Vector3<f64>>
    where
        R: Raster + ?Sized,
    {
        let point = |dx: isize, dy: isize| read_point(xyz, (x + dx) as usize, (y + dy) as usize);
        let center = point(0, 0)?;
        let (tangent_x, tangent_y) = match *self {
            Self::Central { k } => {
                let k = k as isize;
                (
                    point(k, 0)? - point(-k, 0)?,
                    point(0, k)? - point(0, -k)?,
                )
            }
            Self::Sobel => {
                let mut tangent_x = Vector3::zeros();
                let mut tangent_y = Vector3::zeros();
                for (d, weight) in [(-1, 1.0), (0, 2.0), (1, 1.0)] {
                    tangent_x += weight * (point(1, d)? - point(-1, d)?);
                    tangent_y += weight * (point(d, 1)? - point(d, -1)?);
                }
                (tangent_x, tangent_y)
            }
            Self::Diagonal { k } => {
                let k = k as isize;
                let falling = point(k, k)? - point(-k, -k)?;
                let rising = point(k, -k)? - point(-k, k)?;
                // (rising, falling) spans the same orientation as (x, y).
                (rising, falling)
            }
        };
        orient(center, tangent_x, tangent_y)
    }
}

/// Normalized `tangent_x × tangent_y`, flipped to face the camera.
fn orient(
    center: Point3<f64>,
    tangent_x: Vector3<f64>,
    tangent_y: Vector3<f64>,
) -> Option<Vector3<f64>> {
    let scale = DEGENERATE_EPSILON * (1.0 + center.coords.norm());
    let (length_x, length_y) = (tangent_x.norm(), tangent_y.norm());
    if length_x <= scale || length_y <= scale {
        return None;
    }
    let normal = tangent_x.cross(&tangent_y);
    let length = normal.norm();
    if !length.is_finite() || length <= DEGENERATE_EPSILON * length_x * length_y {
        return None;
    }
    let normal = normal / length;
    if normal.dot(&center.coords) > 0.0 {
        Some(-normal)
    } else {
        Some(normal)
    }
}

/// Estimates the normal of every pixel of a coordinate raster into channels `0..3` of `out`.
///
/// Every pixel is written; pixels closer than the estimator's reach to the border get the
/// zero vector.
pub fn normal_image<R, D>(xyz: &R, estimator: NormalEstimator, out: &mut D) -> Result<()>
where
    R: Raster + Sync + ?Sized,
    D: RasterMut + ?Sized,
{
    estimator.check_offset()?;
    check_coordinate_raster(xyz)?;
    check_coordinate_raster(&*out)?;
    check_same_dimensions(xyz, &*out)?;
    let (width, height) = xyz.dimensions();
    let reach = estimator.reach();
    debug!(
        "Estimating {}x{} normal image with {:?}",
        width, height, estimator
    );

    let interior = |v: usize, size: usize| v >= reach && size - v > reach;
    let estimate_row = |y: usize| -> Vec<Vector3<f64>> {
        (0..width)
            .map(|x| {
                let normal = if interior(x, width) && interior(y, height) {
                    estimator.estimate_unchecked(xyz, x as isize, y as isize)
                } else {
                    None
                };
                normal.unwrap_or_else(Vector3::zeros)
            })
            .collect()
    };
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<Vector3<f64>>> = (0..height).map(estimate_row).collect();
    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<Vector3<f64>>> = (0..height).into_par_iter().map(estimate_row).collect();

    for (y, row) in rows.into_iter().enumerate() {
        for (x, normal) in row.into_iter().enumerate() {
            write_point(out, x, y, Some(Point3::from(normal)));
        }
    }
    Ok(())
}

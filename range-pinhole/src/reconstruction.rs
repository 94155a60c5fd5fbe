use crate::{PinholeCamera, RigidTransform};
use log::*;
use range_core::nalgebra::{Point2, Point3};
use range_core::{
    check_channel, check_coordinate_raster, check_same_dimensions, is_valid_range, read_point,
    write_point, GrayFloatImage, Raster, RasterMut, Result, DEFAULT_RANGE_SENTINEL,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// What a raw range sample measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum RangeModel {
    /// The euclidean distance from the optical center to the surface along the pixel ray.
    /// Time-of-flight cameras measure this.
    RadialDistance,
    /// The `z` coordinate of the surface.
    Depth,
}

/// The quadratic correction `a r^2 + b r + c` applied to every range sample.
///
/// The identity correction is `a = 0, b = 1, c = 0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DepthCorrection {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for DepthCorrection {
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 1.0,
            c: 0.0,
        }
    }
}

/// Parameters of the range to coordinate conversion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ReconstructionConfig {
    /// Default is [`RangeModel::RadialDistance`].
    pub range_model: RangeModel,
    /// Default is the identity correction.
    pub depth_correction: DepthCorrection,
    /// Range value that marks a pixel without a return. Default is
    /// [`DEFAULT_RANGE_SENTINEL`].
    pub range_sentinel: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            range_model: RangeModel::RadialDistance,
            depth_correction: DepthCorrection::default(),
            range_sentinel: DEFAULT_RANGE_SENTINEL,
        }
    }
}

impl ReconstructionConfig {
    /// Configuration for a sensor that delivers `z` directly.
    pub fn depth() -> Self {
        Self {
            range_model: RangeModel::Depth,
            ..Self::default()
        }
    }

    pub fn range_model(self, range_model: RangeModel) -> Self {
        Self {
            range_model,
            ..self
        }
    }

    pub fn depth_correction(self, a: f64, b: f64, c: f64) -> Self {
        Self {
            depth_correction: DepthCorrection { a, b, c },
            ..self
        }
    }

    pub fn range_sentinel(self, range_sentinel: f64) -> Self {
        Self {
            range_sentinel,
            ..self
        }
    }
}

/// Per-pixel coefficients that turn a range image into a coordinate image.
///
/// For a range sample `r` at pixel `(u, v)`:
///
/// ```text
/// z = az(u, v) * r^2 + bz(u, v) * r + cz(u, v)
/// x = x(u, v) * z
/// y = y(u, v) * z
/// ```
///
/// `x` and `y` are the undistorted normalized ray coordinates of the pixel. The maps only
/// depend on the calibration, so compute them once per camera and image size.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMaps {
    pub az: GrayFloatImage,
    pub bz: GrayFloatImage,
    pub cz: GrayFloatImage,
    pub x: GrayFloatImage,
    pub y: GrayFloatImage,
    /// Range value that marks a pixel without a return, taken from
    /// [`ReconstructionConfig::range_sentinel`].
    pub range_sentinel: f64,
}

impl CalibrationMaps {
    /// Precomputes the maps of `camera` for a `width` x `height` range image.
    ///
    /// Pixels where the inversion of the lens distortion does not converge keep the last
    /// iterate; a single warning reports how many there were.
    pub fn from_camera(
        camera: &PinholeCamera,
        width: usize,
        height: usize,
        config: &ReconstructionConfig,
    ) -> Self {
        debug!(
            "Computing {}x{} calibration maps with {:?}",
            width, height, config
        );
        let DepthCorrection { a, b, c } = config.depth_correction;
        let compute = |index: usize| {
            let pixel = Point2::new((index % width) as f64, (index / width) as f64);
            let (ray, converged) = camera.normalize_ext(pixel);
            let factor = match config.range_model {
                RangeModel::RadialDistance => 1.0 / (1.0 + ray.norm_squared()).sqrt(),
                RangeModel::Depth => 1.0,
            };
            let coefficients = [a * factor, b * factor, c * factor, ray.x, ray.y];
            (coefficients.map(|v| v as f32), converged)
        };

        #[cfg(not(feature = "rayon"))]
        let samples: Vec<([f32; 5], bool)> = (0..width * height).map(compute).collect();
        #[cfg(feature = "rayon")]
        let samples: Vec<([f32; 5], bool)> =
            (0..width * height).into_par_iter().map(compute).collect();

        let failed = samples.iter().filter(|(_, converged)| !converged).count();
        if failed > 0 {
            warn!(
                "Undistortion did not converge for {} of {} pixels",
                failed,
                samples.len()
            );
        }

        let map = |k: usize| GrayFloatImage::from_fn(width, height, |u, v| samples[v * width + u].0[k]);
        Self {
            az: map(0),
            bz: map(1),
            cz: map(2),
            x: map(3),
            y: map(4),
            range_sentinel: config.range_sentinel,
        }
    }

    pub fn width(&self) -> usize {
        self.az.width()
    }

    pub fn height(&self) -> usize {
        self.az.height()
    }

    /// Fails with [`range_core::Error::DimensionMismatch`] unless all five maps have the
    /// same size.
    pub fn check(&self) -> Result<()> {
        for other in [&self.bz, &self.cz, &self.x, &self.y] {
            check_same_dimensions(&self.az, other)?;
        }
        Ok(())
    }
}

/// Reconstructs the coordinate image of a range image into channels `0..3` of `out`.
///
/// `range` is read from channel `0`. Pixels whose range is invalid (see
/// [`range_core::is_valid_range`] and [`CalibrationMaps::range_sentinel`]) receive
/// [`range_core::INVALID_COORDINATE`]. The sentinel is compared at the precision of the range
/// raster. The range image, the maps and `out` must all have the same size.
pub fn xyz_image_from_range_image<R, D>(
    range: &R,
    maps: &CalibrationMaps,
    out: &mut D,
) -> Result<()>
where
    R: Raster + Sync + ?Sized,
    D: RasterMut + ?Sized,
{
    maps.check()?;
    check_same_dimensions(&maps.az, range)?;
    check_same_dimensions(&maps.az, &*out)?;
    check_channel(range, 0)?;
    check_coordinate_raster(&*out)?;
    let (width, height) = (maps.width(), maps.height());
    trace!("Reconstructing {}x{} coordinate image", width, height);

    let sentinel = range.round_to_sample(maps.range_sentinel);
    let reconstruct_row = |v: usize| -> Vec<Option<Point3<f64>>> {
        (0..width)
            .map(|u| {
                let r = range.get(u, v, 0);
                if !is_valid_range(r, sentinel) {
                    return None;
                }
                let z = f64::from(maps.az.get(u, v)) * r * r
                    + f64::from(maps.bz.get(u, v)) * r
                    + f64::from(maps.cz.get(u, v));
                Some(Point3::new(
                    f64::from(maps.x.get(u, v)) * z,
                    f64::from(maps.y.get(u, v)) * z,
                    z,
                ))
            })
            .collect()
    };
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<Option<Point3<f64>>>> = (0..height).map(reconstruct_row).collect();
    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<Option<Point3<f64>>>> =
        (0..height).into_par_iter().map(reconstruct_row).collect();

    for (v, row) in rows.into_iter().enumerate() {
        for (u, point) in row.into_iter().enumerate() {
            write_point(out, u, v, point);
        }
    }
    Ok(())
}

/// Applies a rigid transform to every valid pixel of a coordinate raster.
///
/// Invalid pixels stay invalid.
pub fn transform_xyz_image<R, D>(xyz: &R, transform: &RigidTransform, out: &mut D) -> Result<()>
where
    R: Raster + ?Sized,
    D: RasterMut + ?Sized,
{
    check_coordinate_raster(xyz)?;
    check_coordinate_raster(&*out)?;
    check_same_dimensions(xyz, &*out)?;
    let (width, height) = xyz.dimensions();
    for y in 0..height {
        for x in 0..width {
            let point = read_point(xyz, x, y).map(|p| transform.transform_point(&p));
            write_point(out, x, y, point);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraIntrinsics, PlumbBob};
    use approx::assert_relative_eq;
    use image::{ImageBuffer, Luma, Rgb};
    use range_core::nalgebra::{Rotation3, Vector3};
    use range_core::{Error, Rodrigues, XyzImage};

    fn camera() -> PinholeCamera {
        PinholeCamera::new(
            CameraIntrinsics::identity()
                .focal(20.0)
                .principal_point(Point2::new(7.5, 5.5)),
            PlumbBob::from_coefficients(&[-0.1, 0.01, 0.0005, 0.0002]).unwrap(),
        )
    }

    #[test]
    fn radial_distance_lands_on_the_sphere() {
        let camera = camera();
        let maps = CalibrationMaps::from_camera(&camera, 16, 12, &ReconstructionConfig::default());
        let range = GrayFloatImage::filled(16, 12, 2.0);
        let mut xyz = XyzImage::new(16, 12);
        xyz_image_from_range_image(&range, &maps, &mut xyz).unwrap();
        for p in xyz.points() {
            assert_relative_eq!(p.coords.norm(), 2.0, epsilon = 1e-5);
        }
        assert_eq!(xyz.points().len(), 16 * 12);
    }

    #[test]
    fn depth_model_and_correction() {
        let config = ReconstructionConfig::depth().depth_correction(0.5, 2.0, 1.0);
        let maps = CalibrationMaps::from_camera(&camera(), 16, 12, &config);
        let range = GrayFloatImage::filled(16, 12, 1.0);
        let mut xyz = XyzImage::new(16, 12);
        xyz_image_from_range_image(&range, &maps, &mut xyz).unwrap();
        let p = xyz.point(3, 9).unwrap();
        assert_relative_eq!(p.z, 3.5, epsilon = 1e-6);
        let ray = camera().normalize(Point2::new(3.0, 9.0));
        assert_relative_eq!(p.x, ray.x * 3.5, epsilon = 1e-5);
        assert_relative_eq!(p.y, ray.y * 3.5, epsilon = 1e-5);
    }

    #[test]
    fn invalid_ranges_propagate() {
        let config = ReconstructionConfig::default().range_sentinel(7.0);
        let maps = CalibrationMaps::from_camera(&camera(), 4, 3, &config);
        assert_eq!(maps.range_sentinel, 7.0);
        let mut range = GrayFloatImage::filled(4, 3, 1.0);
        range.put(0, 0, 0.0);
        range.put(1, 0, f32::NAN);
        range.put(2, 0, -1.0);
        range.put(3, 0, 7.0);
        let mut xyz = XyzImage::new(4, 3);
        xyz_image_from_range_image(&range, &maps, &mut xyz).unwrap();
        assert!(xyz.point(0, 0).is_some());
        assert!(xyz.point(1, 0).is_none());
        assert!(xyz.point(2, 0).is_none());
        assert!(xyz.point(3, 0).is_none());
        assert!(xyz.point(3, 2).is_some());
    }

    #[test]
    fn sentinel_matches_at_sample_precision() {
        let config = ReconstructionConfig::depth().range_sentinel(0.1);
        let maps = CalibrationMaps::from_camera(&camera(), 4, 3, &config);
        let mut range = GrayFloatImage::filled(4, 3, 1.0);
        range.put(2, 1, 0.1);
        let mut xyz = XyzImage::new(4, 3);
        xyz_image_from_range_image(&range, &maps, &mut xyz).unwrap();
        assert!(xyz.point(2, 1).is_none());
        assert_eq!(xyz.points().len(), 11);
    }

    #[test]
    fn double_precision_rasters() {
        let maps = CalibrationMaps::from_camera(&camera(), 16, 12, &ReconstructionConfig::depth());
        let mut range = ImageBuffer::<Luma<f64>, Vec<f64>>::from_pixel(16, 12, Luma([1.25]));
        range.put_pixel(5, 5, Luma([DEFAULT_RANGE_SENTINEL]));
        let mut xyz = ImageBuffer::<Rgb<f64>, Vec<f64>>::new(16, 12);
        xyz_image_from_range_image(&range, &maps, &mut xyz).unwrap();
        assert_eq!(read_point(&xyz, 5, 5), None);
        let p = read_point(&xyz, 3, 9).unwrap();
        assert_eq!(p.z, 1.25);
        assert_relative_eq!(p.x, f64::from(maps.x.get(3, 9)) * 1.25);

        let mut moved = ImageBuffer::<Rgb<f64>, Vec<f64>>::new(16, 12);
        let shift = RigidTransform::from_parts(Rotation3::identity(), Vector3::new(0.0, 0.0, 1.0));
        transform_xyz_image(&xyz, &shift, &mut moved).unwrap();
        assert_eq!(read_point(&moved, 3, 9).map(|p| p.z), Some(2.25));
        assert_eq!(read_point(&moved, 5, 5), None);

        let mut gray = GrayFloatImage::new(16, 12);
        assert!(matches!(
            xyz_image_from_range_image(&range, &maps, &mut gray),
            Err(Error::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn sizes_must_match() {
        let maps = CalibrationMaps::from_camera(&camera(), 4, 3, &ReconstructionConfig::default());
        let range = GrayFloatImage::filled(4, 4, 1.0);
        let mut xyz = XyzImage::new(4, 3);
        assert!(matches!(
            xyz_image_from_range_image(&range, &maps, &mut xyz),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn transform_keeps_invalid_pixels() {
        let mut xyz = XyzImage::new(2, 1);
        xyz.set_point(0, 0, Some(Point3::new(1.0, 0.0, 2.0)));
        let transform = RigidTransform::from_rodrigues(
            Rodrigues::new(0.0, 0.0, core::f64::consts::FRAC_PI_2),
            Vector3::new(0.0, 0.0, 1.0),
        );
        let mut out = XyzImage::new(2, 1);
        transform_xyz_image(&xyz, &transform, &mut out).unwrap();
        assert_relative_eq!(
            out.point(0, 0).unwrap(),
            Point3::new(0.0, 1.0, 3.0),
            epsilon = 1e-6
        );
        assert!(out.point(1, 0).is_none());
    }
}

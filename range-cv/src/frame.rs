use log::*;
use range_core::nalgebra::Vector3;
use range_core::{check_same_dimensions, GrayFloatImage, Raster, Result, XyzImage};
use range_features::{
    gradient_image_into, normal_image, GradientEstimator, IntegralImage, NormalEstimator,
};
use range_pinhole::{
    transform_xyz_image, xyz_image_from_range_image, CalibrationMaps, PinholeCamera,
    ReconstructionConfig, RigidTransform,
};

/// Everything computed from one range and intensity frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Reconstructed points, in the target frame when extrinsics are configured.
    pub xyz: XyzImage,
    /// Unit surface normals in the same frame as `xyz`; zero where there is none.
    pub normals: XyzImage,
    pub gradient_magnitude: GrayFloatImage,
    pub gradient_phase: GrayFloatImage,
}

impl Frame {
    /// Number of pixels with a valid coordinate.
    pub fn valid_points(&self) -> usize {
        self.xyz
            .pixels()
            .filter(|p| range_core::is_valid_coordinate(&p.0))
            .count()
    }
}

/// Runs reconstruction, normal and gradient estimation on a frame.
///
/// The default uses the radial distance range model, box-sum gradients of radius 2 and
/// central difference normals with `k = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProcessor {
    pub reconstruction: ReconstructionConfig,
    pub gradient: GradientEstimator,
    pub gradient_radius: usize,
    pub normal: NormalEstimator,
    /// Transform from the range camera into the frame the output should be expressed in,
    /// for instance the color camera of the same head.
    pub extrinsics: Option<RigidTransform>,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self {
            reconstruction: ReconstructionConfig::default(),
            gradient: GradientEstimator::BoxSum,
            gradient_radius: 2,
            normal: NormalEstimator::Central { k: 1 },
            extrinsics: None,
        }
    }
}

impl FrameProcessor {
    /// This convenience constructor is provided for the very common case that only the
    /// gradient radius needs to be changed.
    pub fn new(gradient_radius: usize) -> Self {
        Self {
            gradient_radius,
            ..Default::default()
        }
    }

    /// Coarse gradients with radius `5`, smoothing away sensor noise.
    pub fn smooth() -> Self {
        Self::new(5)
    }

    /// Fine gradients with the 3x3 Sobel kernel and Sobel normals.
    pub fn fine() -> Self {
        Self {
            gradient: GradientEstimator::Sobel,
            gradient_radius: 1,
            normal: NormalEstimator::Sobel,
            ..Default::default()
        }
    }

    pub fn reconstruction(self, reconstruction: ReconstructionConfig) -> Self {
        Self {
            reconstruction,
            ..self
        }
    }

    pub fn gradient(self, gradient: GradientEstimator, gradient_radius: usize) -> Self {
        Self {
            gradient,
            gradient_radius,
            ..self
        }
    }

    pub fn normal(self, normal: NormalEstimator) -> Self {
        Self { normal, ..self }
    }

    pub fn extrinsics(self, extrinsics: RigidTransform) -> Self {
        Self {
            extrinsics: Some(extrinsics),
            ..self
        }
    }

    /// Precomputes the calibration maps of `camera` for frames of the given size.
    ///
    /// The maps carry the range sentinel of the reconstruction config. Keep the result around and hand it to [`FrameProcessor::process`] for every frame.
    pub fn calibrate(&self, camera: &PinholeCamera, width: usize, height: usize) -> CalibrationMaps {
        CalibrationMaps::from_camera(camera, width, height, &self.reconstruction)
    }

    /// Processes one frame.
    ///
    /// `range` and `intensity` are read from channel `0` and must have the size of `maps`.
    pub fn process<R, I>(&self, maps: &CalibrationMaps, range: &R, intensity: &I) -> Result<Frame>
    where
        R: Raster + Sync + ?Sized,
        I: Raster + ?Sized,
    {
        check_same_dimensions(&maps.az, intensity)?;
        let (width, height) = (maps.width(), maps.height());

        trace!("Reconstructing coordinates.");
        let mut xyz = XyzImage::new(width, height);
        xyz_image_from_range_image(range, maps, &mut xyz)?;

        trace!("Estimating normals.");
        let mut normals = XyzImage::new(width, height);
        normal_image(&xyz, self.normal, &mut normals)?;

        trace!("Estimating gradients.");
        let integral = IntegralImage::new(intensity, 0)?;
        let mut gradient_magnitude = GrayFloatImage::new(width, height);
        let mut gradient_phase = GrayFloatImage::new(width, height);
        gradient_image_into(
            &integral,
            self.gradient,
            self.gradient_radius,
            &mut gradient_magnitude,
            &mut gradient_phase,
        )?;

        if let Some(extrinsics) = self.extrinsics {
            trace!("Moving the frame into the target frame.");
            let mut moved = XyzImage::new(width, height);
            transform_xyz_image(&xyz, &extrinsics, &mut moved)?;
            xyz = moved;
            rotate_normals(&mut normals, &extrinsics);
        }

        let frame = Frame {
            xyz,
            normals,
            gradient_magnitude,
            gradient_phase,
        };
        info!(
            "Processed {}x{} frame with {} valid points",
            width,
            height,
            frame.valid_points()
        );
        Ok(frame)
    }
}

fn rotate_normals(normals: &mut XyzImage, extrinsics: &RigidTransform) {
    let rotation = extrinsics.rotation();
    for pixel in normals.chunks_exact_mut(3) {
        let n = rotation
            * Vector3::new(
                f64::from(pixel[0]),
                f64::from(pixel[1]),
                f64::from(pixel[2]),
            );
        pixel.copy_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use range_core::nalgebra::{Point2, Point3};
    use range_core::Rodrigues;
    use range_pinhole::{CameraIntrinsics, PlumbBob};

    fn camera() -> PinholeCamera {
        PinholeCamera::new(
            CameraIntrinsics::identity()
                .focal(30.0)
                .principal_point(Point2::new(11.5, 8.5)),
            PlumbBob::from_coefficients(&[-0.15, 0.02, 0.0, 0.0]).unwrap(),
        )
    }

    #[test]
    fn extrinsics_move_points_and_normals() {
        let camera = camera();
        let processor = FrameProcessor::default()
            .reconstruction(ReconstructionConfig::depth())
            .extrinsics(RigidTransform::from_rodrigues(
                Rodrigues::new(0.0, core::f64::consts::PI, 0.0),
                Vector3::new(0.0, 0.0, 4.0),
            ));
        let maps = processor.calibrate(&camera, 24, 18);
        let range = GrayFloatImage::filled(24, 18, 1.5);
        let intensity = GrayFloatImage::new(24, 18);
        let frame = processor.process(&maps, &range, &intensity).unwrap();

        let p = frame.xyz.point(11, 8).unwrap();
        assert_relative_eq!(p.z, 2.5, epsilon = 1e-5);
        let n = frame.normals.point(11, 8).unwrap();
        assert_relative_eq!(n, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn smooth_gradients_span_the_radius() {
        let processor = FrameProcessor::smooth();
        assert_eq!(processor.gradient_radius, 5);
        let maps = processor.calibrate(&camera(), 24, 18);
        let range = GrayFloatImage::filled(24, 18, 1.5);
        let intensity = GrayFloatImage::from_fn(24, 18, |_, y| 0.25 * y as f32);
        let frame = processor.process(&maps, &range, &intensity).unwrap();
        assert_eq!(frame.gradient_magnitude.get(4, 9), 0.0);
        assert_eq!(frame.gradient_magnitude.get(5, 13), 0.0);
        assert_relative_eq!(frame.gradient_magnitude.get(5, 9), 0.25, epsilon = 1e-6);
        assert_relative_eq!(
            frame.gradient_phase.get(5, 9),
            core::f32::consts::FRAC_PI_2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn intensity_must_match() {
        let processor = FrameProcessor::fine();
        let maps = processor.calibrate(&camera(), 24, 18);
        let range = GrayFloatImage::filled(24, 18, 1.5);
        let intensity = GrayFloatImage::new(24, 17);
        assert!(processor.process(&maps, &range, &intensity).is_err());
    }
}

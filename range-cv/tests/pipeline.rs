use approx::assert_relative_eq;
use range_cv::camera::pinhole::{CameraIntrinsics, PinholeCamera, PlumbBob, ReconstructionConfig};
use range_cv::feature::{GradientEstimator, NormalEstimator};
use range_cv::frame::FrameProcessor;
use range_cv::nalgebra::{Point2, Point3};
use range_cv::GrayFloatImage;

const WIDTH: usize = 32;
const HEIGHT: usize = 24;

fn camera() -> PinholeCamera {
    PinholeCamera::new(
        CameraIntrinsics::identity()
            .focal(40.0)
            .principal_point(Point2::new(15.5, 11.5)),
        PlumbBob::from_coefficients(&[-0.12, 0.03, 0.0004, -0.0002, 0.0]).unwrap(),
    )
}

#[test]
fn sentinel_pixel_propagates_through_the_frame() {
    let _ = pretty_env_logger::try_init();
    let processor = FrameProcessor::default()
        .reconstruction(ReconstructionConfig::depth())
        .normal(NormalEstimator::Central { k: 1 });
    let maps = processor.calibrate(&camera(), WIDTH, HEIGHT);

    let mut range = GrayFloatImage::filled(WIDTH, HEIGHT, 2.0);
    range.put(10, 10, 0.0);
    let intensity = GrayFloatImage::from_fn(WIDTH, HEIGHT, |x, _| x as f32);
    let frame = processor.process(&maps, &range, &intensity).unwrap();

    assert_eq!(frame.valid_points(), WIDTH * HEIGHT - 1);
    assert!(frame.xyz.point(10, 10).is_none());
    for (x, y) in [(10, 10), (9, 10), (11, 10), (10, 9), (10, 11)] {
        assert_eq!(frame.normals.point(x, y), Some(Point3::origin()), "({}, {})", x, y);
    }
    let normal = frame.normals.point(20, 5).unwrap();
    assert_relative_eq!(normal, Point3::new(0.0, 0.0, -1.0), epsilon = 1e-5);

    assert!((frame.gradient_magnitude.get(16, 12) - 1.0).abs() < 1e-5);
    assert!(frame.gradient_phase.get(16, 12).abs() < 1e-5);
    assert_eq!(frame.gradient_magnitude.get(1, 1), 0.0);
}

#[test]
fn radial_ranges_stay_on_the_sphere() {
    let _ = pretty_env_logger::try_init();
    let processor = FrameProcessor::fine().gradient(GradientEstimator::Iterative, 3);
    let maps = processor.calibrate(&camera(), WIDTH, HEIGHT);
    let range = GrayFloatImage::filled(WIDTH, HEIGHT, 3.0);
    let intensity = GrayFloatImage::filled(WIDTH, HEIGHT, 0.5);
    let frame = processor.process(&maps, &range, &intensity).unwrap();
    for point in frame.xyz.points() {
        assert_relative_eq!(point.coords.norm(), 3.0, epsilon = 1e-5);
    }
    assert!(frame.gradient_magnitude.pixels().all(|p| p[0] == 0.0));
    let (min, max) = frame.xyz.min_max().unwrap();
    assert!(min.z < max.z);
    assert!(max.z <= 3.0);
}

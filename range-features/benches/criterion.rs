use criterion::{criterion_group, criterion_main, Criterion};
use range_core::nalgebra::Point3;
use range_core::{GrayFloatImage, XyzImage};
use range_features::{
    gradient_image_into, normal_image, GradientEstimator, IntegralImage, NormalEstimator,
};

const WIDTH: usize = 176;
const HEIGHT: usize = 144;

fn intensity() -> GrayFloatImage {
    GrayFloatImage::from_fn(WIDTH, HEIGHT, |x, y| {
        ((x as f32 * 0.13).sin() + (y as f32 * 0.07).cos()) * 100.0
    })
}

fn sphere() -> XyzImage {
    let mut xyz = XyzImage::new(WIDTH, HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let u = (x as f64 - WIDTH as f64 / 2.0) / WIDTH as f64;
            let v = (y as f64 - HEIGHT as f64 / 2.0) / WIDTH as f64;
            let z = 2.0 - (1.0 - u * u - v * v).sqrt();
            xyz.set_point(x, y, Some(Point3::new(u * z, v * z, z)));
        }
    }
    xyz
}

fn bench_integral(c: &mut Criterion) {
    let image = intensity();
    c.bench_function("integral_image", |b| {
        b.iter(|| IntegralImage::new(&image, 0))
    });
}

fn bench_gradients(c: &mut Criterion) {
    let integral = IntegralImage::new(&intensity(), 0).unwrap();
    let mut magnitude = GrayFloatImage::new(WIDTH, HEIGHT);
    let mut phase = GrayFloatImage::new(WIDTH, HEIGHT);
    for (name, estimator) in [
        ("gradient_box_sum", GradientEstimator::BoxSum),
        ("gradient_iterative", GradientEstimator::Iterative),
        ("gradient_sobel", GradientEstimator::Sobel),
    ] {
        c.bench_function(name, |b| {
            b.iter(|| gradient_image_into(&integral, estimator, 5, &mut magnitude, &mut phase))
        });
    }
}

fn bench_normals(c: &mut Criterion) {
    let xyz = sphere();
    let mut normals = XyzImage::new(WIDTH, HEIGHT);
    for (name, estimator) in [
        ("normal_central", NormalEstimator::Central { k: 2 }),
        ("normal_sobel", NormalEstimator::Sobel),
        ("normal_diagonal", NormalEstimator::Diagonal { k: 2 }),
    ] {
        c.bench_function(name, |b| {
            b.iter(|| normal_image(&xyz, estimator, &mut normals))
        });
    }
}

criterion_group!(
    name = features;
    config = Criterion::default().sample_size(10);
    targets = bench_integral, bench_gradients, bench_normals
);

criterion_main!(features);

use crate::{Raster, RasterMut, INVALID_COORDINATE};
use derive_more::{Deref, DerefMut};
use image::{ImageBuffer, Luma, Rgb};

type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;
type XyzImageBuffer = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// A single channel `f32` image.
///
/// Range, intensity and all per-pixel calibration coefficients are stored in this type.
/// It is a thin wrapper around the image crate's buffer so that rows can be handed out
/// as plain slices to the whole-image drivers.
#[derive(Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct GrayFloatImage(pub GrayImageBuffer);

impl GrayFloatImage {
    /// Creates an image filled with `0.0`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self(ImageBuffer::from_pixel(
            width as u32,
            height as u32,
            Luma([value]),
        ))
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        Self(ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            Luma([f(x as usize, y as usize)])
        }))
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.get_pixel(x as u32, y as u32)[0]
    }

    pub fn put(&mut self, x: usize, y: usize, pixel_value: f32) {
        self.put_pixel(x as u32, y as u32, Luma([pixel_value]));
    }
}

/// A three channel `f32` coordinate image.
///
/// Every pixel holds the `(x, y, z)` position of the surface seen through that pixel.
/// Pixels without a measurement hold [`INVALID_COORDINATE`] in all channels.
#[derive(Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct XyzImage(pub XyzImageBuffer);

impl XyzImage {
    /// Creates an image where every pixel is invalid.
    pub fn new(width: usize, height: usize) -> Self {
        Self(ImageBuffer::from_pixel(
            width as u32,
            height as u32,
            Rgb([INVALID_COORDINATE; 3]),
        ))
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }
}

impl Raster for GrayFloatImage {
    fn width(&self) -> usize {
        GrayFloatImage::width(self)
    }

    fn height(&self) -> usize {
        GrayFloatImage::height(self)
    }

    fn channels(&self) -> usize {
        1
    }

    #[inline(always)]
    fn get(&self, x: usize, y: usize, channel: usize) -> f64 {
        Raster::get(&self.0, x, y, channel)
    }

    fn round_to_sample(&self, value: f64) -> f64 {
        self.0.round_to_sample(value)
    }
}

impl RasterMut for GrayFloatImage {
    #[inline(always)]
    fn set(&mut self, x: usize, y: usize, channel: usize, value: f64) {
        self.0.set(x, y, channel, value);
    }
}

impl Raster for XyzImage {
    fn width(&self) -> usize {
        XyzImage::width(self)
    }

    fn height(&self) -> usize {
        XyzImage::height(self)
    }

    fn channels(&self) -> usize {
        3
    }

    #[inline(always)]
    fn get(&self, x: usize, y: usize, channel: usize) -> f64 {
        Raster::get(&self.0, x, y, channel)
    }

    fn round_to_sample(&self, value: f64) -> f64 {
        self.0.round_to_sample(value)
    }
}

impl RasterMut for XyzImage {
    #[inline(always)]
    fn set(&mut self, x: usize, y: usize, channel: usize, value: f64) {
        self.0.set(x, y, channel, value);
    }
}

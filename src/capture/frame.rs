//! Raw frame types produced by frame sources

use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbImage;

use super::source::CaptureError;

/// Pixel layouts a frame source may hand over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit red, green, blue
    Rgb24,
    /// Packed 8-bit blue, green, red (OpenCV/V4L2 default)
    Bgr24,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
        }
    }
}

/// A captured frame at full resolution
///
/// Pixels are normalized to RGB on construction. Frames are not `Clone`:
/// each pipeline stage takes ownership from the previous one.
#[derive(Debug)]
pub struct RawFrame {
    image: RgbImage,
    source_format: PixelFormat,
    /// Capture timestamp
    pub captured_at: Instant,
}

impl RawFrame {
    /// Build a frame from a packed pixel buffer
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        mut data: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(CaptureError::BadFrameSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        if format == PixelFormat::Bgr24 {
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        let actual = data.len();
        let image = RgbImage::from_raw(width, height, data).ok_or(CaptureError::BadFrameSize {
            width,
            height,
            expected,
            actual,
        })?;

        Ok(Self {
            image,
            source_format: format,
            captured_at: Instant::now(),
        })
    }

    /// Wrap an already decoded RGB image
    pub fn from_rgb(image: RgbImage, captured_at: Instant) -> Self {
        Self {
            image,
            source_format: PixelFormat::Rgb24,
            captured_at,
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel layout the source delivered
    pub fn source_format(&self) -> PixelFormat {
        self.source_format
    }

    /// Borrow the RGB pixels
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Take the RGB pixels
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Produce a copy shrunk by `factor` in each dimension
    ///
    /// Factors of 0 or 1 produce a same-size copy. Dimensions never drop
    /// below one pixel.
    pub fn downscale(&self, factor: u32) -> RawFrame {
        if factor <= 1 {
            return RawFrame::from_rgb(self.image.clone(), self.captured_at);
        }

        let width = (self.width() / factor).max(1);
        let height = (self.height() / factor).max(1);
        let small = imageops::resize(&self.image, width, height, FilterType::Triangle);

        RawFrame::from_rgb(small, self.captured_at)
    }
}

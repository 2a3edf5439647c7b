//! Frame annotation
//!
//! Draws a box around every detected face with its label on a filled bar
//! along the bottom edge of the box, then JPEG-encodes the result.

mod draw;
mod font;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use thiserror::Error;

use crate::capture::RawFrame;
use crate::recognition::Detection;

const BOX_THICKNESS: i64 = 2;
const LABEL_BAR_HEIGHT: i64 = 35;
const LABEL_INSET: i64 = 6;
const LABEL_SCALE: u32 = 2;

/// Error type for annotation
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// JPEG encoding failed
    #[error("JPEG encode failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Frame has no pixels
    #[error("cannot encode an empty {width}x{height} frame")]
    EmptyFrame { width: u32, height: u32 },
}

/// Draws detections onto frames and encodes them for streaming
#[derive(Debug, Clone)]
pub struct Annotator {
    jpeg_quality: u8,
    box_color: Rgb<u8>,
    text_color: Rgb<u8>,
}

impl Annotator {
    /// Create an annotator encoding at `jpeg_quality` (clamped to 1-100)
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            box_color: Rgb([255, 0, 0]),
            text_color: Rgb([255, 255, 255]),
        }
    }

    /// Draw every detection onto `image`
    ///
    /// Boxes must already be in `image` coordinates.
    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection]) {
        for detection in detections {
            let bbox = detection.bbox;
            let (left, top) = (i64::from(bbox.left), i64::from(bbox.top));
            let (right, bottom) = (i64::from(bbox.right), i64::from(bbox.bottom));

            draw::stroke_rect(image, left, top, right, bottom, BOX_THICKNESS, self.box_color);
            draw::fill_rect(
                image,
                left,
                bottom - LABEL_BAR_HEIGHT,
                right,
                bottom,
                self.box_color,
            );
            draw::draw_text(
                image,
                left + LABEL_INSET,
                bottom - LABEL_INSET - draw::text_height(LABEL_SCALE),
                &detection.label,
                LABEL_SCALE,
                self.text_color,
            );
        }
    }

    /// JPEG-encode an image
    pub fn encode(&self, image: &RgbImage) -> Result<Bytes, AnnotateError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnnotateError::EmptyFrame {
                width: image.width(),
                height: image.height(),
            });
        }

        let mut buffer = Vec::with_capacity(image.as_raw().len() / 8);
        JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality).encode_image(image)?;

        Ok(Bytes::from(buffer))
    }

    /// Draw detections on a full-resolution frame and encode it
    pub fn render(&self, frame: RawFrame, detections: &[Detection]) -> Result<Bytes, AnnotateError> {
        let mut image = frame.into_image();
        self.draw(&mut image, detections);
        self.encode(&image)
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(85)
    }
}

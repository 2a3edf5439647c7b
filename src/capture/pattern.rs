//! Synthetic test pattern source
//!
//! Generates a diagonal gradient with a vertical bar sweeping across it, so a
//! viewer can tell the stream is live without a camera attached.

use std::time::Instant;

use image::{Rgb, RgbImage};

use super::frame::RawFrame;
use super::source::{CaptureError, FrameSource};

const BAR_WIDTH: u32 = 16;
const BAR_STEP: u32 = 4;

/// Frame source producing a moving test pattern
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    tick: u64,
}

impl TestPatternSource {
    /// Create a pattern source with the given frame size (at least 1x1)
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            tick: 0,
        }
    }

    /// Frames produced so far
    pub fn frames_produced(&self) -> u64 {
        self.tick
    }
}

impl FrameSource for TestPatternSource {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let span = u64::from(self.width + BAR_WIDTH);
        let bar_x = ((self.tick * u64::from(BAR_STEP)) % span) as u32;
        let (width, height) = (self.width, self.height);

        let image = RgbImage::from_fn(width, height, |x, y| {
            if x + BAR_WIDTH >= bar_x && x < bar_x {
                return Rgb([255, 255, 255]);
            }
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            Rgb([r, g, 128])
        });

        self.tick += 1;
        Ok(RawFrame::from_rgb(image, Instant::now()))
    }
}

//! Frame capture
//!
//! Frame sources, the raw frame type, and the capture loop that turns raw
//! frames into annotated ones.
//!
//! Bundled sources:
//! - [`TestPatternSource`]: synthetic moving pattern, no hardware needed
//! - [`ImageDirSource`]: replays still images from a directory
//!
//! Camera backends implement [`FrameSource`] and plug into [`CaptureLoop`]
//! the same way.

pub mod config;
pub mod frame;
pub mod image_dir;
pub mod pattern;
pub mod pipeline;
pub mod source;

pub use config::CaptureConfig;
pub use frame::{PixelFormat, RawFrame};
pub use image_dir::ImageDirSource;
pub use pattern::TestPatternSource;
pub use pipeline::{CaptureHandle, CaptureLoop, LoopState, LoopStateCell};
pub use source::{CaptureError, FrameSource};

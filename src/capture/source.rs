//! Frame source capability
//!
//! A frame source wraps a camera or other video device. The capture loop is
//! its only caller and owns it for the lifetime of the loop.

use thiserror::Error;

use super::frame::RawFrame;

/// Error returned by a frame source
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A single acquisition failed; the next one may succeed
    #[error("transient capture failure: {0}")]
    Transient(String),

    /// The device handle is gone
    #[error("capture device lost: {0}")]
    HardwareLost(String),

    /// Source handed over a buffer that does not match its dimensions
    #[error("frame buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    BadFrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Too many acquisitions failed in a row
    #[error("camera lost after {0} consecutive capture failures")]
    TooManyFailures(u32),
}

impl CaptureError {
    /// Whether the capture loop must stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::HardwareLost(_) | CaptureError::TooManyFailures(_)
        )
    }
}

/// Produces raw frames from a camera or video device
pub trait FrameSource: Send {
    /// Human-readable source identifier for logs
    fn name(&self) -> &str;

    /// Acquire the next frame, blocking until one is available
    fn next_frame(&mut self) -> Result<RawFrame, CaptureError>;

    /// Release the underlying device
    ///
    /// Called exactly once by the capture loop, on every exit path.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Owns a frame source and guarantees it is released exactly once
///
/// Released explicitly on the normal exit paths, or on drop if the loop
/// unwinds.
pub(crate) struct SourceGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceGuard<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.source.name()
    }

    pub(crate) fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        self.source.next_frame()
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            tracing::info!(source = self.source.name(), "Frame source released");
        }
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

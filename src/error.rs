//! Crate-level error type
//!
//! Each subsystem has its own error enum; this type unifies them for the
//! application wiring and the server entry points.

use std::io;

use thiserror::Error;

use crate::annotate::AnnotateError;
use crate::broadcast::BroadcastError;
use crate::capture::CaptureError;
use crate::recognition::{GalleryError, RecognitionError};

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame source failure
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Face detection or embedding failure
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Gallery could not be loaded at startup
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),

    /// Drawing or JPEG encoding failure
    #[error("annotation error: {0}")]
    Annotate(#[from] AnnotateError),

    /// Frame broadcaster was closed
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    /// The capture thread panicked before reporting a result
    #[error("capture thread panicked")]
    CaptureThreadPanicked,
}

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;

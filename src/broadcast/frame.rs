//! Annotated frame type handed to streaming sessions

use std::time::Instant;

use bytes::Bytes;

/// Version number of a published frame.
///
/// Generation 0 means nothing has been published yet; every publish adds
/// exactly one.
pub type Generation = u64;

/// An encoded, annotated frame ready to be sent to viewers
///
/// Immutable once built and cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    /// JPEG payload (zero-copy via reference counting)
    pub data: Bytes,
    /// When the underlying raw frame was captured
    pub captured_at: Instant,
    /// Number of faces drawn onto the frame
    pub face_count: usize,
}

impl AnnotatedFrame {
    /// Create a frame from an encoded payload
    pub fn new(data: Bytes, captured_at: Instant, face_count: usize) -> Self {
        Self {
            data,
            captured_at,
            face_count,
        }
    }

    /// Create an unannotated frame stamped with the current time
    pub fn jpeg(data: impl Into<Bytes>) -> Self {
        Self::new(data.into(), Instant::now(), 0)
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

//! Recognizer capability
//!
//! The detection and embedding algorithm is pluggable. The capture loop only
//! depends on this trait, so any backend (dlib, ONNX, a test double) can sit
//! behind it.

use thiserror::Error;

use super::embedding::{BoundingBox, Embedding};
use crate::capture::RawFrame;

/// Default "close enough" distance for two embeddings of the same face
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Error type for recognizer backends
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Face detection failed on the frame
    #[error("face detection failed: {0}")]
    Detection(String),

    /// Embedding extraction failed for a face
    #[error("face embedding failed: {0}")]
    Embedding(String),
}

/// Face detection and identity comparison
///
/// Shared read-only across threads; implementations that keep state must use
/// interior synchronization.
pub trait Recognizer: Send + Sync {
    /// Find face regions on a frame, in that frame's coordinates
    fn detect_faces(&self, frame: &RawFrame) -> Result<Vec<BoundingBox>, RecognitionError>;

    /// Compute the embedding of one face region
    fn embed(&self, frame: &RawFrame, face: &BoundingBox) -> Result<Embedding, RecognitionError>;

    /// Maximum distance at which two embeddings are the same identity
    fn match_threshold(&self) -> f32 {
        DEFAULT_MATCH_THRESHOLD
    }

    /// Whether `candidate` is close enough to a gallery embedding
    fn is_match(&self, known: &Embedding, candidate: &Embedding) -> bool {
        known.distance(candidate) <= self.match_threshold()
    }
}

/// Recognizer that never finds a face
///
/// Used when no detection backend is linked; frames are streamed unannotated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecognizer;

impl Recognizer for NullRecognizer {
    fn detect_faces(&self, _frame: &RawFrame) -> Result<Vec<BoundingBox>, RecognitionError> {
        Ok(Vec::new())
    }

    fn embed(&self, _frame: &RawFrame, _face: &BoundingBox) -> Result<Embedding, RecognitionError> {
        Err(RecognitionError::Embedding("no recognition backend".into()))
    }
}

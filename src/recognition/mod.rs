//! Face recognition capability and gallery matching
//!
//! The recognizer itself is an external capability behind the [`Recognizer`]
//! trait. This module owns what sits around it: the embedding and box types,
//! the immutable gallery, and the nearest-match-and-threshold identity policy.

pub mod embedding;
pub mod gallery;
pub mod recognizer;

pub use embedding::{BoundingBox, Detection, Embedding, UNKNOWN_LABEL};
pub use gallery::{Gallery, GalleryEntry, GalleryError, Identity};
pub use recognizer::{NullRecognizer, RecognitionError, Recognizer, DEFAULT_MATCH_THRESHOLD};

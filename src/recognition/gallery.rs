//! Known-identity gallery
//!
//! Loaded once at startup from labelled reference images and shared read-only
//! by every recognition pass afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use super::embedding::{Embedding, UNKNOWN_LABEL};
use super::recognizer::{RecognitionError, Recognizer};
use crate::capture::RawFrame;

/// Error loading a gallery entry; fatal at startup
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Reference image could not be read or decoded
    #[error("cannot load reference image for {name} ({}): {source}", path.display())]
    Image {
        name: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// No face found on the reference image
    #[error("no face found in reference image for {name} ({})", path.display())]
    NoFace { name: String, path: PathBuf },

    /// Recognizer failed on the reference image
    #[error("recognizer failed on reference image for {name}: {source}")]
    Recognition {
        name: String,
        #[source]
        source: RecognitionError,
    },
}

/// One known identity
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub name: String,
    pub embedding: Embedding,
}

impl GalleryEntry {
    pub fn new(name: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            name: name.into(),
            embedding,
        }
    }
}

/// Result of matching one face against the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Identity name or `UNKNOWN_LABEL`
    pub label: String,
    /// Distance to the nearest entry (None for an empty gallery)
    pub distance: Option<f32>,
}

/// Immutable set of known identities, cheap to clone
#[derive(Debug, Clone)]
pub struct Gallery {
    entries: Arc<[GalleryEntry]>,
}

impl Gallery {
    /// Build a gallery from prepared entries
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// A gallery with no identities; every face is unknown
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load entries from `(name, image path)` pairs
    ///
    /// Each image is decoded, the first detected face is embedded. Any failure
    /// aborts the whole load.
    pub fn load<R, N, P>(recognizer: &R, references: &[(N, P)]) -> Result<Self, GalleryError>
    where
        R: Recognizer + ?Sized,
        N: AsRef<str>,
        P: AsRef<Path>,
    {
        let mut entries = Vec::with_capacity(references.len());

        for (name, path) in references {
            let name = name.as_ref();
            let path = path.as_ref();

            let image = image::open(path).map_err(|source| GalleryError::Image {
                name: name.to_string(),
                path: path.to_path_buf(),
                source,
            })?;
            let frame = RawFrame::from_rgb(image.to_rgb8(), Instant::now());

            let recognition_error = |source| GalleryError::Recognition {
                name: name.to_string(),
                source,
            };
            let faces = recognizer
                .detect_faces(&frame)
                .map_err(recognition_error)?;
            let face = faces.first().ok_or_else(|| GalleryError::NoFace {
                name: name.to_string(),
                path: path.to_path_buf(),
            })?;
            let embedding = recognizer
                .embed(&frame, face)
                .map_err(recognition_error)?;

            tracing::info!(identity = name, path = %path.display(), "Gallery entry loaded");
            entries.push(GalleryEntry::new(name, embedding));
        }

        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Label a face embedding
    ///
    /// Picks the entry at minimum distance, then accepts it only if the
    /// recognizer's own match check agrees. Anything else is `Unknown`.
    pub fn identify<R>(&self, recognizer: &R, candidate: &Embedding) -> Identity
    where
        R: Recognizer + ?Sized,
    {
        let nearest = self
            .entries
            .iter()
            .map(|entry| (entry, entry.embedding.distance(candidate)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match nearest {
            Some((entry, distance)) if recognizer.is_match(&entry.embedding, candidate) => {
                Identity {
                    label: entry.name.clone(),
                    distance: Some(distance),
                }
            }
            Some((_, distance)) => Identity {
                label: UNKNOWN_LABEL.to_string(),
                distance: Some(distance),
            },
            None => Identity {
                label: UNKNOWN_LABEL.to_string(),
                distance: None,
            },
        }
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::empty()
    }
}

//! Face geometry and embedding types

/// Label used when no gallery identity matches
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Face region in the coordinates of the frame it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    /// Create a box from its edges
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Box width in pixels
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Box height in pixels
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Map a box found on a downscaled frame back to full resolution
    pub fn scale(&self, factor: u32) -> Self {
        Self {
            top: self.top.saturating_mul(factor),
            right: self.right.saturating_mul(factor),
            bottom: self.bottom.saturating_mul(factor),
            left: self.left.saturating_mul(factor),
        }
    }
}

/// Fixed-length face descriptor compared by Euclidean distance
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance; infinite when the lengths differ
    pub fn distance(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() {
            return f32::INFINITY;
        }

        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A labelled face on one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Face region in full-resolution coordinates
    pub bbox: BoundingBox,
    /// Gallery identity or `UNKNOWN_LABEL`
    pub label: String,
    /// Distance to the nearest gallery entry, if the gallery was consulted
    pub distance: Option<f32>,
}

impl Detection {
    /// Whether the face matched a gallery identity
    pub fn is_known(&self) -> bool {
        self.label != UNKNOWN_LABEL
    }
}

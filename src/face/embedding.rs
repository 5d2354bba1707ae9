//! Fixed-length face embeddings and the distance between them

use serde::{Deserialize, Serialize};

/// Length of embeddings produced by the ArcFace recognizer
pub const EMBEDDING_DIM: usize = 512;

/// A numeric vector describing one detected face
///
/// Lower [`FaceEmbedding::distance`] means more similar. Two embeddings are
/// considered the same person when the distance is at or below the configured
/// tolerance.
///
/// ```rust
/// use face_vote::face::FaceEmbedding;
///
/// let a = FaceEmbedding::new(vec![0.0, 1.0]);
/// let b = FaceEmbedding::new(vec![0.5, 1.0]);
///
/// assert_eq!(a.distance(&b), 0.5);
/// assert!(a.matches(&b, 0.5));
/// assert!(!a.matches(&b, 0.49));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmbedding {
    values: Vec<f32>,
}

impl FaceEmbedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance to another embedding
    ///
    /// Embeddings of different lengths come from different encoders and can
    /// never match, so their distance is infinite.
    pub fn distance(&self, other: &FaceEmbedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }

        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// Whether `other` is within `tolerance` of this embedding (inclusive)
    pub fn matches(&self, other: &FaceEmbedding, tolerance: f32) -> bool {
        self.distance(other) <= tolerance
    }
}

impl From<Vec<f32>> for FaceEmbedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

//! The seam where a face detection + recognition model plugs in

use super::embedding::FaceEmbedding;
use crate::Result;
use image::DynamicImage;

/// Produces one embedding per face found in an image
///
/// Implementations run on the blocking thread pool and may be shared across
/// requests. [`super::OnnxFaceEncoder`] is the production implementation.
pub trait FaceEncoder: Send + Sync {
    /// Embeddings for every detected face, most prominent first
    ///
    /// An empty vector means no face was found. Errors are reserved for
    /// encoder failures, not for images without faces.
    fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEmbedding>>;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

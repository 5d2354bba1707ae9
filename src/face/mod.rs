//! Face detection, embedding, comparison and capture decoding

pub mod align;
pub mod capture;
pub mod detect;
pub mod embedding;
pub mod encoder;
pub mod onnx;

pub use capture::{CaptureError, decode_capture, decode_data_url};
pub use detect::FaceBox;
pub use embedding::{EMBEDDING_DIM, FaceEmbedding};
pub use encoder::FaceEncoder;
pub use onnx::OnnxFaceEncoder;

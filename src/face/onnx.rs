//! Production face encoder: SCRFD detection and ArcFace recognition on ONNX Runtime
//!
//! Expects two models in the configured directory:
//! - `scrfd_500m_bnkps.onnx` (detector, with five-point landmarks)
//! - `w600k_r50.onnx` (recognizer, 512-d output)
//!
//! Embeddings are L2-normalised, so the Euclidean distance between two of
//! them is `sqrt(2 - 2 cos θ)`.

use super::align::{ALIGNED_SIZE, aligned_face};
use super::detect::{DetectorInput, FaceBox, decode_detections, letterbox};
use super::embedding::{EMBEDDING_DIM, FaceEmbedding};
use super::encoder::FaceEncoder;
use crate::config::FaceConfig;
use crate::{Error, Result, face_error};
use image::{DynamicImage, RgbImage};
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

pub const DETECTOR_MODEL: &str = "scrfd_500m_bnkps.onnx";
pub const RECOGNIZER_MODEL: &str = "w600k_r50.onnx";

/// Boxes overlapping more than this are merged by NMS
const NMS_IOU: f32 = 0.4;

/// Detector + recognizer pair
pub struct OnnxFaceEncoder {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
    min_score: f32,
}

impl OnnxFaceEncoder {
    /// Load both models from `config.models_dir`
    pub fn load(config: &FaceConfig) -> Result<Self> {
        let detector_path = config.models_dir.join(DETECTOR_MODEL);
        let recognizer_path = config.models_dir.join(RECOGNIZER_MODEL);

        if !detector_path.is_file() || !recognizer_path.is_file() {
            return Err(Error::config(format!(
                "Face models missing; expected {} and {}",
                detector_path.display(),
                recognizer_path.display()
            )));
        }

        let encoder = Self {
            detector: Mutex::new(open_session(&detector_path)?),
            recognizer: Mutex::new(open_session(&recognizer_path)?),
            min_score: config.detection_threshold,
        };
        info!(
            "🧠 Face models loaded: {} and {}",
            detector_path.display(),
            recognizer_path.display()
        );
        Ok(encoder)
    }

    /// Every face in the image, best first
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let DetectorInput { data, scale } = letterbox(image);
        let input = Tensor::from_array((DetectorInput::shape().to_vec(), data))
            .map_err(|e| face_error!("Detector input: {}", e))?;

        let mut session = self
            .detector
            .lock()
            .map_err(|_| face_error!("Detector session lock poisoned"))?;
        let input_name = session.inputs[0].name.clone();
        let outputs = session
            .run(ort::inputs![input_name => input])
            .map_err(|e| face_error!("Detector inference failed: {}", e))?;

        let mut tensors = Vec::new();
        for (name, value) in outputs.iter() {
            let (_, values) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| face_error!("Detector output {}: {}", name, e))?;
            tensors.push(values.to_vec());
        }

        let faces = decode_detections(&tensors, scale, self.min_score, NMS_IOU);
        debug!("Detector found {} face(s)", faces.len());
        Ok(faces)
    }

    /// Unit-length embedding of an aligned 112×112 face
    pub fn embed(&self, face: &RgbImage) -> Result<FaceEmbedding> {
        let input = Tensor::from_array((recognizer_shape().to_vec(), recognizer_input(face)))
            .map_err(|e| face_error!("Recognizer input: {}", e))?;

        let mut session = self
            .recognizer
            .lock()
            .map_err(|_| face_error!("Recognizer session lock poisoned"))?;
        let input_name = session.inputs[0].name.clone();
        let outputs = session
            .run(ort::inputs![input_name => input])
            .map_err(|e| face_error!("Recognizer inference failed: {}", e))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| face_error!("Recognizer produced no output"))?;
        let (_, raw) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| face_error!("Recognizer output: {}", e))?;
        if raw.len() != EMBEDDING_DIM {
            return Err(face_error!(
                "Recognizer returned {} values, expected {}",
                raw.len(),
                EMBEDDING_DIM
            ));
        }

        normalise(raw).ok_or_else(|| face_error!("Recognizer returned a zero embedding"))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
        let mut embeddings = Vec::new();
        for face in self.detect(image)? {
            if let Some(aligned) = aligned_face(image, &face) {
                embeddings.push(self.embed(&aligned)?);
            }
        }
        Ok(embeddings)
    }

    fn name(&self) -> &'static str {
        "scrfd+arcface"
    }
}

fn open_session(path: &Path) -> Result<Session> {
    let builder = Session::builder()
        .map_err(|e| face_error!("ONNX Runtime unavailable: {}", e))?;
    builder
        .commit_from_file(path)
        .map_err(|e| face_error!("Failed to load {}: {}", path.display(), e))
}

fn recognizer_shape() -> [i64; 4] {
    [1, 3, ALIGNED_SIZE as i64, ALIGNED_SIZE as i64]
}

/// NCHW, RGB, `(v - 127.5) / 127.5`
fn recognizer_input(face: &RgbImage) -> Vec<f32> {
    let plane = (face.width() * face.height()) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in face.enumerate_pixels() {
        let offset = (y * face.width() + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = (f32::from(pixel[channel]) - 127.5) / 127.5;
        }
    }
    data
}

fn normalise(raw: &[f32]) -> Option<FaceEmbedding> {
    let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
    if !norm.is_finite() || norm <= f32::EPSILON {
        return None;
    }
    Some(FaceEmbedding::new(raw.iter().map(|v| v / norm).collect()))
}

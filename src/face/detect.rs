//! SCRFD detector pre- and post-processing
//!
//! Everything here is plain tensor arithmetic so it can be exercised without
//! model files. The detector takes a 640×640 RGB input, letterboxed at the
//! top-left corner and normalised to roughly [-1, 1]. It emits one score, box
//! and (for `_kps` variants) landmark tensor per stride, grouped by kind:
//! `[score_8, score_16, score_32, bbox_8, .., kps_8, ..]`.

use image::DynamicImage;
use image::imageops::{self, FilterType};

/// Side of the square detector input
pub const DETECTOR_INPUT: u32 = 640;

/// Feature map strides, in output order
pub const STRIDES: [u32; 3] = [8, 16, 32];

/// Detected face in source image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    /// Eyes, nose tip and mouth corners, when the model predicts them
    pub landmarks: Option<[[f32; 2]; 5]>,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    fn area(&self) -> f32 {
        self.width() * self.height()
    }

    fn iou(&self, other: &FaceBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }
        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// Letterboxed detector input
#[derive(Debug, Clone)]
pub struct DetectorInput {
    /// NCHW, RGB, `(v - 127.5) / 128`
    pub data: Vec<f32>,
    /// Factor from source pixels to detector pixels
    pub scale: f32,
}

impl DetectorInput {
    pub fn shape() -> [i64; 4] {
        [1, 3, DETECTOR_INPUT as i64, DETECTOR_INPUT as i64]
    }
}

/// Resize into the top-left of a 640×640 canvas and normalise
pub fn letterbox(image: &DynamicImage) -> DetectorInput {
    let side = DETECTOR_INPUT;
    let (width, height) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = side as f32 / width.max(height);
    let new_width = ((width * scale) as u32).clamp(1, side);
    let new_height = ((height * scale) as u32).clamp(1, side);

    let resized = image
        .resize_exact(new_width, new_height, FilterType::Triangle)
        .to_rgb8();
    let mut canvas = image::RgbImage::new(side, side);
    imageops::overlay(&mut canvas, &resized, 0, 0);

    let plane = (side * side) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let offset = (y * side + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = (f32::from(pixel[channel]) - 127.5) / 128.0;
        }
    }

    DetectorInput { data, scale }
}

/// Turn raw per-stride outputs into boxes in source coordinates
///
/// `outputs` holds the flattened tensors in model order. Anchors scoring
/// below `min_score` are dropped; the remainder go through NMS and are
/// returned best first.
pub fn decode_detections(
    outputs: &[Vec<f32>],
    scale: f32,
    min_score: f32,
    nms_iou: f32,
) -> Vec<FaceBox> {
    let levels = STRIDES.len();
    if outputs.len() < 2 * levels || scale <= 0.0 {
        return Vec::new();
    }
    let with_landmarks = outputs.len() >= 3 * levels;

    let mut candidates = Vec::new();
    for (level, stride) in STRIDES.iter().enumerate() {
        let scores = &outputs[level];
        let boxes = &outputs[level + levels];
        let landmarks = with_landmarks.then(|| &outputs[level + 2 * levels]);

        let grid = (DETECTOR_INPUT / stride) as usize;
        let cells = grid * grid;
        if scores.is_empty() || scores.len() % cells != 0 {
            continue;
        }
        let anchors = scores.len() / cells;
        let stride = *stride as f32;

        for (index, &score) in scores.iter().enumerate() {
            if score < min_score || boxes.len() < (index + 1) * 4 {
                continue;
            }
            let cell = index / anchors;
            let cx = (cell % grid) as f32 * stride;
            let cy = (cell / grid) as f32 * stride;

            let d = &boxes[index * 4..index * 4 + 4];
            let landmarks = landmarks
                .filter(|kps| kps.len() >= (index + 1) * 10)
                .map(|kps| {
                    let k = &kps[index * 10..index * 10 + 10];
                    std::array::from_fn(|p| {
                        [
                            (cx + k[2 * p] * stride) / scale,
                            (cy + k[2 * p + 1] * stride) / scale,
                        ]
                    })
                });

            candidates.push(FaceBox {
                x1: (cx - d[0] * stride) / scale,
                y1: (cy - d[1] * stride) / scale,
                x2: (cx + d[2] * stride) / scale,
                y2: (cy + d[3] * stride) / scale,
                score,
                landmarks,
            });
        }
    }

    non_max_suppression(candidates, nms_iou)
}

/// Keep the best box of every overlapping group, best first
pub fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<FaceBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

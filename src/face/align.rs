//! Face crop preparation for the recognition model
//!
//! With landmarks, the face is warped by the similarity transform that best
//! maps its five points onto the canonical 112×112 ArcFace layout. Without
//! them the detection box is cropped and resized.

use super::detect::FaceBox;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

/// Side of the square recognizer input
pub const ALIGNED_SIZE: u32 = 112;

/// Landmark positions in a 112×112 aligned face
pub const ARCFACE_TEMPLATE: [[f32; 2]; 5] = [
    [38.2946, 51.6963],
    [73.5318, 51.5014],
    [56.0252, 71.7366],
    [41.5493, 92.3655],
    [70.7299, 92.2041],
];

/// `[a, -b, tx; b, a, ty]`, a rotation + uniform scale + translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit of `dst ≈ T(src)`
    ///
    /// Returns `None` when the source points are degenerate.
    pub fn estimate(src: &[[f32; 2]; 5], dst: &[[f32; 2]; 5]) -> Option<Self> {
        let n = src.len() as f32;
        let mean = |points: &[[f32; 2]; 5]| {
            let (x, y) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p[0], y + p[1]));
            (x / n, y / n)
        };
        let (sx, sy) = mean(src);
        let (dx, dy) = mean(dst);

        let (mut dot, mut cross, mut energy) = (0.0f32, 0.0f32, 0.0f32);
        for (s, d) in src.iter().zip(dst) {
            let (px, py) = (s[0] - sx, s[1] - sy);
            let (qx, qy) = (d[0] - dx, d[1] - dy);
            dot += px * qx + py * qy;
            cross += px * qy - py * qx;
            energy += px * px + py * py;
        }
        if energy <= f32::EPSILON {
            return None;
        }

        let a = dot / energy;
        let b = cross / energy;
        Some(Self {
            a,
            b,
            tx: dx - (a * sx - b * sy),
            ty: dy - (b * sx + a * sy),
        })
    }

    pub fn apply(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        [
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        ]
    }

    pub fn invert(&self, [u, v]: [f32; 2]) -> [f32; 2] {
        let det = self.a * self.a + self.b * self.b;
        let (x, y) = (u - self.tx, v - self.ty);
        [
            (self.a * x + self.b * y) / det,
            (-self.b * x + self.a * y) / det,
        ]
    }
}

/// 112×112 RGB face ready for the recognizer
pub fn aligned_face(image: &DynamicImage, face: &FaceBox) -> Option<RgbImage> {
    let rgb = image.to_rgb8();

    if let Some(transform) = face
        .landmarks
        .as_ref()
        .and_then(|points| Similarity::estimate(points, &ARCFACE_TEMPLATE))
    {
        return Some(warp(&rgb, &transform));
    }

    let x1 = face.x1.max(0.0) as u32;
    let y1 = face.y1.max(0.0) as u32;
    let x2 = (face.x2.max(0.0) as u32).min(rgb.width());
    let y2 = (face.y2.max(0.0) as u32).min(rgb.height());
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let crop = image::imageops::crop_imm(&rgb, x1, y1, x2 - x1, y2 - y1).to_image();
    Some(image::imageops::resize(
        &crop,
        ALIGNED_SIZE,
        ALIGNED_SIZE,
        FilterType::Triangle,
    ))
}

/// Inverse-map every output pixel into the source with bilinear sampling
fn warp(source: &RgbImage, transform: &Similarity) -> RgbImage {
    RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |u, v| {
        let [x, y] = transform.invert([u as f32, v as f32]);
        bilinear(source, x, y)
    })
}

fn bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || x < 0.0 || y < 0.0 {
        return Rgb([0, 0, 0]);
    }
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    if x0 >= width || y0 >= height {
        return Rgb([0, 0, 0]);
    }
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let corners = [
        (image.get_pixel(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (image.get_pixel(x1, y0), fx * (1.0 - fy)),
        (image.get_pixel(x0, y1), (1.0 - fx) * fy),
        (image.get_pixel(x1, y1), fx * fy),
    ];

    Rgb(std::array::from_fn(|c| {
        let value: f32 = corners
            .iter()
            .map(|(pixel, weight)| f32::from(pixel[c]) * weight)
            .sum();
        value.round().clamp(0.0, 255.0) as u8
    }))
}

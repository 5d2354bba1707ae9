//! Shared fixtures: a data directory with a registry, admins and photos

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use face_vote::Result;
use face_vote::config::Config;
use face_vote::face::{FaceEmbedding, FaceEncoder};
use face_vote::server::AppState;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.org";
pub const ADMIN_PASSWORD: &str = "secret";

const BADGE: Rgb<u8> = Rgb([255, 0, 0]);
const BADGE_SIZE: u32 = 8;

/// Stand-in portrait for a voter; different seeds give unrelated faces
///
/// The red badge in the top-left corner is what [`BadgeEncoder`] detects.
pub fn portrait(seed: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
        if x < BADGE_SIZE && y < BADGE_SIZE {
            return BADGE;
        }
        let v = ((x * (3 + seed) + y * (5 + 2 * seed) + (x * y) % (7 + seed)) % 256) as u8;
        Rgb([v, v, v])
    }))
}

/// Textured image with no face in it
pub fn ramp() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([(x * 3 + 30) as u8])))
}

/// Detector + recognizer double for fixture images
///
/// Reports exactly one face when the image carries the portrait badge and
/// none otherwise, whatever its texture. The embedding is the zero-mean,
/// unit-length 16×8 luma thumbnail of the whole image.
pub struct BadgeEncoder;

impl FaceEncoder for BadgeEncoder {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
        let rgb = image.to_rgb8();
        let has_badge = rgb.width() >= BADGE_SIZE
            && rgb.height() >= BADGE_SIZE
            && (0..BADGE_SIZE).all(|y| (0..BADGE_SIZE).all(|x| *rgb.get_pixel(x, y) == BADGE));
        if !has_badge {
            return Ok(Vec::new());
        }

        let thumb = imageops::resize(&image.to_luma8(), 16, 8, FilterType::Triangle);
        let pixels: Vec<f32> = thumb.pixels().map(|p| f32::from(p.0[0])).collect();
        let mean = pixels.iter().sum::<f32>() / pixels.len() as f32;
        let centred: Vec<f32> = pixels.iter().map(|v| v - mean).collect();
        let norm = centred.iter().map(|v| v * v).sum::<f32>().sqrt();

        Ok(vec![FaceEmbedding::new(
            centred.into_iter().map(|v| v / norm).collect(),
        )])
    }

    fn name(&self) -> &'static str {
        "badge"
    }
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

pub fn data_url(image: &DynamicImage) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(image)))
}

/// Registry:
/// - Asha / 1111 with a usable photo
/// - Ravi Kumar / 2222 with a usable photo
/// - Blank / 3333 whose photo is a flat grey square
/// - Ghost / 4444 whose photo is missing
/// - Ramp / 5555 whose photo is a textured gradient with no face
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();

        std::fs::create_dir_all(base.join("images")).unwrap();
        portrait(1).save(base.join("images/asha.png")).unwrap();
        portrait(2).save(base.join("images/ravi.png")).unwrap();
        GrayImage::from_pixel(64, 64, Luma([180]))
            .save(base.join("images/blank.png"))
            .unwrap();
        ramp().save(base.join("images/ramp.png")).unwrap();

        std::fs::write(
            base.join("voters.csv"),
            "name,aadhar,image\n\
             Asha,1111,asha.png\n\
             Ravi Kumar,2222,ravi.png\n\
             Blank,3333,blank.png\n\
             Ghost,4444,ghost.png\n\
             Ramp,5555,ramp.png\n",
        )
        .unwrap();

        std::fs::write(
            base.join("admins.csv"),
            format!("email,password,name\n{ADMIN_EMAIL},{ADMIN_PASSWORD},Chief Officer\n"),
        )
        .unwrap();

        let config = Config::for_testing(base);
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn state(&self) -> Arc<AppState> {
        AppState::load(self.config.clone(), Arc::new(BadgeEncoder))
            .await
            .unwrap()
    }
}

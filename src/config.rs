//! Configuration management for the voting service
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present) with validation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default distance at or below which two face embeddings are the same person
///
/// Recognizer embeddings are unit length, so a Euclidean distance of 0.5
/// corresponds to a cosine similarity of at least 0.875. That is strict for
/// webcam captures; raise `FACE_MATCH_TOLERANCE` (1.1 is roughly cosine 0.4)
/// if genuine voters are being turned away.
pub const DEFAULT_MATCH_TOLERANCE: f32 = 0.5;

/// Minimum detector confidence for a face to count
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Locations of the flat-file inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Voter registry (`name,aadhar,image`)
    pub voters_csv: PathBuf,

    /// Admin list (`email,password,name`), re-read on every login
    pub admins_csv: PathBuf,

    /// Directory holding the reference photos named in the registry
    pub images_dir: PathBuf,

    /// Static frontend served as a fallback when the directory exists
    pub frontend_dir: PathBuf,
}

/// Face verification tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Maximum embedding distance accepted as a match (inclusive)
    pub match_tolerance: f32,

    /// Upper bound on one decode + encode of a captured image
    pub encode_timeout_ms: u64,

    /// Directory holding the detector and recognizer ONNX models
    pub models_dir: PathBuf,

    /// Minimum detector score, in (0, 1]
    pub detection_threshold: f32,
}

impl FaceConfig {
    fn validate(&self) -> Result<()> {
        if !self.match_tolerance.is_finite() || self.match_tolerance <= 0.0 {
            return Err(Error::config("FACE_MATCH_TOLERANCE must be a positive number"));
        }
        if self.encode_timeout_ms == 0 {
            return Err(Error::config("FACE_ENCODE_TIMEOUT_MS must be greater than zero"));
        }
        if !(self.detection_threshold > 0.0 && self.detection_threshold <= 1.0) {
            return Err(Error::config("FACE_DETECTION_THRESHOLD must be in (0, 1]"));
        }
        Ok(())
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            encode_timeout_ms: 10_000,
            models_dir: PathBuf::from("models"),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub face: FaceConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let server = ServerConfig {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", "5000")?,
        };

        let data = DataConfig {
            voters_csv: env_or("VOTERS_CSV", "data/voters.csv").into(),
            admins_csv: env_or("ADMINS_CSV", "data/admins.csv").into(),
            images_dir: env_or("IMAGES_DIR", "data/images").into(),
            frontend_dir: env_or("FRONTEND_DIR", "frontend").into(),
        };

        let face = FaceConfig {
            match_tolerance: parse_env("FACE_MATCH_TOLERANCE", "0.5")?,
            encode_timeout_ms: parse_env("FACE_ENCODE_TIMEOUT_MS", "10000")?,
            models_dir: env_or("FACE_MODELS_DIR", "models").into(),
            detection_threshold: parse_env("FACE_DETECTION_THRESHOLD", "0.5")?,
        };
        face.validate()?;

        let logging = LoggingConfig {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "pretty"),
        };

        Ok(Self {
            server,
            data,
            face,
            logging,
        })
    }

    /// Create configuration for testing, rooted at `base`
    pub fn for_testing(base: impl Into<PathBuf>) -> Self {
        let base = base.into();

        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            data: DataConfig {
                voters_csv: base.join("voters.csv"),
                admins_csv: base.join("admins.csv"),
                images_dir: base.join("images"),
                frontend_dir: base.join("frontend"),
            },
            face: FaceConfig::default(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    env_or(key, default)
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("Invalid {key}")))
}

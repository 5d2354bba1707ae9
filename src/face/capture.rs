//! Decoding of live captures submitted as data URLs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;

/// Why a submitted capture could not be turned into an image
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// The payload is not valid base64
    #[error("Image decode error: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The bytes are not a supported image
    #[error("Invalid image data")]
    Image(#[from] image::ImageError),
}

/// Extract the raw bytes from a `data:image/...;base64,<payload>` URL
///
/// A bare base64 payload without the `data:` header is accepted as well.
/// Whitespace inside the payload (line-wrapped encoders) is ignored.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match data_url.split_once(',') {
        Some((_header, payload)) => payload,
        None => data_url,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Decode a data URL all the way to an image
pub fn decode_capture(data_url: &str) -> Result<DynamicImage, CaptureError> {
    let bytes = decode_data_url(data_url)?;
    Ok(image::load_from_memory(&bytes)?)
}

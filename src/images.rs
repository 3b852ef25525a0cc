//! Cover image intake.
//!
//! Accepts a data-URI base64 JPEG payload, re-encodes it at fixed quality
//! and stores it under the static directory at a path derived from the
//! record identifier. Never touches the series bucket.

use crate::error::{Result, TrackerError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::warn;

/// Re-encode quality for stored covers.
const JPEG_QUALITY: u8 = 95;

/// Outcome of a cover upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoverUpload {
    /// Path the cover was written to, relative to the static directory.
    Stored(String),

    /// Payload did not carry a data-URI prefix; nothing was written.
    Unrecognized,
}

/// Decode a data-URI base64 JPEG payload and store it as
/// `<static_dir>/img/<id>.jpg`.
pub fn store_cover(static_dir: &Path, id: &str, payload: &str) -> Result<CoverUpload> {
    if !payload.starts_with("data") {
        warn!(id, "cover payload is not a data URI");
        return Ok(CoverUpload::Unrecognized);
    }

    // Strip through the first comma: "data:image/jpeg;base64,<data>"
    let encoded = match payload.find(',') {
        Some(idx) => &payload[idx + 1..],
        None => payload,
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| TrackerError::Decode(format!("bad base64 payload: {e}")))?;

    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .map_err(|e| TrackerError::Decode(format!("bad JPEG payload: {e}")))?;

    let img_dir = static_dir.join("img");
    fs::create_dir_all(&img_dir).map_err(|e| TrackerError::Storage(e.to_string()))?;

    let target = img_dir.join(format!("{id}.jpg"));
    let file = File::create(&target).map_err(|e| TrackerError::Storage(e.to_string()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
    decoded
        .write_with_encoder(encoder)
        .map_err(|e| TrackerError::Storage(e.to_string()))?;

    Ok(CoverUpload::Stored(format!("img/{id}.jpg")))
}

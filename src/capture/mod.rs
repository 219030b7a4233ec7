pub mod camera;
pub mod library;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageOrigin {
    Camera,
    Library,
}

/// A JPEG ready for analysis, kept on disk for display.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub id: Uuid,
    pub display_uri: String,
    pub base64: String,
    pub origin: ImageOrigin,
    pub captured_at: DateTime<Utc>,
}

/// Directory holding the JPEG behind each live capture.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    dir: PathBuf,
}

impl CaptureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write `jpeg` to disk and wrap it as a capture.
    pub fn store(&self, jpeg: &[u8], origin: ImageOrigin) -> Result<CapturedImage, CaptureError> {
        let id = Uuid::new_v4();
        let path = self.dir.join(format!("{}.jpg", id));
        std::fs::write(&path, jpeg)?;

        log::debug!("Stored {:?} capture {} ({} bytes)", origin, id, jpeg.len());

        Ok(CapturedImage {
            id,
            display_uri: path.to_string_lossy().into_owned(),
            base64: STANDARD.encode(jpeg),
            origin,
            captured_at: Utc::now(),
        })
    }

    /// Remove the file behind a capture. Missing files are not an error.
    pub fn discard(&self, image: &CapturedImage) {
        let path = Path::new(&image.display_uri);
        if !path.starts_with(&self.dir) {
            return;
        }
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Discarded capture {}", image.id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to discard capture {}: {}", image.id, e),
        }
    }
}

/// Map a 0.0–1.0 compression quality onto the JPEG encoder's 1–100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

pub fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, CaptureError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
        encoder.encode_image(&rgb)?;
    }
    Ok(buffer)
}

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::{encode_jpeg, CaptureStore, CapturedImage, ImageOrigin};
use crate::error::CaptureError;

/// Outcome of the runtime camera permission request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraPermission {
    Granted,
    Denied,
}

impl CameraPermission {
    pub fn require(self) -> Result<(), CaptureError> {
        match self {
            Self::Granted => Ok(()),
            Self::Denied => Err(CaptureError::PermissionDenied),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraOptions {
    /// JPEG compression quality, 0.0–1.0.
    pub quality: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self { quality: 0.8 }
    }
}

/// Decode a viewfinder frame sent as base64 (optionally a `data:` URL).
pub fn decode_frame(frame: &str) -> Result<Vec<u8>, CaptureError> {
    let payload = match frame.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => frame,
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(CaptureError::InvalidPayload("empty frame".to_string()));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| CaptureError::InvalidPayload(e.to_string()))
}

/// Turn a shutter frame into a stored JPEG at the requested quality.
pub fn capture_frame(
    frame: &str,
    options: &CameraOptions,
    store: &CaptureStore,
) -> Result<CapturedImage, CaptureError> {
    let bytes = decode_frame(frame)?;
    let image = image::load_from_memory(&bytes)?;
    let jpeg = encode_jpeg(&image, options.quality)?;

    log::info!(
        "Captured camera frame {}x{} ({} bytes JPEG)",
        image.width(),
        image.height(),
        jpeg.len()
    );

    store.store(&jpeg, ImageOrigin::Camera)
}

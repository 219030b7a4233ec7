use image::DynamicImage;
use std::path::Path;

use super::{encode_jpeg, CaptureStore, CapturedImage, ImageOrigin};
use crate::error::CaptureError;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

#[derive(Debug, Clone, Copy)]
pub struct LibraryOptions {
    /// Crop aspect ratio as (width, height).
    pub aspect: (u32, u32),
    pub quality: f32,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            aspect: (4, 3),
            quality: 1.0,
        }
    }
}

/// Center-crop to the largest region with the given aspect ratio.
pub fn crop_to_aspect(image: &DynamicImage, aspect: (u32, u32)) -> DynamicImage {
    let (aw, ah) = aspect;
    let (width, height) = (image.width(), image.height());
    if aw == 0 || ah == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    // Compare width/height against aw/ah without floating point
    let (crop_w, crop_h) = if (width as u64) * (ah as u64) > (height as u64) * (aw as u64) {
        let w = ((height as u64) * (aw as u64) / (ah as u64)) as u32;
        (w.max(1), height)
    } else {
        let h = ((width as u64) * (ah as u64) / (aw as u64)) as u32;
        (width, h.max(1))
    };

    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    image.crop_imm(x, y, crop_w, crop_h)
}

/// Load a picked file, crop it and store it as JPEG.
pub fn load_image(
    path: &Path,
    options: &LibraryOptions,
    store: &CaptureStore,
) -> Result<CapturedImage, CaptureError> {
    let image = image::open(path)?;
    let cropped = crop_to_aspect(&image, options.aspect);
    let jpeg = encode_jpeg(&cropped, options.quality)?;

    log::info!(
        "Selected {} ({}x{} cropped to {}x{})",
        path.display(),
        image.width(),
        image.height(),
        cropped.width(),
        cropped.height()
    );

    store.store(&jpeg, ImageOrigin::Library)
}

/// Open the native picker restricted to images. `None` when the user cancels.
#[cfg(feature = "desktop")]
pub async fn pick_image_file() -> Option<std::path::PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select a food photo")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

//! Validation and on-disk storage of uploaded recipe images.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{info, warn};
use uuid::Uuid;

/// Directory, relative to the media root, holding recipe images.
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("No file was submitted.")]
    Missing,
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    Invalid,
    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks that `bytes` decode as one of the accepted image formats.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Missing);
    }
    let format = image::guess_format(bytes).map_err(|_| ImageError::Invalid)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(ImageError::Invalid);
    }
    image::load_from_memory_with_format(bytes, format).map_err(|_| ImageError::Invalid)?;
    Ok(format)
}

/// Public URL of a stored file, given the configured media URL prefix.
pub fn media_url_for(media_url: &str, relative_path: &str) -> String {
    format!("{}/{}", media_url.trim_end_matches('/'), relative_path.trim_start_matches('/'))
}

#[derive(Clone, Debug)]
pub struct ImageStore {
    media_dir: PathBuf,
}

impl ImageStore {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
        }
    }

    /// Validates and writes a recipe image under a random name. Returns the
    /// path relative to the media root.
    pub async fn save_recipe_image(&self, bytes: &[u8]) -> Result<String, ImageError> {
        let format = validate_image(bytes)?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let relative_path = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());

        let path = self.media_dir.join(&relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        info!(path = %relative_path, size = bytes.len(), "Stored recipe image.");
        Ok(relative_path)
    }

    /// Removes a previously stored image. Only paths inside the recipe image
    /// directory are touched; failures are logged and otherwise ignored.
    pub async fn remove(&self, relative_path: &str) {
        let inside_upload_dir = Path::new(relative_path)
            .parent()
            .is_some_and(|parent| parent == Path::new(RECIPE_IMAGE_DIR));
        if !inside_upload_dir {
            warn!(path = %relative_path, "Refusing to remove file outside the recipe image directory.");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.media_dir.join(relative_path)).await {
            warn!(path = %relative_path, error = %e, "Failed to remove recipe image.");
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode sample png");
    bytes
}

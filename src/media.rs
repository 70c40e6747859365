//! Uploaded recipe images: multipart extraction, format validation and
//! storage under `media_root` with generated file names.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use axum::http::HeaderMap;
use bytes::Bytes;
use image::ImageReader;
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};

const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// A single file part pulled out of a multipart body.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub data: Bytes,
}

/// Read the part called `field` from a multipart body. Other parts are skipped.
pub async fn read_file_field(
    headers: &HeaderMap,
    body: Bytes,
    field: &str,
) -> Result<Option<Upload>, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().map(str::to_string);
        let data = part
            .bytes()
            .await
            .map_err(|e| format!("Field read error: {e}"))?;
        return Ok(Some(Upload { file_name, data }));
    }

    Ok(None)
}

pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `data` as an image and write it under a fresh name.
    /// Returns the path relative to the media root.
    pub async fn save_recipe_image(&self, data: Bytes) -> Result<String, AppError> {
        let decoded = tokio::task::spawn_blocking(move || {
            image_extension(&data).map(|ext| (ext, data))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Image validation task failed: {e}")))?;

        let (extension, data) = decoded.ok_or_else(|| {
            AppError::Validation(FieldErrors::single(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            ))
        })?;

        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());
        let target = self.root.join(&relative);
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create media directory: {e}")))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write image: {e}")))?;

        tracing::debug!("Stored image at {}", target.display());
        Ok(relative)
    }

    /// Remove a stored file. Failures are logged, never returned.
    pub async fn remove(&self, relative: &str) {
        let target = self.root.join(relative);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {e}", target.display()),
        }
    }
}

/// The canonical file extension of `data` if it fully decodes as a supported image.
fn image_extension(data: &[u8]) -> Option<&'static str> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?;
    let format = reader.format()?;
    reader.decode().ok()?;
    format.extensions_str().first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(10, 10, image::Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn recognizes_png() {
        assert_eq!(image_extension(&png_bytes()), Some("png"));
    }

    #[test]
    fn rejects_text_and_truncated_images() {
        assert_eq!(image_extension(b"notimage"), None);
        let png = png_bytes();
        assert_eq!(image_extension(&png[..png.len() / 2]), None);
    }

    #[tokio::test]
    async fn saved_images_get_generated_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let first = store.save_recipe_image(Bytes::from(png_bytes())).await.unwrap();
        let second = store.save_recipe_image(Bytes::from(png_bytes())).await.unwrap();

        assert!(first.starts_with("uploads/recipe/"));
        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
        assert!(dir.path().join(&first).exists());

        store.remove(&first).await;
        assert!(!dir.path().join(&first).exists());
    }

    #[tokio::test]
    async fn invalid_image_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let err = store
            .save_recipe_image(Bytes::from_static(b"notimage"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("image")));
    }
}

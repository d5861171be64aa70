//! Upload validation
//!
//! Only image-typed files are admitted into a session. Admission depends on
//! the declared media type alone; the local preview is best-effort.

use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;
use sha2::{Digest, Sha256};

use crate::error::{PrintLayersError, Result};

/// Longest edge of the local preview thumbnail
const PREVIEW_MAX_EDGE: u32 = 512;

/// A candidate or admitted file: raw bytes plus declared type and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
    sha256: String,
}

impl UploadedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
            sha256,
        }
    }

    /// Read a file from disk, inferring its media type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let media_type = media_type_for_path(path);
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the contents, for log correlation
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Whether the declared media type is in the image category
    pub fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// Guess a media type from a file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Local preview of an admitted file
#[derive(Debug, Clone)]
pub struct Preview {
    /// Dimensions of the full image
    pub width: u32,
    pub height: u32,
    /// Downscaled copy for display
    pub thumbnail: RgbaImage,
}

impl Preview {
    /// Build the preview on the blocking pool
    pub async fn load(file: &UploadedFile) -> Result<Self> {
        let file = file.clone();
        tokio::task::spawn_blocking(move || Self::from_file(&file))
            .await
            .map_err(|join_err| PrintLayersError::Io(std::io::Error::other(join_err)))?
    }

    /// Decode a preview straight from the raw bytes, no network involved
    pub fn from_file(file: &UploadedFile) -> Result<Self> {
        let image = image::load_from_memory(file.bytes())?;
        let (width, height) = (image.width(), image.height());
        let thumbnail = if width.max(height) > PREVIEW_MAX_EDGE {
            image
                .resize(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE, FilterType::Triangle)
                .to_rgba8()
        } else {
            image.to_rgba8()
        };
        Ok(Self {
            width,
            height,
            thumbnail,
        })
    }
}

/// Gatekeeper for files entering a session
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadValidator;

impl UploadValidator {
    pub fn new() -> Self {
        Self
    }

    /// Accept the candidate iff its media type begins with `image/`
    pub fn accept(&self, candidate: UploadedFile) -> Result<UploadedFile> {
        if candidate.is_image() {
            tracing::debug!(
                file = candidate.name(),
                media_type = candidate.media_type(),
                "upload accepted"
            );
            Ok(candidate)
        } else {
            tracing::debug!(
                file = candidate.name(),
                media_type = candidate.media_type(),
                "upload rejected"
            );
            Err(PrintLayersError::Validation {
                name: candidate.name.clone(),
                media_type: candidate.media_type.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_accepts_image_types() {
        let validator = UploadValidator::new();
        for media_type in ["image/png", "image/jpeg", "IMAGE/WEBP", " image/gif"] {
            let file = UploadedFile::new("a", media_type, vec![1u8, 2, 3]);
            assert!(validator.accept(file).is_ok(), "{} should pass", media_type);
        }
    }

    #[test]
    fn test_rejects_non_image_types() {
        let validator = UploadValidator::new();
        for media_type in ["text/plain", "application/pdf", "", "video/mp4", "imagex/png"] {
            let file = UploadedFile::new("a", media_type, vec![1u8]);
            let err = validator.accept(file).unwrap_err();
            assert_eq!(err.error_code(), "VALIDATION_ERROR");
        }
    }

    #[test]
    fn test_media_type_for_path() {
        assert_eq!(media_type_for_path(&PathBuf::from("x/photo.JPG")), "image/jpeg");
        assert_eq!(media_type_for_path(&PathBuf::from("notes.txt")), "text/plain");
        assert_eq!(
            media_type_for_path(&PathBuf::from("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_sha256_is_stable() {
        let a = UploadedFile::new("a.png", "image/png", b"abc".to_vec());
        let b = UploadedFile::new("b.png", "image/png", b"abc".to_vec());
        assert_eq!(a.sha256(), b.sha256());
        assert_eq!(a.sha256().len(), 64);
    }

    #[test]
    fn test_preview_downscales_large_images() {
        let big = RgbaImage::from_pixel(1024, 256, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        big.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let preview = Preview::from_file(&UploadedFile::new("big.png", "image/png", png)).unwrap();
        assert_eq!((preview.width, preview.height), (1024, 256));
        assert_eq!(preview.thumbnail.width(), PREVIEW_MAX_EDGE);
    }

    #[test]
    fn test_preview_fails_on_garbage() {
        let file = UploadedFile::new("x.png", "image/png", vec![0u8; 8]);
        assert!(Preview::from_file(&file).is_err());
    }

    #[tokio::test]
    async fn test_preview_loads_off_the_async_thread() {
        let small = RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 255]));
        let mut png = Vec::new();
        small
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let preview = Preview::load(&UploadedFile::new("s.png", "image/png", png))
            .await
            .unwrap();
        assert_eq!((preview.width, preview.height), (4, 3));

        let garbage = UploadedFile::new("x.png", "image/png", vec![0u8; 8]);
        assert!(Preview::load(&garbage).await.is_err());
    }
}

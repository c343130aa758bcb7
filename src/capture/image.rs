use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ImageOrigin {
    Upload,
    Device,
}

impl ImageOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageOrigin::Upload => "upload",
            ImageOrigin::Device => "device",
        }
    }
}

/// Opaque reference to displayable image content.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImageData {
    /// Bytes held in memory, e.g. an uploaded file.
    #[serde(rename_all = "camelCase")]
    Inline {
        media_type: String,
        size_bytes: usize,
        #[serde(skip)]
        bytes: Arc<[u8]>,
    },
    /// Content addressed by URL or path, e.g. a stub capture.
    Remote { url: String },
}

impl ImageData {
    pub fn inline(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImageData::Inline {
            media_type: media_type.into(),
            size_bytes: bytes.len(),
            bytes: bytes.into(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        ImageData::Remote { url: url.into() }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapturedImage {
    /// Distinguishes two captures of identical content.
    pub id: Uuid,
    pub data: ImageData,
    pub origin: ImageOrigin,
    pub name: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(data: ImageData, origin: ImageOrigin, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            origin,
            name,
            captured_at: Utc::now(),
        }
    }
}

/// A file picked by the user, before validation.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// Media type reported by the picker, if any.
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read upload {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            media_type: None,
            bytes,
        })
    }

    /// Reported media type, else one inferred from the extension, else one
    /// sniffed from the content.
    pub fn resolved_media_type(&self) -> Option<String> {
        if let Some(media_type) = self.media_type.as_deref().map(str::trim) {
            if !media_type.is_empty() {
                return Some(media_type.to_ascii_lowercase());
            }
        }

        media_type_from_name(&self.name).or_else(|| {
            image::guess_format(&self.bytes)
                .ok()
                .map(|format| format.to_mime_type().to_string())
        })
    }
}

fn media_type_from_name(name: &str) -> Option<String> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    if extension == "svg" {
        return Some("image/svg+xml".into());
    }
    ImageFormat::from_extension(&extension).map(|format| format.to_mime_type().to_string())
}

pub fn is_image_media_type(media_type: &str) -> bool {
    media_type.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn reported_media_type_wins() {
        let file = UploadFile::new("photo.png", Some("Image/PNG".into()), Vec::new());
        assert_eq!(file.resolved_media_type().as_deref(), Some("image/png"));

        let file = UploadFile::new("photo.png", Some("text/plain".into()), Vec::new());
        assert_eq!(file.resolved_media_type().as_deref(), Some("text/plain"));
    }

    #[test]
    fn infers_from_extension_then_content() {
        let jpeg = UploadFile::new("holiday.JPG", None, Vec::new());
        assert_eq!(jpeg.resolved_media_type().as_deref(), Some("image/jpeg"));

        let svg = UploadFile::new("logo.svg", None, Vec::new());
        assert_eq!(svg.resolved_media_type().as_deref(), Some("image/svg+xml"));

        let sniffed = UploadFile::new("download", None, PNG_MAGIC.to_vec());
        assert_eq!(sniffed.resolved_media_type().as_deref(), Some("image/png"));

        let notes = UploadFile::new("notes.txt", None, b"groceries".to_vec());
        assert_eq!(notes.resolved_media_type(), None);
    }

    #[test]
    fn reads_uploads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.name, "scan.png");
        assert_eq!(file.bytes.len(), PNG_MAGIC.len());
        assert!(is_image_media_type(&file.resolved_media_type().unwrap()));
    }
}

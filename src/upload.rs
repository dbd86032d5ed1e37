//! Multipart handling for product forms: text fields plus up to four images.

use std::path::Path;

use axum::{
    body::Bytes,
    extract::{
        Multipart,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use thiserror::Error;

use crate::dto::products::ProductForm;

pub const IMAGES_FIELD: &str = "images";
pub const MAX_FILES: usize = 4;
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;
/// Body limit for product routes: every file at full size plus room for the text parts.
pub const MAX_BODY_SIZE: usize = MAX_FILES * MAX_FILE_SIZE + 1024 * 1024;

const ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];
const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File exceeds the allowed size (100MB)")]
    FileTooLarge,

    #[error("Too many files, at most 4 images are allowed")]
    TooManyFiles,

    #[error("Only image files are supported (jpg, jpeg, png, gif, webp, svg)")]
    UnsupportedType,

    #[error("File upload error: {0}")]
    Malformed(String),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::FileTooLarge
        } else {
            UploadError::Malformed(err.body_text())
        }
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(err: MultipartRejection) -> Self {
        UploadError::Malformed(err.body_text())
    }
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    /// Lower-cased extension without the dot, `jpg` when the name has none.
    pub fn extension(&self) -> String {
        extension_of(&self.file_name).unwrap_or_else(|| "jpg".to_string())
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Both the declared MIME type and the file extension must be image types.
pub fn is_allowed_image(content_type: &str, file_name: &str) -> bool {
    let mime = content_type.to_lowercase();
    let ext_ok = extension_of(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    ALLOWED_MIME_TYPES.contains(&mime.as_str()) && ext_ok
}

#[derive(Debug, Default)]
pub struct ProductUpload {
    pub form: ProductForm,
    pub images: Vec<ImageFile>,
}

/// Drain a product multipart body, enforcing type, size and count limits
/// before any file leaves the process.
pub async fn read_product_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ProductUpload, UploadError> {
    let mut multipart = multipart?;
    let mut upload = ProductUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            upload.form.insert(name, value);
            continue;
        };

        if name != IMAGES_FIELD {
            return Err(UploadError::Malformed(format!("unexpected file field '{name}'")));
        }
        // Browsers send an empty part when no file was picked.
        if file_name.is_empty() {
            continue;
        }
        if upload.images.len() == MAX_FILES {
            return Err(UploadError::TooManyFiles);
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_allowed_image(&content_type, &file_name) {
            return Err(UploadError::UnsupportedType);
        }

        let bytes = read_limited(field, MAX_FILE_SIZE).await?;
        upload.images.push(ImageFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Ok(upload)
}

async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Bytes, UploadError> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(UploadError::FileTooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_and_extension_must_both_match() {
        assert!(is_allowed_image("image/png", "photo.png"));
        assert!(is_allowed_image("image/jpeg", "PHOTO.JPG"));
        assert!(is_allowed_image("image/svg+xml", "logo.svg"));
        assert!(!is_allowed_image("image/png", "photo.exe"));
        assert!(!is_allowed_image("application/pdf", "photo.png"));
        assert!(!is_allowed_image("image/png", "photo"));
    }

    #[test]
    fn extension_defaults_to_jpg() {
        let file = ImageFile {
            file_name: "noext".into(),
            content_type: "image/jpeg".into(),
            bytes: Bytes::new(),
        };
        assert_eq!(file.extension(), "jpg");
    }

    #[test]
    fn upload_errors_have_distinct_messages() {
        let messages = [
            UploadError::FileTooLarge.to_string(),
            UploadError::TooManyFiles.to_string(),
            UploadError::UnsupportedType.to_string(),
            UploadError::Malformed("boom".into()).to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

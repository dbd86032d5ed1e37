//! Image storage backends. Product records only keep the references returned here.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::{AppConfig, CloudinaryConfig, ImageStorageKind},
    error::{AppError, AppResult},
    upload::ImageFile,
};

/// URL prefix under which [`LocalImageStorage`] files are served.
pub const LOCAL_PUBLIC_PREFIX: &str = "/uploads";

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store one image and return the reference to persist with the product.
    async fn store(&self, image: &ImageFile) -> AppResult<String>;
}

pub type SharedImageStorage = Arc<dyn ImageStorage>;

/// Store every image in order; the references keep the upload order.
pub async fn store_all(storage: &dyn ImageStorage, images: &[ImageFile]) -> AppResult<Vec<String>> {
    let mut refs = Vec::with_capacity(images.len());
    for image in images {
        refs.push(storage.store(image).await?);
    }
    Ok(refs)
}

pub fn from_config(config: &AppConfig) -> anyhow::Result<SharedImageStorage> {
    match config.image_storage {
        ImageStorageKind::Local => Ok(Arc::new(LocalImageStorage::new(&config.upload_dir))),
        ImageStorageKind::Cloudinary => {
            let cloudinary = config
                .cloudinary
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Cloudinary credentials are not configured"))?;
            Ok(Arc::new(CloudinaryStorage::new(cloudinary)))
        }
    }
}

/// `<millis>-<6 random chars>`, unique enough for product images.
fn generate_public_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..6])
}

#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    dir: PathBuf,
}

impl LocalImageStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(&self, image: &ImageFile) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("create {}: {e}", self.dir.display())))?;

        let file_name = format!("{}.{}", generate_public_id(), image.extension());
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), bytes = image.bytes.len(), "image stored");
        Ok(format!("{LOCAL_PUBLIC_PREFIX}/{file_name}"))
    }
}

/// Signed uploads to the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

/// Cloudinary signature: parameters sorted by name, joined as `k=v&k=v`,
/// followed by the API secret, hashed with SHA-256.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

#[async_trait]
impl ImageStorage for CloudinaryStorage {
    async fn store(&self, image: &ImageFile) -> AppResult<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        let public_id = generate_public_id();
        let format = image.extension();

        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("format", format.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("format", format)
            .text("public_id", public_id)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .http_client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "cloudinary upload failed with {status}: {body}"
            )));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[test]
    fn signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "products")], "secret");
        let b = sign_params(&[("folder", "products"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_params(&[("folder", "products"), ("timestamp", "1")], "other"));
    }

    #[test]
    fn public_ids_differ() {
        assert_ne!(generate_public_id(), generate_public_id());
    }

    #[tokio::test]
    async fn local_storage_writes_file_and_returns_public_path() {
        let dir = std::env::temp_dir().join(format!("storefront-{}", Uuid::new_v4()));
        let storage = LocalImageStorage::new(&dir);
        let image = ImageFile {
            file_name: "box.PNG".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG"),
        };

        let reference = storage.store(&image).await.unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with(".png"));

        let file_name = reference.trim_start_matches("/uploads/");
        let written = tokio::fs::read(dir.join(file_name)).await.unwrap();
        assert_eq!(written, b"\x89PNG");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

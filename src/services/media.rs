//! Media host seam.
//!
//! Uploaded files are first staged to a temporary file ([`StagedFile`]) and
//! then handed to a [`MediaStore`], which returns the public URL. The staged
//! file is removed when it is dropped, whether the upload worked or not.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{MediaBackend, MediaConfig};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media host rejected upload: {0}")]
    Rejected(String),
}

/// A request file written to temporary storage
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

impl StagedFile {
    /// Write `bytes` to a fresh temporary file under `dir`
    pub async fn stage(
        dir: &Path,
        bytes: &[u8],
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self, MediaError> {
        tokio::fs::create_dir_all(dir).await?;
        let file = NamedTempFile::new_in(dir)?;
        tokio::fs::write(file.path(), bytes).await?;
        Ok(Self {
            file,
            original_name,
            content_type,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Lowercased extension of the client's file name, if it had one
    pub fn extension(&self) -> Option<String> {
        let name = self.original_name.as_deref()?;
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
    }
}

/// What the media host reports back for one upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    pub secure_url: String,
    /// Seconds, for audio and video uploads
    pub duration: Option<f64>,
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &StagedFile) -> Result<UploadedMedia, MediaError>;
}

pub fn build_media_store(config: &MediaConfig) -> Arc<dyn MediaStore> {
    match config.backend {
        MediaBackend::Cloudinary => Arc::new(CloudinaryStore::new(config)),
        MediaBackend::Local => Arc::new(LocalMediaStore::new(&config.local_dir, &config.public_url)),
    }
}

/// Cloudinary upload API with signed requests
pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    url: Option<String>,
    secure_url: Option<String>,
    duration: Option<f64>,
    public_id: Option<String>,
    error: Option<CloudinaryError>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("https://api.cloudinary.com/v1_1/{}/auto/upload", self.cloud_name)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, with the secret appended, hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, file: &StagedFile) -> Result<UploadedMedia, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", timestamp.clone())], &self.api_secret);

        let bytes = tokio::fs::read(file.path()).await?;
        let mut part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file.original_name.clone().unwrap_or_else(|| "upload".to_string()));
        if let Some(ct) = &file.content_type {
            part = part.mime_str(ct)?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self.client.post(self.endpoint()).multipart(form).send().await?;
        let status = response.status();
        let body: CloudinaryResponse = response.json().await?;

        if let Some(err) = body.error {
            return Err(MediaError::Rejected(format!("{} ({})", err.message, status)));
        }

        let secure_url = body
            .secure_url
            .ok_or_else(|| MediaError::Rejected(format!("response without secure_url ({})", status)))?;

        tracing::info!("Uploaded {} bytes to media host", file.size);
        Ok(UploadedMedia {
            url: body.url.unwrap_or_else(|| secure_url.clone()),
            secure_url,
            duration: body.duration,
            public_id: body.public_id.unwrap_or_default(),
        })
    }
}

/// Copies files into a local directory served under `/static`
pub struct LocalMediaStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, file: &StagedFile) -> Result<UploadedMedia, MediaError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = Uuid::new_v4().to_string();
        let name = match file.extension() {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.clone(),
        };
        tokio::fs::copy(file.path(), self.dir.join(&name)).await?;

        let url = format!("{}/{}", self.public_url, name);
        tracing::debug!("Stored {} locally as {}", file.size, name);
        Ok(UploadedMedia {
            url: url.clone(),
            secure_url: url,
            duration: None,
            public_id: id,
        })
    }
}

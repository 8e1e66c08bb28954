//! Background image upload with a local fallback.
//!
//! Setting a board background uploads the image and stores the returned URL
//! in the snapshot. When the upload fails the user is not blocked: the image
//! gets a local `blob:local/<uuid>` reference, its bytes stay in the
//! session's [`EphemeralImages`] cache, and a warning notes that the image
//! will not survive a reload (other participants cannot load it either).

#[cfg(test)]
#[path = "upload_test.rs"]
mod upload_test;

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Scheme prefix of local, non-durable image references.
pub const EPHEMERAL_PREFIX: &str = "blob:local/";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by upload sinks.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No upload service is configured.
    #[error("uploads not configured")]
    NotConfigured,

    #[error("upload request failed: {0}")]
    Request(String),

    #[error("upload response error: status {status}")]
    Response { status: u16, body: String },

    #[error("upload response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// TYPES
// =============================================================================

/// Raw image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Stored by the upload sink; safe to persist.
    Durable(String),
    /// Local only. The payload must be kept by the caller to display it.
    Ephemeral { url: String, payload: ImagePayload },
}

impl ImageRef {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Durable(url) | Self::Ephemeral { url, .. } => url,
        }
    }

    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable(_))
    }
}

/// Destination for uploaded images.
#[async_trait::async_trait]
pub trait UploadSink: Send + Sync {
    /// Store the image and return its durable URL.
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, UploadError>;
}

// =============================================================================
// SINKS
// =============================================================================

/// Upload via `POST {base}/uploads`, expecting `{"url": "..."}` back.
pub struct HttpUploadSink {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUploadSink {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| UploadError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self) -> String {
        format!("{}/uploads", self.base_url)
    }
}

#[async_trait::async_trait]
impl UploadSink for HttpUploadSink {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, UploadError> {
        let response = self
            .http
            .post(self.url())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(UploadError::Response { status: status.as_u16(), body: text });
        }

        parse_upload_response(&text)
    }
}

/// Sink used when no upload service is configured. Every upload fails, so
/// every image falls back to an ephemeral reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploads;

#[async_trait::async_trait]
impl UploadSink for DisabledUploads {
    async fn upload(&self, _bytes: &[u8], _content_type: &str) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Extract the durable URL from an upload response body.
///
/// # Errors
///
/// Returns [`UploadError::Parse`] if the body has no non-empty `url`.
pub fn parse_upload_response(body: &str) -> Result<String, UploadError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|e| UploadError::Parse(e.to_string()))?;
    if parsed.url.is_empty() {
        return Err(UploadError::Parse("empty url".into()));
    }
    Ok(parsed.url)
}

// =============================================================================
// FALLBACK
// =============================================================================

/// Upload `bytes`, falling back to an ephemeral reference on any failure.
pub async fn upload_or_fallback(sink: &dyn UploadSink, bytes: Vec<u8>, content_type: &str) -> ImageRef {
    match sink.upload(&bytes, content_type).await {
        Ok(url) => {
            info!(%url, size = bytes.len(), "image uploaded");
            ImageRef::Durable(url)
        }
        Err(e) => {
            let url = format!("{EPHEMERAL_PREFIX}{}", Uuid::new_v4());
            warn!(error = %e, %url, "image upload failed; using local image that will not survive reload");
            ImageRef::Ephemeral { url, payload: ImagePayload { bytes, content_type: content_type.to_owned() } }
        }
    }
}

/// Whether `url` is a local ephemeral reference.
#[must_use]
pub fn is_ephemeral(url: &str) -> bool {
    url.starts_with(EPHEMERAL_PREFIX)
}

/// Bytes of images that only exist locally, keyed by their ephemeral URL.
#[derive(Debug, Default)]
pub struct EphemeralImages {
    images: HashMap<String, ImagePayload>,
}

impl EphemeralImages {
    pub fn insert(&mut self, url: String, payload: ImagePayload) {
        self.images.insert(url, payload);
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&ImagePayload> {
        self.images.get(url)
    }

    /// Drop every image except the one still referenced.
    pub fn retain_only(&mut self, current: Option<&str>) {
        self.images.retain(|url, _| Some(url.as_str()) == current);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

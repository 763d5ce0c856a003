//! Remote text recognition
//!
//! Uploads a normalized capture to the OCR endpoint as a single multipart
//! file field and decodes the `{"text": "..."}` reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::config::{Config, TimeoutConfig};
use crate::normalize::NormalizedImage;
use crate::{Error, Result};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// File name announced for the upload
pub const UPLOAD_FILE_NAME: &str = "photo.jpg";

/// MIME type of the upload
pub const UPLOAD_MIME: &str = "image/jpeg";

/// Expected reply from the OCR endpoint
#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
}

/// Something that turns a normalized image into text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize the text in `image`
    ///
    /// # Errors
    ///
    /// Returns `NetworkTimeout`, `NetworkError`, or `MalformedResponse`
    async fn recognize(&self, image: NormalizedImage) -> Result<String>;

    /// Recognizer name for logging
    fn name(&self) -> &'static str;
}

/// HTTP client for the remote OCR endpoint
pub struct RecognitionClient {
    client: reqwest::Client,
    endpoint: Url,
    jpeg_quality: u8,
}

impl RecognitionClient {
    /// Create a client for `endpoint` with the given phase bounds
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: Url, timeouts: TimeoutConfig, jpeg_quality: u8) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .timeout(overall_deadline(timeouts))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            jpeg_quality,
        })
    }

    /// Create a client from the resolved configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.timeouts, config.jpeg_quality)
    }

    /// Endpoint receiving uploads
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the single-part upload form
    fn build_form(&self, image: &NormalizedImage) -> Result<Form> {
        let payload = image.encode_jpeg(self.jpeg_quality)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            bytes = payload.len(),
            "encoded upload payload"
        );

        let part = Part::bytes(payload)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME)
            .map_err(|e| Error::Encode(e.to_string()))?;

        Ok(Form::new().part(IMAGE_FIELD, part))
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    async fn recognize(&self, image: NormalizedImage) -> Result<String> {
        let form = self.build_form(&image)?;
        drop(image);

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, endpoint = %self.endpoint, "OCR request failed");
                Error::from(e)
            })?;

        // Status is not checked; any body is decoded the same way
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::warn!(error = %e, %status, "failed to read OCR response body");
            Error::from(e)
        })?;

        tracing::debug!(
            %status,
            bytes = body.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "received OCR response"
        );

        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "remote-ocr"
    }
}

/// Deadline for the whole exchange
///
/// reqwest has no write-phase bound, so a stalled upload is only caught by the
/// overall deadline. Using the longest phase bound makes every stall surface
/// near its configured bound, at the cost of also capping a slow connect plus a
/// slow read to that same bound.
fn overall_deadline(timeouts: TimeoutConfig) -> Duration {
    timeouts.connect.max(timeouts.read).max(timeouts.write)
}

/// Decode `{"text": "..."}` strictly
///
/// # Errors
///
/// Returns `MalformedResponse` if the body is empty, not JSON, or lacks a string `text`
pub fn parse_response(body: &str) -> Result<String> {
    if body.trim().is_empty() {
        return Err(Error::MalformedResponse("empty response body".to_string()));
    }

    serde_json::from_str::<OcrResponse>(body)
        .map(|r| r.text)
        .map_err(|e| Error::MalformedResponse(e.to_string()))
}

//! HTTP client for the generation backend.
//!
//! Endpoints: `GET /api/history`, `DELETE /api/history/{id}`,
//! `POST /api/generate/text`, and plain `GET` for output images.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::record::{GenerationRecord, RecordId};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors produced by backend requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request did not complete (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// Image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// A URL could not be built from the configured base.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Body of `POST /api/generate/text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    /// Empty means "let the backend pick".
    pub seed: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    history_limit: usize,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        history_limit: usize,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            history_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path such as `/outputs/x.png`.
    pub fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        reqwest::Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
    }

    pub async fn list_history(&self) -> Result<Vec<GenerationRecord>, ApiError> {
        let mut url = self.url("/api/history")?;
        if self.history_limit > 0 {
            url.query_pairs_mut()
                .append_pair("limit", &self.history_limit.to_string());
        }
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let text = read_success(response, "Unable to load history.").await?;
        let records: Vec<GenerationRecord> =
            serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;
        tracing::info!(count = records.len(), "history loaded");
        Ok(records)
    }

    pub async fn delete_history(&self, id: &RecordId) -> Result<(), ApiError> {
        let mut url = self.url("/api/history")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?
            .push(id.as_str());
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        read_success(response, "Delete failed.").await?;
        tracing::info!(record = %id, "history record deleted");
        Ok(())
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationRecord, ApiError> {
        let text = self
            .send_json("/api/generate/text", request, "Generation failed.")
            .await?;
        let record: GenerationRecord =
            serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;
        tracing::info!(
            record = %record.id,
            duration_ms = ?record.duration_ms,
            "generation finished"
        );
        Ok(record)
    }

    /// Raw bytes of a backend file (output image or uploaded input).
    pub async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status,
                message: format!("Unable to load {path}."),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn send_json(
        &self,
        path: &str,
        body: &impl Serialize,
        fallback: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        read_success(response, fallback).await
    }
}

async fn read_success(response: reqwest::Response, fallback: &str) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    let success = response.status().is_success();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Request(e.to_string()))?;
    if !success {
        let message = error_message(&text, fallback);
        tracing::warn!(status, %message, "backend request failed");
        return Err(ApiError::Status { status, message });
    }
    // Some backends answer 200 with an `error` body.
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) {
        if let Some(Value::String(error)) = map.get("error") {
            return Err(ApiError::Status {
                status,
                message: error.clone(),
            });
        }
    }
    Ok(text)
}

/// Human-readable message from an error body: `detail`, then `error`, then
/// the raw text, then `fallback`.
pub fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["detail", "error"]
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
                Some(value @ (Value::Array(_) | Value::Object(_))) => Some(value.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| fallback.to_string()),
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => fallback.to_string(),
    }
}

//! HTTP client for the backend call and pipeline-test endpoints.
//!
//! All requests go through one ApiClient so error surfacing is uniform:
//! a non-2xx response is decoded into a RequestError carrying the
//! server's optional `detail` message, and transport failures map to
//! their own variant. Nothing here retries.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::domain::CallRequest;

/// Bounded per-request timeout. Hardening only; the protocol itself
/// specifies none.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A failed HTTP call, with the server's detail when it sent one
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Server returned status {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RequestError {
    /// Server-supplied human-readable detail, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            Self::Transport(_) => None,
        }
    }

    /// Message to surface to the user: the server detail when present,
    /// otherwise the given generic fallback
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

/// Error body shape used by the backend for non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallInitiated {
    call_id: String,
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Client for the backend API
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Convert a response into `Status` unless it is 2xx, pulling the
    /// optional `detail` out of the JSON body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RequestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail);

        Err(RequestError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    /// `POST /api/call`: initiate an outbound call, returning the
    /// backend-issued call identifier
    pub async fn initiate_call(&self, request: &CallRequest) -> Result<String, RequestError> {
        debug!(phone = %request.phone_number, "Initiating call");

        let response = self
            .client
            .post(self.config.api_url("/api/call"))
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await?;

        let initiated: CallInitiated = Self::check(response).await?.json().await?;
        Ok(initiated.call_id)
    }

    /// `POST /api/test-stt`: transcribe an audio payload.
    ///
    /// The audio goes over the wire base64-encoded with no data-URL
    /// prefix. An absent transcript is returned as an empty string; the
    /// caller decides what empty means.
    pub async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String, RequestError> {
        let audio_data = base64::engine::general_purpose::STANDARD.encode(audio);

        let response = self
            .client
            .post(self.config.api_url("/api/test-stt"))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({
                "audio_data": audio_data,
                "file_name": file_name,
            }))
            .send()
            .await?;

        let stt: SttResponse = Self::check(response).await?.json().await?;
        Ok(stt.transcript.unwrap_or_default())
    }

    /// `POST /api/test-llm`: generate a reply for a transcript
    pub async fn generate_reply(&self, transcript: &str) -> Result<String, RequestError> {
        let response = self
            .client
            .post(self.config.api_url("/api/test-llm"))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({ "transcript": transcript }))
            .send()
            .await?;

        let llm: LlmResponse = Self::check(response).await?.json().await?;
        Ok(llm.response.unwrap_or_default())
    }

    /// `POST /api/test-tts`: synthesize speech, returning raw audio
    /// bytes (the one endpoint that does not answer JSON)
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, RequestError> {
        let response = self
            .client
            .post(self.config.api_url("/api/test-tts"))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_detail() {
        let err = RequestError::Status {
            status: 400,
            detail: Some("Invalid phone number".to_string()),
        };
        assert_eq!(
            err.user_message("Failed to initiate call"),
            "Invalid phone number"
        );
    }

    #[test]
    fn test_user_message_falls_back_when_no_detail() {
        let err = RequestError::Status {
            status: 500,
            detail: None,
        };
        assert_eq!(
            err.user_message("Failed to initiate call"),
            "Failed to initiate call"
        );
    }

    #[test]
    fn test_error_body_parsing() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"nope"}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("nope"));

        let body: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.detail.is_none());
    }
}

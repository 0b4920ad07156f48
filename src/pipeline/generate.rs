//! The generation capability: one request, one response.
//!
//! [`GenerationClient`] is the seam between the session and the remote
//! service. [`HttpGenerationClient`] POSTs `{ text, mode }` as JSON and reads
//! `{ summary?, quiz?, assignments? }` back. No retries: a failed exchange is
//! reported to the user, who can try again.

use crate::config::GenerationMode;
use crate::error::{RequestError, StudyError};
use crate::output::ResultSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Request body sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    pub mode: GenerationMode,
}

/// Successful response body. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub quiz: Option<String>,
    #[serde(default)]
    pub assignments: Option<String>,
}

impl From<GenerateResponse> for ResultSet {
    fn from(r: GenerateResponse) -> Self {
        ResultSet {
            summary: r.summary.unwrap_or_default(),
            quiz: r.quiz.unwrap_or_default(),
            assignments: r.assignments.unwrap_or_default(),
        }
    }
}

/// Sends a generation request and waits for the single response.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RequestError>;
}

/// [`GenerationClient`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGenerationClient {
    /// Build a client for `endpoint`. `timeout` of `None` keeps reqwest's
    /// default (no whole-request timeout).
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, StudyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| StudyError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RequestError> {
        debug!(
            "POST {} (mode={}, {} chars)",
            self.endpoint,
            request.mode,
            request.text.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // A body that cannot be read is treated like one without `detail`.
            let detail = match response.bytes().await {
                Ok(body) => parse_error_detail(&body),
                Err(_) => None,
            };
            return Err(RequestError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| RequestError::InvalidResponse(e.to_string()))
    }
}

/// Pull a non-empty string `detail` out of an error body.
///
/// Frameworks such as FastAPI also send `detail` as a list of validation
/// errors; only a plain string is meant for end users.
pub fn parse_error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

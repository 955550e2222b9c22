//! Request/response contract with the correction service.
//!
//! One sentence per call:
//!
//! ```text
//! POST {base_url}/correct   { "sentence": "..." }
//!
//! 200 { "status": "success", "corrected_sentence": "..." }
//! 200 { "status": "error",   "message": "..." }
//! 503 { "status": "loading" }               ← model still warming up
//! ```
//!
//! [`CorrectionBackend`] is the seam the retry client talks to;
//! [`HttpBackend`] is the `reqwest` implementation of it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ServiceConfig;

// ---------------------------------------------------------------------------
// BackendReply / BackendError
// ---------------------------------------------------------------------------

/// A well-formed application-level reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Success(String),
    Loading,
    /// The service understood the request and rejected it.
    Error(String),
}

/// Transport or protocol failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Nothing is listening yet (connection refused and friends).
    #[error("correction service not reachable: {0}")]
    Unreachable(String),

    /// HTTP 503: the service is up but not ready.
    #[error("correction service unavailable (HTTP 503)")]
    Unavailable,

    #[error("correction request timed out")]
    Timeout,

    #[error("correction service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("failed to parse correction reply: {0}")]
    Parse(String),
}

impl BackendError {
    /// `true` for failures that mean "not ready yet, try again later".
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Unreachable(_) | BackendError::Unavailable)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Unreachable(e.to_string())
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// CorrectionBackend trait
// ---------------------------------------------------------------------------

/// One correction request.  Implementors must be `Send + Sync` so they can
/// be shared as `Arc<dyn CorrectionBackend>`.
#[async_trait]
pub trait CorrectionBackend: Send + Sync {
    async fn request(&self, sentence: &str, timeout: Duration)
        -> Result<BackendReply, BackendError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CorrectRequest<'a> {
    sentence: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum WireReply {
    Success { corrected_sentence: String },
    Loading,
    Error {
        #[serde(default)]
        message: String,
    },
}

impl From<WireReply> for BackendReply {
    fn from(w: WireReply) -> Self {
        match w {
            WireReply::Success { corrected_sentence } => BackendReply::Success(corrected_sentence),
            WireReply::Loading => BackendReply::Loading,
            WireReply::Error { message } => BackendReply::Error(message),
        }
    }
}

/// Classify an HTTP status and body.
///
/// ```
/// use text_pilot::service::{interpret_reply, BackendError, BackendReply};
///
/// assert_eq!(
///     interpret_reply(200, r#"{"status":"success","corrected_sentence":"Hola."}"#),
///     Ok(BackendReply::Success("Hola.".into()))
/// );
/// assert_eq!(interpret_reply(503, r#"{"status":"loading"}"#), Err(BackendError::Unavailable));
/// ```
pub fn interpret_reply(status: u16, body: &str) -> Result<BackendReply, BackendError> {
    match status {
        503 => Err(BackendError::Unavailable),
        200..=299 => serde_json::from_str::<WireReply>(body)
            .map(BackendReply::from)
            .map_err(|e| BackendError::Parse(e.to_string())),
        _ => {
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| body.trim().to_string());
            Err(BackendError::Http { status, message })
        }
    }
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// `reqwest` client for `POST {base_url}/correct`.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    /// The service is expected on the local machine, so system proxy
    /// settings are ignored.  Falls back to a default client if the builder
    /// fails.
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: format!("{}/correct", base_url.trim_end_matches('/')),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.base_url)
    }
}

#[async_trait]
impl CorrectionBackend for HttpBackend {
    async fn request(
        &self,
        sentence: &str,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&CorrectRequest { sentence })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        interpret_reply(status, &body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Resilient correction client.
//!
//! [`CorrectionClient::correct`] drives one [`CorrectionAttempt`] through a
//! bounded retry loop:
//!
//! ```text
//! request ──success──────────────▶ Success(text)
//!         ──status=error / other──▶ ServiceError     (no retry)
//!         ──refused / 503 / loading─▶ wait retry_delay, try again
//!                                     … max_attempts exhausted ─▶ ConnectionError
//! ```
//!
//! The loop holds no state outside its future: dropping the future (for
//! example when the orchestrator shuts down) cancels the pending delay and
//! any request in flight.
//!
//! [`CorrectionClient::correct_manual`] is the single-attempt entry point for
//! on-demand corrections; its failures are user-facing errors.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::ServiceConfig;

use super::backend::{BackendError, BackendReply, CorrectionBackend, HttpBackend};

// ---------------------------------------------------------------------------
// CorrectionOutcome
// ---------------------------------------------------------------------------

/// Result of one correction request, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionOutcome {
    Success(String),
    /// The service is still warming up.  The retrying loop turns this into
    /// a wait, so callers of `correct` never see it.
    Loading,
    /// Retry budget exhausted; the service is treated as unavailable.
    ConnectionError,
    /// Non-retryable failure reported by, or talking to, the service.
    ServiceError(String),
}

// ---------------------------------------------------------------------------
// CorrectionAttempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Retrying,
    Succeeded,
    Failed,
}

/// Bookkeeping for one submitted sentence.
#[derive(Debug, Clone)]
pub struct CorrectionAttempt {
    pub sentence: String,
    /// Requests issued so far.
    pub attempt_count: u32,
    pub status: AttemptStatus,
}

impl CorrectionAttempt {
    pub fn new(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            attempt_count: 0,
            status: AttemptStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, AttemptStatus::Succeeded | AttemptStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total requests allowed per sentence (at least one is always made).
    pub max_attempts: u32,
    /// Wait between a retryable failure and the next request.
    pub delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

// ---------------------------------------------------------------------------
// ManualCorrectionError
// ---------------------------------------------------------------------------

/// Failures of the on-demand entry point, worded for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManualCorrectionError {
    #[error("could not connect to the correction service")]
    CannotConnect,

    #[error("the correction service is taking too long to respond, try again")]
    TooSlow,

    #[error("invalid response from the correction service")]
    InvalidResponse,

    #[error("correction service error: {0}")]
    Service(String),
}

// ---------------------------------------------------------------------------
// CorrectionClient
// ---------------------------------------------------------------------------

pub struct CorrectionClient {
    backend: Arc<dyn CorrectionBackend>,
    policy: RetryPolicy,
    manual_timeout: Duration,
}

impl CorrectionClient {
    pub fn new(
        backend: Arc<dyn CorrectionBackend>,
        policy: RetryPolicy,
        manual_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            policy,
            manual_timeout,
        }
    }

    /// HTTP client for the service described by `config`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            Arc::new(HttpBackend::from_config(config)),
            RetryPolicy::from_config(config),
            config.manual_timeout(),
        )
    }

    /// Correct `sentence`, retrying while the service is warming up.
    pub async fn correct(&self, sentence: &str) -> CorrectionOutcome {
        let mut attempt = CorrectionAttempt::new(sentence);
        self.drive(&mut attempt).await
    }

    /// Run `attempt` to a terminal status.
    pub async fn drive(&self, attempt: &mut CorrectionAttempt) -> CorrectionOutcome {
        let max = self.policy.max_attempts.max(1);

        while attempt.attempt_count < max {
            attempt.attempt_count += 1;
            let n = attempt.attempt_count;

            match self.request(&attempt.sentence, self.policy.request_timeout).await {
                Ok(BackendReply::Success(text)) => {
                    attempt.status = AttemptStatus::Succeeded;
                    return CorrectionOutcome::Success(text);
                }
                Ok(BackendReply::Error(message)) => {
                    attempt.status = AttemptStatus::Failed;
                    log::error!("service: correction rejected: {message}");
                    return CorrectionOutcome::ServiceError(message);
                }
                Ok(BackendReply::Loading) => {
                    log::info!("service: attempt {n}/{max}: model still loading, waiting");
                }
                Err(e) if e.is_retryable() => {
                    log::info!("service: attempt {n}/{max}: service not ready ({e}), retrying");
                }
                Err(e) => {
                    attempt.status = AttemptStatus::Failed;
                    log::error!("service: correction request failed: {e}");
                    return CorrectionOutcome::ServiceError(e.to_string());
                }
            }

            attempt.status = AttemptStatus::Retrying;
            if n < max {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        attempt.status = AttemptStatus::Failed;
        log::warn!("service: unavailable after {max} attempts");
        CorrectionOutcome::ConnectionError
    }

    /// On-demand correction: one attempt bounded by the manual timeout.
    /// Blank input is returned as-is without contacting the service; a blank
    /// correction of non-blank input is an invalid response.
    pub async fn correct_manual(&self, sentence: &str) -> Result<String, ManualCorrectionError> {
        if sentence.trim().is_empty() {
            return Ok(sentence.to_string());
        }

        match self.request(sentence, self.manual_timeout).await {
            Ok(BackendReply::Success(text)) if text.trim().is_empty() => {
                log::error!("service: empty correction for non-empty input");
                Err(ManualCorrectionError::InvalidResponse)
            }
            Ok(BackendReply::Success(text)) => Ok(text),
            Ok(BackendReply::Error(message)) => Err(ManualCorrectionError::Service(message)),
            Ok(BackendReply::Loading) => Err(ManualCorrectionError::TooSlow),
            Err(e) => {
                log::error!("service: manual correction failed: {e}");
                Err(match e {
                    BackendError::Unreachable(_) => ManualCorrectionError::CannotConnect,
                    BackendError::Unavailable | BackendError::Timeout => {
                        ManualCorrectionError::TooSlow
                    }
                    BackendError::Parse(_) => ManualCorrectionError::InvalidResponse,
                    BackendError::Http { message, .. } => ManualCorrectionError::Service(message),
                    BackendError::Request(message) => ManualCorrectionError::Service(message),
                })
            }
        }
    }

    /// Backend call with a hard upper bound, whatever the backend does.
    async fn request(
        &self,
        sentence: &str,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError> {
        match tokio::time::timeout(timeout, self.backend.request(sentence, timeout)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(BackendError::Timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

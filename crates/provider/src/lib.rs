//! Upstream error classification for credential failover
//!
//! Decouples the dispatcher from any particular transport. A transport error
//! implements `Classify` to tell the dispatcher whether waiting and starting
//! a new round over the credential pool could help:
//! - Retryable: overload or quota signals (429, 500, 503, "quota" in the text)
//! - Terminal: everything else (bad request, auth failure, schema errors)
//!
//! Transports that expose a status code populate `UpstreamError` directly.
//! Transports that only surface error text fall back to `classify_message`.

pub mod classify;

pub use classify::{classify, classify_message, classify_status};

use std::fmt;
use std::time::Duration;

/// Whether a failed round over the pool is worth repeating after a backoff.
///
/// Classification only matters once every credential in a round has failed;
/// a Terminal error on one credential never prevents trying the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Backend overloaded or quota exhausted; retry after backoff
    Retryable,
    /// Waiting will not help; propagate after the current round
    Terminal,
}

impl ErrorClassification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::Retryable => "retryable",
            ErrorClassification::Terminal => "terminal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClassification::Retryable)
    }
}

/// Errors the dispatcher can classify.
pub trait Classify {
    fn classification(&self) -> ErrorClassification;

    /// Server-provided minimum wait before the next attempt, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Structured failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl UpstreamError {
    /// Error carrying an HTTP-like status code.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Error from a transport that exposes only text.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "upstream returned {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl Classify for UpstreamError {
    fn classification(&self) -> ErrorClassification {
        classify(self.status, &self.message)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl Classify for String {
    fn classification(&self) -> ErrorClassification {
        classify_message(self)
    }
}

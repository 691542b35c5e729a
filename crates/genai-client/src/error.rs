//! Error types for generative-AI API calls

use std::time::Duration;

use provider::{Classify, ErrorClassification};

/// Errors from client construction and API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("invalid API key: {0}")]
    InvalidKey(String),

    #[error("client build failed: {0}")]
    Build(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Classify for Error {
    fn classification(&self) -> ErrorClassification {
        match self {
            Error::Api {
                status, message, ..
            } => provider::classify(Some(*status), message),
            // Transport errors only carry text
            Error::Http(message) => provider::classify_message(message),
            Error::InvalidKey(_) | Error::Build(_) | Error::InvalidResponse(_) => {
                ErrorClassification::Terminal
            }
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

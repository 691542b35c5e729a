//! Error types for dispatch

/// Final outcome of a failed dispatch.
///
/// Intermediate per-credential failures never surface; the caller sees only
/// the error that ended the dispatch.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("no credentials available")]
    NoCredentialsAvailable,

    /// Every credential failed in one round with an error waiting cannot fix.
    #[error("{0}")]
    Terminal(E),

    /// Every round failed with retryable errors; carries the last one.
    #[error("all credentials exhausted after {rounds} rounds: {last}")]
    Exhausted { rounds: u32, last: E },

    #[error("dispatch cancelled")]
    Cancelled,
}

impl<E> Error<E> {
    /// The operation error that ended the dispatch, if any.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Error::Terminal(e) | Error::Exhausted { last: e, .. } => Some(e),
            Error::NoCredentialsAvailable | Error::Cancelled => None,
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            Error::Terminal(e) | Error::Exhausted { last: e, .. } => Some(e),
            Error::NoCredentialsAvailable | Error::Cancelled => None,
        }
    }

    /// Metrics label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Error::NoCredentialsAvailable => "no_credentials",
            Error::Terminal(_) => "terminal",
            Error::Exhausted { .. } => "exhausted",
            Error::Cancelled => "cancelled",
        }
    }
}

/// Result alias for dispatch.
pub type Result<T, E> = std::result::Result<T, Error<E>>;

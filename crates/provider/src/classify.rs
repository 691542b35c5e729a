//! Status and message classifiers
//!
//! Status codes are authoritative when present. Message matching is the
//! fallback for transports that fold the status into error text; it is a
//! case-sensitive substring check.

use crate::ErrorClassification;

/// Status codes that signal overload or quota exhaustion.
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 503];

/// Markers in error text that signal overload or quota exhaustion.
const RETRYABLE_MARKERS: &[&str] = &["429", "quota", "500", "503"];

/// Classify by HTTP status alone.
pub fn classify_status(status: u16) -> ErrorClassification {
    if RETRYABLE_STATUSES.contains(&status) {
        ErrorClassification::Retryable
    } else {
        ErrorClassification::Terminal
    }
}

/// Classify error text by substring markers.
pub fn classify_message(message: &str) -> ErrorClassification {
    if RETRYABLE_MARKERS.iter().any(|marker| message.contains(marker)) {
        ErrorClassification::Retryable
    } else {
        ErrorClassification::Terminal
    }
}

/// Classify a failure from an optional status and its message.
///
/// Retryable if either the status or the message says so.
pub fn classify(status: Option<u16>, message: &str) -> ErrorClassification {
    match status.map(classify_status) {
        Some(ErrorClassification::Retryable) => ErrorClassification::Retryable,
        _ => classify_message(message),
    }
}

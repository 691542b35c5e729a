//! Generative-AI API constants

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// REST API version path segment
pub const API_VERSION: &str = "v1beta";

/// Model used when configuration does not name one
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

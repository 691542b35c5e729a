//! Key-bound API client
//!
//! Each `GenAiClient` owns a `reqwest::Client` whose default headers carry
//! its API key, marked sensitive so it never shows up in reqwest's debug
//! output. Handles are cheap to clone and safe to share across tasks.

use std::fmt;
use std::time::Duration;

use common::Secret;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use tracing::debug;

use crate::constants::{
    API_KEY_HEADER, API_VERSION, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{Error, Result};
use crate::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

/// Settings shared by every handle in a pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A ready-to-use client bound to one API key.
#[derive(Clone)]
pub struct GenAiClient {
    http: reqwest::Client,
    endpoint: String,
    key_hint: String,
}

impl fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenAiClient")
            .field("endpoint", &self.endpoint)
            .field("key", &self.key_hint)
            .finish()
    }
}

impl GenAiClient {
    /// Build a handle for `api_key`.
    ///
    /// Fails if the key is empty or contains characters that cannot be sent
    /// in an HTTP header.
    pub fn new(api_key: &Secret<String>, config: &ClientConfig) -> Result<Self> {
        let key = api_key.expose().trim();
        if key.is_empty() {
            return Err(Error::InvalidKey("key is empty".into()));
        }

        let mut value = HeaderValue::from_str(key)
            .map_err(|e| Error::InvalidKey(format!("not a valid header value: {e}")))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Build(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: generate_endpoint(&config.base_url, &config.model),
            key_hint: api_key.hint(),
        })
    }

    /// Redacted key label for logs.
    pub fn key_hint(&self) -> &str {
        &self.key_hint
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `generateContent` with a full request body.
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Http(format!("generateContent request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_delay);
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            debug!(status = status.as_u16(), key = %self.key_hint, "generateContent rejected");
            return Err(api_error(status, &body, retry_after));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("undecodable generateContent body: {e}")))
    }

    /// Single-turn text generation.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let response = self
            .generate(&GenerateContentRequest::from_prompt(prompt))
            .await?;
        response
            .text()
            .ok_or_else(|| Error::InvalidResponse("response contained no text".into()))
    }
}

fn generate_endpoint(base_url: &str, model: &str) -> String {
    format!(
        "{}/{API_VERSION}/models/{model}:generateContent",
        base_url.trim_end_matches('/')
    )
}

/// Map a non-success response to `Error::Api`.
///
/// Prefers the JSON envelope's message (prefixed with its canonical status
/// name) and falls back to the raw body. A `RetryInfo` delay in the body is
/// used when the `Retry-After` header is absent.
fn api_error(status: reqwest::StatusCode, body: &str, retry_after: Option<Duration>) -> Error {
    let (message, body_delay) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let delay = envelope.error.retry_delay().and_then(parse_delay);
            let message = match envelope.error.status {
                Some(name) => format!("{name}: {}", envelope.error.message),
                None => envelope.error.message,
            };
            (message, delay)
        }
        Err(_) if body.trim().is_empty() => (
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            None,
        ),
        Err(_) => (body.trim().to_string(), None),
    };

    Error::Api {
        status: status.as_u16(),
        message,
        retry_after: retry_after.or(body_delay),
    }
}

/// Parse a delay given as whole seconds ("17") or a duration string ("17s", "1.5s").
fn parse_delay(value: &str) -> Option<Duration> {
    let value = value.trim();
    let secs = value.strip_suffix('s').unwrap_or(value);
    let secs: f64 = secs.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

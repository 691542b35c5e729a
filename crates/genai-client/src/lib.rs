//! Client handle for the hosted generative-AI REST API
//!
//! One `GenAiClient` is bound to exactly one API key. Construction validates
//! the key and builds a dedicated HTTP client with the key installed as a
//! sensitive default header, so a handle is ready to use as soon as it
//! exists. Failures come back as `Error`, which implements
//! `provider::Classify` so the dispatcher can decide whether to back off.

pub mod client;
pub mod constants;
pub mod error;
pub mod types;

pub use client::{ClientConfig, GenAiClient};
pub use constants::*;
pub use error::{Error, Result};
pub use types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

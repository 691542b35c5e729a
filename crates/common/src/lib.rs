//! Shared types for the generative-AI dispatcher workspace
//!
//! `Secret` carries API keys from configuration into client handles without
//! letting them leak through `Debug`, `Display`, or structured logs.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

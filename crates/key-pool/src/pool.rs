//! Credential pool construction
//!
//! Raw configuration values may each hold several comma-separated keys. They
//! are split, trimmed and turned into client handles once at startup. The
//! resulting pool is never mutated; it is shared read-only between
//! concurrent dispatches.
//!
//! Keys whose handle cannot be built are left out of the pool. An empty pool
//! is still a valid pool: the dispatcher fails fast on it.

use std::fmt;
use std::sync::Arc;

use common::Secret;
use tracing::{debug, info, warn};

/// Split raw configuration values into individual credentials.
///
/// Order is preserved and duplicates are kept.
pub fn parse_credentials<'a, I>(raw: I) -> Vec<Secret<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| Secret::new(key.to_owned()))
        .collect()
}

/// Immutable, ordered set of client handles, one per usable credential.
pub struct CredentialPool<H> {
    handles: Vec<Arc<H>>,
}

impl<H> CredentialPool<H> {
    /// Build a pool from raw configuration values.
    ///
    /// `connect` constructs a handle for one credential. Credentials it
    /// rejects are skipped and logged by position only. Never fails; warns
    /// when no handle could be built.
    pub fn build<'a, I, F, E>(raw: I, mut connect: F) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(&Secret<String>) -> std::result::Result<H, E>,
        E: fmt::Display,
    {
        let credentials = parse_credentials(raw);
        let mut handles = Vec::with_capacity(credentials.len());

        for (index, credential) in credentials.iter().enumerate() {
            match connect(credential) {
                Ok(handle) => {
                    debug!(index, key = %credential.hint(), "client handle constructed");
                    handles.push(Arc::new(handle));
                }
                Err(e) => {
                    warn!(index, error = %e, "skipping credential, client construction failed");
                }
            }
        }

        if handles.is_empty() {
            warn!(
                credentials = credentials.len(),
                "no usable credentials, every dispatch will fail"
            );
        } else {
            info!(
                handles = handles.len(),
                skipped = credentials.len() - handles.len(),
                "credential pool initialized"
            );
        }

        Self { handles }
    }

    /// Pool over already-constructed handles, in the given order.
    pub fn from_handles(handles: Vec<H>) -> Self {
        Self {
            handles: handles.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<H>> {
        self.handles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<H>> {
        self.handles.iter()
    }
}

impl<H> fmt::Debug for CredentialPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("handles", &self.handles.len())
            .finish()
    }
}

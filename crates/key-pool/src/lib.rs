//! Credential pool and failover dispatcher for a rate-limited AI backend
//!
//! A `CredentialPool` is built once from raw configuration strings and holds
//! one client handle per usable credential. A `Dispatcher` runs a caller
//! operation against the pool:
//! 1. Each round starts at a random credential and tries every credential
//!    in turn, returning on the first success
//! 2. When a whole round fails, the last error is classified
//! 3. Retryable (overload/quota) → wait `base * 2^round + jitter`, next round
//! 4. Terminal, or round budget spent → the error propagates to the caller
//!
//! An empty pool fails every dispatch with `NoCredentialsAvailable` without
//! invoking the operation.

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod random;

pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use policy::RetryPolicy;
pub use pool::{CredentialPool, parse_credentials};
pub use provider::{Classify, ErrorClassification};
pub use random::{FixedRandom, RandomSource, ThreadRandom};
pub use tokio_util::sync::CancellationToken;

//! Failover dispatcher over a credential pool
//!
//! One dispatch runs up to `RetryPolicy::total_rounds()` rounds. A round
//! starts at a random credential and tries every credential once, strictly
//! one after another, returning on the first success. A failure on one
//! credential never delays trying the next: the key may be revoked or out of
//! quota while the others are healthy.
//!
//! Only when a whole round fails is the last error classified. Retryable
//! errors (backend overloaded, every key out of quota) wait
//! `base * 2^round + jitter` (or longer when the server asks, up to
//! `RetryPolicy::max_delay`) and start a new round; anything else propagates
//! right away.
//!
//! Each dispatch owns its round counter, last error and random draws.
//! Concurrent dispatches do not coordinate and may start on the same
//! credential.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use provider::Classify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::policy::RetryPolicy;
use crate::pool::CredentialPool;
use crate::random::{RandomSource, ThreadRandom};

/// Longest error message included in round-boundary warnings.
const LOG_MESSAGE_LIMIT: usize = 200;

/// Runs operations against a shared credential pool with failover and backoff.
pub struct Dispatcher<H, R = ThreadRandom> {
    pool: Arc<CredentialPool<H>>,
    policy: RetryPolicy,
    random: R,
}

impl<H> Dispatcher<H, ThreadRandom> {
    /// Dispatcher with the default policy (3 rounds, 2s base, 1s jitter).
    pub fn new(pool: Arc<CredentialPool<H>>) -> Self {
        Self {
            pool,
            policy: RetryPolicy::default(),
            random: ThreadRandom,
        }
    }
}

impl<H, R: RandomSource> Dispatcher<H, R> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the random source used for start offsets and jitter.
    pub fn with_random<R2: RandomSource>(self, random: R2) -> Dispatcher<H, R2> {
        Dispatcher {
            pool: self.pool,
            policy: self.policy,
            random,
        }
    }

    pub fn pool(&self) -> &Arc<CredentialPool<H>> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds on some credential or the dispatch
    /// gives up.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut(Arc<H>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Classify + fmt::Display,
    {
        self.run_with_cancel(&CancellationToken::new(), operation)
            .await
    }

    /// Like `run`, aborting with `Error::Cancelled` once `cancel` fires.
    ///
    /// The token is checked before every credential attempt and raced
    /// against every backoff wait. An attempt already in flight is not
    /// interrupted.
    pub async fn run_with_cancel<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut(Arc<H>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let size = self.pool.len();
        if size == 0 {
            warn!("dispatch refused, credential pool is empty");
            return Err(finish(Error::NoCredentialsAvailable));
        }

        let total_rounds = self.policy.total_rounds();
        let mut global_attempts: u32 = 0;

        loop {
            let round = global_attempts + 1;
            let start = self.random.below(size as u64) as usize;
            let mut last_error: Option<E> = None;

            for offset in 0..size {
                if cancel.is_cancelled() {
                    info!(round, "dispatch cancelled");
                    return Err(finish(Error::Cancelled));
                }

                let index = (start + offset) % size;
                let Some(handle) = self.pool.get(index) else {
                    continue;
                };

                match operation(Arc::clone(handle)).await {
                    Ok(value) => {
                        metrics::record_attempt(true);
                        if round > 1 || offset > 0 {
                            info!(index, round, attempt = offset + 1, "dispatch succeeded after failover");
                        }
                        metrics::record_result("success");
                        return Ok(value);
                    }
                    Err(e) => {
                        metrics::record_attempt(false);
                        debug!(index, round, error = %e, "credential attempt failed");
                        last_error = Some(e);
                    }
                }
            }

            // Only an empty pool leaves a round without an error.
            let Some(last_error) = last_error else {
                return Err(finish(Error::NoCredentialsAvailable));
            };

            let classification = last_error.classification();
            let message = truncate(&last_error.to_string(), LOG_MESSAGE_LIMIT);

            if !classification.is_retryable() {
                warn!(
                    failed_credentials = size,
                    round,
                    max_rounds = total_rounds,
                    classification = classification.label(),
                    error = %message,
                    "all credentials failed, not retrying"
                );
                return Err(finish(Error::Terminal(last_error)));
            }

            if global_attempts >= self.policy.max_global_rounds {
                warn!(
                    failed_credentials = size,
                    round,
                    max_rounds = total_rounds,
                    classification = classification.label(),
                    error = %message,
                    "all credentials failed, retry budget exhausted"
                );
                return Err(finish(Error::Exhausted {
                    rounds: round,
                    last: last_error,
                }));
            }

            let jitter = self.policy.draw_jitter(&self.random);
            let delay = self
                .policy
                .wait_for(global_attempts, jitter, last_error.retry_after());

            warn!(
                failed_credentials = size,
                round,
                max_rounds = total_rounds,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %message,
                "all credentials failed, backing off before next round"
            );
            metrics::record_backoff(delay);

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(round, "dispatch cancelled during backoff");
                    return Err(finish(Error::Cancelled));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            global_attempts += 1;
        }
    }
}

impl<H, R> fmt::Debug for Dispatcher<H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool.len())
            .field("policy", &self.policy)
            .finish()
    }
}

fn finish<E>(err: Error<E>) -> Error<E> {
    metrics::record_result(err.label());
    err
}

/// Cut `message` to at most `limit` characters on a char boundary.
fn truncate(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}

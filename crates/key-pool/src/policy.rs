//! Round budget and backoff schedule

use std::time::Duration;

use crate::random::RandomSource;

/// Extra rounds allowed after the first one.
pub const MAX_GLOBAL_ROUNDS: u32 = 2;

/// Wait after the first failed round; doubles every round.
pub const BASE_DELAY: Duration = Duration::from_millis(2000);

/// Upper bound (exclusive) of the jitter added to each wait.
pub const MAX_JITTER: Duration = Duration::from_millis(1000);

/// Longest server retry hint honoured before a new round.
pub const MAX_HINT_DELAY: Duration = Duration::from_secs(60);

/// How many rounds a dispatch may run and how long it waits between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_global_rounds: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
    /// Cap on server retry hints. The computed schedule is not capped.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_global_rounds: MAX_GLOBAL_ROUNDS,
            base_delay: BASE_DELAY,
            max_jitter: MAX_JITTER,
            max_delay: MAX_HINT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Rounds including the first.
    pub fn total_rounds(&self) -> u32 {
        self.max_global_rounds.saturating_add(1)
    }

    /// `base_delay * 2^round`, saturating.
    pub fn backoff(&self, round: u32) -> Duration {
        let factor = 1u32.checked_shl(round).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn delay_for(&self, round: u32, jitter: Duration) -> Duration {
        self.backoff(round).saturating_add(jitter)
    }

    /// Wait before the round after `round`: the computed delay, raised to
    /// the server hint clamped at `max_delay`.
    pub fn wait_for(&self, round: u32, jitter: Duration, hint: Option<Duration>) -> Duration {
        let delay = self.delay_for(round, jitter);
        match hint {
            Some(hint) => delay.max(hint.min(self.max_delay)),
            None => delay,
        }
    }

    /// Uniform jitter in `[0, max_jitter)` at millisecond resolution.
    pub fn draw_jitter(&self, random: &dyn RandomSource) -> Duration {
        let bound = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(random.below(bound))
    }
}

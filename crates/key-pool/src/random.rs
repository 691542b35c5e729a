//! Random source for start offsets and jitter
//!
//! Production draws from `rand`'s thread-local RNG. Tests inject a fixed or
//! scripted source to pin the starting credential and the jitter.

use rand::RngExt;

/// Uniform draws used by the dispatcher.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&self, bound: u64) -> u64;
}

/// Thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        rand::rng().random_range(0..bound)
    }
}

/// Always yields the same value, reduced modulo the bound.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub u64);

impl RandomSource for FixedRandom {
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 { 0 } else { self.0 % bound }
    }
}

impl<R: RandomSource + ?Sized> RandomSource for std::sync::Arc<R> {
    fn below(&self, bound: u64) -> u64 {
        (**self).below(bound)
    }
}

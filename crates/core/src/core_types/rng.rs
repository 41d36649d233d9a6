//! Deterministic simulation RNG
//!
//! Wraps `ChaCha8Rng` so identical seeds produce identical runs on every platform.
//! Every stochastic function in the crate takes `&mut SimRng`; nothing reaches for a
//! thread-local generator.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded random source threaded through domain building and propagation.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl SimRng {
    /// Create a generator from a `u64` seed
    pub fn from_seed_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a generator from OS entropy, remembering the drawn seed so the run
    /// can be replayed later.
    pub fn from_entropy() -> Self {
        Self::from_seed_u64(rand::random::<u64>())
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[0, 1)`
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Uniform draw in `[low, high]`; returns `low` for a degenerate range
    #[inline]
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.inner.random_range(low..=high)
    }

    /// Uniform integer in `[low, high]` inclusive
    #[inline]
    pub fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        self.inner.random_range(low..=high)
    }

    /// Uniform index in `[0, len)`; `None` when `len == 0`
    #[inline]
    pub fn index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.inner.random_range(0..len))
    }

    /// Bernoulli trial that succeeds with probability `p`
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// `+1` or `-1` with equal probability
    #[inline]
    pub fn sign(&mut self) -> i64 {
        if self.inner.random::<bool>() {
            1
        } else {
            -1
        }
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }
}

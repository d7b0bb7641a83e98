//! Virtual-time environment.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trafficlink_core::Environment;

/// Environment whose clock only moves when something sleeps or waits.
///
/// Clones share the same clock and RNG, so a device and the engine driving
/// it always agree on the current instant.
#[derive(Clone)]
pub struct SimEnv {
    base: Instant,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    elapsed: Duration,
    rng: ChaCha8Rng,
}

impl SimEnv {
    /// Environment seeded with zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a seeded RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            base: Instant::now(),
            inner: Arc::new(Mutex::new(Inner {
                elapsed: Duration::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Virtual time since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    /// Move the clock to `instant` if it lies in the future.
    pub fn advance_to(&self, instant: Instant) {
        let target = instant.saturating_duration_since(self.base);
        let mut inner = self.lock();
        if target > inner.elapsed {
            inner.elapsed = target;
        }
    }

    /// Uniform integer in `0..=max`.
    pub fn random_up_to(&self, max: usize) -> usize {
        self.lock().rng.gen_range(0..=max)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        self.base + self.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

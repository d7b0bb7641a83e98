//! Environment abstraction.
//!
//! The exchange engine never reads the system clock or sleeps directly. Every
//! wait it performs is expressed as a call on [`Environment`], so a simulated
//! environment can advance virtual time instantly and make timing-dependent
//! behaviour (handshake windows, quiet gaps, overall timeouts) deterministic.

use std::time::{Duration, Instant};

/// Source of time for the exchange engine.
pub trait Environment {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block the calling exchange for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<E: Environment + ?Sized> Environment for &E {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Wall-clock environment used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Time left until `deadline`, or `None` once it has passed.
pub fn remaining<E: Environment + ?Sized>(env: &E, deadline: Instant) -> Option<Duration> {
    deadline.checked_duration_since(env.now()).filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_sleep_advances_time() {
        let env = SystemEnv;
        let t0 = env.now();
        env.sleep(Duration::from_millis(2));
        assert!(env.now() >= t0 + Duration::from_millis(2));
    }

    #[test]
    fn remaining_is_none_after_deadline() {
        let env = SystemEnv;
        let past = env.now();
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(remaining(&env, past), None);
        assert!(remaining(&env, env.now() + Duration::from_secs(5)).is_some());
    }
}

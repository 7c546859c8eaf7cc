//! Reconnect Backoff
//!
//! Exponential backoff with jitter for the session reconnect loop. The
//! delay is a pure function of the failure streak, so the policy only
//! tracks how many consecutive attempts have failed.

use std::time::Duration;

use rand::Rng;

/// Backoff parameters for the reconnect loop.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling applied after exponential growth.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub growth: f64,
    /// Randomization fraction applied to each delay (0.1 = up to ±10%).
    pub jitter: f64,
    /// Consecutive failures tolerated before giving up; 0 is unlimited.
    pub attempt_cap: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            growth: 2.0,
            jitter: 0.1,
            attempt_cap: 0,
        }
    }
}

/// Tracks the current failure streak and yields the next retry delay.
///
/// # Example
///
/// ```rust
/// use bitfinex_stream_client::infrastructure::bitfinex::reconnect::{BackoffConfig, BackoffPolicy};
///
/// let mut policy = BackoffPolicy::new(BackoffConfig::default());
/// assert!(policy.next_delay().is_some());
/// policy.reset(); // call after a successful connect
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    failures: u32,
}

impl BackoffPolicy {
    /// Policy with no recorded failures.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return the delay to wait before retrying.
    ///
    /// Returns `None` once the attempt cap is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.attempt_cap > 0 && self.failures >= self.config.attempt_cap {
            return None;
        }

        let exponent = i32::try_from(self.failures).unwrap_or(i32::MAX);
        self.failures += 1;

        #[allow(clippy::cast_precision_loss)]
        let base = self.config.base_delay.as_millis() as f64;
        #[allow(clippy::cast_precision_loss)]
        let ceiling = self.config.max_delay.as_millis() as f64;

        let scaled = (base * self.config.growth.powi(exponent)).min(ceiling);
        Some(jittered(scaled, self.config.jitter))
    }

    /// Clear the failure streak after a successful connect.
    pub const fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures recorded since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether another retry is still allowed.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.config.attempt_cap > 0 && self.failures >= self.config.attempt_cap
    }
}

fn jittered(millis: f64, jitter: f64) -> Duration {
    let adjusted = if jitter > 0.0 {
        let spread = millis * jitter;
        let offset: f64 = rand::rng().random_range(-spread..=spread);
        (millis + offset).max(1.0)
    } else {
        millis.max(0.0)
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Duration::from_millis(adjusted as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(cap: u32) -> BackoffConfig {
        BackoffConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            growth: 2.0,
            jitter: 0.0,
            attempt_cap: cap,
        }
    }

    #[test]
    fn delays_double_per_failure() {
        let mut policy = BackoffPolicy::new(no_jitter(0));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(400)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let mut policy = BackoffPolicy::new(no_jitter(0));
        for _ in 0..10 {
            let _ = policy.next_delay();
        }
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn attempt_cap_exhausts_the_policy() {
        let mut policy = BackoffPolicy::new(no_jitter(2));
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_none());
        assert!(policy.exhausted());
    }

    #[test]
    fn reset_restores_the_base_delay() {
        let mut policy = BackoffPolicy::new(no_jitter(3));
        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.failures(), 2);

        policy.reset();
        assert_eq!(policy.failures(), 0);
        assert!(!policy.exhausted());
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn jitter_stays_within_its_fraction() {
        for _ in 0..100 {
            let mut policy = BackoffPolicy::new(BackoffConfig {
                base_delay: Duration::from_millis(1000),
                jitter: 0.1,
                ..BackoffConfig::default()
            });
            let millis = policy.next_delay().unwrap().as_millis();
            assert!((900..=1100).contains(&millis), "delay {millis}ms out of range");
        }
    }

    #[test]
    fn zero_cap_never_exhausts() {
        let mut policy = BackoffPolicy::new(no_jitter(0));
        for _ in 0..500 {
            assert!(policy.next_delay().is_some());
        }
        assert!(!policy.exhausted());
    }
}

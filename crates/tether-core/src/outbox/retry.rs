//! Retry policy: backoff delays and the attempt ceiling.

use std::time::Duration;

/// Retry policy for failed deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base delay, doubled per attempt already made.
    pub base_delay: Duration,

    /// Upper bound for a single wait.
    pub max_delay: Duration,

    /// Attempts after which a job is quarantined even if the failure was transient.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_attempts: 8,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the next attempt of a job.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (0 for a fresh job).
    ///
    /// delay = min(base_delay * 2^attempts, max_delay), and no wait at all for
    /// a fresh job. With the default policy:
    /// - attempts 0: 0s
    /// - attempts 1: 2s
    /// - attempts 2: 4s
    /// - attempts 3: 8s
    /// - attempts 4+: 10s
    pub fn backoff(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Has the job used up its automatic attempts?
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

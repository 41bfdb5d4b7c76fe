//! Reconnect delay computation.
//!
//! Delays double from a base and are capped by a ceiling. The computation is
//! a pure function of the attempt number so it can be tested without timers.

use crate::error::RealtimeError;
use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_DELAY_CEILING: Duration = Duration::from_millis(10_000);

/// Base delay and ceiling for exponential reconnect backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            ceiling: DEFAULT_DELAY_CEILING,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, ceiling: Duration) -> Result<Self, RealtimeError> {
        let policy = Self { base, ceiling };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), RealtimeError> {
        if self.base.is_zero() {
            return Err(RealtimeError::Config(
                "Reconnect base delay must be > 0".to_string(),
            ));
        }
        if self.ceiling < self.base {
            return Err(RealtimeError::Config(
                "Reconnect delay ceiling must be >= base delay".to_string(),
            ));
        }
        Ok(())
    }

    /// `min(base * 2^attempt, ceiling)`. Attempt 1 is the first retry.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.ceiling, |delay| delay.min(self.ceiling))
    }
}

/// Delay before retry `attempt` under the default 1s base / 10s ceiling.
pub fn next_delay(attempt: u32) -> Duration {
    BackoffPolicy::default().next_delay(attempt)
}

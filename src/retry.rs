//! Retry policy for transport-level failures.
//!
//! Failed attempts are retried with exponential backoff up to a fixed number
//! of attempts, and the whole call (all attempts and pauses) can be bounded by
//! a time budget.

use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    budget: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            budget: Some(DEFAULT_BUDGET),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts (initial try + retries), never less than one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// `None` lifts the time limit; attempts are still capped.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Pause before retry number `retry_number` (1 for the first retry).
    pub fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = RetryPolicy::default()
            .with_base_backoff(Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(500));

        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(500));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.budget(), Some(DEFAULT_BUDGET));
        assert_eq!(policy.with_budget(None).budget(), None);
    }
}

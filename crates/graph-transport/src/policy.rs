//! Retry/backoff policy.

use std::time::Duration;

use crate::error::FailureKind;

/// Bounded exponential backoff applied to transient failures.
///
/// The policy is an immutable value: the transport is constructed with a
/// default policy, and a call may override it through
/// [`CallOptions`](crate::CallOptions).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor between consecutive retries
    pub multiplier: f64,
    /// Upper bound for any single wait, including server-supplied hints
    pub max_delay: Duration,
    /// Use the `Retry-After` header instead of the computed delay when present
    pub honor_retry_after: bool,
    /// Failure classes that are retried. `PermanentClientError` is never retried.
    pub retry_on: Vec<FailureKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            honor_retry_after: true,
            retry_on: vec![
                FailureKind::Locked,
                FailureKind::Throttled,
                FailureKind::TransientServerFault,
                FailureKind::NetworkFault,
            ],
        }
    }
}

impl RetryPolicy {
    /// A policy that issues every request exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether a failure of this class is retried at all.
    pub fn should_retry(&self, kind: FailureKind) -> bool {
        kind.is_transient() && self.retry_on.contains(&kind)
    }

    /// Computed delay before retry number `retry` (1 = the second attempt):
    /// `base_delay * multiplier^(retry - 1)`, capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs < 0.0 || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Delay before retry number `retry`, preferring a server hint when allowed.
    pub fn delay_before_retry(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) if self.honor_retry_after => hint.min(self.max_delay),
            _ => self.backoff(retry),
        }
    }

    /// Worst-case total wait across all retries, ignoring request time.
    pub fn max_total_wait(&self) -> Duration {
        (1..self.attempts()).map(|retry| self.backoff(retry)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::default().with_max_delay(Duration::from_secs(10));
        assert_eq!(
            policy.delay_before_retry(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.delay_before_retry(1, Some(Duration::from_secs(120))),
            Duration::from_secs(10)
        );

        let ignoring = RetryPolicy {
            honor_retry_after: false,
            ..RetryPolicy::default()
        };
        assert_eq!(
            ignoring.delay_before_retry(1, Some(Duration::from_secs(3))),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(FailureKind::Locked));
        assert!(policy.should_retry(FailureKind::NetworkFault));
        assert!(!policy.should_retry(FailureKind::PermanentClientError));

        let locked_only = RetryPolicy {
            retry_on: vec![FailureKind::Locked],
            ..RetryPolicy::default()
        };
        assert!(!locked_only.should_retry(FailureKind::Throttled));
    }

    #[test]
    fn test_max_total_wait() {
        let policy = RetryPolicy::default().with_max_attempts(4);
        assert_eq!(policy.max_total_wait(), Duration::from_millis(3500));
        assert_eq!(RetryPolicy::no_retry().max_total_wait(), Duration::ZERO);
    }
}

//! Linear backoff for transient failures.

use std::time::Duration;

use crate::config::RetryConfig;

/// How the interceptor chain treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 2xx.
    Success,
    /// 401.
    Unauthorized,
    /// 5xx; retried.
    Retryable,
    /// Any other status; never retried.
    Rejected,
}

impl Disposition {
    #[must_use]
    pub const fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            401 => Self::Unauthorized,
            500..=599 => Self::Retryable,
            _ => Self::Rejected,
        }
    }
}

/// Retry policy: at most `max_retries` resubmissions, retry `n` waiting
/// `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the given retry (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    /// The retry to schedule after `attempt` failed, if any remain.
    #[must_use]
    pub const fn next_retry(&self, attempt: Attempt) -> Option<Attempt> {
        if attempt.retries < self.max_retries {
            Some(Attempt {
                retries: attempt.retries + 1,
            })
        } else {
            None
        }
    }
}

/// Position of a submission within its retry sequence.
///
/// A value type: each retry gets a fresh `Attempt`, so concurrent requests
/// never share a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt {
    retries: u32,
}

impl Attempt {
    /// The initial submission.
    pub const FIRST: Self = Self { retries: 0 };

    /// Retries performed before this submission.
    #[must_use]
    pub const fn retries(self) -> u32 {
        self.retries
    }

    /// Total submissions including this one.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.retries + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition() {
        assert_eq!(Disposition::of(200), Disposition::Success);
        assert_eq!(Disposition::of(204), Disposition::Success);
        assert_eq!(Disposition::of(401), Disposition::Unauthorized);
        assert_eq!(Disposition::of(403), Disposition::Rejected);
        assert_eq!(Disposition::of(404), Disposition::Rejected);
        assert_eq!(Disposition::of(500), Disposition::Retryable);
        assert_eq!(Disposition::of(503), Disposition::Retryable);
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=3).map(|n| policy.delay_for(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(3000)
            ]
        );
    }

    #[test]
    fn test_retry_bound() {
        let policy = RetryPolicy::default();
        let mut attempt = Attempt::FIRST;
        let mut retries = 0;
        while let Some(next) = policy.next_retry(attempt) {
            attempt = next;
            retries += 1;
        }
        assert_eq!(retries, 3);
        assert_eq!(attempt.number(), 4);
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy::from(RetryConfig {
            max_retries: 0,
            base_delay: Duration::from_millis(10),
        });
        assert!(policy.next_retry(Attempt::FIRST).is_none());
    }
}

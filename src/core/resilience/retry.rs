use crate::core::errors::{ExchangeError, FailureKind};
use std::collections::BTreeSet;
use std::time::Duration;

/// Exponential backoff: the wait before attempt `n + 1` is
/// `initial * multiplier^(n - 1)`, capped at `max_interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl ExponentialBackoff {
    pub const fn new(initial: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            multiplier,
            max_interval: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Wait after the given failed attempt (1-based).
    pub fn interval(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = nanos.min(self.max_interval.as_nanos() as f64).max(0.0);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Endless sequence of waits, one per failed attempt.
    pub fn iter(&self) -> BackoffIter {
        BackoffIter {
            backoff: self.clone(),
            attempt: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffIter {
    backoff: ExponentialBackoff,
    attempt: u32,
}

impl Iterator for BackoffIter {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        Some(self.backoff.interval(self.attempt))
    }
}

/// Retry configuration as registered in a [`PolicyRegistry`](super::PolicyRegistry).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total invocations, including the first one
    pub max_attempts: u32,
    pub backoff: ExponentialBackoff,
    /// Failure kinds (and their refinements) that trigger another attempt
    pub retry_on: BTreeSet<FailureKind>,
}

impl RetryConfig {
    pub fn new(
        max_attempts: u32,
        backoff: ExponentialBackoff,
        retry_on: impl IntoIterator<Item = FailureKind>,
    ) -> Self {
        Self {
            max_attempts,
            backoff,
            retry_on: retry_on.into_iter().collect(),
        }
    }

    /// Safe for idempotent calls: any transport failure or transient 5xx.
    pub fn idempotent() -> Self {
        Self::new(
            3,
            ExponentialBackoff::new(Duration::from_millis(50), 4.0),
            [
                FailureKind::Io,
                FailureKind::ServiceUnavailable,
                FailureKind::InternalServerError,
                FailureKind::Timeout,
            ],
        )
    }

    /// For calls that must not execute twice (order placement, cancellation).
    ///
    /// Only failures that prove the request never reached the exchange are
    /// retried; internal server errors and generic I/O failures are ambiguous.
    pub fn non_idempotent() -> Self {
        Self::new(
            3,
            ExponentialBackoff::new(Duration::from_millis(50), 4.0),
            [
                FailureKind::UnknownHost,
                FailureKind::Socket,
                FailureKind::ServiceUnavailable,
            ],
        )
    }

    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.max_attempts == 0 {
            return Err(ExchangeError::ConfigurationError(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff.initial.is_zero() {
            return Err(ExchangeError::ConfigurationError(
                "retry backoff must start above zero".to_string(),
            ));
        }
        if !self.backoff.multiplier.is_finite() || self.backoff.multiplier < 1.0 {
            return Err(ExchangeError::ConfigurationError(format!(
                "retry backoff multiplier must be >= 1.0, got {}",
                self.backoff.multiplier
            )));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::idempotent()
    }
}

/// Named, immutable retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    name: String,
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(name: impl Into<String>, config: RetryConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.config.backoff
    }

    pub fn is_retryable(&self, error: &ExchangeError) -> bool {
        let kind = error.kind();
        self.config
            .retry_on
            .iter()
            .any(|retryable| kind.is_a(*retryable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let backoff = RetryConfig::idempotent().backoff;
        let waits: Vec<u128> = backoff.iter().take(3).map(|d| d.as_millis()).collect();
        assert_eq!(waits, vec![50, 200, 800]);
    }

    #[test]
    fn test_backoff_is_capped() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(50), 4.0)
            .with_max_interval(Duration::from_millis(500));
        assert_eq!(backoff.interval(3), Duration::from_millis(500));
        assert_eq!(backoff.interval(40), Duration::from_millis(500));
    }

    #[test]
    fn test_idempotent_policy_covers_io_refinements() {
        let policy = RetryPolicy::new("default", RetryConfig::idempotent());
        assert!(policy.is_retryable(&ExchangeError::network(FailureKind::Io, "reset")));
        assert!(policy.is_retryable(&ExchangeError::network(FailureKind::UnknownHost, "dns")));
        assert!(policy.is_retryable(&ExchangeError::network(FailureKind::Timeout, "slow")));
        assert!(policy.is_retryable(&ExchangeError::from_status(500, "oops")));
        assert!(policy.is_retryable(&ExchangeError::from_status(503, "down")));
        assert!(!policy.is_retryable(&ExchangeError::from_status(400, "bad")));
        assert!(!policy.is_retryable(&ExchangeError::AuthError("nope".to_string())));
    }

    #[test]
    fn test_non_idempotent_policy_is_narrow() {
        let policy = RetryPolicy::new("nonIdempotentCallsBase", RetryConfig::non_idempotent());
        assert!(policy.is_retryable(&ExchangeError::network(FailureKind::UnknownHost, "dns")));
        assert!(policy.is_retryable(&ExchangeError::network(FailureKind::Socket, "refused")));
        assert!(policy.is_retryable(&ExchangeError::from_status(503, "down")));
        assert!(!policy.is_retryable(&ExchangeError::from_status(500, "oops")));
        assert!(!policy.is_retryable(&ExchangeError::network(FailureKind::Io, "reset")));
        assert!(!policy.is_retryable(&ExchangeError::network(FailureKind::Timeout, "slow")));
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::idempotent().validate().is_ok());
        let mut config = RetryConfig::idempotent();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
        let mut config = RetryConfig::idempotent();
        config.backoff.multiplier = 0.5;
        assert!(config.validate().is_err());
    }
}

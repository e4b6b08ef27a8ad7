//! Sliding-window rate limiter.
//!
//! Every granted permit is recorded with its grant instant. A request is
//! admitted only while fewer than `limit_for_period` grants fall inside the
//! trailing `limit_refresh_period`, so no window of that length ever holds
//! more grants than the limit, whatever the number of concurrent callers.

use crate::core::errors::ExchangeError;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Permits granted per refresh period
    pub limit_for_period: u32,
    pub limit_refresh_period: Duration,
    /// Longest a caller may wait for a permit before failing
    pub timeout_duration: Duration,
}

impl RateLimiterConfig {
    pub const fn new(limit_for_period: u32, limit_refresh_period: Duration) -> Self {
        Self {
            limit_for_period,
            limit_refresh_period,
            timeout_duration: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_duration: Duration) -> Self {
        self.timeout_duration = timeout_duration;
        self
    }

    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.limit_for_period == 0 {
            return Err(ExchangeError::ConfigurationError(
                "rate limiter limit_for_period must be at least 1".to_string(),
            ));
        }
        if self.limit_refresh_period.is_zero() {
            return Err(ExchangeError::ConfigurationError(
                "rate limiter refresh period must be above zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(1200, Duration::from_secs(60)).with_timeout(Duration::from_secs(30))
    }
}

pub struct RateLimiter {
    name: String,
    config: RateLimiterConfig,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let capacity = config.limit_for_period.min(4096) as usize;
        Self {
            name: name.into(),
            config,
            grants: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Acquire `permits`, waiting up to the configured timeout.
    ///
    /// Fails with [`ExchangeError::RateLimitExceeded`] without waiting when the
    /// projected wait is longer than the timeout.
    pub async fn acquire(&self, permits: u32) -> Result<(), ExchangeError> {
        if permits > self.config.limit_for_period {
            return Err(self.exceeded());
        }

        let give_up_at = Instant::now() + self.config.timeout_duration;
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                self.prune(&mut grants, now);
                match self.wait_for(&grants, permits, now) {
                    None => {
                        grants.extend(std::iter::repeat(now).take(permits as usize));
                        debug!(
                            limiter = %self.name,
                            permits,
                            in_window = grants.len(),
                            "Rate limiter permit granted"
                        );
                        return Ok(());
                    }
                    Some(wait) => wait,
                }
            };

            if Instant::now() + wait > give_up_at {
                warn!(
                    limiter = %self.name,
                    permits,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limiter wait would exceed timeout"
                );
                return Err(self.exceeded());
            }
            sleep(wait).await;
        }
    }

    /// Acquire `permits` only if they are available right now.
    pub async fn try_acquire(&self, permits: u32) -> bool {
        if permits > self.config.limit_for_period {
            return false;
        }
        let mut grants = self.grants.lock().await;
        let now = Instant::now();
        self.prune(&mut grants, now);
        if self.wait_for(&grants, permits, now).is_some() {
            return false;
        }
        grants.extend(std::iter::repeat(now).take(permits as usize));
        true
    }

    /// Permits that could be granted right now.
    pub async fn available_permits(&self) -> u32 {
        let mut grants = self.grants.lock().await;
        self.prune(&mut grants, Instant::now());
        self.config
            .limit_for_period
            .saturating_sub(grants.len() as u32)
    }

    fn prune(&self, grants: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = grants.front() {
            if *oldest + self.config.limit_refresh_period <= now {
                grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// `None` when `permits` fit in the current window, otherwise how long
    /// until enough grants fall out of it.
    fn wait_for(&self, grants: &VecDeque<Instant>, permits: u32, now: Instant) -> Option<Duration> {
        let free = (self.config.limit_for_period as usize).saturating_sub(grants.len());
        if permits as usize <= free {
            return None;
        }
        let must_expire = permits as usize - free;
        let release_at = grants[must_expire - 1] + self.config.limit_refresh_period;
        Some(release_at.saturating_duration_since(now))
    }

    fn exceeded(&self) -> ExchangeError {
        ExchangeError::RateLimitExceeded {
            limiter: self.name.clone(),
            max_wait: self.config.timeout_duration,
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

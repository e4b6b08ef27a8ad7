//! Retry, rate limiting and the decorator that applies them to exchange calls.

pub mod decorator;
pub mod rate_limiter;
pub mod registry;
pub mod retry;

use serde::{Deserialize, Serialize};

pub use decorator::{Decoration, DecorationPlan, Decorator};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use registry::{PolicyRegistry, DEFAULT, NON_IDEMPOTENT_CALLS_BASE};
pub use retry::{BackoffIter, ExponentialBackoff, RetryConfig, RetryPolicy};

/// Per-client switches deciding whether fetched policies are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSpec {
    pub retry_enabled: bool,
    pub rate_limiter_enabled: bool,
}

impl ResilienceSpec {
    /// Both switches off, for deterministic tests.
    pub const fn disabled() -> Self {
        Self {
            retry_enabled: false,
            rate_limiter_enabled: false,
        }
    }
}

impl Default for ResilienceSpec {
    fn default() -> Self {
        Self {
            retry_enabled: true,
            rate_limiter_enabled: true,
        }
    }
}

use super::rate_limiter::{RateLimiter, RateLimiterConfig};
use super::retry::{RetryConfig, RetryPolicy};
use crate::core::errors::ExchangeError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Name of the default retry and rate-limiter configurations.
pub const DEFAULT: &str = "default";
/// Name of the narrow retry configuration used for non-idempotent calls.
pub const NON_IDEMPOTENT_CALLS_BASE: &str = "nonIdempotentCallsBase";

/// Named retry and rate-limiter policies for one exchange client family.
///
/// Configurations are registered up front; policies are created from them on
/// first lookup and cached, so every lookup of a name returns the same
/// instance. Two callers using the same rate-limiter name therefore share one
/// permit budget.
///
/// The registry is an ordinary value: build one per exchange and hand it to
/// the services that need it.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    retry_configs: RwLock<HashMap<String, RetryConfig>>,
    rate_limiter_configs: RwLock<HashMap<String, RateLimiterConfig>>,
    retries: RwLock<HashMap<String, Arc<RetryPolicy>>>,
    rate_limiters: RwLock<HashMap<String, Arc<RateLimiter>>>,
}

impl PolicyRegistry {
    /// Registry holding the default retry, non-idempotent retry and default
    /// rate-limiter configurations.
    pub fn new_default() -> Self {
        let registry = Self::default();
        {
            let mut retry_configs = registry
                .retry_configs
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            retry_configs.insert(DEFAULT.to_string(), RetryConfig::idempotent());
            retry_configs.insert(
                NON_IDEMPOTENT_CALLS_BASE.to_string(),
                RetryConfig::non_idempotent(),
            );
        }
        registry
            .rate_limiter_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(DEFAULT.to_string(), RateLimiterConfig::default());
        registry
    }

    /// Register (or replace) a named retry configuration.
    ///
    /// Fails once a policy with this name has been handed out, since callers
    /// already hold it.
    pub fn register_retry_policy(
        &self,
        name: impl Into<String>,
        config: RetryConfig,
    ) -> Result<(), ExchangeError> {
        let name = name.into();
        config.validate()?;
        if self.read_retries().contains_key(&name) {
            return Err(ExchangeError::ConfigurationError(format!(
                "retry policy '{}' is already in use",
                name
            )));
        }
        debug!(policy = %name, max_attempts = config.max_attempts, "Registered retry configuration");
        self.retry_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, config);
        Ok(())
    }

    /// Register (or replace) a named rate-limiter configuration.
    pub fn register_rate_limiter(
        &self,
        name: impl Into<String>,
        config: RateLimiterConfig,
    ) -> Result<(), ExchangeError> {
        let name = name.into();
        config.validate()?;
        if self.read_rate_limiters().contains_key(&name) {
            return Err(ExchangeError::ConfigurationError(format!(
                "rate limiter '{}' is already in use",
                name
            )));
        }
        debug!(
            limiter = %name,
            limit = config.limit_for_period,
            period_ms = config.limit_refresh_period.as_millis() as u64,
            "Registered rate limiter configuration"
        );
        self.rate_limiter_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, config);
        Ok(())
    }

    pub fn retry(&self, name: &str) -> Arc<RetryPolicy> {
        self.retry_with_config(name, name)
    }

    /// Policy `name`, created on first access from configuration `config_name`
    /// (or the default configuration when that is not registered).
    pub fn retry_with_config(&self, name: &str, config_name: &str) -> Arc<RetryPolicy> {
        if let Some(policy) = self.read_retries().get(name) {
            return policy.clone();
        }

        let config = {
            let configs = self
                .retry_configs
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            configs
                .get(config_name)
                .or_else(|| configs.get(DEFAULT))
                .cloned()
                .unwrap_or_default()
        };

        let mut retries = self.retries.write().unwrap_or_else(PoisonError::into_inner);
        retries
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(policy = %name, config = %config_name, "Created retry policy");
                Arc::new(RetryPolicy::new(name, config))
            })
            .clone()
    }

    pub fn rate_limiter(&self, name: &str) -> Arc<RateLimiter> {
        self.rate_limiter_with_config(name, name)
    }

    /// Limiter `name`, created on first access from configuration `config_name`
    /// (or the default configuration when that is not registered).
    pub fn rate_limiter_with_config(&self, name: &str, config_name: &str) -> Arc<RateLimiter> {
        if let Some(limiter) = self.read_rate_limiters().get(name) {
            return limiter.clone();
        }

        let config = {
            let configs = self
                .rate_limiter_configs
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            configs
                .get(config_name)
                .or_else(|| configs.get(DEFAULT))
                .cloned()
                .unwrap_or_default()
        };

        let mut limiters = self
            .rate_limiters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        limiters
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(limiter = %name, config = %config_name, "Created rate limiter");
                Arc::new(RateLimiter::new(name, config))
            })
            .clone()
    }

    fn read_retries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<RetryPolicy>>> {
        self.retries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_rate_limiters(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<RateLimiter>>> {
        self.rate_limiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

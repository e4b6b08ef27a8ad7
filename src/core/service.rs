use crate::core::config::ExchangeConfig;
use crate::core::resilience::{
    Decorator, PolicyRegistry, RateLimiter, ResilienceSpec, RetryPolicy,
};
use std::sync::Arc;

/// Glue shared by every exchange service: policy lookups against the
/// exchange's registry, and decoration of calls with this client's
/// [`ResilienceSpec`].
///
/// Exchange code decides per endpoint which policy names to use; order
/// placement and cancellation go through
/// [`NON_IDEMPOTENT_CALLS_BASE`](crate::core::resilience::NON_IDEMPOTENT_CALLS_BASE),
/// market data through [`DEFAULT`](crate::core::resilience::DEFAULT).
#[derive(Debug, Clone)]
pub struct BaseExchangeService {
    exchange_name: String,
    resilience: ResilienceSpec,
    registry: Arc<PolicyRegistry>,
}

impl BaseExchangeService {
    pub fn new(config: &ExchangeConfig, registry: Arc<PolicyRegistry>) -> Self {
        Self {
            exchange_name: config.exchange_name.clone(),
            resilience: config.resilience,
            registry,
        }
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn resilience(&self) -> ResilienceSpec {
        self.resilience
    }

    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    pub fn retry(&self, name: &str) -> Arc<RetryPolicy> {
        self.registry.retry(name)
    }

    pub fn retry_with_config(&self, name: &str, shared_config_name: &str) -> Arc<RetryPolicy> {
        self.registry.retry_with_config(name, shared_config_name)
    }

    pub fn rate_limiter(&self, name: &str) -> Arc<RateLimiter> {
        self.registry.rate_limiter(name)
    }

    pub fn rate_limiter_with_config(
        &self,
        name: &str,
        shared_config_name: &str,
    ) -> Arc<RateLimiter> {
        self.registry
            .rate_limiter_with_config(name, shared_config_name)
    }

    /// Start decorating `work` under this client's resilience switches.
    pub fn decorate<W>(&self, work: W) -> Decorator<W> {
        Decorator::decorate(self.resilience, work)
    }
}

use crate::core::errors::ExchangeError;
use crate::core::resilience::{PolicyRegistry, RateLimiterConfig};
use std::time::Duration;

/// Account-level call counter shared by every Kraken call.
pub const KRAKEN: &str = "kraken";
pub const ADD_ORDER: &str = "krakenAddOrder";
pub const CANCEL_ORDER: &str = "krakenCancelOrder";

/// Registry for Kraken clients, with the tighter account quota registered.
pub fn create_registry() -> Result<PolicyRegistry, ExchangeError> {
    let registry = PolicyRegistry::new_default();
    registry.register_rate_limiter(
        KRAKEN,
        RateLimiterConfig::new(90, Duration::from_secs(60)).with_timeout(Duration::from_secs(30)),
    )?;
    Ok(registry)
}

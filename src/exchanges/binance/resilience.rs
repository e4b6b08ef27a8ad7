use crate::core::errors::ExchangeError;
use crate::core::resilience::{PolicyRegistry, RateLimiterConfig};
use std::time::Duration;

/// Account-level request-weight limiter shared by every Binance call.
pub const BINANCE: &str = "binance";
pub const PLACE_ORDER: &str = "binancePlaceOrder";
pub const CANCEL_ORDER: &str = "binanceCancelOrder";

/// Request weights from the Binance spot API documentation.
pub mod weights {
    pub const TICKER_24H: u32 = 2;
    pub const EXCHANGE_INFO: u32 = 20;
    pub const ACCOUNT: u32 = 20;
    pub const ORDER: u32 = 1;
}

/// Registry for Binance clients: the library defaults plus the weight limiter.
pub fn create_registry() -> Result<PolicyRegistry, ExchangeError> {
    let registry = PolicyRegistry::new_default();
    registry.register_rate_limiter(
        BINANCE,
        RateLimiterConfig::new(1200, Duration::from_secs(60))
            .with_timeout(Duration::from_secs(30)),
    )?;
    Ok(registry)
}

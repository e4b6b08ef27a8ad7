use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClientBuilder;
use crate::core::nonce::CurrentTimeNonceFactory;
use crate::core::resilience::PolicyRegistry;
use crate::exchanges::binance::{
    connector::BinanceConnector, resilience, rest::BinanceRestClient, signer::BinanceSigner,
};
use std::sync::Arc;

pub const EXCHANGE_NAME: &str = "binance";
pub const BASE_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";

/// Fill in the exchange name and, when no URI is configured, the public
/// endpoint for the selected network.
pub fn with_defaults(mut config: ExchangeConfig) -> ExchangeConfig {
    if config.exchange_name.is_empty() {
        config.exchange_name = EXCHANGE_NAME.to_string();
    }
    if config.preferred_uri().is_none() {
        let url = if config.testnet { TESTNET_URL } else { BASE_URL };
        config.ssl_uri = Some(url.to_string());
    }
    config
}

/// Create a Binance connector sharing an existing policy registry
pub fn build_connector(
    config: ExchangeConfig,
    registry: Arc<PolicyRegistry>,
) -> Result<BinanceConnector, ExchangeError> {
    let config = with_defaults(config);
    let mut rest_builder = RestClientBuilder::<BinanceRestClient>::for_interface(&config);

    if config.has_credentials() {
        let signer = Arc::new(BinanceSigner::new(
            config.api_key().to_string(),
            config.secret_key().to_string(),
        ));
        rest_builder =
            rest_builder.with_signer(signer, Arc::new(CurrentTimeNonceFactory::millis()));
    }

    let rest = rest_builder.build()?;
    Ok(BinanceConnector::new(rest, &config, registry))
}

/// Create a Binance connector with its own registry
pub fn build_default_connector(config: ExchangeConfig) -> Result<BinanceConnector, ExchangeError> {
    build_connector(config, Arc::new(resilience::create_registry()?))
}

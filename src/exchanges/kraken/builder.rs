use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClientBuilder;
use crate::core::nonce::{NonceFactory, TimeAnchoredNonceFactory};
use crate::core::resilience::PolicyRegistry;
use crate::exchanges::kraken::{
    connector::KrakenConnector, resilience, rest::KrakenRestClient, signer::KrakenSigner,
};
use std::sync::Arc;

pub const EXCHANGE_NAME: &str = "kraken";
pub const BASE_URL: &str = "https://api.kraken.com";

/// Kraken has no public spot sandbox, so a testnet config must name its own URI.
pub fn with_defaults(mut config: ExchangeConfig) -> Result<ExchangeConfig, ExchangeError> {
    if config.exchange_name.is_empty() {
        config.exchange_name = EXCHANGE_NAME.to_string();
    }
    if config.preferred_uri().is_none() {
        if config.testnet {
            return Err(ExchangeError::ConfigurationError(
                "Kraken has no default testnet endpoint; set a base URL".to_string(),
            ));
        }
        config.ssl_uri = Some(BASE_URL.to_string());
    }
    Ok(config)
}

/// Create a Kraken connector signing with a [`TimeAnchoredNonceFactory`].
///
/// That factory is seeded from the clock in 250 ms quanta, so a process that
/// issued many nonces in a burst and then restarts may seed below values it
/// already used; Kraken answers those with `EAPI:Invalid nonce`, which is not
/// retried. Use [`build_connector_with_nonce`] with a
/// `CurrentTimeNonceFactory` at microsecond granularity when that matters.
pub fn build_connector(
    config: ExchangeConfig,
    registry: Arc<PolicyRegistry>,
) -> Result<KrakenConnector, ExchangeError> {
    build_connector_with_nonce(config, registry, Arc::new(TimeAnchoredNonceFactory::new()))
}

/// Create a Kraken connector whose signed requests draw from `nonce_factory`.
pub fn build_connector_with_nonce(
    config: ExchangeConfig,
    registry: Arc<PolicyRegistry>,
    nonce_factory: Arc<dyn NonceFactory>,
) -> Result<KrakenConnector, ExchangeError> {
    let config = with_defaults(config)?;
    let mut rest_builder = RestClientBuilder::<KrakenRestClient>::for_interface(&config);

    if config.has_credentials() {
        let signer = Arc::new(KrakenSigner::new(
            config.api_key().to_string(),
            config.secret_key(),
        )?);
        rest_builder = rest_builder.with_signer(signer, nonce_factory);
    }

    let rest = rest_builder.build()?;
    Ok(KrakenConnector::new(rest, &config, registry))
}

pub fn build_default_connector(config: ExchangeConfig) -> Result<KrakenConnector, ExchangeError> {
    build_connector(config, Arc::new(resilience::create_registry()?))
}

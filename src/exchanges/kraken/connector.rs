use crate::core::{
    config::ExchangeConfig,
    errors::ExchangeError,
    kernel::{ReqwestRest, RestClient},
    resilience::{PolicyRegistry, DEFAULT, NON_IDEMPOTENT_CALLS_BASE},
    service::BaseExchangeService,
    traits::{AccountInfo, ExchangeConnector, MarketDataSource, OrderPlacer},
    types::{Balance, OrderRequest, OrderResponse, Symbol, Ticker},
};
use crate::exchanges::kraken::conversions;
use crate::exchanges::kraken::resilience::{ADD_ORDER, CANCEL_ORDER, KRAKEN};
use crate::exchanges::kraken::rest::KrakenRestClient;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct KrakenConnector<R: RestClient = ReqwestRest> {
    rest: KrakenRestClient<R>,
    service: BaseExchangeService,
}

impl<R: RestClient> KrakenConnector<R> {
    pub fn new(
        rest: KrakenRestClient<R>,
        config: &ExchangeConfig,
        registry: Arc<PolicyRegistry>,
    ) -> Self {
        Self {
            rest,
            service: BaseExchangeService::new(config, registry),
        }
    }

    pub fn service(&self) -> &BaseExchangeService {
        &self.service
    }

    pub fn rest(&self) -> &KrakenRestClient<R> {
        &self.rest
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for KrakenConnector<R> {
    #[instrument(skip(self), fields(exchange = "kraken", symbol = %symbol))]
    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, ExchangeError> {
        let pair = conversions::kraken_pair(symbol);
        let raw = self
            .service
            .decorate(|| self.rest.get_ticker(&pair))
            .with_retry(self.service.retry(DEFAULT))
            .with_rate_limiter(self.service.rate_limiter(KRAKEN))
            .call()
            .await?;
        conversions::convert_ticker(symbol.clone(), raw, Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for KrakenConnector<R> {
    #[instrument(skip(self, order), fields(exchange = "kraken", symbol = %order.symbol))]
    async fn place_order(&self, order: OrderRequest) -> Result<OrderResponse, ExchangeError> {
        order.validate()?;
        let params = conversions::order_params(&order)?;
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let raw = self
            .service
            .decorate(|| self.rest.add_order(&params))
            .with_retry(
                self.service
                    .retry_with_config(ADD_ORDER, NON_IDEMPOTENT_CALLS_BASE),
            )
            .with_rate_limiter(self.service.rate_limiter(KRAKEN))
            .call()
            .await?;

        info!(description = %raw.descr.order, "Order placed");
        conversions::convert_order_response(&order, raw, Utc::now().timestamp_millis())
    }

    #[instrument(skip(self), fields(exchange = "kraken", symbol = %symbol))]
    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> Result<(), ExchangeError> {
        let result = self
            .service
            .decorate(|| self.rest.cancel_order(order_id))
            .with_retry(
                self.service
                    .retry_with_config(CANCEL_ORDER, NON_IDEMPOTENT_CALLS_BASE),
            )
            .with_rate_limiter(self.service.rate_limiter(KRAKEN))
            .call()
            .await?;

        if result.count == 0 {
            warn!(order_id, "Cancel matched no open order");
            return Err(ExchangeError::InvalidParameters(format!(
                "No open order {} to cancel",
                order_id
            )));
        }
        info!(order_id, count = result.count, "Order cancelled");
        Ok(())
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for KrakenConnector<R> {
    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
        let raw = self
            .service
            .decorate(|| self.rest.get_balance())
            .with_retry(self.service.retry(DEFAULT))
            .with_rate_limiter(self.service.rate_limiter(KRAKEN))
            .call()
            .await?;
        conversions::convert_balances(raw)
    }
}

impl<R: RestClient> ExchangeConnector for KrakenConnector<R> {}

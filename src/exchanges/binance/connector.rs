use crate::core::{
    config::ExchangeConfig,
    errors::ExchangeError,
    kernel::{ReqwestRest, RestClient},
    resilience::{PolicyRegistry, DEFAULT, NON_IDEMPOTENT_CALLS_BASE},
    service::BaseExchangeService,
    traits::{AccountInfo, ExchangeConnector, MarketDataSource, OrderPlacer},
    types::{Balance, OrderRequest, OrderResponse, Symbol, Ticker},
};
use crate::exchanges::binance::conversions;
use crate::exchanges::binance::resilience::{weights, BINANCE, CANCEL_ORDER, PLACE_ORDER};
use crate::exchanges::binance::rest::BinanceRestClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Binance spot connector: every call goes through the shared "binance"
/// weight limiter, with order calls on the non-idempotent retry policy.
pub struct BinanceConnector<R: RestClient = ReqwestRest> {
    rest: BinanceRestClient<R>,
    service: BaseExchangeService,
}

impl<R: RestClient> BinanceConnector<R> {
    pub fn new(
        rest: BinanceRestClient<R>,
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

    pub fn rest(&self) -> &BinanceRestClient<R> {
        &self.rest
    }

    /// Symbols currently open for trading
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_symbols(&self) -> Result<Vec<Symbol>, ExchangeError> {
        let info = self
            .service
            .decorate(|| self.rest.get_exchange_info())
            .with_retry(self.service.retry(DEFAULT))
            .with_rate_limiter_permits(
                self.service.rate_limiter(BINANCE),
                weights::EXCHANGE_INFO,
            )
            .call()
            .await?;
        Ok(conversions::convert_symbols(info.symbols))
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for BinanceConnector<R> {
    #[instrument(skip(self), fields(exchange = "binance", symbol = %symbol))]
    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, ExchangeError> {
        let pair = symbol.concat();
        let raw = self
            .service
            .decorate(|| self.rest.get_ticker_24h(&pair))
            .with_retry(self.service.retry(DEFAULT))
            .with_rate_limiter_permits(self.service.rate_limiter(BINANCE), weights::TICKER_24H)
            .call()
            .await?;
        conversions::convert_ticker(symbol.clone(), raw)
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for BinanceConnector<R> {
    #[instrument(skip(self, order), fields(exchange = "binance", symbol = %order.symbol))]
    async fn place_order(&self, order: OrderRequest) -> Result<OrderResponse, ExchangeError> {
        order.validate()?;
        let params = conversions::order_params(&order);
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let raw = self
            .service
            .decorate(|| self.rest.place_order(&params))
            .with_retry(
                self.service
                    .retry_with_config(PLACE_ORDER, NON_IDEMPOTENT_CALLS_BASE),
            )
            .with_rate_limiter_permits(self.service.rate_limiter(BINANCE), weights::ORDER)
            .call()
            .await?;

        info!(order_id = raw.order_id, status = %raw.status, "Order placed");
        conversions::convert_order_response(&order, raw)
    }

    #[instrument(skip(self), fields(exchange = "binance", symbol = %symbol))]
    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> Result<(), ExchangeError> {
        let pair = symbol.concat();
        let raw = self
            .service
            .decorate(|| self.rest.cancel_order(&pair, order_id))
            .with_retry(
                self.service
                    .retry_with_config(CANCEL_ORDER, NON_IDEMPOTENT_CALLS_BASE),
            )
            .with_rate_limiter_permits(self.service.rate_limiter(BINANCE), weights::ORDER)
            .call()
            .await?;

        info!(order_id = raw.order_id, status = %raw.status, "Order cancelled");
        Ok(())
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for BinanceConnector<R> {
    #[instrument(skip(self), fields(exchange = "binance"))]
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
        let account = self
            .service
            .decorate(|| self.rest.get_account_info())
            .with_retry(self.service.retry(DEFAULT))
            .with_rate_limiter_permits(self.service.rate_limiter(BINANCE), weights::ACCOUNT)
            .call()
            .await?;
        conversions::convert_balances(account)
    }
}

impl<R: RestClient> ExchangeConnector for BinanceConnector<R> {}

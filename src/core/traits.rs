use crate::core::{
    errors::ExchangeError,
    types::{Balance, OrderRequest, OrderResponse, Symbol, Ticker},
};
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataSource {
    /// Best bid/ask and last trade for one symbol
    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker, ExchangeError>;
}

#[async_trait]
pub trait OrderPlacer {
    /// Place a new order. Implementations must not retry once the request
    /// may have reached the exchange.
    async fn place_order(&self, order: OrderRequest) -> Result<OrderResponse, ExchangeError>;

    /// Cancel an order by its exchange-assigned id
    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> Result<(), ExchangeError>;
}

#[async_trait]
pub trait AccountInfo {
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError>;
}

// Composite trait for callers that need every capability
#[async_trait]
pub trait ExchangeConnector: MarketDataSource + OrderPlacer + AccountInfo {}

use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestEndpoints};
use crate::exchanges::binance::types::{
    BinanceAccountInfo, BinanceCancelResponse, BinanceExchangeInfo, BinanceOrderResponse,
    BinanceTicker24h,
};
use reqwest::Method;

/// Thin typed wrapper around `RestClient` for Binance API
pub struct BinanceRestClient<R: RestClient = ReqwestRest> {
    client: R,
}

impl<R: RestClient> BinanceRestClient<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &R {
        &self.client
    }

    pub async fn get_ticker_24h(&self, symbol: &str) -> Result<BinanceTicker24h, ExchangeError> {
        self.client
            .get_json("/api/v3/ticker/24hr", &[("symbol", symbol)], false)
            .await
    }

    pub async fn get_exchange_info(&self) -> Result<BinanceExchangeInfo, ExchangeError> {
        self.client
            .get_json("/api/v3/exchangeInfo", &[], false)
            .await
    }

    pub async fn get_account_info(&self) -> Result<BinanceAccountInfo, ExchangeError> {
        self.client
            .signed_request_json(Method::GET, "/api/v3/account", &[], &[])
            .await
    }

    /// Binance takes order parameters in the signed query, not a JSON body.
    pub async fn place_order(
        &self,
        params: &[(&str, &str)],
    ) -> Result<BinanceOrderResponse, ExchangeError> {
        self.client
            .signed_request_json(Method::POST, "/api/v3/order", params, &[])
            .await
    }

    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> Result<BinanceCancelResponse, ExchangeError> {
        self.client
            .signed_request_json(
                Method::DELETE,
                "/api/v3/order",
                &[("symbol", symbol), ("orderId", order_id)],
                &[],
            )
            .await
    }
}

impl RestEndpoints for BinanceRestClient<ReqwestRest> {
    fn bind(rest: ReqwestRest) -> Self {
        Self::new(rest)
    }
}

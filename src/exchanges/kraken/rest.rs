use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestEndpoints};
use crate::exchanges::kraken::types::{
    KrakenAddOrderResult, KrakenBalanceResult, KrakenCancelResult, KrakenResponse,
    KrakenTickerResult,
};
use reqwest::Method;
use serde::de::DeserializeOwned;

/// Thin typed wrapper around `RestClient` for the Kraken spot API.
///
/// Error arrays are unwrapped here, inside the unit of work, so retry
/// policies see the classified failure.
pub struct KrakenRestClient<R: RestClient = ReqwestRest> {
    client: R,
}

impl<R: RestClient> KrakenRestClient<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &R {
        &self.client
    }

    async fn public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        self.client
            .get_json::<KrakenResponse<T>>(endpoint, params, false)
            .await?
            .into_result()
    }

    async fn private<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        self.client
            .signed_request_json::<KrakenResponse<T>>(Method::POST, endpoint, params, &[])
            .await?
            .into_result()
    }

    pub async fn get_ticker(&self, pair: &str) -> Result<KrakenTickerResult, ExchangeError> {
        self.public("/0/public/Ticker", &[("pair", pair)]).await
    }

    pub async fn get_balance(&self) -> Result<KrakenBalanceResult, ExchangeError> {
        self.private("/0/private/Balance", &[]).await
    }

    pub async fn add_order(
        &self,
        params: &[(&str, &str)],
    ) -> Result<KrakenAddOrderResult, ExchangeError> {
        self.private("/0/private/AddOrder", params).await
    }

    pub async fn cancel_order(&self, txid: &str) -> Result<KrakenCancelResult, ExchangeError> {
        self.private("/0/private/CancelOrder", &[("txid", txid)])
            .await
    }
}

impl RestEndpoints for KrakenRestClient<ReqwestRest> {
    fn bind(rest: ReqwestRest) -> Self {
        Self::new(rest)
    }
}

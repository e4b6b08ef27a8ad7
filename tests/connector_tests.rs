use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tradewire::core::config::ExchangeConfig;
use tradewire::core::kernel::RestClient;
use tradewire::core::resilience::ResilienceSpec;
use tradewire::core::traits::{AccountInfo, MarketDataSource, OrderPlacer};
use tradewire::exchanges::binance::{self, BinanceConnector, BinanceRestClient};
use tradewire::exchanges::kraken::{self, KrakenConnector, KrakenRestClient};
use tradewire::{ExchangeError, FailureKind, OrderRequest, OrderSide, Symbol};

/// Replays canned responses in order and records every endpoint hit.
#[derive(Default)]
struct ScriptedRest {
    responses: Mutex<VecDeque<Result<Value, ExchangeError>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedRest {
    fn with(responses: Vec<Result<Value, ExchangeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn next<T: DeserializeOwned>(&self, method: Method, endpoint: &str) -> Result<T, ExchangeError> {
        self.calls
            .lock()
            .unwrap()
            .push((method, endpoint.to_string()));
        let value = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Other("script exhausted".to_string())))?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl RestClient for ScriptedRest {
    async fn get(
        &self,
        endpoint: &str,
        _query_params: &[(&str, &str)],
        _authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.next(Method::GET, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        _query_params: &[(&str, &str)],
        _authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.next(Method::GET, endpoint)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        _body: &Value,
        _authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.next(Method::POST, endpoint)
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        _query_params: &[(&str, &str)],
        _authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.next(Method::DELETE, endpoint)
    }

    async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        _query_params: &[(&str, &str)],
        _body: &[u8],
    ) -> Result<T, ExchangeError> {
        self.next(method, endpoint)
    }
}

/// Route crate logs (retry warnings included) into the test output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn binance_connector(
    resilience: ResilienceSpec,
    responses: Vec<Result<Value, ExchangeError>>,
) -> BinanceConnector<ScriptedRest> {
    init_tracing();
    let config = ExchangeConfig::read_only()
        .exchange_name("binance")
        .resilience(resilience);
    BinanceConnector::new(
        BinanceRestClient::new(ScriptedRest::with(responses)),
        &config,
        Arc::new(binance::resilience::create_registry().unwrap()),
    )
}

fn kraken_connector(responses: Vec<Result<Value, ExchangeError>>) -> KrakenConnector<ScriptedRest> {
    init_tracing();
    let config = ExchangeConfig::read_only().exchange_name("kraken");
    KrakenConnector::new(
        KrakenRestClient::new(ScriptedRest::with(responses)),
        &config,
        Arc::new(kraken::resilience::create_registry().unwrap()),
    )
}

fn binance_ticker() -> Value {
    json!({
        "symbol": "BTCUSDT",
        "lastPrice": "30000.10",
        "bidPrice": "30000.00",
        "askPrice": "30000.20",
        "volume": "1234.5",
        "closeTime": 1_700_000_000_000_i64
    })
}

fn binance_order() -> Value {
    json!({
        "symbol": "BTCUSDT",
        "orderId": 28,
        "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
        "transactTime": 1_507_725_176_595_i64,
        "price": "0.00000000",
        "origQty": "10.00000000",
        "status": "FILLED",
        "type": "MARKET",
        "side": "SELL"
    })
}

fn btcusdt() -> Symbol {
    Symbol::new("BTC", "USDT").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_binance_ticker_retries_transient_failures() {
    let connector = binance_connector(
        ResilienceSpec::default(),
        vec![
            Err(ExchangeError::from_status(503, "Service Unavailable")),
            Err(ExchangeError::network(FailureKind::Timeout, "timed out")),
            Ok(binance_ticker()),
        ],
    );

    let ticker = connector.get_ticker(&btcusdt()).await.unwrap();
    assert_eq!(ticker.last.to_string(), "30000.10");
    assert_eq!(connector.rest().inner().calls().len(), 3);

    // one logical call at weight 2, however many attempts it took
    let limiter = connector.service().rate_limiter(binance::resilience::BINANCE);
    assert_eq!(limiter.available_permits().await, 1200 - 2);
}

#[tokio::test(start_paused = true)]
async fn test_binance_ticker_without_retry_fails_fast() {
    let connector = binance_connector(
        ResilienceSpec::disabled(),
        vec![
            Err(ExchangeError::from_status(503, "Service Unavailable")),
            Ok(binance_ticker()),
        ],
    );

    let error = connector.get_ticker(&btcusdt()).await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::ServiceUnavailable);
    assert_eq!(connector.rest().inner().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_binance_order_is_not_retried_after_ambiguous_failure() {
    let connector = binance_connector(
        ResilienceSpec::default(),
        vec![
            Err(ExchangeError::from_status(500, "Internal error")),
            Ok(binance_order()),
        ],
    );

    let order = OrderRequest::market(btcusdt(), OrderSide::Sell, "10".parse().unwrap());
    let error = connector.place_order(order).await.unwrap_err();
    assert!(matches!(error, ExchangeError::ServerError { status: 500, .. }));
    assert_eq!(
        connector.rest().inner().calls(),
        vec![(Method::POST, "/api/v3/order".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_binance_order_is_retried_when_it_never_left() {
    let connector = binance_connector(
        ResilienceSpec::default(),
        vec![
            Err(ExchangeError::network(
                FailureKind::UnknownHost,
                "dns error: failed to lookup address",
            )),
            Ok(binance_order()),
        ],
    );

    let order = OrderRequest::market(btcusdt(), OrderSide::Sell, "10".parse().unwrap());
    let response = connector.place_order(order).await.unwrap();
    assert_eq!(response.order_id, "28");
    assert_eq!(response.status, "FILLED");
    assert!(response.price.is_none());
    assert_eq!(connector.rest().inner().calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_order_never_reaches_the_wire() {
    let connector = binance_connector(ResilienceSpec::default(), vec![]);
    let mut order = OrderRequest::market(btcusdt(), OrderSide::Buy, "1".parse().unwrap());
    order.order_type = tradewire::OrderType::Limit;

    assert!(matches!(
        connector.place_order(order).await,
        Err(ExchangeError::InvalidParameters(_))
    ));
    assert!(connector.rest().inner().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_binance_balances() {
    let connector = binance_connector(
        ResilienceSpec::default(),
        vec![Ok(json!({
            "balances": [
                {"asset": "BTC", "free": "4723846.89208129", "locked": "0.00000000"},
                {"asset": "LTC", "free": "0.00000000", "locked": "0.00000000"}
            ]
        }))],
    );

    let balances = connector.get_account_balance().await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].asset, "BTC");
    assert_eq!(
        connector.rest().inner().calls(),
        vec![(Method::GET, "/api/v3/account".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_kraken_error_array_drives_retry() {
    let connector = kraken_connector(vec![
        Ok(json!({"error": ["EService:Unavailable"]})),
        Ok(json!({
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "a": ["30300.10000", "1", "1.000"],
                    "b": ["30300.00000", "1", "1.000"],
                    "c": ["30303.20000", "0.00067643"],
                    "v": ["4083.67001100", "4412.73601799"]
                }
            }
        })),
    ]);

    let symbol = Symbol::new("BTC", "USD").unwrap();
    let ticker = connector.get_ticker(&symbol).await.unwrap();
    assert_eq!(ticker.bid.to_string(), "30300.00000");
    assert_eq!(connector.rest().inner().calls().len(), 2);

    let limiter = connector.service().rate_limiter(kraken::resilience::KRAKEN);
    assert_eq!(limiter.available_permits().await, 89);
}

#[tokio::test(start_paused = true)]
async fn test_kraken_invalid_nonce_is_not_retried() {
    let connector = kraken_connector(vec![
        Ok(json!({"error": ["EAPI:Invalid nonce"]})),
        Ok(json!({"error": [], "result": {"ZUSD": "10.0"}})),
    ]);

    let error = connector.get_account_balance().await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Authentication);
    assert_eq!(connector.rest().inner().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_kraken_order_lifecycle() {
    let connector = kraken_connector(vec![
        Ok(json!({
            "error": [],
            "result": {
                "descr": {"order": "buy 1.25 XBTUSD @ limit 37500.0"},
                "txid": ["OUF4EM-FRGI2-MQMWZD"]
            }
        })),
        Ok(json!({"error": [], "result": {"count": 1}})),
        Ok(json!({"error": [], "result": {"count": 0}})),
    ]);

    let symbol = Symbol::new("BTC", "USD").unwrap();
    let order = OrderRequest::limit(
        symbol.clone(),
        OrderSide::Buy,
        "1.25".parse().unwrap(),
        "37500".parse().unwrap(),
    );
    let response = connector.place_order(order).await.unwrap();
    assert_eq!(response.order_id, "OUF4EM-FRGI2-MQMWZD");

    connector
        .cancel_order(&symbol, &response.order_id)
        .await
        .unwrap();
    assert!(matches!(
        connector.cancel_order(&symbol, &response.order_id).await,
        Err(ExchangeError::InvalidParameters(_))
    ));

    let endpoints: Vec<String> = connector
        .rest()
        .inner()
        .calls()
        .into_iter()
        .map(|(_, endpoint)| endpoint)
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "/0/private/AddOrder",
            "/0/private/CancelOrder",
            "/0/private/CancelOrder"
        ]
    );
}

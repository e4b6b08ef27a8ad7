use crate::core::errors::ExchangeError;
use serde::Deserialize;
use std::collections::HashMap;

/// Kraken wraps every payload in `{ "error": [...], "result": ... }` and
/// reports most failures with HTTP 200.
#[derive(Debug, Deserialize)]
pub struct KrakenResponse<T> {
    #[serde(default)]
    pub error: Vec<String>,
    pub result: Option<T>,
}

impl<T> KrakenResponse<T> {
    pub fn into_result(self) -> Result<T, ExchangeError> {
        if let Some(first) = self.error.first() {
            return Err(classify_error(first));
        }
        self.result.ok_or_else(|| {
            ExchangeError::DeserializationError("Kraken response has no result".to_string())
        })
    }
}

/// Map a Kraken `Category:Message` error string onto the crate's taxonomy.
pub fn classify_error(error: &str) -> ExchangeError {
    let message = error.to_string();
    match error {
        "EAPI:Rate limit exceeded" | "EOrder:Rate limit exceeded" | "EGeneral:Too many requests" => {
            ExchangeError::ApiError { code: 429, message }
        }
        "EService:Unavailable" | "EService:Busy" | "EService:Market in cancel_only mode" => {
            ExchangeError::ServerError {
                status: 503,
                message,
            }
        }
        "EGeneral:Internal error" => ExchangeError::ServerError {
            status: 500,
            message,
        },
        _ if error.starts_with("EAPI:Invalid key")
            || error.starts_with("EAPI:Invalid signature")
            || error.starts_with("EAPI:Invalid nonce")
            || error.starts_with("EGeneral:Permission denied") =>
        {
            ExchangeError::AuthError(message)
        }
        _ if error.starts_with("EGeneral:Invalid arguments") || error.starts_with("EOrder:") => {
            ExchangeError::InvalidParameters(message)
        }
        _ => ExchangeError::ApiError { code: 0, message },
    }
}

/// One entry of `/0/public/Ticker`; arrays hold `[price, whole lot volume, lot volume]`
/// for `a`/`b`, `[price, lot volume]` for `c` and `[today, last 24h]` for `v`.
#[derive(Debug, Deserialize)]
pub struct KrakenTickerInfo {
    pub a: Vec<String>,
    pub b: Vec<String>,
    pub c: Vec<String>,
    pub v: Vec<String>,
}

pub type KrakenTickerResult = HashMap<String, KrakenTickerInfo>;

pub type KrakenBalanceResult = HashMap<String, String>;

#[derive(Debug, Deserialize)]
pub struct KrakenOrderDescription {
    pub order: String,
}

#[derive(Debug, Deserialize)]
pub struct KrakenAddOrderResult {
    pub descr: KrakenOrderDescription,
    pub txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct KrakenCancelResult {
    pub count: u32,
}

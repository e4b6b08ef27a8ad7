use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(#[from] rust_decimal::Error),
}

/// Quote assets recognised when splitting a concatenated symbol, longest first.
const KNOWN_QUOTES: [&str; 6] = ["USDT", "USDC", "BTC", "ETH", "EUR", "USD"];

/// Exchange-neutral trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Result<Self, TypesError> {
        let base = base.into();
        let quote = quote.into();

        if base.is_empty() || quote.is_empty() {
            return Err(TypesError::InvalidSymbol(
                "Base and quote assets cannot be empty".to_string(),
            ));
        }

        Ok(Self { base, quote })
    }

    /// Parse `BTC/USDT` or a concatenated form such as `BTCUSDT`.
    pub fn parse(symbol: &str) -> Result<Self, TypesError> {
        if let Some((base, quote)) = symbol.split_once('/') {
            return Self::new(base, quote);
        }

        KNOWN_QUOTES
            .iter()
            .find_map(|quote| {
                symbol
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
                    .map(|base| (base, *quote))
            })
            .ok_or_else(|| TypesError::InvalidSymbol(format!("Unable to parse '{}'", symbol)))
            .and_then(|(base, quote)| Self::new(base, quote))
    }

    /// Base and quote run together, the form most REST APIs expect.
    pub fn concat(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Type-safe price representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Price {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe quantity representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Quantity {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Quantity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    GTC, // Good Till Canceled
    IOC, // Immediate or Cancel
    FOK, // Fill or Kill
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Option<Price>,
    pub time_in_force: Option<TimeInForce>,
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    pub fn market(symbol: Symbol, side: OrderSide, quantity: Quantity) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
            client_order_id: None,
        }
    }

    pub fn limit(symbol: Symbol, side: OrderSide, quantity: Quantity, price: Price) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: Some(TimeInForce::GTC),
            client_order_id: None,
        }
    }

    /// Limit orders need a price; market orders must not carry one.
    pub fn validate(&self) -> Result<(), crate::core::errors::ExchangeError> {
        use crate::core::errors::ExchangeError;

        if self.quantity.value() <= Decimal::ZERO {
            return Err(ExchangeError::InvalidParameters(
                "Order quantity must be positive".to_string(),
            ));
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err(ExchangeError::InvalidParameters(
                "Limit orders require a price".to_string(),
            )),
            (OrderType::Market, Some(_)) => Err(ExchangeError::InvalidParameters(
                "Market orders cannot carry a price".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Option<Price>,
    pub status: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub last: Price,
    pub bid: Price,
    pub ask: Price,
    pub volume: Quantity,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Quantity,
    pub locked: Quantity,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_symbol_parse() {
        let symbol = Symbol::parse("BTCUSDT").unwrap();
        assert_eq!(symbol.base, "BTC");
        assert_eq!(symbol.quote, "USDT");
        assert_eq!(symbol.concat(), "BTCUSDT");
        assert_eq!(symbol.to_string(), "BTC/USDT");

        let slashed = Symbol::parse("XBT/EUR").unwrap();
        assert_eq!(slashed.concat(), "XBTEUR");

        assert!(Symbol::parse("USDT").is_err());
        assert!(Symbol::parse("FOOBAR").is_err());
    }

    #[test]
    fn test_order_validation() {
        let symbol = Symbol::parse("BTCUSDT").unwrap();
        let quantity = Quantity::new(dec("0.5"));

        assert!(OrderRequest::market(symbol.clone(), OrderSide::Buy, quantity)
            .validate()
            .is_ok());
        assert!(
            OrderRequest::limit(symbol.clone(), OrderSide::Sell, quantity, Price::new(dec("100")))
                .validate()
                .is_ok()
        );

        let mut missing_price = OrderRequest::market(symbol.clone(), OrderSide::Buy, quantity);
        missing_price.order_type = OrderType::Limit;
        assert!(missing_price.validate().is_err());

        let zero = OrderRequest::market(symbol, OrderSide::Buy, Quantity::new(Decimal::ZERO));
        assert!(zero.validate().is_err());
    }
}

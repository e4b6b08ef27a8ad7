//! Exchange trading clients with a shared resilience layer: named retry and
//! rate-limiter policies, call decoration, nonce generation and a
//! configurable HTTP transport.

pub mod core;
pub mod exchanges;

pub use core::{
    errors::{ExchangeError, FailureKind},
    traits::ExchangeConnector,
    types::*,
};
pub use exchanges::binance::BinanceConnector;
pub use exchanges::kraken::KrakenConnector;

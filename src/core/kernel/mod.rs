//! Exchange-agnostic HTTP transport.
//!
//! A client is assembled by [`RestClientBuilder`] from an
//! [`ExchangeConfig`](crate::core::config::ExchangeConfig): base URL,
//! timeouts and proxy come from the exchange configuration, and every request flows
//! through an ordered [`Interceptor`] chain (tracing first, then any custom
//! interceptors such as request signing).
//!
//! ```rust,no_run
//! use tradewire::core::config::ExchangeConfig;
//! use tradewire::core::kernel::{ReqwestRest, RestClient, RestClientBuilder};
//!
//! # async fn example() -> Result<(), tradewire::ExchangeError> {
//! let config = ExchangeConfig::read_only()
//!     .exchange_name("binance")
//!     .base_url("https://api.binance.com".to_string())
//!     .connect_timeout_ms(5_000);
//! let rest: ReqwestRest = RestClientBuilder::for_interface(&config).build()?;
//! let time: serde_json::Value = rest.get_json("/api/v3/time", &[], false).await?;
//! # Ok(())
//! # }
//! ```
pub mod interceptor;
pub mod rest;
pub mod signer;

pub use interceptor::{
    default_interceptors, Interceptor, PreparedRequest, SigningInterceptor, TracingInterceptor,
};
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestEndpoints, TransportConfig};
pub use signer::{SignatureResult, SignedParts, Signer};

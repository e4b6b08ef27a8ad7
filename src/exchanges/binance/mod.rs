pub mod builder;
pub mod connector;
pub mod conversions;
pub mod resilience;
pub mod rest;
pub mod signer;
pub mod types;

// Re-export main types for easier importing
pub use builder::{build_connector, build_default_connector};
pub use connector::BinanceConnector;
pub use rest::BinanceRestClient;
pub use signer::BinanceSigner;

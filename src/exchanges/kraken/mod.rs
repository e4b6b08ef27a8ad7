pub mod builder;
pub mod connector;
pub mod conversions;
pub mod resilience;
pub mod rest;
pub mod signer;
pub mod types;

pub use builder::{build_connector, build_connector_with_nonce, build_default_connector};
pub use connector::KrakenConnector;
pub use rest::KrakenRestClient;
pub use signer::KrakenSigner;

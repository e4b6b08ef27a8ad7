pub mod config;
pub mod errors;
pub mod kernel;
pub mod nonce;
pub mod resilience;
pub mod service;
pub mod traits;
pub mod types;

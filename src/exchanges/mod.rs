pub mod binance;
pub mod kraken;

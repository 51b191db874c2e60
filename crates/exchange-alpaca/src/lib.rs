//! Alpaca brokerage and options market data integration.
//!
//! Implements the [`Brokerage`](odte_core::traits::Brokerage) and
//! [`MarketData`](odte_core::traits::MarketData) seams over Alpaca's REST
//! API, with local trading-hour gates applied before orders leave the
//! process.

pub mod account;
pub mod client;
pub mod error;
pub mod execution;
pub mod market_data;

pub use client::{AlpacaClient, AlpacaConfig};
pub use error::AlpacaError;

//! Shared types, collaborator traits, the trading calendar, and
//! configuration for the 0DTE trading stack.

pub mod calendar;
pub mod config;
pub mod config_loader;
pub mod market;
pub mod traits;

pub use config::AgentConfig;
pub use config_loader::ConfigLoader;
pub use market::{
    AccountSummary, BrokerPosition, OptionQuote, OptionType, OrderAck, OrderRequest, OrderSide,
    OrderType, QuoteSnapshot, Recommendation, TimeInForce,
};
pub use traits::{Brokerage, MarketData};

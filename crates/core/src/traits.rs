//! Collaborator seams consumed by the trading agent.
//!
//! The agent only sees these traits; the Alpaca client implements them in
//! `odte-alpaca`, and agent tests substitute scripted mocks.

use anyhow::Result;
use async_trait::async_trait;

use crate::market::{AccountSummary, BrokerPosition, OptionQuote, OrderAck, OrderRequest, QuoteSnapshot};

/// Brokerage order and account operations.
#[async_trait]
pub trait Brokerage: Send + Sync {
    async fn account(&self) -> Result<AccountSummary>;
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck>;
    async fn close_position(&self, symbol: &str) -> Result<()>;
    async fn positions(&self) -> Result<Vec<BrokerPosition>>;
}

/// Market-data queries for option chains and per-symbol snapshots.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Same-day-expiry option chain for an underlying.
    async fn zero_dte_chain(&self, underlying: &str) -> Result<Vec<OptionQuote>>;
    /// Current quote snapshot for a single contract symbol.
    async fn snapshot(&self, symbol: &str) -> Result<QuoteSnapshot>;
}

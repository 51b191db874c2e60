//! Agent configuration. Loaded once at startup, read-only afterwards.

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::Recommendation;

/// Lower bound on the scan interval; anything faster hammers the data feed.
pub const MIN_SCAN_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Underlyings to scan for 0DTE chains.
    pub underlyings: Vec<String>,
    /// Catalog strategy names to evaluate each cycle.
    pub strategies: Vec<String>,
    /// Seconds between scan cycles.
    pub scan_interval_secs: u64,
    /// Maximum simultaneously tracked positions.
    pub max_positions: usize,
    /// Maximum realized daily loss in dollars before new entries stop.
    pub max_daily_loss: Decimal,
    /// Maximum contracts per trade.
    pub max_position_size: u32,
    /// Stop loss as a percentage of entry premium.
    pub stop_loss_pct: Decimal,
    /// Take profit as a percentage of entry premium.
    pub take_profit_pct: Decimal,
    /// Skip contracts whose premium exceeds this percentage of the underlying price.
    pub max_premium_pct: Decimal,
    /// Weakest recommendation the agent will act on.
    pub min_recommendation: Recommendation,
    /// Paper account (true) or live account (false).
    pub paper: bool,
    /// Log intended orders without submitting them.
    pub dry_run: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            underlyings: vec!["SPY".to_string()],
            strategies: vec!["long_call_stock".to_string(), "strangle_stock".to_string()],
            scan_interval_secs: 60,
            max_positions: 3,
            max_daily_loss: Decimal::from(1000),
            max_position_size: 10,
            stop_loss_pct: Decimal::from(50),
            take_profit_pct: Decimal::from(100),
            max_premium_pct: Decimal::from(2),
            min_recommendation: Recommendation::Buy,
            paper: true,
            dry_run: false,
        }
    }
}

impl AgentConfig {
    /// Validate ranges. Called once by the CLI before the agent starts.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.underlyings.is_empty() {
            anyhow::bail!("At least one underlying is required");
        }
        if self.strategies.is_empty() {
            anyhow::bail!("At least one strategy is required");
        }
        if self.scan_interval_secs < MIN_SCAN_INTERVAL_SECS {
            anyhow::bail!(
                "scan_interval_secs {} below floor {}",
                self.scan_interval_secs,
                MIN_SCAN_INTERVAL_SECS
            );
        }
        if self.max_positions == 0 {
            anyhow::bail!("max_positions must be at least 1");
        }
        if self.max_daily_loss <= Decimal::ZERO {
            anyhow::bail!("max_daily_loss must be positive");
        }
        if self.max_position_size == 0 {
            anyhow::bail!("max_position_size must be at least 1");
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct > Decimal::from(100) {
            anyhow::bail!("stop_loss_pct must be in (0, 100]");
        }
        if self.take_profit_pct <= Decimal::ZERO {
            anyhow::bail!("take_profit_pct must be positive");
        }
        if self.max_premium_pct <= Decimal::ZERO {
            anyhow::bail!("max_premium_pct must be positive");
        }
        Ok(())
    }

    /// Tag attached to every structured log event.
    pub fn mode_tag(&self) -> &'static str {
        if self.paper {
            "paper"
        } else {
            "live"
        }
    }
}

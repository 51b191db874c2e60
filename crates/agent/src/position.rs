//! Positions tracked by the agent between entry and exit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A live position opened by the agent, with its exit levels fixed at entry.
#[derive(Debug, Clone)]
pub struct TrackedPosition {
    /// Option contract symbol (OCC format).
    pub symbol: String,
    /// Brokerage id of the entry order.
    pub order_id: String,
    /// Catalog name of the strategy that opened this position.
    pub strategy: String,
    pub qty: u32,
    /// Per-share premium paid at entry.
    pub entry_price: Decimal,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl TrackedPosition {
    /// Dollar P/L at the given per-share mark.
    pub fn pnl_at(&self, mark: Decimal) -> Decimal {
        (mark - self.entry_price) * Decimal::from(self.qty) * Decimal::from(100)
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfDay,
    Shutdown,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::EndOfDay => "eod_close",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position() -> TrackedPosition {
        TrackedPosition {
            symbol: "SPY250829C00500000".to_string(),
            order_id: "order-1".to_string(),
            strategy: "long_call_stock".to_string(),
            qty: 2,
            entry_price: dec!(2.50),
            stop_price: dec!(1.25),
            target_price: dec!(5.00),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn pnl_scales_by_quantity_and_contract_size() {
        let p = position();
        assert_eq!(p.pnl_at(dec!(3.00)), dec!(100.00));
        assert_eq!(p.pnl_at(dec!(1.25)), dec!(-250.00));
    }

    #[test]
    fn exit_reason_display_is_snake_case() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
        assert_eq!(ExitReason::EndOfDay.to_string(), "eod_close");
    }
}

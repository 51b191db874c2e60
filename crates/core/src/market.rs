//! Shared market-data and brokerage types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// A quoted option contract from a chain snapshot.
///
/// Greeks are optional; not every feed carries them, and the selector
/// falls back to strike-based rules when delta is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub symbol: String,
    pub underlying: String,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last: Option<Decimal>,
    pub volume: u64,
    pub open_interest: u64,
    pub implied_volatility: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub rho: Option<f64>,
}

impl OptionQuote {
    /// Mid price from bid/ask, falling back to last when either side is missing.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => self.last,
        }
    }

    /// Bid-ask spread, when both sides are quoted.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// True if the contract expires on `reference_date`.
    pub fn is_zero_dte(&self, reference_date: NaiveDate) -> bool {
        self.expiration == reference_date
    }

    /// Sanity-check quote data: positive strike, non-negative and non-inverted bid/ask.
    pub fn is_valid(&self) -> bool {
        if self.symbol.is_empty() || self.underlying.is_empty() {
            return false;
        }
        if self.strike <= Decimal::ZERO {
            return false;
        }
        if let (Some(bid), Some(ask)) = (self.bid, self.ask) {
            if bid < Decimal::ZERO || ask < Decimal::ZERO || bid > ask {
                return false;
            }
        }
        true
    }
}

/// Point-in-time quote for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last: Option<Decimal>,
    pub open_interest: u64,
    pub timestamp: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Mid price from bid/ask, falling back to last.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => self.last,
        }
    }
}

/// Brokerage account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub equity: Decimal,
    pub cash: Decimal,
    pub buying_power: Decimal,
    pub daytrade_count: u32,
    pub pattern_day_trader: bool,
    pub trading_blocked: bool,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit { price: Decimal },
}

/// Order duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
}

/// An order to submit to the brokerage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: u32,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

/// Acknowledgement returned by the brokerage for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

/// A position as reported by the brokerage ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    pub qty: Decimal,
    pub avg_entry_price: Option<Decimal>,
}

/// Discrete strategy recommendation, ordered worst to best.
///
/// The derived `Ord` makes "meets the configured minimum" a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongAvoid,
    Avoid,
    Hold,
    Buy,
    StrongBuy,
}

impl Recommendation {
    /// True if this recommendation is at least as good as `minimum`.
    pub fn meets(self, minimum: Recommendation) -> bool {
        self >= minimum
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StrongAvoid => "strong_avoid",
            Self::Avoid => "avoid",
            Self::Hold => "hold",
            Self::Buy => "buy",
            Self::StrongBuy => "strong_buy",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Recommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_avoid" => Ok(Self::StrongAvoid),
            "avoid" => Ok(Self::Avoid),
            "hold" => Ok(Self::Hold),
            "buy" => Ok(Self::Buy),
            "strong_buy" => Ok(Self::StrongBuy),
            other => anyhow::bail!("Unknown recommendation: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn quote(bid: Option<Decimal>, ask: Option<Decimal>, last: Option<Decimal>) -> OptionQuote {
        OptionQuote {
            symbol: "SPY250829C00500000".to_string(),
            underlying: "SPY".to_string(),
            option_type: OptionType::Call,
            strike: dec!(500),
            expiration: NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
            bid,
            ask,
            last,
            volume: 100,
            open_interest: 500,
            implied_volatility: None,
            delta: None,
            gamma: None,
            theta: None,
            vega: None,
            rho: None,
        }
    }

    #[test]
    fn mid_averages_bid_ask() {
        let q = quote(Some(dec!(2.40)), Some(dec!(2.60)), Some(dec!(9.99)));
        assert_eq!(q.mid(), Some(dec!(2.50)));
    }

    #[test]
    fn mid_falls_back_to_last_when_one_side_missing() {
        let q = quote(Some(dec!(2.40)), None, Some(dec!(2.45)));
        assert_eq!(q.mid(), Some(dec!(2.45)));
    }

    #[test]
    fn inverted_bid_ask_is_invalid() {
        let q = quote(Some(dec!(2.60)), Some(dec!(2.40)), None);
        assert!(!q.is_valid());
    }

    #[test]
    fn non_positive_strike_is_invalid() {
        let mut q = quote(Some(dec!(1.00)), Some(dec!(1.10)), None);
        q.strike = Decimal::ZERO;
        assert!(!q.is_valid());
    }

    #[test]
    fn recommendation_total_order() {
        assert!(Recommendation::StrongBuy > Recommendation::Buy);
        assert!(Recommendation::Buy > Recommendation::Hold);
        assert!(Recommendation::Hold > Recommendation::Avoid);
        assert!(Recommendation::Avoid > Recommendation::StrongAvoid);
    }

    #[test]
    fn recommendation_meets_minimum() {
        assert!(Recommendation::StrongBuy.meets(Recommendation::Buy));
        assert!(Recommendation::Buy.meets(Recommendation::Buy));
        assert!(!Recommendation::Hold.meets(Recommendation::Buy));
    }

    #[test]
    fn recommendation_round_trips_through_serde() {
        let json = serde_json::to_string(&Recommendation::StrongBuy).unwrap();
        assert_eq!(json, "\"strong_buy\"");
        let back: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Recommendation::StrongBuy);
    }
}

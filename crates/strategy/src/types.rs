//! Analysis input and output types.

use chrono::NaiveDate;
use odte_core::market::{OptionType, Recommendation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::StrategyDef;

/// Broad classification of the underlying instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlyingClass {
    Stock,
    Index,
    Etf,
}

const ETFS: &[&str] = &[
    "SPY", "QQQ", "IWM", "DIA", "VTI", "VOO", "XLF", "XLE", "GLD", "SLV",
];
const INDICES: &[&str] = &["SPX", "NDX", "RUT", "VIX"];

impl UnderlyingClass {
    /// Classify by fixed membership list; anything unrecognized is a stock.
    pub fn classify(underlying: &str) -> Self {
        let upper = underlying.to_uppercase();
        if ETFS.contains(&upper.as_str()) {
            Self::Etf
        } else if INDICES.contains(&upper.as_str()) {
            Self::Index
        } else {
            Self::Stock
        }
    }
}

/// A concrete option contract selected for one strategy leg.
///
/// Built fresh from a chain snapshot per analysis; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub underlying: String,
    pub underlying_class: UnderlyingClass,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    /// Mid of bid/ask at selection time.
    pub premium: Decimal,
    /// Shares per contract (100 for standard US equity options).
    pub contract_size: Decimal,
}

/// Per-contract greeks. Missing feed values default to zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: Option<f64>,
}

/// Upside of a strategy at expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxProfit {
    Limited(Decimal),
    Unlimited,
}

impl std::fmt::Display for MaxProfit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limited(p) => write!(f, "{p}"),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Price level(s) at which the strategy breaks even at expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakeven {
    Single(Decimal),
    Pair(Decimal, Decimal),
}

/// Risk profile of a strategy at its selected strikes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub max_loss: Decimal,
    pub max_profit: MaxProfit,
    pub breakeven: Breakeven,
    pub probability_of_profit: Option<f64>,
}

/// Position greeks summed across all legs (contract size applied).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NetGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Coarse volatility regime fed into scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketVolatility {
    Low,
    #[default]
    Normal,
    High,
}

/// ATM implied volatility bands for the regime classification.
const LOW_IV: f64 = 0.15;
const HIGH_IV: f64 = 0.30;

impl MarketVolatility {
    /// Classify from ATM implied volatility; missing data reads as normal.
    pub fn from_atm_iv(atm_iv: Option<f64>) -> Self {
        match atm_iv {
            Some(iv) if iv < LOW_IV => Self::Low,
            Some(iv) if iv > HIGH_IV => Self::High,
            _ => Self::Normal,
        }
    }
}

/// The analyzer's sole output: everything the agent needs to decide.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAnalysis {
    pub strategy: StrategyDef,
    pub contracts: Vec<OptionContract>,
    pub risk_profile: RiskProfile,
    pub net_greeks: NetGreeks,
    /// Fixed broker-margin approximation, not a real margin calculation.
    pub margin: Decimal,
    pub recommendation: Recommendation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_etfs_indices_and_stocks() {
        assert_eq!(UnderlyingClass::classify("SPY"), UnderlyingClass::Etf);
        assert_eq!(UnderlyingClass::classify("gld"), UnderlyingClass::Etf);
        assert_eq!(UnderlyingClass::classify("SPX"), UnderlyingClass::Index);
        assert_eq!(UnderlyingClass::classify("VIX"), UnderlyingClass::Index);
        assert_eq!(UnderlyingClass::classify("NVDA"), UnderlyingClass::Stock);
    }

    #[test]
    fn max_profit_displays_unlimited() {
        assert_eq!(MaxProfit::Unlimited.to_string(), "unlimited");
    }

    #[test]
    fn volatility_regime_bands() {
        assert_eq!(MarketVolatility::from_atm_iv(Some(0.10)), MarketVolatility::Low);
        assert_eq!(MarketVolatility::from_atm_iv(Some(0.22)), MarketVolatility::Normal);
        assert_eq!(MarketVolatility::from_atm_iv(Some(0.45)), MarketVolatility::High);
        assert_eq!(MarketVolatility::from_atm_iv(None), MarketVolatility::Normal);
    }
}

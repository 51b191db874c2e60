//! Immutable table of strategy definitions.
//!
//! Leg order is semantically meaningful: leg *i* pairs with contract *i*
//! through selection and analysis, so definitions here fix that pairing.

use odte_core::market::OptionType;
use serde::{Deserialize, Serialize};

/// Whether the leg is bought or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegSide {
    Long,
    Short,
}

/// Strike-selection rule for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeOffset {
    /// Strike nearest the underlying price.
    Atm,
    /// Nearest out-of-the-money strike: above price for calls, below for puts.
    /// For puts this denotes the symmetric OTM leg of a strangle, not a deep one.
    OtmHigh,
    /// Nearest out-of-the-money strike on the low side.
    OtmLow,
    /// Nearest in-the-money strike.
    Itm,
    /// Contract whose delta is closest to the target.
    Delta(f64),
}

/// One option leg within a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub side: LegSide,
    pub option_type: OptionType,
    pub strike_offset: StrikeOffset,
    pub quantity: u32,
}

/// Directional/volatility intent of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    DirectionalBullish,
    DirectionalBearish,
    NeutralVolatility,
    Speculation,
    Income,
}

/// A strategy definition from the catalog. Immutable after process start.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDef {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: StrategyCategory,
    pub legs: Vec<StrategyLeg>,
    /// True when the trader only pays premium; max loss is bounded by it.
    pub is_debit_only: bool,
    pub same_day_suitable: bool,
}

fn leg(side: LegSide, option_type: OptionType, strike_offset: StrikeOffset) -> StrategyLeg {
    StrategyLeg {
        side,
        option_type,
        strike_offset,
        quantity: 1,
    }
}

/// The built-in strategy table.
pub fn all() -> Vec<StrategyDef> {
    use LegSide::{Long, Short};
    use OptionType::{Call, Put};
    use StrikeOffset::{Atm, Delta, OtmHigh, OtmLow};

    vec![
        StrategyDef {
            name: "long_call_stock",
            display_name: "Long Call",
            category: StrategyCategory::DirectionalBullish,
            legs: vec![leg(Long, Call, Atm)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "long_put_stock",
            display_name: "Long Put",
            category: StrategyCategory::DirectionalBearish,
            legs: vec![leg(Long, Put, Atm)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "straddle_stock",
            display_name: "Long Straddle",
            category: StrategyCategory::NeutralVolatility,
            legs: vec![leg(Long, Call, Atm), leg(Long, Put, Atm)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "strangle_stock",
            display_name: "Long Strangle",
            category: StrategyCategory::NeutralVolatility,
            legs: vec![leg(Long, Call, OtmHigh), leg(Long, Put, OtmHigh)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "long_call_vertical",
            display_name: "Bull Call Spread",
            category: StrategyCategory::DirectionalBullish,
            legs: vec![leg(Long, Call, Atm), leg(Short, Call, OtmHigh)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "long_put_vertical",
            display_name: "Bear Put Spread",
            category: StrategyCategory::DirectionalBearish,
            legs: vec![leg(Long, Put, Atm), leg(Short, Put, OtmLow)],
            is_debit_only: true,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "short_put_vertical",
            display_name: "Bull Put Credit Spread",
            category: StrategyCategory::Income,
            legs: vec![leg(Short, Put, OtmLow), leg(Long, Put, Delta(-0.15))],
            is_debit_only: false,
            same_day_suitable: true,
        },
        StrategyDef {
            name: "lotto_call_stock",
            display_name: "Deep OTM Lotto Call",
            category: StrategyCategory::Speculation,
            legs: vec![leg(Long, Call, Delta(0.10))],
            is_debit_only: true,
            same_day_suitable: true,
        },
    ]
}

/// Look up a strategy by catalog name.
pub fn find(name: &str) -> Option<StrategyDef> {
    all().into_iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_known_strategy() {
        let s = find("strangle_stock").unwrap();
        assert_eq!(s.legs.len(), 2);
        assert_eq!(s.legs[0].option_type, OptionType::Call);
        assert_eq!(s.legs[1].option_type, OptionType::Put);
    }

    #[test]
    fn find_returns_none_for_unknown() {
        assert!(find("iron_condor_stock").is_none());
    }

    #[test]
    fn all_names_are_unique() {
        let defs = all();
        let mut names: Vec<_> = defs.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn credit_strategies_are_not_debit_only() {
        let s = find("short_put_vertical").unwrap();
        assert!(!s.is_debit_only);
        assert_eq!(s.legs[0].side, LegSide::Short);
    }

    #[test]
    fn every_strategy_is_same_day_suitable() {
        assert!(all().iter().all(|s| s.same_day_suitable));
    }
}

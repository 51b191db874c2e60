//! Strategy catalog, contract selection, and risk analysis for 0DTE options.
//!
//! The pure core of the system: given a strategy definition and quoted
//! contracts, produce a risk profile, net greeks, a margin estimate, and a
//! discrete recommendation. No I/O happens in this crate.

pub mod analyzer;
pub mod catalog;
pub mod selector;
pub mod types;

pub use analyzer::{Analyzer, AnalyzerError};
pub use catalog::{LegSide, StrategyCategory, StrategyDef, StrategyLeg, StrikeOffset};
pub use selector::{select_contract, to_contract, to_greeks, underlying_reference};
pub use types::{
    Breakeven, Greeks, MarketVolatility, MaxProfit, NetGreeks, OptionContract, RiskProfile,
    StrategyAnalysis, UnderlyingClass,
};

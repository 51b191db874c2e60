//! Risk profiling and recommendation scoring.
//!
//! All money math is `Decimal`; greeks stay `f64` as fed from the data
//! provider. Shapes the profiler cannot price return an error rather than a
//! profile with made-up numbers.

use odte_core::market::{OptionQuote, OptionType, Recommendation};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{LegSide, StrategyCategory, StrategyDef};
use crate::selector::{select_contract, to_contract, to_greeks};
use crate::types::{
    Breakeven, Greeks, MarketVolatility, MaxProfit, NetGreeks, OptionContract, RiskProfile,
    StrategyAnalysis,
};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("no contracts supplied for {0}")]
    Empty(String),

    #[error("{strategy} expects {expected} contracts, got {actual}")]
    LegMismatch {
        strategy: String,
        expected: usize,
        actual: usize,
    },

    #[error("no contract in chain matched leg {leg} of {strategy}")]
    NoContract { strategy: String, leg: usize },

    #[error("no quotable premium for {symbol}")]
    NoPremium { symbol: String },

    #[error("unsupported multi-leg shape: {0}")]
    UnsupportedShape(String),
}

/// Prices strategy shapes against a market snapshot.
///
/// `risk_free_rate`, `implied_volatility`, and `time_to_expiry` are carried
/// for a future model-based probability of profit; the expiry-payoff math
/// below does not consume them yet.
#[derive(Debug, Clone)]
pub struct Analyzer {
    pub risk_free_rate: f64,
    pub implied_volatility: f64,
    pub underlying_price: Decimal,
    pub time_to_expiry: f64,
}

impl Analyzer {
    pub fn new(
        risk_free_rate: f64,
        implied_volatility: f64,
        underlying_price: Decimal,
        time_to_expiry: f64,
    ) -> Self {
        Self {
            risk_free_rate,
            implied_volatility,
            underlying_price,
            time_to_expiry,
        }
    }

    /// Full pipeline: select contracts from `chain`, profile the risk, sum
    /// the greeks, score a recommendation, and estimate margin.
    ///
    /// # Errors
    ///
    /// Fails when a leg cannot be matched to a quoted contract or the
    /// strategy shape is not priceable.
    pub fn analyze(
        &self,
        strategy: &StrategyDef,
        chain: &[OptionQuote],
        volatility: MarketVolatility,
    ) -> Result<StrategyAnalysis, AnalyzerError> {
        let mut contracts = Vec::with_capacity(strategy.legs.len());
        let mut greeks = Vec::with_capacity(strategy.legs.len());
        for (i, leg) in strategy.legs.iter().enumerate() {
            let quote = select_contract(chain, leg, self.underlying_price).ok_or_else(|| {
                AnalyzerError::NoContract {
                    strategy: strategy.name.to_string(),
                    leg: i,
                }
            })?;
            let contract = to_contract(quote).ok_or_else(|| AnalyzerError::NoPremium {
                symbol: quote.symbol.clone(),
            })?;
            greeks.push(to_greeks(quote));
            contracts.push(contract);
        }

        let risk_profile = self.risk_profile(strategy, &contracts)?;
        let net_greeks = self.net_greeks(&contracts, &greeks);
        let recommendation = self.recommendation(&risk_profile, &net_greeks, volatility);
        let margin = self.margin(strategy, &risk_profile);

        debug!(
            strategy = strategy.name,
            max_loss = %risk_profile.max_loss,
            max_profit = %risk_profile.max_profit,
            %recommendation,
            "analyzed strategy"
        );

        Ok(StrategyAnalysis {
            strategy: strategy.clone(),
            contracts,
            risk_profile,
            net_greeks,
            margin,
            recommendation,
        })
    }

    /// Expiry-payoff risk profile for the selected contracts.
    ///
    /// # Errors
    ///
    /// Fails when contracts and legs disagree in count or the shape has no
    /// closed-form profile here.
    pub fn risk_profile(
        &self,
        strategy: &StrategyDef,
        contracts: &[OptionContract],
    ) -> Result<RiskProfile, AnalyzerError> {
        if contracts.is_empty() {
            return Err(AnalyzerError::Empty(strategy.name.to_string()));
        }
        if contracts.len() != strategy.legs.len() {
            return Err(AnalyzerError::LegMismatch {
                strategy: strategy.name.to_string(),
                expected: strategy.legs.len(),
                actual: contracts.len(),
            });
        }

        if strategy.is_debit_only {
            self.debit_profile(strategy, contracts)
        } else {
            self.credit_profile(strategy, contracts)
        }
    }

    fn debit_profile(
        &self,
        strategy: &StrategyDef,
        contracts: &[OptionContract],
    ) -> Result<RiskProfile, AnalyzerError> {
        // Debit positions cannot lose more than the premium paid, summed
        // over every leg regardless of side.
        let max_loss: Decimal = contracts
            .iter()
            .map(|c| c.premium * c.contract_size)
            .sum();

        let (max_profit, breakeven) = if contracts.len() == 1 {
            let c = &contracts[0];
            let breakeven = match c.option_type {
                OptionType::Call => c.strike + c.premium,
                OptionType::Put => c.strike - c.premium,
            };
            let max_profit = match strategy.category {
                StrategyCategory::DirectionalBullish
                | StrategyCategory::DirectionalBearish
                | StrategyCategory::NeutralVolatility
                | StrategyCategory::Speculation => MaxProfit::Unlimited,
                StrategyCategory::Income => MaxProfit::Limited(max_loss),
            };
            (max_profit, Breakeven::Single(breakeven))
        } else if strategy.name.contains("straddle") {
            let total: Decimal = contracts.iter().map(|c| c.premium).sum();
            let strike = contracts[0].strike;
            (
                MaxProfit::Unlimited,
                Breakeven::Pair(strike - total, strike + total),
            )
        } else if strategy.name.contains("strangle") {
            let call = contracts
                .iter()
                .find(|c| c.option_type == OptionType::Call)
                .ok_or_else(|| AnalyzerError::UnsupportedShape(strategy.name.to_string()))?;
            let put = contracts
                .iter()
                .find(|c| c.option_type == OptionType::Put)
                .ok_or_else(|| AnalyzerError::UnsupportedShape(strategy.name.to_string()))?;
            (
                MaxProfit::Unlimited,
                Breakeven::Pair(put.strike - put.premium, call.strike + call.premium),
            )
        } else if strategy.name.contains("vertical") {
            let long = leg_contract(strategy, contracts, LegSide::Long)
                .ok_or_else(|| AnalyzerError::UnsupportedShape(strategy.name.to_string()))?;
            let short = leg_contract(strategy, contracts, LegSide::Short)
                .ok_or_else(|| AnalyzerError::UnsupportedShape(strategy.name.to_string()))?;
            let width = (long.strike - short.strike).abs();
            let max_profit = width * long.contract_size - max_loss;
            let breakeven = long.strike + (long.premium - short.premium);
            (MaxProfit::Limited(max_profit), Breakeven::Single(breakeven))
        } else {
            return Err(AnalyzerError::UnsupportedShape(strategy.name.to_string()));
        };

        Ok(RiskProfile {
            max_loss,
            max_profit,
            breakeven,
            probability_of_profit: None,
        })
    }

    fn credit_profile(
        &self,
        strategy: &StrategyDef,
        contracts: &[OptionContract],
    ) -> Result<RiskProfile, AnalyzerError> {
        let short_premium: Decimal = paired(strategy, contracts)
            .filter(|(leg, _)| leg.side == LegSide::Short)
            .map(|(_, c)| c.premium)
            .sum();
        let long_premium: Decimal = paired(strategy, contracts)
            .filter(|(leg, _)| leg.side == LegSide::Long)
            .map(|(_, c)| c.premium)
            .sum();
        let contract_size = contracts[0].contract_size;
        let net_credit = (short_premium - long_premium) * contract_size;

        let min_strike = contracts
            .iter()
            .map(|c| c.strike)
            .min()
            .ok_or_else(|| AnalyzerError::Empty(strategy.name.to_string()))?;
        let max_strike = contracts
            .iter()
            .map(|c| c.strike)
            .max()
            .ok_or_else(|| AnalyzerError::Empty(strategy.name.to_string()))?;
        let width = max_strike - min_strike;

        Ok(RiskProfile {
            max_loss: width * contract_size - net_credit,
            max_profit: MaxProfit::Limited(net_credit),
            breakeven: Breakeven::Single(min_strike + net_credit / contract_size),
            probability_of_profit: None,
        })
    }

    /// Greeks summed across legs, scaled by contract size. Feed signs are
    /// taken as-is; short legs are not flipped here.
    pub fn net_greeks(&self, contracts: &[OptionContract], greeks: &[Greeks]) -> NetGreeks {
        let mut net = NetGreeks::default();
        for (contract, g) in contracts.iter().zip(greeks) {
            let size = contract.contract_size.to_f64().unwrap_or(0.0);
            net.delta += g.delta * size;
            net.gamma += g.gamma * size;
            net.theta += g.theta * size;
            net.vega += g.vega * size;
        }
        net
    }

    /// Additive scoring over reward/risk ratio, volatility regime, and
    /// theta burn, mapped onto the discrete recommendation scale.
    pub fn recommendation(
        &self,
        risk: &RiskProfile,
        net: &NetGreeks,
        volatility: MarketVolatility,
    ) -> Recommendation {
        let mut score: i32 = 0;

        let reward = match risk.max_profit {
            MaxProfit::Limited(p) => p,
            MaxProfit::Unlimited => risk.max_loss * Decimal::from(10),
        };
        if risk.max_loss.is_zero() {
            // Nothing at risk reads as the best possible ratio.
            score += 2;
        } else {
            let ratio = reward / risk.max_loss;
            if ratio >= Decimal::from(3) {
                score += 2;
            } else if ratio >= Decimal::from(2) {
                score += 1;
            } else if ratio < Decimal::ONE {
                score -= 2;
            }
        }

        if volatility == MarketVolatility::High && net.vega > 0.0 {
            score += 1;
        }
        if volatility == MarketVolatility::Low && net.vega > 0.0 {
            score -= 1;
        }

        let theta_budget = (risk.max_loss * Decimal::new(1, 1)).to_f64().unwrap_or(0.0);
        if net.theta.abs() > theta_budget {
            score -= 1;
        }

        if score >= 3 {
            Recommendation::StrongBuy
        } else if score >= 1 {
            Recommendation::Buy
        } else if score >= 0 {
            Recommendation::Hold
        } else if score >= -2 {
            Recommendation::Avoid
        } else {
            Recommendation::StrongAvoid
        }
    }

    /// Margin estimate: full risk for debit shapes, 1.5x for credit shapes.
    pub fn margin(&self, strategy: &StrategyDef, risk: &RiskProfile) -> Decimal {
        if strategy.is_debit_only {
            risk.max_loss
        } else {
            risk.max_loss * Decimal::new(15, 1)
        }
    }
}

fn leg_contract<'a>(
    strategy: &'a StrategyDef,
    contracts: &'a [OptionContract],
    side: LegSide,
) -> Option<&'a OptionContract> {
    paired(strategy, contracts)
        .find(|(leg, _)| leg.side == side)
        .map(|(_, c)| c)
}

fn paired<'a>(
    strategy: &'a StrategyDef,
    contracts: &'a [OptionContract],
) -> impl Iterator<Item = (&'a crate::catalog::StrategyLeg, &'a OptionContract)> {
    strategy.legs.iter().zip(contracts)
}

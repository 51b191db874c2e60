//! Maps a strategy leg onto one concrete contract from a chain snapshot.
//!
//! Selection is pure and deterministic: ties resolve to the first candidate
//! in chain order, and the input slice is never reordered.

use odte_core::market::{OptionQuote, OptionType};
use rust_decimal::Decimal;

use crate::catalog::{StrategyLeg, StrikeOffset};
use crate::types::{Greeks, OptionContract, UnderlyingClass};

/// Pick the contract for `leg` from `chain`, or `None` when no candidate fits.
pub fn select_contract<'a>(
    chain: &'a [OptionQuote],
    leg: &StrategyLeg,
    underlying_price: Decimal,
) -> Option<&'a OptionQuote> {
    let candidates: Vec<&OptionQuote> = chain
        .iter()
        .filter(|q| q.option_type == leg.option_type)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    match leg.strike_offset {
        StrikeOffset::Atm => at_the_money(&candidates, underlying_price),
        StrikeOffset::OtmHigh => match leg.option_type {
            OptionType::Call => nearest_above(&candidates, underlying_price),
            // "High" denotes the symmetric OTM leg for puts: nearest below, not deep.
            OptionType::Put => nearest_below(&candidates, underlying_price),
        },
        StrikeOffset::OtmLow => match leg.option_type {
            OptionType::Put => nearest_below(&candidates, underlying_price),
            OptionType::Call => nearest_above(&candidates, underlying_price),
        },
        StrikeOffset::Itm => match leg.option_type {
            OptionType::Call => nearest_below(&candidates, underlying_price),
            OptionType::Put => nearest_above(&candidates, underlying_price),
        },
        StrikeOffset::Delta(target) => {
            let with_delta = candidates.iter().any(|q| q.delta.is_some());
            if with_delta {
                closest_delta(&candidates, target)
            } else {
                at_the_money(&candidates, underlying_price)
            }
        }
    }
}

/// Strike minimizing |strike - price|. First-wins on ties.
fn at_the_money<'a>(candidates: &[&'a OptionQuote], price: Decimal) -> Option<&'a OptionQuote> {
    let mut best: Option<&OptionQuote> = None;
    let mut best_dist = Decimal::MAX;
    for q in candidates {
        let dist = (q.strike - price).abs();
        if dist < best_dist {
            best_dist = dist;
            best = Some(q);
        }
    }
    best
}

/// Lowest strike strictly above price. First-wins on ties.
fn nearest_above<'a>(candidates: &[&'a OptionQuote], price: Decimal) -> Option<&'a OptionQuote> {
    let mut best: Option<&OptionQuote> = None;
    for q in candidates {
        if q.strike <= price {
            continue;
        }
        match best {
            Some(b) if q.strike >= b.strike => {}
            _ => best = Some(q),
        }
    }
    best
}

/// Highest strike strictly below price. First-wins on ties.
fn nearest_below<'a>(candidates: &[&'a OptionQuote], price: Decimal) -> Option<&'a OptionQuote> {
    let mut best: Option<&OptionQuote> = None;
    for q in candidates {
        if q.strike >= price {
            continue;
        }
        match best {
            Some(b) if q.strike <= b.strike => {}
            _ => best = Some(q),
        }
    }
    best
}

/// Contract with delta closest to the target, among those carrying delta.
fn closest_delta<'a>(candidates: &[&'a OptionQuote], target: f64) -> Option<&'a OptionQuote> {
    let mut best: Option<&OptionQuote> = None;
    let mut best_diff = f64::INFINITY;
    for q in candidates {
        let Some(delta) = q.delta else { continue };
        let diff = (delta - target).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some(q);
        }
    }
    best
}

/// Build the analysis-facing contract from a quote. `None` when no usable premium.
pub fn to_contract(quote: &OptionQuote) -> Option<OptionContract> {
    let premium = quote.mid()?;
    Some(OptionContract {
        symbol: quote.symbol.clone(),
        underlying: quote.underlying.clone(),
        underlying_class: UnderlyingClass::classify(&quote.underlying),
        option_type: quote.option_type,
        strike: quote.strike,
        expiration: quote.expiration,
        premium,
        contract_size: Decimal::from(100),
    })
}

/// Estimate the underlying price and ATM implied volatility from a chain.
///
/// The call nearest 0.5 delta anchors both: price is its strike plus half
/// its mid. `None` when no call carries delta or the anchor has no price.
pub fn underlying_reference(chain: &[OptionQuote]) -> Option<(Decimal, Option<f64>)> {
    let mut best: Option<(&OptionQuote, f64)> = None;
    for quote in chain {
        if quote.option_type != OptionType::Call {
            continue;
        }
        let Some(delta) = quote.delta else { continue };
        let diff = (delta - 0.5).abs();
        match best {
            Some((_, d)) if diff >= d => {}
            _ => best = Some((quote, diff)),
        }
    }
    let (quote, _) = best?;
    let mid = quote.mid()?;
    Some((
        quote.strike + mid / Decimal::from(2),
        quote.implied_volatility,
    ))
}

/// Extract greeks from a quote, defaulting any missing value to zero.
pub fn to_greeks(quote: &OptionQuote) -> Greeks {
    Greeks {
        delta: quote.delta.unwrap_or(0.0),
        gamma: quote.gamma.unwrap_or(0.0),
        theta: quote.theta.unwrap_or(0.0),
        vega: quote.vega.unwrap_or(0.0),
        rho: quote.rho,
    }
}

//! Contract quantity sizing from the remaining daily loss budget.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Contracts to buy so that a full stop-out stays inside `remaining_budget`.
///
/// Risk per contract is the premium times the stop fraction times contract
/// size. The result is clamped to `1..=max_position_size`; affordability of
/// the minimum one contract is checked by the caller before entry.
pub fn contracts_for(
    remaining_budget: Decimal,
    premium: Decimal,
    stop_loss_pct: Decimal,
    max_position_size: u32,
) -> u32 {
    let risk_per_contract = premium * stop_loss_pct / Decimal::from(100) * Decimal::from(100);
    if risk_per_contract <= Decimal::ZERO {
        return 1;
    }
    let raw = (remaining_budget / risk_per_contract)
        .floor()
        .to_u32()
        .unwrap_or(0);
    raw.clamp(1, max_position_size)
}

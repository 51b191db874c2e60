//! Account endpoint mapping.

use odte_core::market::AccountSummary;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::client::AlpacaClient;
use crate::error::AlpacaError;

/// Wire shape of `/v2/account`. Alpaca encodes money fields as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiAccount {
    #[serde(with = "rust_decimal::serde::str")]
    equity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    cash: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    buying_power: Decimal,
    #[serde(default)]
    daytrade_count: u32,
    #[serde(default)]
    pattern_day_trader: bool,
    #[serde(default)]
    trading_blocked: bool,
}

impl From<ApiAccount> for AccountSummary {
    fn from(api: ApiAccount) -> Self {
        Self {
            equity: api.equity,
            cash: api.cash,
            buying_power: api.buying_power,
            daytrade_count: api.daytrade_count,
            pattern_day_trader: api.pattern_day_trader,
            trading_blocked: api.trading_blocked,
        }
    }
}

impl AlpacaClient {
    /// Fetch the current account snapshot.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn fetch_account(&self) -> Result<AccountSummary, AlpacaError> {
        let url = format!("{}/v2/account", self.config.base_url);
        let api: ApiAccount = self.get(&url).await?;
        Ok(api.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn account_decodes_string_money_fields() {
        let json = r#"{
            "equity": "25000.50",
            "cash": "10000.00",
            "buying_power": "50001.00",
            "daytrade_count": 2,
            "pattern_day_trader": false,
            "trading_blocked": false
        }"#;
        let api: ApiAccount = serde_json::from_str(json).unwrap();
        let summary: AccountSummary = api.into();
        assert_eq!(summary.equity, dec!(25000.50));
        assert_eq!(summary.buying_power, dec!(50001.00));
        assert_eq!(summary.daytrade_count, 2);
        assert!(!summary.trading_blocked);
    }

    #[test]
    fn account_defaults_optional_flags() {
        let json = r#"{
            "equity": "100.00",
            "cash": "100.00",
            "buying_power": "200.00"
        }"#;
        let api: ApiAccount = serde_json::from_str(json).unwrap();
        let summary: AccountSummary = api.into();
        assert_eq!(summary.daytrade_count, 0);
        assert!(!summary.pattern_day_trader);
    }
}

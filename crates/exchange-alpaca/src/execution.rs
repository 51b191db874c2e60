//! Order submission and position management.
//!
//! Same-day-expiry gates run before any network call: a closed market or a
//! passed cutoff rejects the order locally instead of burning an API round
//! trip on a guaranteed rejection.

use async_trait::async_trait;
use chrono::Utc;
use odte_core::calendar;
use odte_core::market::{BrokerPosition, OrderAck, OrderRequest, OrderSide, OrderType, TimeInForce};
use odte_core::traits::Brokerage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::AlpacaClient;
use crate::error::AlpacaError;

#[derive(Debug, Serialize)]
struct ApiOrder {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
}

impl From<&OrderRequest> for ApiOrder {
    fn from(request: &OrderRequest) -> Self {
        let (order_type, limit_price) = match request.order_type {
            OrderType::Market => ("market", None),
            OrderType::Limit { price } => ("limit", Some(price.to_string())),
        };
        Self {
            symbol: request.symbol.clone(),
            qty: request.qty.to_string(),
            side: match request.side {
                OrderSide::Buy => "buy",
                OrderSide::Sell => "sell",
            },
            order_type,
            time_in_force: match request.time_in_force {
                TimeInForce::Day => "day",
            },
            limit_price,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiOrderAck {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiPosition {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    qty: Decimal,
    avg_entry_price: Option<String>,
}

impl AlpacaClient {
    /// Submit an order, gated on market hours and the same-day-expiry cutoff.
    ///
    /// # Errors
    ///
    /// Fails locally with [`AlpacaError::MarketClosed`] or
    /// [`AlpacaError::PastCutoff`] before any request is made, or with
    /// transport/API errors afterwards.
    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, AlpacaError> {
        let now = Utc::now();
        if !calendar::is_market_open(now) {
            return Err(AlpacaError::MarketClosed {
                symbol: request.symbol.clone(),
            });
        }
        if !calendar::can_submit_zero_dte(now) {
            return Err(AlpacaError::PastCutoff {
                symbol: request.symbol.clone(),
            });
        }

        let url = format!("{}/v2/orders", self.config.base_url);
        let body = ApiOrder::from(request);
        let ack: ApiOrderAck = self.post(&url, &body).await?;
        info!(
            symbol = %request.symbol,
            qty = request.qty,
            side = ?request.side,
            order_id = %ack.id,
            status = %ack.status,
            "order submitted"
        );
        Ok(OrderAck {
            id: ack.id,
            status: ack.status,
        })
    }

    /// Close the full position in `symbol` at market.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn liquidate(&self, symbol: &str) -> Result<(), AlpacaError> {
        let url = format!("{}/v2/positions/{symbol}", self.config.base_url);
        self.delete(&url).await?;
        info!(symbol, "position closed");
        Ok(())
    }

    /// Fetch all open positions from the brokerage ledger.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn open_positions(&self) -> Result<Vec<BrokerPosition>, AlpacaError> {
        let url = format!("{}/v2/positions", self.config.base_url);
        let api: Vec<ApiPosition> = self.get(&url).await?;
        Ok(api
            .into_iter()
            .map(|p| BrokerPosition {
                symbol: p.symbol,
                qty: p.qty,
                avg_entry_price: p.avg_entry_price.and_then(|s| s.parse().ok()),
            })
            .collect())
    }
}

#[async_trait]
impl Brokerage for AlpacaClient {
    async fn account(&self) -> anyhow::Result<odte_core::market::AccountSummary> {
        Ok(self.fetch_account().await?)
    }

    async fn submit_order(&self, request: &OrderRequest) -> anyhow::Result<OrderAck> {
        Ok(self.place_order(request).await?)
    }

    async fn close_position(&self, symbol: &str) -> anyhow::Result<()> {
        Ok(self.liquidate(symbol).await?)
    }

    async fn positions(&self) -> anyhow::Result<Vec<BrokerPosition>> {
        Ok(self.open_positions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_order_serializes_with_price() {
        let request = OrderRequest {
            symbol: "SPY250829C00500000".to_string(),
            qty: 2,
            side: OrderSide::Buy,
            order_type: OrderType::Limit { price: dec!(2.55) },
            time_in_force: TimeInForce::Day,
        };
        let body = ApiOrder::from(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "limit");
        assert_eq!(json["limit_price"], "2.55");
        assert_eq!(json["qty"], "2");
        assert_eq!(json["time_in_force"], "day");
    }

    #[test]
    fn market_order_omits_limit_price() {
        let request = OrderRequest {
            symbol: "SPY250829P00490000".to_string(),
            qty: 1,
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
        };
        let json = serde_json::to_value(ApiOrder::from(&request)).unwrap();
        assert_eq!(json["type"], "market");
        assert_eq!(json["side"], "sell");
        assert!(json.get("limit_price").is_none());
    }

    #[test]
    fn position_decodes_string_quantities() {
        let json = r#"[{
            "symbol": "SPY250829C00500000",
            "qty": "3",
            "avg_entry_price": "2.50"
        }]"#;
        let api: Vec<ApiPosition> = serde_json::from_str(json).unwrap();
        assert_eq!(api[0].qty, dec!(3));
    }
}

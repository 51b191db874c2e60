//! Options chain and stock snapshot endpoints.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use odte_core::market::{OptionQuote, OptionType, QuoteSnapshot};
use odte_core::traits::MarketData;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::client::AlpacaClient;
use crate::error::AlpacaError;

#[derive(Debug, Deserialize)]
struct ChainResponse {
    #[serde(default)]
    snapshots: HashMap<String, OptionSnapshot>,
}

#[derive(Debug, Deserialize)]
struct OptionSnapshot {
    #[serde(rename = "latestQuote")]
    latest_quote: Option<ApiQuote>,
    #[serde(rename = "latestTrade")]
    latest_trade: Option<ApiTrade>,
    greeks: Option<ApiGreeks>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
    #[serde(rename = "dailyBar")]
    daily_bar: Option<ApiBar>,
}

#[derive(Debug, Deserialize)]
struct ApiQuote {
    #[serde(rename = "bp")]
    bid: Option<Decimal>,
    #[serde(rename = "ap")]
    ask: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiTrade {
    #[serde(rename = "p")]
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiGreeks {
    delta: Option<f64>,
    gamma: Option<f64>,
    theta: Option<f64>,
    vega: Option<f64>,
    rho: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiBar {
    #[serde(rename = "v", default)]
    volume: u64,
}

#[derive(Debug, Deserialize)]
struct StockSnapshotResponse {
    #[serde(rename = "latestQuote")]
    latest_quote: Option<ApiQuote>,
    #[serde(rename = "latestTrade")]
    latest_trade: Option<ApiTrade>,
}

/// Decode an OCC option symbol given its underlying prefix.
///
/// `SPY250829C00500000` reads as SPY, 2025-08-29, call, strike 500.000.
fn parse_occ(symbol: &str, underlying: &str) -> Option<(NaiveDate, OptionType, Decimal)> {
    let rest = symbol.strip_prefix(underlying)?;
    if rest.len() != 15 {
        return None;
    }
    let expiration = NaiveDate::parse_from_str(&rest[..6], "%y%m%d").ok()?;
    let option_type = match &rest[6..7] {
        "C" => OptionType::Call,
        "P" => OptionType::Put,
        _ => return None,
    };
    let thousandths: i64 = rest[7..].parse().ok()?;
    Some((expiration, option_type, Decimal::new(thousandths, 3)))
}

fn to_quote(symbol: &str, underlying: &str, snapshot: OptionSnapshot) -> Option<OptionQuote> {
    let (expiration, option_type, strike) = parse_occ(symbol, underlying)?;
    let greeks = snapshot.greeks;
    Some(OptionQuote {
        symbol: symbol.to_string(),
        underlying: underlying.to_string(),
        option_type,
        strike,
        expiration,
        bid: snapshot.latest_quote.as_ref().and_then(|q| q.bid),
        ask: snapshot.latest_quote.as_ref().and_then(|q| q.ask),
        last: snapshot.latest_trade.as_ref().and_then(|t| t.price),
        volume: snapshot.daily_bar.map(|b| b.volume).unwrap_or_default(),
        open_interest: 0,
        implied_volatility: snapshot.implied_volatility,
        delta: greeks.as_ref().and_then(|g| g.delta),
        gamma: greeks.as_ref().and_then(|g| g.gamma),
        theta: greeks.as_ref().and_then(|g| g.theta),
        vega: greeks.as_ref().and_then(|g| g.vega),
        rho: greeks.as_ref().and_then(|g| g.rho),
    })
}

impl AlpacaClient {
    /// Fetch the chain of contracts expiring today for `underlying`.
    ///
    /// Malformed symbols and quotes that fail validation are dropped with a
    /// warning rather than failing the whole snapshot.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn today_chain(&self, underlying: &str) -> Result<Vec<OptionQuote>, AlpacaError> {
        let today = Utc::now().date_naive();
        let url = format!(
            "{}/v1beta1/options/snapshots/{underlying}?feed=indicative&limit=1000&expiration_date={}",
            self.config.data_url,
            today.format("%Y-%m-%d"),
        );
        let response: ChainResponse = self.get(&url).await?;

        let mut chain = Vec::with_capacity(response.snapshots.len());
        for (symbol, snapshot) in response.snapshots {
            let Some(quote) = to_quote(&symbol, underlying, snapshot) else {
                warn!(%symbol, "dropping contract with unparseable symbol");
                continue;
            };
            if !quote.is_valid() {
                warn!(%symbol, "dropping contract with invalid quote data");
                continue;
            }
            chain.push(quote);
        }
        // HashMap iteration order is arbitrary; fix it so selection ties
        // resolve the same way across runs.
        chain.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(chain)
    }

    /// Fetch the latest stock quote and trade for `symbol`.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn stock_snapshot(&self, symbol: &str) -> Result<QuoteSnapshot, AlpacaError> {
        let url = format!("{}/v2/stocks/{symbol}/snapshot", self.config.data_url);
        let response: StockSnapshotResponse = self.get(&url).await?;
        Ok(QuoteSnapshot {
            symbol: symbol.to_string(),
            bid: response.latest_quote.as_ref().and_then(|q| q.bid),
            ask: response.latest_quote.as_ref().and_then(|q| q.ask),
            last: response.latest_trade.as_ref().and_then(|t| t.price),
            open_interest: 0,
            timestamp: Utc::now(),
        })
    }

    /// Latest quote for one option contract, via a single-symbol chain query.
    ///
    /// # Errors
    ///
    /// Fails on transport or API errors.
    pub async fn option_snapshot(&self, symbol: &str) -> Result<QuoteSnapshot, AlpacaError> {
        let url = format!(
            "{}/v1beta1/options/snapshots?symbols={symbol}&feed=indicative",
            self.config.data_url,
        );
        let response: ChainResponse = self.get(&url).await?;
        let snapshot = response.snapshots.into_iter().next().map(|(_, s)| s);
        Ok(QuoteSnapshot {
            symbol: symbol.to_string(),
            bid: snapshot
                .as_ref()
                .and_then(|s| s.latest_quote.as_ref())
                .and_then(|q| q.bid),
            ask: snapshot
                .as_ref()
                .and_then(|s| s.latest_quote.as_ref())
                .and_then(|q| q.ask),
            last: snapshot
                .as_ref()
                .and_then(|s| s.latest_trade.as_ref())
                .and_then(|t| t.price),
            open_interest: 0,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl MarketData for AlpacaClient {
    async fn zero_dte_chain(&self, underlying: &str) -> anyhow::Result<Vec<OptionQuote>> {
        Ok(self.today_chain(underlying).await?)
    }

    async fn snapshot(&self, symbol: &str) -> anyhow::Result<QuoteSnapshot> {
        Ok(self.option_snapshot(symbol).await?)
    }
}

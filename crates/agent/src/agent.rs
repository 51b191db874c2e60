//! The scan/monitor/execute loop.
//!
//! One agent per process, one tokio task, no shared state. Every cycle is a
//! full pass: mark open positions against fresh quotes, then look for new
//! entries if the gates allow it. The end-of-day unwind and shutdown both
//! flatten the book before the loop exits.

use std::time::Duration;

use anyhow::{Context, Result};
use odte_core::calendar;
use odte_core::config::AgentConfig;
use odte_core::market::{
    AccountSummary, OptionQuote, OrderRequest, OrderSide, OrderType, TimeInForce,
};
use odte_core::traits::{Brokerage, MarketData};
use odte_strategy::{catalog, underlying_reference, Analyzer, MarketVolatility, StrategyAnalysis};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::position::{ExitReason, TrackedPosition};
use crate::scheduler::{self, Clock};
use crate::sizing;

const RISK_FREE_RATE: f64 = 0.05;

/// Single-task trading agent over injectable brokerage, data, and clock.
pub struct TradingAgent<B, M, C> {
    broker: B,
    data: M,
    clock: C,
    config: AgentConfig,
    positions: Vec<TrackedPosition>,
    daily_pnl: Decimal,
    cycles: u64,
    running: bool,
}

impl<B: Brokerage, M: MarketData, C: Clock> TradingAgent<B, M, C> {
    pub fn new(broker: B, data: M, clock: C, config: AgentConfig) -> Self {
        Self {
            broker,
            data,
            clock,
            config,
            positions: Vec::new(),
            daily_pnl: Decimal::ZERO,
            cycles: 0,
            running: false,
        }
    }

    pub fn positions(&self) -> &[TrackedPosition] {
        &self.positions
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Preflight checks and daily counter reset.
    ///
    /// # Errors
    ///
    /// Fails when the brokerage is unreachable or the account is blocked
    /// from trading.
    pub async fn start(&mut self) -> Result<()> {
        if self.running {
            warn!("start called on a running agent, ignoring");
            return Ok(());
        }
        let account = self
            .broker
            .account()
            .await
            .context("brokerage connectivity check failed")?;
        if account.trading_blocked {
            anyhow::bail!("account is blocked from trading");
        }
        self.daily_pnl = Decimal::ZERO;
        self.cycles = 0;
        self.running = true;

        match calendar::secs_to_cutoff(self.clock.now()) {
            Some(secs) => info!(
                tag = "SCHEDULE",
                mode = self.config.mode_tag(),
                secs_to_cutoff = secs,
                equity = %account.equity,
                "agent started"
            ),
            None => warn!(
                tag = "SCHEDULE",
                mode = self.config.mode_tag(),
                "started after the same-day order cutoff, entries disabled"
            ),
        }
        Ok(())
    }

    /// Run until the end-of-day unwind or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Fails only when startup checks fail; in-flight cycle errors are
    /// logged and the loop continues.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.start().await?;

        if let Err(err) = self.cycle().await {
            error!(error = %err, "cycle failed");
        }

        let mut interval = tokio::time::interval(Duration::from_secs(
            self.config.scan_interval_secs,
        ));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial cycle already ran.
        interval.tick().await;

        let eod = tokio::time::sleep_until(scheduler::eod_deadline(&self.clock));
        tokio::pin!(eod);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.cycle().await {
                        error!(error = %err, "cycle failed");
                    }
                }
                () = &mut eod => {
                    self.unwind_all(ExitReason::EndOfDay).await;
                    self.stop();
                }
                _ = shutdown.changed() => {
                    self.unwind_all(ExitReason::Shutdown).await;
                    self.stop();
                }
            }
            if !self.running {
                break;
            }
        }

        info!(
            tag = "STOP",
            cycles = self.cycles,
            daily_pnl = %self.daily_pnl,
            "agent stopped"
        );
        Ok(())
    }

    /// One full pass: monitor always, scan only when ungated.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for future hard-stop conditions.
    pub async fn cycle(&mut self) -> Result<()> {
        self.cycles += 1;
        let now = self.clock.now();
        let market_open = calendar::is_market_open(now);
        let before_cutoff = calendar::can_submit_zero_dte(now);
        // Realized P/L of either sign counts against the daily budget.
        let budget_exhausted = self.daily_pnl.abs() >= self.config.max_daily_loss;
        let gated = !market_open || !before_cutoff || budget_exhausted;

        info!(
            tag = "CYCLE",
            mode = self.config.mode_tag(),
            cycle = self.cycles,
            gated,
            positions = self.positions.len(),
            daily_pnl = %self.daily_pnl,
            "cycle start"
        );
        if budget_exhausted {
            warn!(
                tag = "RISK",
                daily_pnl = %self.daily_pnl,
                limit = %self.config.max_daily_loss,
                "daily budget exhausted, entries disabled"
            );
        }

        self.monitor().await;

        if !gated && self.positions.len() < self.config.max_positions {
            self.scan().await;
        }
        Ok(())
    }

    /// Mark every open position and exit the ones that hit a level.
    async fn monitor(&mut self) {
        let mut idx = 0;
        while idx < self.positions.len() {
            let symbol = self.positions[idx].symbol.clone();
            let mark = match self.data.snapshot(&symbol).await {
                Ok(snapshot) => snapshot.mid(),
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "snapshot failed, keeping position");
                    None
                }
            };
            let Some(mark) = mark else {
                idx += 1;
                continue;
            };
            let position = &self.positions[idx];
            let reason = if mark <= position.stop_price {
                Some(ExitReason::StopLoss)
            } else if mark >= position.target_price {
                Some(ExitReason::TakeProfit)
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    if !self.exit(idx, reason, mark).await {
                        idx += 1;
                    }
                }
                None => idx += 1,
            }
        }
    }

    /// Evaluate every configured strategy on every configured underlying.
    async fn scan(&mut self) {
        let account = match self.broker.account().await {
            Ok(account) => account,
            Err(err) => {
                warn!(tag = "SCAN", error = %err, "account fetch failed, skipping scan");
                return;
            }
        };

        for underlying in self.config.underlyings.clone() {
            if self.positions.len() >= self.config.max_positions {
                break;
            }
            let chain = match self.data.zero_dte_chain(&underlying).await {
                Ok(chain) => chain,
                Err(err) => {
                    warn!(tag = "SCAN", %underlying, error = %err, "chain fetch failed");
                    continue;
                }
            };
            if chain.is_empty() {
                info!(tag = "SCAN", %underlying, "no same-day contracts");
                continue;
            }
            let Some((price, atm_iv)) = underlying_reference(&chain) else {
                warn!(tag = "SCAN", %underlying, "no delta data to anchor a price estimate");
                continue;
            };
            let volatility = MarketVolatility::from_atm_iv(atm_iv);
            let time_to_expiry = calendar::secs_to_cutoff(self.clock.now()).unwrap_or(0) as f64
                / (365.25 * 24.0 * 3600.0);
            let analyzer = Analyzer::new(
                RISK_FREE_RATE,
                atm_iv.unwrap_or(0.0),
                price,
                time_to_expiry,
            );
            info!(
                tag = "SCAN",
                %underlying,
                price = %price,
                contracts = chain.len(),
                volatility = ?volatility,
                "scanning chain"
            );

            for name in self.config.strategies.clone() {
                if self.positions.len() >= self.config.max_positions {
                    break;
                }
                let Some(strategy) = catalog::find(&name) else {
                    warn!(tag = "SCAN", strategy = %name, "unknown strategy name");
                    continue;
                };
                let analysis = match analyzer.analyze(&strategy, &chain, volatility) {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        debug!(tag = "SCAN", strategy = %name, error = %err, "analysis skipped");
                        continue;
                    }
                };
                info!(
                    tag = "SCAN",
                    strategy = %name,
                    recommendation = %analysis.recommendation,
                    max_loss = %analysis.risk_profile.max_loss,
                    max_profit = %analysis.risk_profile.max_profit,
                    "strategy evaluated"
                );
                if !analysis.recommendation.meets(self.config.min_recommendation) {
                    continue;
                }
                self.enter(&analysis, &chain, &account, price).await;
            }
        }
    }

    /// Open a position on the analysis, subject to the premium and budget
    /// checks. Multi-leg strategies trade their first leg only for now.
    async fn enter(
        &mut self,
        analysis: &StrategyAnalysis,
        chain: &[OptionQuote],
        account: &AccountSummary,
        underlying_price: Decimal,
    ) {
        let Some(contract) = analysis.contracts.first() else {
            return;
        };
        if analysis.contracts.len() > 1 {
            info!(
                tag = "ENTRY",
                strategy = analysis.strategy.name,
                legs = analysis.contracts.len(),
                "multi-leg order routing unavailable, trading first leg only"
            );
        }
        if self.positions.iter().any(|p| p.symbol == contract.symbol) {
            return;
        }

        let premium = contract.premium;
        if premium <= Decimal::ZERO {
            warn!(tag = "ENTRY", symbol = %contract.symbol, "non-positive premium, skipping");
            return;
        }
        let premium_cap = underlying_price * self.config.max_premium_pct / Decimal::from(100);
        if premium > premium_cap {
            info!(
                tag = "RISK",
                symbol = %contract.symbol,
                premium = %premium,
                cap = %premium_cap,
                "premium above cap, skipping"
            );
            return;
        }

        // Budget counts realized P/L by magnitude, and is re-checked here
        // because an exit earlier in the same cycle may have moved it after
        // the cycle gate was evaluated.
        let hundred = Decimal::from(100);
        let remaining = self.config.max_daily_loss - self.daily_pnl.abs();
        let max_notional = premium * Decimal::from(self.config.max_position_size) * hundred;
        if max_notional > remaining {
            warn!(
                tag = "RISK",
                symbol = %contract.symbol,
                max_notional = %max_notional,
                remaining_budget = %remaining,
                "entry would exceed the remaining daily budget, skipping"
            );
            return;
        }
        let qty = sizing::contracts_for(
            remaining,
            premium,
            self.config.stop_loss_pct,
            self.config.max_position_size,
        );
        let cost = premium * Decimal::from(qty) * hundred;
        if cost > account.buying_power {
            warn!(
                tag = "RISK",
                symbol = %contract.symbol,
                cost = %cost,
                buying_power = %account.buying_power,
                "insufficient buying power, skipping"
            );
            return;
        }

        let stop = premium * (hundred - self.config.stop_loss_pct) / hundred;
        let target = premium * (hundred + self.config.take_profit_pct) / hundred;
        let limit = chain
            .iter()
            .find(|q| q.symbol == contract.symbol)
            .and_then(|q| q.ask)
            .unwrap_or(premium);

        if self.config.dry_run {
            info!(
                tag = "DRY_RUN",
                strategy = analysis.strategy.name,
                symbol = %contract.symbol,
                qty,
                limit = %limit,
                "would buy"
            );
            return;
        }

        let request = OrderRequest {
            symbol: contract.symbol.clone(),
            qty,
            side: OrderSide::Buy,
            order_type: OrderType::Limit { price: limit },
            time_in_force: TimeInForce::Day,
        };
        match self.broker.submit_order(&request).await {
            Ok(ack) => {
                info!(
                    tag = "ENTRY",
                    mode = self.config.mode_tag(),
                    strategy = analysis.strategy.name,
                    symbol = %contract.symbol,
                    qty,
                    premium = %premium,
                    stop = %stop,
                    target = %target,
                    order_id = %ack.id,
                    "position opened"
                );
                self.positions.push(TrackedPosition {
                    symbol: contract.symbol.clone(),
                    order_id: ack.id,
                    strategy: analysis.strategy.name.to_string(),
                    qty,
                    entry_price: premium,
                    stop_price: stop,
                    target_price: target,
                    opened_at: self.clock.now(),
                });
            }
            Err(err) => {
                warn!(tag = "ENTRY", symbol = %contract.symbol, error = %err, "order rejected");
            }
        }
    }

    /// Close one position and realize its P/L. Returns true when the
    /// position was removed from tracking.
    async fn exit(&mut self, idx: usize, reason: ExitReason, mark: Decimal) -> bool {
        let position = self.positions[idx].clone();
        let pnl = position.pnl_at(mark);
        let tag = exit_tag(reason);

        if self.config.dry_run {
            info!(
                tag = "DRY_RUN",
                symbol = %position.symbol,
                reason = %reason,
                pnl = %pnl,
                "would close position"
            );
            self.daily_pnl += pnl;
            self.positions.remove(idx);
            return true;
        }

        if let Err(err) = self.broker.close_position(&position.symbol).await {
            warn!(
                symbol = %position.symbol,
                error = %err,
                "close failed, falling back to market sell"
            );
            let request = OrderRequest {
                symbol: position.symbol.clone(),
                qty: position.qty,
                side: OrderSide::Sell,
                order_type: OrderType::Market,
                time_in_force: TimeInForce::Day,
            };
            if let Err(err) = self.broker.submit_order(&request).await {
                error!(
                    tag = tag,
                    symbol = %position.symbol,
                    error = %err,
                    "market sell fallback failed, keeping position tracked"
                );
                return false;
            }
        }

        info!(
            tag = tag,
            mode = self.config.mode_tag(),
            symbol = %position.symbol,
            strategy = %position.strategy,
            reason = %reason,
            mark = %mark,
            pnl = %pnl,
            "position closed"
        );
        self.daily_pnl += pnl;
        self.positions.remove(idx);
        true
    }

    /// Flatten the whole book, marking each position at its latest mid
    /// (entry price when no quote is available).
    pub async fn unwind_all(&mut self, reason: ExitReason) {
        info!(
            tag = exit_tag(reason),
            positions = self.positions.len(),
            reason = %reason,
            "closing all positions"
        );
        let mut idx = 0;
        while idx < self.positions.len() {
            let symbol = self.positions[idx].symbol.clone();
            let entry = self.positions[idx].entry_price;
            let mark = match self.data.snapshot(&symbol).await {
                Ok(snapshot) => snapshot.mid().unwrap_or(entry),
                Err(_) => entry,
            };
            if !self.exit(idx, reason, mark).await {
                idx += 1;
            }
        }
    }

    /// Idempotent: stopping a stopped agent is a no-op.
    pub fn stop(&mut self) {
        self.running = false;
    }
}

/// Log tag for a position exit, keyed on why it happened.
fn exit_tag(reason: ExitReason) -> &'static str {
    match reason {
        ExitReason::StopLoss => "STOP_LOSS",
        ExitReason::TakeProfit => "TAKE_PROFIT",
        ExitReason::EndOfDay => "EOD",
        ExitReason::Shutdown => "EXIT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::FixedClock;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use odte_core::market::{BrokerPosition, OptionType, OrderAck, QuoteSnapshot};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockBroker {
        account: AccountSummary,
        orders: Mutex<Vec<OrderRequest>>,
        closed: Mutex<Vec<String>>,
        fail_close: bool,
        fail_market_sell: bool,
    }

    impl MockBroker {
        fn new() -> Self {
            Self {
                account: AccountSummary {
                    equity: dec!(25000),
                    cash: dec!(25000),
                    buying_power: dec!(50000),
                    daytrade_count: 0,
                    pattern_day_trader: false,
                    trading_blocked: false,
                },
                orders: Mutex::new(Vec::new()),
                closed: Mutex::new(Vec::new()),
                fail_close: false,
                fail_market_sell: false,
            }
        }
    }

    #[async_trait]
    impl Brokerage for &MockBroker {
        async fn account(&self) -> Result<AccountSummary> {
            Ok(self.account.clone())
        }

        async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck> {
            if self.fail_market_sell && request.side == OrderSide::Sell {
                anyhow::bail!("order rejected");
            }
            self.orders.lock().unwrap().push(request.clone());
            Ok(OrderAck {
                id: "order-1".to_string(),
                status: "accepted".to_string(),
            })
        }

        async fn close_position(&self, symbol: &str) -> Result<()> {
            if self.fail_close {
                anyhow::bail!("position close rejected");
            }
            self.closed.lock().unwrap().push(symbol.to_string());
            Ok(())
        }

        async fn positions(&self) -> Result<Vec<BrokerPosition>> {
            Ok(Vec::new())
        }
    }

    struct MockData {
        chain: Vec<OptionQuote>,
        marks: Mutex<HashMap<String, Decimal>>,
        chain_fetches: Mutex<usize>,
    }

    impl MockData {
        fn new(chain: Vec<OptionQuote>) -> Self {
            Self {
                chain,
                marks: Mutex::new(HashMap::new()),
                chain_fetches: Mutex::new(0),
            }
        }

        fn chain_fetches(&self) -> usize {
            *self.chain_fetches.lock().unwrap()
        }

        fn set_mark(&self, symbol: &str, mark: Decimal) {
            self.marks.lock().unwrap().insert(symbol.to_string(), mark);
        }
    }

    #[async_trait]
    impl MarketData for &MockData {
        async fn zero_dte_chain(&self, _underlying: &str) -> Result<Vec<OptionQuote>> {
            *self.chain_fetches.lock().unwrap() += 1;
            Ok(self.chain.clone())
        }

        async fn snapshot(&self, symbol: &str) -> Result<QuoteSnapshot> {
            let mark = self
                .marks
                .lock()
                .unwrap()
                .get(symbol)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no quote for {symbol}"))?;
            Ok(QuoteSnapshot {
                symbol: symbol.to_string(),
                bid: None,
                ask: None,
                last: Some(mark),
                open_interest: 0,
                timestamp: Utc::now(),
            })
        }
    }

    fn quote(
        option_type: OptionType,
        strike: Decimal,
        bid: Decimal,
        ask: Decimal,
        delta: f64,
    ) -> OptionQuote {
        OptionQuote {
            symbol: format!("SPY-{strike}-{option_type}"),
            underlying: "SPY".to_string(),
            option_type,
            strike,
            expiration: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            bid: Some(bid),
            ask: Some(ask),
            last: None,
            volume: 100,
            open_interest: 500,
            implied_volatility: Some(0.22),
            delta: Some(delta),
            gamma: Some(0.02),
            theta: Some(-0.05),
            vega: Some(0.10),
            rho: None,
        }
    }

    fn chain() -> Vec<OptionQuote> {
        vec![
            quote(OptionType::Call, dec!(500), dec!(2.40), dec!(2.60), 0.50),
            quote(OptionType::Call, dec!(505), dec!(1.10), dec!(1.30), 0.35),
            quote(OptionType::Put, dec!(495), dec!(1.00), dec!(1.20), -0.35),
            quote(OptionType::Put, dec!(500), dec!(2.30), dec!(2.50), -0.50),
        ]
    }

    // 13:00 ET on a June Tuesday: open, well before the cutoff.
    fn midday() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 17, 0, 0).unwrap())
    }

    // Sized so the 2.50 ATM premium passes the worst-case budget check:
    // 2.50 x 4 x 100 = 1000, exactly the default daily budget.
    fn config() -> AgentConfig {
        AgentConfig {
            strategies: vec!["long_call_stock".to_string()],
            max_position_size: 4,
            ..AgentConfig::default()
        }
    }

    fn agent<'a>(
        broker: &'a MockBroker,
        data: &'a MockData,
        clock: FixedClock,
        config: AgentConfig,
    ) -> TradingAgent<&'a MockBroker, &'a MockData, FixedClock> {
        TradingAgent::new(broker, data, clock, config)
    }

    #[tokio::test]
    async fn scan_enters_a_recommended_position() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();

        // ATM call at 500, mid 2.50. The sizer allows 8 contracts at a 50%
        // stop but the per-trade cap clamps to 4.
        assert_eq!(agent.positions().len(), 1);
        let p = &agent.positions()[0];
        assert_eq!(p.qty, 4);
        assert_eq!(p.order_id, "order-1");
        assert_eq!(p.entry_price, dec!(2.50));
        assert_eq!(p.stop_price, dec!(1.25));
        assert_eq!(p.target_price, dec!(5.00));

        let orders = broker.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].order_type, OrderType::Limit { price: dec!(2.60) });
    }

    #[tokio::test]
    async fn no_duplicate_entry_on_the_same_contract() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(2.55));
        agent.cycle().await.unwrap();

        assert_eq!(agent.positions().len(), 1);
        assert_eq!(broker.orders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gated_cycle_after_cutoff_skips_entries() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        // 15:20 ET, past the same-day cutoff.
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 19, 20, 0).unwrap());
        let mut agent = agent(&broker, &data, clock, config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();

        assert!(agent.positions().is_empty());
        assert!(broker.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_loss_exit_realizes_loss_and_shrinks_the_budget() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        assert_eq!(agent.positions().len(), 1);

        // Mark below the 1.25 stop: (1.20 - 2.50) * 4 * 100 = -520.
        data.set_mark("SPY-500-call", dec!(1.20));
        agent.cycle().await.unwrap();

        assert!(agent.positions().is_empty());
        assert_eq!(agent.daily_pnl(), dec!(-520.00));
        assert_eq!(broker.closed.lock().unwrap().as_slice(), ["SPY-500-call"]);

        // Remaining budget is 480; a worst-case 1000 entry no longer fits,
        // so no re-entry on this or the next cycle.
        agent.cycle().await.unwrap();
        assert!(agent.positions().is_empty());
        assert_eq!(broker.orders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn take_profit_exit_realizes_gain() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();

        // Mark above the 5.00 target: (5.10 - 2.50) * 4 * 100 = 1040.
        data.set_mark("SPY-500-call", dec!(5.10));
        agent.cycle().await.unwrap();

        assert_eq!(agent.daily_pnl(), dec!(1040.00));
        assert_eq!(broker.closed.lock().unwrap().as_slice(), ["SPY-500-call"]);
        // Realized P/L counts against the budget by magnitude, so the big
        // win also blocks re-entry for the day.
        assert!(agent.positions().is_empty());
        assert_eq!(broker.orders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gain_past_the_daily_limit_gates_the_cycle() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(5.10));
        agent.cycle().await.unwrap();
        assert_eq!(agent.daily_pnl(), dec!(1040.00));
        let fetches = data.chain_fetches();

        // 1040 in gains exhausts the $1000 budget just like a loss would,
        // so the next cycle must not even scan the chain.
        agent.cycle().await.unwrap();
        assert_eq!(data.chain_fetches(), fetches);
        assert_eq!(broker.orders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gated_cycle_still_monitors_positions() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let clock = midday();
        let mut agent = agent(&broker, &data, clock.clone(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        assert_eq!(agent.positions().len(), 1);

        // Past the cutoff the cycle is gated, but the open position still
        // gets marked and exits at its target.
        clock.set(Utc.with_ymd_and_hms(2025, 6, 10, 19, 20, 0).unwrap());
        data.set_mark("SPY-500-call", dec!(5.10));
        agent.cycle().await.unwrap();

        assert!(agent.positions().is_empty());
        assert_eq!(agent.daily_pnl(), dec!(1040.00));
    }

    #[tokio::test]
    async fn start_on_a_running_agent_keeps_the_day_counters() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(5.10));
        agent.cycle().await.unwrap();
        assert_eq!(agent.daily_pnl(), dec!(1040.00));

        agent.start().await.unwrap();
        assert_eq!(agent.daily_pnl(), dec!(1040.00));
        assert!(agent.is_running());
    }

    #[tokio::test]
    async fn unwind_closes_every_position() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(2.50));

        agent.unwind_all(ExitReason::EndOfDay).await;

        assert!(agent.positions().is_empty());
        assert_eq!(agent.daily_pnl(), dec!(0.00));
        assert_eq!(broker.closed.lock().unwrap().len(), 1);

        agent.stop();
        agent.stop();
        assert!(!agent.is_running());
    }

    #[tokio::test]
    async fn shutdown_unwind_flattens_the_book() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(2.50));

        agent.unwind_all(ExitReason::Shutdown).await;

        assert!(agent.positions().is_empty());
        assert_eq!(broker.closed.lock().unwrap().as_slice(), ["SPY-500-call"]);
    }

    #[tokio::test]
    async fn failed_close_falls_back_to_market_sell() {
        let mut broker = MockBroker::new();
        broker.fail_close = true;
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(1.00));
        agent.cycle().await.unwrap();

        assert!(agent.positions().is_empty());
        let orders = broker.orders.lock().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].side, OrderSide::Sell);
        assert_eq!(orders[1].order_type, OrderType::Market);
    }

    #[tokio::test]
    async fn double_exit_failure_keeps_the_position_tracked() {
        let mut broker = MockBroker::new();
        broker.fail_close = true;
        broker.fail_market_sell = true;
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();
        data.set_mark("SPY-500-call", dec!(1.00));
        agent.cycle().await.unwrap();

        assert_eq!(agent.positions().len(), 1);
        assert_eq!(agent.daily_pnl(), dec!(0));
    }

    #[tokio::test]
    async fn dry_run_logs_without_submitting() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let cfg = AgentConfig {
            dry_run: true,
            ..config()
        };
        let mut agent = agent(&broker, &data, midday(), cfg);

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();

        assert!(agent.positions().is_empty());
        assert!(broker.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_account_fails_startup() {
        let mut broker = MockBroker::new();
        broker.account.trading_blocked = true;
        let data = MockData::new(chain());
        let mut agent = agent(&broker, &data, midday(), config());

        assert!(agent.start().await.is_err());
        assert!(!agent.is_running());
    }

    #[tokio::test]
    async fn max_positions_limits_entries() {
        let broker = MockBroker::new();
        let data = MockData::new(chain());
        let cfg = AgentConfig {
            strategies: vec![
                "long_call_stock".to_string(),
                "long_put_stock".to_string(),
            ],
            max_positions: 1,
            ..config()
        };
        let mut agent = agent(&broker, &data, midday(), cfg);

        agent.start().await.unwrap();
        agent.cycle().await.unwrap();

        assert_eq!(agent.positions().len(), 1);
        assert_eq!(broker.orders.lock().unwrap().len(), 1);
    }
}

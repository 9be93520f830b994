//! Autonomous trading loop
//!
//! Owns the scan/evaluate/execute cycle and the risk gates around it.
//! Supervised mode runs the full pipeline but stops short of submission;
//! every decision is still reported. All limits are re-checked per trade
//! inside a cycle, so a flood of candidates in one tick cannot blow
//! through the daily budget.

use crate::balance::BalanceTracker;
use crate::config::TradingConfig;
use crate::error::BotError;
use crate::evaluator::OpportunityEvaluator;
use crate::executor::TradeExecutor;
use crate::notify::Reporter;
use crate::positions::PositionTracker;
use crate::scanner::MarketScanner;
use crate::types::{ExecutionResult, Side};
use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Trade-count budget, reset on calendar-day rollover
struct RiskCounters {
    daily_trade_count: u32,
    last_reset_date: NaiveDate,
}

impl RiskCounters {
    fn new() -> Self {
        Self {
            daily_trade_count: 0,
            last_reset_date: Local::now().date_naive(),
        }
    }

    fn roll(&mut self) {
        self.roll_to(Local::now().date_naive());
    }

    fn roll_to(&mut self, today: NaiveDate) {
        if today != self.last_reset_date {
            info!(
                %today,
                yesterday_trades = self.daily_trade_count,
                "new trading day, resetting counters"
            );
            self.daily_trade_count = 0;
            self.last_reset_date = today;
        }
    }
}

/// Point-in-time view of the controller for status reporting
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    pub running: bool,
    pub unsupervised: bool,
    pub daily_trades: u32,
    pub max_daily_trades: u32,
    pub open_positions: usize,
    pub max_open_positions: usize,
    pub total_exposure: Decimal,
    pub usdc_balance: Option<Decimal>,
}

/// Drives the scan/evaluate/execute cycle on a fixed tick
pub struct AutonomousTradingController {
    scanner: MarketScanner,
    evaluator: OpportunityEvaluator,
    executor: TradeExecutor,
    balance: Arc<BalanceTracker>,
    positions: Arc<PositionTracker>,
    reporter: Reporter,
    config: TradingConfig,
    counters: Mutex<RiskCounters>,
    // Held for the duration of a cycle so overlapping ticks skip.
    cycling: Mutex<()>,
    running: AtomicBool,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl AutonomousTradingController {
    pub fn new(
        scanner: MarketScanner,
        evaluator: OpportunityEvaluator,
        executor: TradeExecutor,
        balance: Arc<BalanceTracker>,
        positions: Arc<PositionTracker>,
        reporter: Reporter,
        config: TradingConfig,
    ) -> Self {
        Self {
            scanner,
            evaluator,
            executor,
            balance,
            positions,
            reporter,
            config,
            counters: Mutex::new(RiskCounters::new()),
            cycling: Mutex::new(()),
            running: AtomicBool::new(false),
            shutdown: Mutex::new(None),
        }
    }

    /// Spawn the trading loop. The first cycle runs immediately, then on
    /// every tick interval; slow cycles skip missed ticks instead of
    /// bursting.
    pub async fn start(self: &Arc<Self>) {
        let mut shutdown = self.shutdown.lock().await;
        if shutdown.is_some() {
            warn!("controller already running");
            return;
        }
        let (tx, mut rx) = watch::channel(false);
        *shutdown = Some(tx);
        drop(shutdown);
        self.running.store(true, Ordering::SeqCst);

        info!(
            unsupervised = self.config.unsupervised_mode,
            tick_secs = self.config.tick_interval_secs,
            "trading loop started"
        );

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(controller.config.tick_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        controller.run_cycle().await;
                    }
                    _ = rx.changed() => {
                        if *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            controller.running.store(false, Ordering::SeqCst);
            info!("trading loop stopped");
        });
    }

    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(true);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One scan/evaluate/execute pass.
    ///
    /// Scanning and evaluation always run so supervised operators see
    /// every decision; the risk gates only fence off execution.
    pub async fn run_cycle(&self) {
        let Ok(_guard) = self.cycling.try_lock() else {
            debug!("previous cycle still running, skipping tick");
            return;
        };

        if let Some(hours) = &self.config.trading_hours {
            if !hours.contains(Utc::now()) {
                debug!("outside trading hours, skipping cycle");
                return;
            }
        }

        self.counters.lock().await.roll();

        // Stale holdings would let the scanner re-offer a market we just
        // entered; refresh failure falls back to the cached view.
        if let Err(e) = self.positions.refresh_positions().await {
            warn!("position refresh failed, using cached holdings: {}", e);
        }

        let held = self.positions.held_markets().await;
        let opportunities = match self.scanner.find_opportunities(&held).await {
            Ok(opportunities) => opportunities,
            Err(e) => {
                warn!("scan failed, skipping cycle: {}", e);
                return;
            }
        };

        // The scan snapshot and `held` predate any trades made this
        // cycle; markets entered mid-cycle must not be traded again via
        // their complementary outcome.
        let mut entered: HashSet<String> = HashSet::new();

        for opportunity in &opportunities {
            let decision = self.evaluator.evaluate(opportunity);
            self.reporter.decision(&decision).await;
            if !decision.should_trade {
                continue;
            }

            if !self.config.unsupervised_mode {
                debug!(
                    market = %opportunity.condition_id,
                    "supervised mode, not executing"
                );
                continue;
            }

            if entered.contains(&opportunity.condition_id) {
                debug!(
                    market = %opportunity.condition_id,
                    "market entered this cycle, skipping"
                );
                continue;
            }
            match decision.side {
                Side::Buy => {
                    if self.positions.has_position(&opportunity.condition_id).await {
                        debug!(
                            market = %opportunity.condition_id,
                            "already held, skipping"
                        );
                        continue;
                    }
                }
                Side::Sell => {
                    // Selling needs standing inventory of that exact token
                    if !self.positions.holds_token(&opportunity.token_id).await {
                        debug!(
                            market = %opportunity.condition_id,
                            token = %opportunity.token_id,
                            "no inventory to sell, skipping"
                        );
                        continue;
                    }
                }
            }

            // Gates re-checked per trade, not per cycle.
            {
                let counters = self.counters.lock().await;
                if counters.daily_trade_count >= self.config.max_daily_trades {
                    debug!(
                        count = counters.daily_trade_count,
                        "daily trade limit reached, holding"
                    );
                    continue;
                }
            }
            let open = self.positions.position_count().await;
            if open >= self.config.max_open_positions {
                debug!(open, "open position limit reached, holding");
                continue;
            }

            let check = self.balance.check_balance(decision.size).await;
            if !check.has_enough_balance {
                self.reporter
                    .note(&format!(
                        "insufficient balance for {} (have {}, need {}), skipping",
                        opportunity.condition_id, check.usdc_balance, decision.size
                    ))
                    .await;
                continue;
            }

            let result = self.executor.execute_trade(&decision).await;
            self.reporter.trade_result(&decision, &result).await;
            if result.success {
                entered.insert(opportunity.condition_id.clone());
                self.counters.lock().await.daily_trade_count += 1;
                if let Err(e) = self.positions.refresh_positions().await {
                    warn!("position refresh after trade failed: {}", e);
                }
            }
        }
    }

    /// Place an operator-supplied order. Bypasses the evaluator but not
    /// the daily trade budget, which manual and autonomous trades share.
    pub async fn place_manual_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> ExecutionResult {
        {
            let mut counters = self.counters.lock().await;
            counters.roll();
            if counters.daily_trade_count >= self.config.max_daily_trades {
                let err = BotError::RiskLimit("daily trade limit reached".into());
                return ExecutionResult::failed(err.to_string(), false);
            }
        }

        let result = self.executor.place_order(token_id, side, price, size).await;
        if result.success {
            self.counters.lock().await.daily_trade_count += 1;
            if let Err(e) = self.positions.refresh_positions().await {
                warn!("position refresh after manual order failed: {}", e);
            }
        }
        self.reporter
            .note(&format!(
                "manual {} {} @ {} for {} USDC: {}",
                side,
                token_id,
                price,
                size,
                if result.success { "placed" } else { "failed" }
            ))
            .await;
        result
    }

    pub async fn status(&self) -> ControllerStatus {
        let counters = self.counters.lock().await;
        ControllerStatus {
            running: self.is_running(),
            unsupervised: self.config.unsupervised_mode,
            daily_trades: counters.daily_trade_count,
            max_daily_trades: self.config.max_daily_trades,
            open_positions: self.positions.position_count().await,
            max_open_positions: self.config.max_open_positions,
            total_exposure: self.positions.total_exposure().await,
            usdc_balance: self.balance.current_balance().await.ok(),
        }
    }
}

//! Trade execution
//!
//! Turns an accepted decision into a signed GTC order and submits it.
//! One recoverable failure mode exists: the venue rejecting for
//! insufficient balance/allowance, which triggers a single on-chain
//! deposit from reserve collateral followed by one retry. Everything
//! else is terminal for that trade.

use crate::balance::BalanceTracker;
use crate::chain::Settlement;
use crate::client::ExchangeApi;
use crate::config::TradingConfig;
use crate::types::{ExecutionResult, Order, OrderStatus, OrderType, Side, TradingDecision};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Executes trading decisions against the venue
pub struct TradeExecutor {
    venue: Arc<dyn ExchangeApi>,
    settlement: Arc<dyn Settlement>,
    balance: Arc<BalanceTracker>,
    config: TradingConfig,
}

impl TradeExecutor {
    pub fn new(
        venue: Arc<dyn ExchangeApi>,
        settlement: Arc<dyn Settlement>,
        balance: Arc<BalanceTracker>,
        config: TradingConfig,
    ) -> Self {
        Self {
            venue,
            settlement,
            balance,
            config,
        }
    }

    /// Execute an accepted decision.
    ///
    /// Attempt state machine: submit; on an insufficient-balance error,
    /// deposit once, wait for the bridge, retry once; a second balance
    /// failure is terminal. Never returns an `Err` for expected trade
    /// failures; those are carried in the result value.
    pub async fn execute_trade(&self, decision: &TradingDecision) -> ExecutionResult {
        if !decision.should_trade || decision.size <= Decimal::ZERO {
            return ExecutionResult::failed("decision is not tradeable", false);
        }

        let order = Order {
            token_id: decision.opportunity.token_id.clone(),
            side: decision.side,
            price: decision.opportunity.current_price,
            size: self.shares_for(decision),
            order_type: OrderType::GTC,
        };

        info!(
            condition_id = %decision.opportunity.condition_id,
            side = %order.side,
            price = %order.price,
            shares = %order.size,
            "submitting order"
        );

        match self.venue.submit_order(&order).await {
            Ok(status) => self.confirm(status, false).await,
            Err(e) if e.is_insufficient_balance() => {
                warn!("venue balance insufficient, attempting deposit: {}", e);
                self.deposit_and_retry(&order, decision.size).await
            }
            Err(e) => ExecutionResult::failed(e.to_string(), false),
        }
    }

    /// Place an order with explicit parameters, bypassing evaluation.
    /// Used by the hosting runtime for externally-supplied decisions;
    /// the same deposit-and-retry recovery applies.
    pub async fn place_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> ExecutionResult {
        if size <= Decimal::ZERO || price <= Decimal::ZERO || price >= Decimal::ONE {
            return ExecutionResult::failed("invalid order parameters", false);
        }
        let order = Order {
            token_id: token_id.to_string(),
            side,
            price,
            size: (size / price).round_dp(2),
            order_type: OrderType::GTC,
        };

        match self.venue.submit_order(&order).await {
            Ok(status) => self.confirm(status, false).await,
            Err(e) if e.is_insufficient_balance() => self.deposit_and_retry(&order, size).await,
            Err(e) => ExecutionResult::failed(e.to_string(), false),
        }
    }

    /// The deposit path: move reserve collateral onto the venue, wait out
    /// the asynchronous bridging, then retry the submission exactly once.
    async fn deposit_and_retry(&self, order: &Order, cost: Decimal) -> ExecutionResult {
        let tx_hash = match self.settlement.deposit(cost).await {
            Ok(tx) => tx,
            Err(e) => {
                return ExecutionResult::failed(format!("deposit failed: {}", e), false);
            }
        };
        info!(tx = %tx_hash, "deposit confirmed, waiting for venue balance");
        self.balance.invalidate().await;

        // The deposit's effect on the venue balance is not immediately
        // observable; give the bridge time before retrying.
        tokio::time::sleep(self.config.deposit_settle_delay()).await;

        match self.venue.submit_order(order).await {
            Ok(status) => self.confirm(status, true).await,
            Err(e) => {
                // Terminal regardless of the error kind: one deposit per
                // trade attempt, no retry loops against a broken venue.
                warn!("retry after deposit failed: {}", e);
                ExecutionResult::failed(format!("retry after deposit failed: {}", e), true)
            }
        }
    }

    async fn confirm(&self, status: OrderStatus, deposited: bool) -> ExecutionResult {
        info!(order_id = %status.order_id, status = %status.status, "order placed");
        self.balance.invalidate().await;
        ExecutionResult::ok(status.order_id, deposited)
    }

    /// Decision sizes are USDC amounts; the venue wants shares.
    fn shares_for(&self, decision: &TradingDecision) -> Decimal {
        let price = decision.opportunity.current_price;
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (decision.size / price).round_dp(2)
    }
}

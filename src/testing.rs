//! Mock collaborators for tests
//!
//! In-memory stand-ins for the venue, market data, and settlement layer
//! with call counting and scriptable failures.

use crate::chain::Settlement;
use crate::client::{ExchangeApi, MarketDataApi};
use crate::error::{BotError, Result};
use crate::types::{
    Market, Opportunity, Order, OrderStatus, Outcome, PositionRecord, Side, TradingDecision,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Scriptable in-memory exchange
pub struct MockVenue {
    balance: RwLock<Decimal>,
    positions: RwLock<Vec<PositionRecord>>,
    submitted: RwLock<Vec<Order>>,
    submit_failures: RwLock<Vec<String>>,
    balance_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    position_calls: AtomicUsize,
    fail_balance: AtomicBool,
    fail_positions: AtomicBool,
    next_order_id: AtomicUsize,
}

impl MockVenue {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: RwLock::new(balance),
            positions: RwLock::new(Vec::new()),
            submitted: RwLock::new(Vec::new()),
            submit_failures: RwLock::new(Vec::new()),
            balance_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            position_calls: AtomicUsize::new(0),
            fail_balance: AtomicBool::new(false),
            fail_positions: AtomicBool::new(false),
            next_order_id: AtomicUsize::new(1),
        }
    }

    pub async fn set_balance(&self, balance: Decimal) {
        *self.balance.write().await = balance;
    }

    pub async fn set_positions(&self, positions: Vec<PositionRecord>) {
        *self.positions.write().await = positions;
    }

    /// Queue error messages for the next n submissions.
    pub async fn fail_next_submits(&self, n: usize, message: &str) {
        let mut failures = self.submit_failures.write().await;
        for _ in 0..n {
            failures.push(message.to_string());
        }
    }

    pub fn fail_balance(&self, fail: bool) {
        self.fail_balance.store(fail, Ordering::SeqCst);
    }

    pub fn fail_positions(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn position_calls(&self) -> usize {
        self.position_calls.load(Ordering::SeqCst)
    }

    pub async fn submitted_orders(&self) -> Vec<Order> {
        self.submitted.read().await.clone()
    }
}

#[async_trait]
impl ExchangeApi for MockVenue {
    async fn submit_order(&self, order: &Order) -> Result<OrderStatus> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.submit_failures.write().await.pop();
        if let Some(message) = failure {
            return Err(BotError::Api(message));
        }

        self.submitted.write().await.push(order.clone());
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        Ok(OrderStatus {
            order_id: format!("order-{}", id),
            status: "live".to_string(),
        })
    }

    async fn get_positions(&self) -> Result<Vec<PositionRecord>> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(BotError::Api("positions unavailable".into()));
        }
        Ok(self.positions.read().await.clone())
    }

    async fn get_balance(&self) -> Result<Decimal> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(BotError::Api("balance unavailable".into()));
        }
        Ok(*self.balance.read().await)
    }

    fn address(&self) -> &str {
        "0xmock"
    }
}

/// Fixed set of markets served by condition id
pub struct MockMarketData {
    markets: RwLock<Vec<Market>>,
    fetch_calls: AtomicUsize,
}

impl MockMarketData {
    pub fn with_markets(markets: Vec<Market>) -> Self {
        Self {
            markets: RwLock::new(markets),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub async fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.write().await = markets;
    }

    /// Total lookups served, single-market and top-markets combined.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataApi for MockMarketData {
    async fn get_market(&self, condition_id: &str) -> Result<Market> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.markets
            .read()
            .await
            .iter()
            .find(|m| m.condition_id == condition_id)
            .cloned()
            .ok_or_else(|| BotError::MarketNotFound(condition_id.to_string()))
    }

    async fn get_top_markets(&self, limit: usize) -> Result<Vec<Market>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markets.read().await.iter().take(limit).cloned().collect())
    }
}

/// Settlement layer that records calls instead of hitting the chain
#[derive(Default)]
pub struct MockSettlement {
    deposits: RwLock<Vec<Decimal>>,
    redeems: RwLock<Vec<(String, Vec<u64>)>>,
    neg_risk_redeems: RwLock<Vec<(String, Vec<Decimal>)>>,
    deposit_count: AtomicUsize,
    fail_deposits: AtomicBool,
    fail_redeems: AtomicBool,
}

impl MockSettlement {
    pub fn fail_deposits(&self, fail: bool) {
        self.fail_deposits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_redeems(&self, fail: bool) {
        self.fail_redeems.store(fail, Ordering::SeqCst);
    }

    pub fn deposit_count(&self) -> usize {
        self.deposit_count.load(Ordering::SeqCst)
    }

    pub async fn deposits(&self) -> Vec<Decimal> {
        self.deposits.read().await.clone()
    }

    pub async fn redeem_calls(&self) -> Vec<(String, Vec<u64>)> {
        self.redeems.read().await.clone()
    }

    pub async fn neg_risk_calls(&self) -> Vec<(String, Vec<Decimal>)> {
        self.neg_risk_redeems.read().await.clone()
    }
}

#[async_trait]
impl Settlement for MockSettlement {
    async fn deposit(&self, amount: Decimal) -> Result<String> {
        self.deposit_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_deposits.load(Ordering::SeqCst) {
            return Err(BotError::Chain("deposit reverted".into()));
        }
        self.deposits.write().await.push(amount);
        Ok("0xdeposit".to_string())
    }

    async fn redeem(&self, condition_id: &str, index_sets: &[u64]) -> Result<String> {
        if self.fail_redeems.load(Ordering::SeqCst) {
            return Err(BotError::Chain("redeem reverted".into()));
        }
        self.redeems
            .write()
            .await
            .push((condition_id.to_string(), index_sets.to_vec()));
        Ok("0xredeem".to_string())
    }

    async fn redeem_neg_risk(&self, condition_id: &str, amounts: &[Decimal]) -> Result<String> {
        if self.fail_redeems.load(Ordering::SeqCst) {
            return Err(BotError::Chain("neg-risk redeem reverted".into()));
        }
        self.neg_risk_redeems
            .write()
            .await
            .push((condition_id.to_string(), amounts.to_vec()));
        Ok("0xnegredeem".to_string())
    }
}

/// A binary Yes/No market with the given yes price
pub fn binary_market(condition_id: &str, yes_price: Decimal) -> Market {
    Market {
        id: condition_id.trim_start_matches("0x").to_string(),
        condition_id: condition_id.to_string(),
        question: format!("Market {}?", condition_id),
        outcomes: vec![
            Outcome {
                token_id: format!("{}-yes", condition_id),
                outcome: "Yes".to_string(),
                price: yes_price,
            },
            Outcome {
                token_id: format!("{}-no", condition_id),
                outcome: "No".to_string(),
                price: dec!(1) - yes_price,
            },
        ],
        volume: dec!(10000),
        liquidity: dec!(5000),
        active: true,
        closed: false,
        neg_risk: false,
    }
}

/// An open position on the given market
pub fn position(
    condition_id: &str,
    outcome: &str,
    size: Decimal,
    avg_price: Decimal,
) -> PositionRecord {
    PositionRecord {
        condition_id: condition_id.to_string(),
        token_id: format!("{}-{}", condition_id, outcome.to_lowercase()),
        outcome: outcome.to_string(),
        question: format!("Market {}?", condition_id),
        size,
        avg_price,
        current_price: avg_price,
        pnl: Decimal::ZERO,
        redeemable: false,
        neg_risk: false,
    }
}

/// An accepted buy decision at the given price and USDC size
pub fn decision(price: Decimal, size: Decimal) -> TradingDecision {
    TradingDecision {
        opportunity: Opportunity {
            condition_id: "0xaaa".to_string(),
            token_id: "111".to_string(),
            outcome: "Yes".to_string(),
            question: "Will it happen?".to_string(),
            current_price: price,
            neg_risk: false,
        },
        should_trade: true,
        side: Side::Buy,
        size,
        reasoning: "test decision".to_string(),
    }
}

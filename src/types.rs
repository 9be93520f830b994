//! Core domain types shared across components

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order time-in-force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    GTC,
    FOK,
    GTD,
}

/// A limit order in the venue's format
#[derive(Debug, Clone)]
pub struct Order {
    pub token_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub order_type: OrderType,
}

/// Venue response to an order submission
#[derive(Debug, Clone)]
pub struct OrderStatus {
    pub order_id: String,
    pub status: String,
}

/// A single market outcome with its token and current price
#[derive(Debug, Clone)]
pub struct Outcome {
    pub token_id: String,
    pub outcome: String,
    pub price: Decimal,
}

/// A prediction market as reported by the market-data service
#[derive(Debug, Clone)]
pub struct Market {
    pub id: String,
    pub condition_id: String,
    pub question: String,
    pub outcomes: Vec<Outcome>,
    pub volume: Decimal,
    pub liquidity: Decimal,
    pub active: bool,
    pub closed: bool,
    pub neg_risk: bool,
}

impl Market {
    /// Index of the winning outcome, if the market has resolved.
    ///
    /// A binary market is resolved when the venue marks it closed and one
    /// outcome's price has collapsed to ~1.
    pub fn winning_outcome(&self) -> Option<usize> {
        if !self.closed {
            return None;
        }
        let threshold = Decimal::new(99, 2); // 0.99
        self.outcomes.iter().position(|o| o.price >= threshold)
    }
}

/// A candidate (market, outcome, price) tuple eligible for evaluation.
///
/// Produced fresh on every scan and never persisted.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub condition_id: String,
    pub token_id: String,
    pub outcome: String,
    pub question: String,
    pub current_price: Decimal,
    pub neg_risk: bool,
}

/// Evaluator output, consumed once by the controller
#[derive(Debug, Clone)]
pub struct TradingDecision {
    pub opportunity: Opportunity,
    pub should_trade: bool,
    pub side: Side,
    /// Order size in USDC. Non-zero whenever `should_trade` is set.
    pub size: Decimal,
    pub reasoning: String,
}

/// An owned quantity of a specific market outcome, as reported by the venue
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub condition_id: String,
    pub token_id: String,
    pub outcome: String,
    pub question: String,
    /// Shares held.
    pub size: Decimal,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub pnl: Decimal,
    pub redeemable: bool,
    pub neg_risk: bool,
}

impl PositionRecord {
    /// Cache key: condition id, falling back to token id when the venue
    /// omits it.
    pub fn key(&self) -> &str {
        if self.condition_id.is_empty() {
            &self.token_id
        } else {
            &self.condition_id
        }
    }
}

/// On-venue collateral balance at a point in time
#[derive(Debug, Clone)]
pub struct BalanceSnapshot {
    pub usdc_balance: Decimal,
    pub address: String,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of a single redemption attempt
#[derive(Debug, Clone)]
pub struct RedemptionResult {
    pub question: String,
    pub condition_id: String,
    pub amount_redeemed: Decimal,
    pub tx_hash: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Result of a single trade attempt
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub error: Option<String>,
    /// Whether the deposit-and-retry path was taken.
    pub deposited: bool,
}

impl ExecutionResult {
    pub fn ok(order_id: String, deposited: bool) -> Self {
        Self {
            success: true,
            order_id: Some(order_id),
            error: None,
            deposited,
        }
    }

    pub fn failed(error: impl Into<String>, deposited: bool) -> Self {
        Self {
            success: false,
            order_id: None,
            error: Some(error.into()),
            deposited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market(closed: bool, yes_price: Decimal) -> Market {
        Market {
            id: "1".into(),
            condition_id: "0xabc".into(),
            question: "Test?".into(),
            outcomes: vec![
                Outcome {
                    token_id: "yes".into(),
                    outcome: "Yes".into(),
                    price: yes_price,
                },
                Outcome {
                    token_id: "no".into(),
                    outcome: "No".into(),
                    price: dec!(1) - yes_price,
                },
            ],
            volume: dec!(1000),
            liquidity: dec!(500),
            active: true,
            closed,
            neg_risk: false,
        }
    }

    #[test]
    fn test_winning_outcome_resolved() {
        let m = market(true, dec!(1.0));
        assert_eq!(m.winning_outcome(), Some(0));

        let m = market(true, dec!(0.0));
        assert_eq!(m.winning_outcome(), Some(1));
    }

    #[test]
    fn test_winning_outcome_unresolved() {
        // Open market, mid-range price
        let m = market(false, dec!(0.55));
        assert_eq!(m.winning_outcome(), None);

        // Closed but prices not collapsed (still settling)
        let m = market(true, dec!(0.55));
        assert_eq!(m.winning_outcome(), None);
    }

    #[test]
    fn test_position_key_fallback() {
        let mut pos = PositionRecord {
            condition_id: "0xabc".into(),
            token_id: "tok1".into(),
            outcome: "Yes".into(),
            question: "Q?".into(),
            size: dec!(10),
            avg_price: dec!(0.5),
            current_price: dec!(0.6),
            pnl: dec!(1),
            redeemable: false,
            neg_risk: false,
        };
        assert_eq!(pos.key(), "0xabc");

        pos.condition_id.clear();
        assert_eq!(pos.key(), "tok1");
    }
}

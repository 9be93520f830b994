//! Opportunity evaluation policy
//!
//! A pure function of the opportunity and the immutable trading config:
//! threshold checks, minimum edge, a pluggable confidence model, and
//! position sizing. Every decision carries a deterministic reasoning
//! string; monitoring mode surfaces these verbatim, so they are golden
//! tested.

use crate::config::{ConfidenceModelKind, TradingConfig};
use crate::types::{Opportunity, Side, TradingDecision};
use rust_decimal::Decimal;

/// Pluggable confidence policy.
///
/// The threshold/edge contract is fixed; how confident the bot is in a
/// candidate is a strategy decision.
pub trait ConfidenceModel: Send + Sync {
    fn confidence(&self, opportunity: &Opportunity, side: Side) -> Decimal;
}

/// Confidence from the distance to the complementary outcome price: a
/// cheap buy implies high confidence in the complement resolving against
/// this outcome's implied probability.
pub struct PriceDistanceConfidence;

impl ConfidenceModel for PriceDistanceConfidence {
    fn confidence(&self, opportunity: &Opportunity, side: Side) -> Decimal {
        match side {
            Side::Buy => Decimal::ONE - opportunity.current_price,
            Side::Sell => opportunity.current_price,
        }
    }
}

/// A fixed constant, for test-size operation
pub struct FixedConfidence(pub Decimal);

impl ConfidenceModel for FixedConfidence {
    fn confidence(&self, _opportunity: &Opportunity, _side: Side) -> Decimal {
        self.0
    }
}

/// Applies trading policy to scanner output
pub struct OpportunityEvaluator {
    config: TradingConfig,
    confidence: Box<dyn ConfidenceModel>,
}

impl OpportunityEvaluator {
    pub fn new(config: TradingConfig) -> Self {
        let confidence: Box<dyn ConfidenceModel> = match config.confidence_model {
            ConfidenceModelKind::PriceDistance => Box::new(PriceDistanceConfidence),
            ConfidenceModelKind::Fixed => Box::new(FixedConfidence(Decimal::new(75, 2))),
        };
        Self { config, confidence }
    }

    /// Inject a custom confidence strategy.
    pub fn with_confidence(config: TradingConfig, confidence: Box<dyn ConfidenceModel>) -> Self {
        Self { config, confidence }
    }

    /// Evaluate a single opportunity. Pure: same inputs, same decision.
    pub fn evaluate(&self, opportunity: &Opportunity) -> TradingDecision {
        let price = opportunity.current_price;

        // Threshold check decides the side
        let (side, threshold, edge) = if price <= self.config.buy_threshold {
            (Side::Buy, self.config.buy_threshold, self.config.buy_threshold - price)
        } else if price >= self.config.sell_threshold {
            (Side::Sell, self.config.sell_threshold, price - self.config.sell_threshold)
        } else {
            return self.skip(
                opportunity,
                Side::Buy,
                format!(
                    "price {} within thresholds (buy {} / sell {}); no edge",
                    price, self.config.buy_threshold, self.config.sell_threshold
                ),
            );
        };

        if edge < self.config.min_edge {
            return self.skip(
                opportunity,
                side,
                format!("{} edge {} below minimum {}", side, edge, self.config.min_edge),
            );
        }

        let confidence = self.confidence.confidence(opportunity, side);
        if confidence < self.config.min_confidence_threshold {
            return self.skip(
                opportunity,
                side,
                format!(
                    "confidence {} below threshold {}",
                    confidence, self.config.min_confidence_threshold
                ),
            );
        }

        let size = self.position_size(confidence);
        TradingDecision {
            opportunity: opportunity.clone(),
            should_trade: true,
            side,
            size,
            reasoning: format!(
                "{} {}: price {} beyond threshold {}, edge {}, confidence {}, size {}",
                side, opportunity.outcome, price, threshold, edge, confidence, size
            ),
        }
    }

    fn skip(&self, opportunity: &Opportunity, side: Side, reasoning: String) -> TradingDecision {
        TradingDecision {
            opportunity: opportunity.clone(),
            should_trade: false,
            side,
            size: Decimal::ZERO,
            reasoning,
        }
    }

    /// Confidence-weighted fraction of the max position size, clamped to
    /// `[min_unit_size, max_position_size]` and capped by the per-trade
    /// risk limit.
    fn position_size(&self, confidence: Decimal) -> Decimal {
        let sized = self.config.max_position_size * confidence;
        sized
            .max(self.config.min_unit_size)
            .min(self.config.max_position_size)
            .min(self.config.risk_limit_per_trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity(price: Decimal) -> Opportunity {
        Opportunity {
            condition_id: "0xaaa".into(),
            token_id: "111".into(),
            outcome: "Yes".into(),
            question: "Will it happen?".into(),
            current_price: price,
            neg_risk: false,
        }
    }

    fn evaluator() -> OpportunityEvaluator {
        OpportunityEvaluator::new(TradingConfig::default())
    }

    #[test]
    fn test_cheap_price_buys_with_edge() {
        // buy_threshold 0.1, min_edge 0.02
        let decision = evaluator().evaluate(&opportunity(dec!(0.05)));
        assert!(decision.should_trade);
        assert_eq!(decision.side, Side::Buy);
        // edge = 0.10 - 0.05 = 0.05, confidence = 0.95, size capped at 50
        assert_eq!(decision.size, dec!(50));
        assert_eq!(
            decision.reasoning,
            "BUY Yes: price 0.05 beyond threshold 0.10, edge 0.05, confidence 0.95, size 50"
        );
    }

    #[test]
    fn test_mid_price_rejected() {
        let decision = evaluator().evaluate(&opportunity(dec!(0.5)));
        assert!(!decision.should_trade);
        assert_eq!(decision.size, Decimal::ZERO);
        assert_eq!(
            decision.reasoning,
            "price 0.5 within thresholds (buy 0.10 / sell 0.90); no edge"
        );
    }

    #[test]
    fn test_rich_price_sells() {
        let decision = evaluator().evaluate(&opportunity(dec!(0.95)));
        assert!(decision.should_trade);
        assert_eq!(decision.side, Side::Sell);
    }

    #[test]
    fn test_edge_below_minimum_rejected() {
        // price 0.09: edge 0.01 < min_edge 0.02
        let decision = evaluator().evaluate(&opportunity(dec!(0.09)));
        assert!(!decision.should_trade);
        assert_eq!(decision.reasoning, "BUY edge 0.01 below minimum 0.02");
    }

    #[test]
    fn test_low_confidence_rejected() {
        let config = TradingConfig {
            min_confidence_threshold: dec!(0.99),
            ..Default::default()
        };
        let evaluator = OpportunityEvaluator::new(config);
        // confidence = 1 - 0.05 = 0.95 < 0.99
        let decision = evaluator.evaluate(&opportunity(dec!(0.05)));
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("confidence 0.95 below threshold"));
    }

    #[test]
    fn test_size_invariant_holds() {
        // For a spread of prices, should_trade implies a bounded size
        let config = TradingConfig::default();
        let cap = config.max_position_size.min(config.risk_limit_per_trade);
        let evaluator = OpportunityEvaluator::new(config);

        for cents in 1..100 {
            let decision = evaluator.evaluate(&opportunity(Decimal::new(cents, 2)));
            if decision.should_trade {
                assert!(decision.size > Decimal::ZERO);
                assert!(decision.size <= cap);
            } else {
                assert_eq!(decision.size, Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_size_respects_min_unit() {
        // Tiny max position: confidence weighting would undershoot the
        // minimum unit, clamp brings it back up
        let config = TradingConfig {
            max_position_size: dec!(2),
            min_unit_size: dec!(2),
            min_confidence_threshold: dec!(0.5),
            ..Default::default()
        };
        let evaluator = OpportunityEvaluator::new(config);
        let decision = evaluator.evaluate(&opportunity(dec!(0.05)));
        assert!(decision.should_trade);
        assert_eq!(decision.size, dec!(2));
    }

    #[test]
    fn test_fixed_confidence_model() {
        let config = TradingConfig::default();
        let evaluator =
            OpportunityEvaluator::with_confidence(config, Box::new(FixedConfidence(dec!(0.8))));
        let decision = evaluator.evaluate(&opportunity(dec!(0.05)));
        assert!(decision.should_trade);
        // 100 * 0.8 = 80, capped at risk limit 50
        assert_eq!(decision.size, dec!(50));
    }

    #[test]
    fn test_deterministic() {
        let a = evaluator().evaluate(&opportunity(dec!(0.05)));
        let b = evaluator().evaluate(&opportunity(dec!(0.05)));
        assert_eq!(a.reasoning, b.reasoning);
        assert_eq!(a.size, b.size);
    }
}

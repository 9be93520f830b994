//! Outbound activity reporting
//!
//! Every decision, trade, and redemption is logged, and optionally forwarded
//! to a hosting-runtime channel so an embedding process can surface activity
//! to an operator. Reporting never fails the caller.

use crate::types::{ExecutionResult, RedemptionResult, TradingDecision};
use tokio::sync::mpsc;

/// Forwards controller activity to tracing and an optional channel
#[derive(Clone, Default)]
pub struct Reporter {
    sink: Option<mpsc::Sender<String>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self { sink: None }
    }

    pub fn with_sink(sink: mpsc::Sender<String>) -> Self {
        Self { sink: Some(sink) }
    }

    pub async fn decision(&self, decision: &TradingDecision) {
        if decision.should_trade {
            tracing::info!(
                market = %decision.opportunity.condition_id,
                "decision: {}",
                decision.reasoning
            );
        } else {
            tracing::debug!(
                market = %decision.opportunity.condition_id,
                "skipped: {}",
                decision.reasoning
            );
        }
        self.forward(&decision.reasoning).await;
    }

    pub async fn trade_result(&self, decision: &TradingDecision, result: &ExecutionResult) {
        let note = if result.success {
            let order_id = result.order_id.as_deref().unwrap_or("?");
            tracing::info!(
                market = %decision.opportunity.condition_id,
                order_id,
                deposited = result.deposited,
                "trade placed"
            );
            format!(
                "trade placed: {} (order {})",
                decision.reasoning, order_id
            )
        } else {
            let error = result.error.as_deref().unwrap_or("unknown");
            tracing::warn!(
                market = %decision.opportunity.condition_id,
                error,
                deposited = result.deposited,
                "trade failed"
            );
            format!("trade failed: {} ({})", decision.reasoning, error)
        };
        self.forward(&note).await;
    }

    pub async fn redemption(&self, result: &RedemptionResult) {
        if result.success {
            tracing::info!(
                market = %result.condition_id,
                amount = %result.amount_redeemed,
                tx = result.tx_hash.as_deref().unwrap_or(""),
                "redeemed winning position"
            );
            self.forward(&format!(
                "redeemed {} shares: {}",
                result.amount_redeemed, result.question
            ))
            .await;
        } else {
            tracing::warn!(
                market = %result.condition_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "redemption failed"
            );
        }
    }

    pub async fn note(&self, message: &str) {
        tracing::info!("{}", message);
        self.forward(message).await;
    }

    async fn forward(&self, message: &str) {
        if let Some(sink) = &self.sink {
            // A full or closed channel drops the message rather than
            // blocking the trading loop.
            let _ = sink.try_send(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_forwards_to_sink() {
        let (tx, mut rx) = mpsc::channel(8);
        let reporter = Reporter::with_sink(tx);

        reporter.note("hello").await;
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_no_sink_is_fine() {
        let reporter = Reporter::new();
        reporter.note("dropped").await;

        let d = crate::testing::decision(dec!(0.05), dec!(10));
        reporter.decision(&d).await;
        reporter
            .trade_result(&d, &ExecutionResult::failed("nope", false))
            .await;
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let reporter = Reporter::with_sink(tx);
        reporter.note("one").await;
        // Channel is full now; this must return immediately.
        reporter.note("two").await;
    }
}

//! Redemption monitor
//!
//! Periodically sweeps open positions for markets that have resolved in our
//! favor and redeems the winning outcome tokens on chain. Runs independently
//! of the trading loop; a failed redemption for one market never blocks the
//! others.

use crate::chain::Settlement;
use crate::client::{ExchangeApi, MarketDataApi};
use crate::config::RedemptionConfig;
use crate::notify::Reporter;
use crate::types::{PositionRecord, RedemptionResult};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

/// Sweeps resolved markets and redeems winning positions
pub struct RedemptionMonitor {
    venue: Arc<dyn ExchangeApi>,
    market_data: Arc<dyn MarketDataApi>,
    settlement: Arc<dyn Settlement>,
    reporter: Reporter,
    config: RedemptionConfig,
    // Held for the duration of a sweep so overlapping ticks skip.
    sweeping: Mutex<()>,
}

impl RedemptionMonitor {
    pub fn new(
        venue: Arc<dyn ExchangeApi>,
        market_data: Arc<dyn MarketDataApi>,
        settlement: Arc<dyn Settlement>,
        reporter: Reporter,
        config: RedemptionConfig,
    ) -> Self {
        Self {
            venue,
            market_data,
            settlement,
            reporter,
            config,
            sweeping: Mutex::new(()),
        }
    }

    /// Run the sweep loop until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            tracing::info!("redemption monitor disabled");
            return;
        }

        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.config.interval_secs,
            "redemption monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("redemption monitor stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One pass over all open positions. Returns a result per attempted
    /// redemption.
    pub async fn sweep(&self) -> Vec<RedemptionResult> {
        let Ok(_guard) = self.sweeping.try_lock() else {
            tracing::debug!("redemption sweep already in progress, skipping");
            return Vec::new();
        };

        let positions = match self.venue.get_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::warn!("redemption sweep: failed to fetch positions: {}", e);
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for position in &positions {
            if position.size <= Decimal::ZERO || position.condition_id.is_empty() {
                continue;
            }
            // The venue flags claimable positions; anything it has not
            // flagged yet is not worth a market lookup.
            if !position.redeemable {
                continue;
            }
            if let Some(result) = self.try_redeem(position).await {
                self.reporter.redemption(&result).await;
                results.push(result);
            }
        }

        if !results.is_empty() {
            let redeemed: usize = results.iter().filter(|r| r.success).count();
            tracing::info!(
                attempted = results.len(),
                redeemed,
                "redemption sweep complete"
            );
        }
        results
    }

    /// Redeem a single position if its market has resolved in our favor.
    /// Returns None when the market is unresolved or we hold the losing side.
    async fn try_redeem(&self, position: &PositionRecord) -> Option<RedemptionResult> {
        let market = match self.market_data.get_market(&position.condition_id).await {
            Ok(market) => market,
            Err(e) => {
                tracing::debug!(
                    market = %position.condition_id,
                    "redemption: market lookup failed: {}",
                    e
                );
                return None;
            }
        };

        let winner = market.winning_outcome()?;
        let winning_outcome = &market.outcomes[winner];
        if !winning_outcome.outcome.eq_ignore_ascii_case(&position.outcome) {
            // Lost side pays nothing; redeeming it only burns gas.
            tracing::debug!(
                market = %position.condition_id,
                held = %position.outcome,
                won = %winning_outcome.outcome,
                "holding losing outcome, skipping redemption"
            );
            return None;
        }

        let call = if position.neg_risk || market.neg_risk {
            let mut amounts = vec![Decimal::ZERO; market.outcomes.len()];
            amounts[winner] = position.size;
            self.settlement
                .redeem_neg_risk(&position.condition_id, &amounts)
                .await
        } else {
            // CTF index sets are bitmasks over outcome slots.
            let index_set = 1u64 << winner;
            self.settlement
                .redeem(&position.condition_id, &[index_set])
                .await
        };

        Some(match call {
            Ok(tx_hash) => RedemptionResult {
                question: position.question.clone(),
                condition_id: position.condition_id.clone(),
                amount_redeemed: position.size,
                tx_hash: Some(tx_hash),
                success: true,
                error: None,
            },
            Err(e) => RedemptionResult {
                question: position.question.clone(),
                condition_id: position.condition_id.clone(),
                amount_redeemed: Decimal::ZERO,
                tx_hash: None,
                success: false,
                error: Some(e.to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{binary_market, position, MockMarketData, MockSettlement, MockVenue};
    use rust_decimal_macros::dec;

    struct Harness {
        settlement: Arc<MockSettlement>,
        market_data: Arc<MockMarketData>,
        monitor: RedemptionMonitor,
    }

    fn harness(venue: Arc<MockVenue>, markets: Vec<crate::types::Market>) -> Harness {
        let settlement = Arc::new(MockSettlement::default());
        let market_data = Arc::new(MockMarketData::with_markets(markets));
        let monitor = RedemptionMonitor::new(
            venue,
            market_data.clone(),
            settlement.clone(),
            Reporter::new(),
            RedemptionConfig::default(),
        );
        Harness {
            settlement,
            market_data,
            monitor,
        }
    }

    fn claimable(condition_id: &str, outcome: &str, size: Decimal) -> PositionRecord {
        let mut p = position(condition_id, outcome, size, dec!(0.10));
        p.redeemable = true;
        p
    }

    fn resolved_market(condition_id: &str, yes_wins: bool) -> crate::types::Market {
        let mut m = binary_market(condition_id, if yes_wins { dec!(1.0) } else { dec!(0.0) });
        m.closed = true;
        m
    }

    #[tokio::test]
    async fn test_redeems_winning_position() {
        let venue = Arc::new(MockVenue::new(dec!(0)));
        venue
            .set_positions(vec![claimable("0xaaa", "Yes", dec!(25))])
            .await;
        let h = harness(venue, vec![resolved_market("0xaaa", true)]);

        let results = h.monitor.sweep().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].amount_redeemed, dec!(25));

        let calls = h.settlement.redeem_calls().await;
        assert_eq!(calls, vec![("0xaaa".to_string(), vec![1])]);
    }

    #[tokio::test]
    async fn test_unflagged_position_skipped_without_lookup() {
        // The venue has not marked the position claimable yet; the sweep
        // must not burn a market lookup on it.
        let venue = Arc::new(MockVenue::new(dec!(0)));
        venue
            .set_positions(vec![position("0xaaa", "Yes", dec!(10), dec!(0.10))])
            .await;
        let h = harness(venue, vec![resolved_market("0xaaa", true)]);

        let results = h.monitor.sweep().await;
        assert!(results.is_empty());
        assert_eq!(h.market_data.fetch_calls(), 0);
        assert!(h.settlement.redeem_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_skips_unresolved_and_losing() {
        let venue = Arc::new(MockVenue::new(dec!(0)));
        venue
            .set_positions(vec![
                // Flagged, but the market still reads as open
                claimable("0xaaa", "Yes", dec!(10)),
                // Resolved, but we hold the losing side
                claimable("0xbbb", "No", dec!(10)),
            ])
            .await;
        let h = harness(
            venue,
            vec![binary_market("0xaaa", dec!(0.55)), resolved_market("0xbbb", true)],
        );

        let results = h.monitor.sweep().await;
        assert!(results.is_empty());
        assert!(h.settlement.redeem_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_neg_risk_routes_through_adapter() {
        let venue = Arc::new(MockVenue::new(dec!(0)));
        let mut pos = claimable("0xccc", "No", dec!(40));
        pos.neg_risk = true;
        venue.set_positions(vec![pos]).await;

        let mut market = resolved_market("0xccc", false);
        market.neg_risk = true;
        let h = harness(venue, vec![market]);

        let results = h.monitor.sweep().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success);

        assert!(h.settlement.redeem_calls().await.is_empty());
        let calls = h.settlement.neg_risk_calls().await;
        assert_eq!(calls, vec![("0xccc".to_string(), vec![dec!(0), dec!(40)])]);
    }

    #[tokio::test]
    async fn test_failures_are_independent() {
        let venue = Arc::new(MockVenue::new(dec!(0)));
        venue
            .set_positions(vec![
                claimable("0xaaa", "Yes", dec!(10)),
                claimable("0xbbb", "Yes", dec!(20)),
            ])
            .await;
        let h = harness(
            venue,
            vec![resolved_market("0xaaa", true), resolved_market("0xbbb", true)],
        );
        h.settlement.fail_redeems(true);

        let results = h.monitor.sweep().await;
        // Both attempted, both reported failed, neither aborted the sweep.
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        assert!(results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn test_position_fetch_failure_yields_empty_sweep() {
        let venue = Arc::new(MockVenue::new(dec!(0)));
        venue.fail_positions(true);
        let h = harness(venue, vec![]);

        let results = h.monitor.sweep().await;
        assert!(results.is_empty());
        assert_eq!(h.settlement.deposit_count(), 0);
    }
}

//! Market scanner
//!
//! Produces fresh `Opportunity` candidates each cycle from either a
//! fixed watchlist of condition ids or the venue's top markets. Markets
//! already held are suppressed so the bot never doubles into the same
//! market. A fetch failure for one market never fails the whole scan.

use crate::client::MarketDataApi;
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::types::{Market, Opportunity};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scans the market universe for tradeable candidates
pub struct MarketScanner {
    market_data: Arc<dyn MarketDataApi>,
    config: ScannerConfig,
}

impl MarketScanner {
    pub fn new(market_data: Arc<dyn MarketDataApi>, config: ScannerConfig) -> Self {
        Self {
            market_data,
            config,
        }
    }

    /// Find opportunities in markets not already held.
    ///
    /// Partial results are acceptable: individual market failures are
    /// logged and skipped.
    pub async fn find_opportunities(&self, held: &HashSet<String>) -> Result<Vec<Opportunity>> {
        let markets = if self.config.watchlist.is_empty() {
            self.market_data
                .get_top_markets(self.config.max_markets)
                .await?
        } else {
            let mut markets = Vec::with_capacity(self.config.watchlist.len());
            for condition_id in &self.config.watchlist {
                match self.market_data.get_market(condition_id).await {
                    Ok(market) => markets.push(market),
                    Err(e) => {
                        warn!(condition_id, "skipping market, fetch failed: {}", e);
                    }
                }
            }
            markets
        };

        let mut opportunities = Vec::new();
        for market in markets {
            if !self.is_scannable(&market) {
                continue;
            }
            if held.contains(&market.condition_id) {
                debug!(condition_id = %market.condition_id, "already held, skipping");
                continue;
            }
            opportunities.extend(self.market_opportunities(&market));
        }

        debug!("scan produced {} opportunities", opportunities.len());
        Ok(opportunities)
    }

    fn is_scannable(&self, market: &Market) -> bool {
        market.active
            && !market.closed
            && !market.condition_id.is_empty()
            && market.liquidity >= self.config.min_liquidity
    }

    fn market_opportunities(&self, market: &Market) -> Vec<Opportunity> {
        market
            .outcomes
            .iter()
            .filter(|o| {
                !o.token_id.is_empty() && o.price > Decimal::ZERO && o.price < Decimal::ONE
            })
            .map(|o| Opportunity {
                condition_id: market.condition_id.clone(),
                token_id: o.token_id.clone(),
                outcome: o.outcome.clone(),
                question: market.question.clone(),
                current_price: o.price,
                neg_risk: market.neg_risk,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{binary_market, MockMarketData};
    use rust_decimal_macros::dec;

    fn scanner_with(markets: Vec<Market>, watchlist: Vec<String>) -> MarketScanner {
        let data = Arc::new(MockMarketData::with_markets(markets));
        MarketScanner::new(
            data,
            ScannerConfig {
                watchlist,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_scan_all_produces_both_outcomes() {
        let scanner = scanner_with(vec![binary_market("0xaaa", dec!(0.07))], vec![]);
        let opps = scanner.find_opportunities(&HashSet::new()).await.unwrap();

        assert_eq!(opps.len(), 2);
        assert_eq!(opps[0].condition_id, "0xaaa");
        assert_eq!(opps[0].outcome, "Yes");
        assert_eq!(opps[0].current_price, dec!(0.07));
        assert_eq!(opps[1].outcome, "No");
        assert_eq!(opps[1].current_price, dec!(0.93));
    }

    #[tokio::test]
    async fn test_held_markets_suppressed() {
        let scanner = scanner_with(
            vec![
                binary_market("0xaaa", dec!(0.07)),
                binary_market("0xbbb", dec!(0.50)),
            ],
            vec![],
        );
        let held: HashSet<String> = ["0xaaa".to_string()].into_iter().collect();
        let opps = scanner.find_opportunities(&held).await.unwrap();

        assert!(opps.iter().all(|o| o.condition_id == "0xbbb"));
    }

    #[tokio::test]
    async fn test_watchlist_bad_market_skipped() {
        // Only 0xaaa exists; 0xmissing must be skipped, not fail the scan
        let scanner = scanner_with(
            vec![binary_market("0xaaa", dec!(0.07))],
            vec!["0xmissing".into(), "0xaaa".into()],
        );
        let opps = scanner.find_opportunities(&HashSet::new()).await.unwrap();

        assert_eq!(opps.len(), 2);
        assert!(opps.iter().all(|o| o.condition_id == "0xaaa"));
    }

    #[tokio::test]
    async fn test_closed_and_illiquid_markets_filtered() {
        let mut closed = binary_market("0xccc", dec!(0.10));
        closed.closed = true;
        let mut illiquid = binary_market("0xddd", dec!(0.10));
        illiquid.liquidity = dec!(1);

        let scanner = scanner_with(vec![closed, illiquid], vec![]);
        let opps = scanner.find_opportunities(&HashSet::new()).await.unwrap();
        assert!(opps.is_empty());
    }

    #[tokio::test]
    async fn test_degenerate_prices_filtered() {
        // A resolved-looking market with 0/1 prices yields nothing
        let scanner = scanner_with(vec![binary_market("0xeee", dec!(1.0))], vec![]);
        let opps = scanner.find_opportunities(&HashSet::new()).await.unwrap();
        assert!(opps.is_empty());
    }
}

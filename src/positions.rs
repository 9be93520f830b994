//! Open-position tracking
//!
//! The venue is the authoritative, eventually-consistent ledger, so the
//! tracker never patches its cache in place: every load is a wholesale
//! replacement of the map. Reconciling deltas locally would only drift.

use crate::client::ExchangeApi;
use crate::error::Result;
use crate::types::PositionRecord;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Tracks the account's open holdings, keyed by market condition id
pub struct PositionTracker {
    venue: Arc<dyn ExchangeApi>,
    positions: RwLock<HashMap<String, PositionRecord>>,
}

impl PositionTracker {
    pub fn new(venue: Arc<dyn ExchangeApi>) -> Self {
        Self {
            venue,
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// Load all holdings from the venue, replacing the cache wholesale.
    pub async fn load_existing_positions(&self) -> Result<()> {
        let records = self.venue.get_positions().await?;
        let map: HashMap<String, PositionRecord> = records
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect();
        debug!("loaded {} open positions", map.len());
        let mut positions = self.positions.write().await;
        *positions = map;
        Ok(())
    }

    /// Reload after a trade. Same full replacement as the initial load.
    pub async fn refresh_positions(&self) -> Result<()> {
        self.load_existing_positions().await
    }

    pub async fn has_position(&self, market_id: &str) -> bool {
        self.positions.read().await.contains_key(market_id)
    }

    /// Whether the account holds shares of a specific outcome token.
    pub async fn holds_token(&self, token_id: &str) -> bool {
        self.positions
            .read()
            .await
            .values()
            .any(|p| p.token_id == token_id && p.size > Decimal::ZERO)
    }

    pub async fn position_count(&self) -> usize {
        self.positions.read().await.len()
    }

    /// Sum of `size × avg_price` across all holdings, in USDC.
    pub async fn total_exposure(&self) -> Decimal {
        self.positions
            .read()
            .await
            .values()
            .map(|p| p.size * p.avg_price)
            .sum()
    }

    /// Market ids currently held, for duplicate suppression in the scanner.
    pub async fn held_markets(&self) -> HashSet<String> {
        self.positions.read().await.keys().cloned().collect()
    }

    /// Immutable copy of the current holdings.
    pub async fn snapshot(&self) -> Vec<PositionRecord> {
        self.positions.read().await.values().cloned().collect()
    }
}

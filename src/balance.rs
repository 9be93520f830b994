//! On-venue balance tracking with a short-lived cache
//!
//! The tracker answers "is there enough collateral for size X" without
//! hammering the balance endpoint on every opportunity within a scan
//! cycle. The cache is invalidated explicitly after any trade or
//! deposit so the next check sees fresh state.

use crate::client::ExchangeApi;
use crate::error::BotError;
use crate::types::BalanceSnapshot;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Answer to a balance check
#[derive(Debug, Clone)]
pub struct BalanceCheck {
    pub has_enough_balance: bool,
    pub usdc_balance: Decimal,
}

/// Tracks the on-venue USDC balance
pub struct BalanceTracker {
    venue: Arc<dyn ExchangeApi>,
    cache: RwLock<Option<BalanceSnapshot>>,
    ttl: Duration,
}

impl BalanceTracker {
    pub fn new(venue: Arc<dyn ExchangeApi>, ttl: Duration) -> Self {
        Self {
            venue,
            cache: RwLock::new(None),
            ttl,
        }
    }

    /// Check whether the venue balance covers `required`.
    ///
    /// Fails safe: a fetch error yields `has_enough_balance = false`
    /// with a zero balance, so a transient read failure blocks a trade
    /// instead of risking an uninformed one.
    pub async fn check_balance(&self, required: Decimal) -> BalanceCheck {
        match self.current_balance().await {
            Ok(balance) => BalanceCheck {
                has_enough_balance: balance >= required,
                usdc_balance: balance,
            },
            Err(e) => {
                warn!("balance fetch failed, blocking trade: {}", e);
                BalanceCheck {
                    has_enough_balance: false,
                    usdc_balance: Decimal::ZERO,
                }
            }
        }
    }

    /// Current balance, served from the cache while it is fresh.
    pub async fn current_balance(&self) -> Result<Decimal, BotError> {
        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.as_ref() {
                let age = Utc::now() - snapshot.fetched_at;
                if age.to_std().map(|a| a < self.ttl).unwrap_or(false) {
                    return Ok(snapshot.usdc_balance);
                }
            }
        }

        let balance = self.venue.get_balance().await?;
        debug!(%balance, "fetched venue balance");
        let mut cache = self.cache.write().await;
        *cache = Some(BalanceSnapshot {
            usdc_balance: balance,
            address: self.venue.address().to_string(),
            fetched_at: Utc::now(),
        });
        Ok(balance)
    }

    /// Drop the cached snapshot. Called after trades and deposits.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

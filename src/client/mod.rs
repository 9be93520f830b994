//! Remote venue collaborators
//!
//! The core consumes the venue through the `MarketDataApi` and
//! `ExchangeApi` traits so that every component above this boundary can
//! be driven by mocks in tests. Response normalization lives entirely in
//! the concrete clients; the core never touches raw venue JSON.

pub mod auth;
pub mod clob;
pub mod gamma;

pub use auth::{ApiCredentials, OrderSigner};
pub use clob::ClobClient;
pub use gamma::GammaClient;

use crate::error::Result;
use crate::types::{Market, Order, OrderStatus, PositionRecord};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Market discovery and price lookup
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Look up a market by its condition id.
    async fn get_market(&self, condition_id: &str) -> Result<Market>;

    /// Active markets ordered by volume.
    async fn get_top_markets(&self, limit: usize) -> Result<Vec<Market>>;
}

/// Order submission and account state
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn submit_order(&self, order: &Order) -> Result<OrderStatus>;

    async fn get_positions(&self) -> Result<Vec<PositionRecord>>;

    /// On-venue USDC collateral balance.
    async fn get_balance(&self) -> Result<Decimal>;

    /// Funder address the balance and positions belong to.
    fn address(&self) -> &str;
}

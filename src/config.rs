//! Configuration loading and validation
//!
//! Config is read once at startup from a TOML file plus `.env` overrides
//! for secrets. Validation failures are fatal: the controller must not
//! start with invalid risk limits or missing credentials.

use crate::error::{BotError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub redemption: RedemptionConfig,
}

/// Venue endpoints and API credentials
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    /// Funder / proxy wallet address holding the trading balance.
    pub address: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub api_passphrase: String,
}

/// On-chain settlement configuration (Polygon)
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Private key for the reserve wallet. Needed by any command that
    /// signs venue requests or sends transactions; commands that only
    /// read public market data run without it.
    #[serde(default)]
    pub private_key: String,
    #[serde(default = "default_usdc_address")]
    pub usdc_address: String,
    #[serde(default = "default_ctf_address")]
    pub ctf_address: String,
    #[serde(default = "default_neg_risk_adapter")]
    pub neg_risk_adapter: String,
    /// Destination for deposits: the venue-specific trading wallet.
    #[serde(default)]
    pub deposit_address: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            private_key: String::new(),
            usdc_address: default_usdc_address(),
            ctf_address: default_ctf_address(),
            neg_risk_adapter: default_neg_risk_adapter(),
            deposit_address: String::new(),
            chain_id: default_chain_id(),
        }
    }
}

/// Risk limits and trading policy. Immutable per controller instance.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// When false (supervised), decisions are reported but never executed.
    #[serde(default)]
    pub unsupervised_mode: bool,
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    #[serde(default = "default_min_unit_size")]
    pub min_unit_size: Decimal,
    #[serde(default = "default_risk_limit_per_trade")]
    pub risk_limit_per_trade: Decimal,
    #[serde(default = "default_min_confidence")]
    pub min_confidence_threshold: Decimal,
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: Decimal,
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: Decimal,
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
    #[serde(default = "default_confidence_model")]
    pub confidence_model: ConfidenceModelKind,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Wait after an on-chain deposit before retrying the order. The
    /// deposit's effect on the venue balance is not immediately visible.
    #[serde(default = "default_deposit_settle_secs")]
    pub deposit_settle_secs: u64,
    #[serde(default = "default_balance_cache_secs")]
    pub balance_cache_secs: u64,
    #[serde(default)]
    pub trading_hours: Option<TradingHours>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            unsupervised_mode: false,
            max_position_size: default_max_position_size(),
            min_unit_size: default_min_unit_size(),
            risk_limit_per_trade: default_risk_limit_per_trade(),
            min_confidence_threshold: default_min_confidence(),
            max_daily_trades: default_max_daily_trades(),
            max_open_positions: default_max_open_positions(),
            buy_threshold: default_buy_threshold(),
            sell_threshold: default_sell_threshold(),
            min_edge: default_min_edge(),
            confidence_model: default_confidence_model(),
            tick_interval_secs: default_tick_interval_secs(),
            deposit_settle_secs: default_deposit_settle_secs(),
            balance_cache_secs: default_balance_cache_secs(),
            trading_hours: None,
        }
    }
}

impl TradingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn deposit_settle_delay(&self) -> Duration {
        Duration::from_secs(self.deposit_settle_secs)
    }

    pub fn balance_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_cache_secs)
    }
}

/// Selects the confidence policy used by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceModelKind {
    /// Confidence from distance to the complementary outcome price.
    PriceDistance,
    /// A fixed constant, for test-size operation.
    Fixed,
}

/// Optional trading-hours window, half-open `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TradingHours {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Fixed UTC offset of the operator's timezone, in hours.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl TradingHours {
    /// Whether `now` (UTC) falls inside the window. Supports overnight
    /// wrap (start > end).
    pub fn contains(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        use chrono::{FixedOffset, Offset, Timelike};
        let offset = FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| chrono::Utc.fix());
        let hour = now.with_timezone(&offset).hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Market universe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Condition ids to scan. Empty means scan top markets by volume.
    #[serde(default)]
    pub watchlist: Vec<String>,
    #[serde(default = "default_max_markets")]
    pub max_markets: usize,
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: Decimal,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            watchlist: Vec::new(),
            max_markets: default_max_markets(),
            min_liquidity: default_min_liquidity(),
        }
    }
}

/// Redemption monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionConfig {
    #[serde(default = "default_redemption_enabled")]
    pub enabled: bool,
    #[serde(default = "default_redemption_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            enabled: default_redemption_enabled(),
            interval_secs: default_redemption_interval_secs(),
        }
    }
}

impl RedemptionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}
fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}
fn default_rpc_url() -> String {
    "https://polygon-rpc.com".to_string()
}
fn default_usdc_address() -> String {
    // USDC.e on Polygon, the collateral token for all Polymarket markets
    "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string()
}
fn default_ctf_address() -> String {
    "0x4D97DCd97eC945f40cF65F87097ACe5EA0476045".to_string()
}
fn default_neg_risk_adapter() -> String {
    "0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296".to_string()
}
fn default_chain_id() -> u64 {
    137
}
fn default_max_position_size() -> Decimal {
    Decimal::new(100, 0)
}
fn default_min_unit_size() -> Decimal {
    Decimal::ONE
}
fn default_risk_limit_per_trade() -> Decimal {
    Decimal::new(50, 0)
}
fn default_min_confidence() -> Decimal {
    Decimal::new(60, 2) // 0.60
}
fn default_max_daily_trades() -> u32 {
    10
}
fn default_max_open_positions() -> usize {
    5
}
fn default_buy_threshold() -> Decimal {
    Decimal::new(10, 2) // 0.10
}
fn default_sell_threshold() -> Decimal {
    Decimal::new(90, 2) // 0.90
}
fn default_min_edge() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_confidence_model() -> ConfidenceModelKind {
    ConfidenceModelKind::PriceDistance
}
fn default_tick_interval_secs() -> u64 {
    60
}
fn default_deposit_settle_secs() -> u64 {
    15
}
fn default_balance_cache_secs() -> u64 {
    5
}
fn default_max_markets() -> usize {
    50
}
fn default_min_liquidity() -> Decimal {
    Decimal::new(100, 0)
}
fn default_redemption_enabled() -> bool {
    true
}
fn default_redemption_interval_secs() -> u64 {
    1800 // 30 min
}

impl Config {
    /// Load configuration from a TOML file, with `.env` applied first.
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let expanded = shellexpand::tilde(path);
        let raw = std::fs::read_to_string(expanded.as_ref())
            .map_err(|e| BotError::Config(format!("cannot read {}: {}", path, e)))?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| BotError::Config(format!("parse error: {}", e)))?;

        // Secrets may come from the environment instead of the file
        if let Ok(key) = std::env::var("POLY_API_KEY") {
            config.polymarket.api_key = key;
        }
        if let Ok(secret) = std::env::var("POLY_API_SECRET") {
            config.polymarket.api_secret = secret;
        }
        if let Ok(pass) = std::env::var("POLY_API_PASSPHRASE") {
            config.polymarket.api_passphrase = pass;
        }
        if let Ok(pk) = std::env::var("POLY_PRIVATE_KEY") {
            config.chain.private_key = pk;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the controller must not start with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.trading;
        if self.polymarket.address.is_empty() {
            return Err(BotError::Config("polymarket.address is required".into()));
        }
        if t.max_position_size <= Decimal::ZERO {
            return Err(BotError::Config("max_position_size must be positive".into()));
        }
        if t.risk_limit_per_trade <= Decimal::ZERO {
            return Err(BotError::Config(
                "risk_limit_per_trade must be positive".into(),
            ));
        }
        if t.min_unit_size <= Decimal::ZERO || t.min_unit_size > t.max_position_size {
            return Err(BotError::Config(
                "min_unit_size must be in (0, max_position_size]".into(),
            ));
        }
        if t.min_confidence_threshold < Decimal::ZERO || t.min_confidence_threshold > Decimal::ONE
        {
            return Err(BotError::Config(
                "min_confidence_threshold must be in [0, 1]".into(),
            ));
        }
        if t.max_daily_trades == 0 {
            return Err(BotError::Config("max_daily_trades must be at least 1".into()));
        }
        if t.max_open_positions == 0 {
            return Err(BotError::Config(
                "max_open_positions must be at least 1".into(),
            ));
        }
        if t.buy_threshold <= Decimal::ZERO
            || t.sell_threshold >= Decimal::ONE
            || t.buy_threshold >= t.sell_threshold
        {
            return Err(BotError::Config(
                "thresholds must satisfy 0 < buy_threshold < sell_threshold < 1".into(),
            ));
        }
        if t.min_edge < Decimal::ZERO {
            return Err(BotError::Config("min_edge must be non-negative".into()));
        }
        if let Some(hours) = &t.trading_hours {
            if hours.start_hour > 23 || hours.end_hour > 24 {
                return Err(BotError::Config("trading_hours out of range".into()));
            }
        }
        if t.unsupervised_mode && self.chain.private_key.is_empty() {
            return Err(BotError::Config(
                "unsupervised_mode requires chain.private_key".into(),
            ));
        }
        Ok(())
    }

    /// Venue and chain access signs every request, so the key is needed
    /// even in supervised mode. Checked per command rather than in
    /// `validate` so read-only commands keep working without a key.
    pub fn require_signing(&self) -> Result<()> {
        if self.chain.private_key.is_empty() {
            return Err(BotError::Config(
                "chain.private_key is required for venue and chain access".into(),
            ));
        }
        Ok(())
    }
}

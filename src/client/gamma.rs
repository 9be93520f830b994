//! Gamma API client for market data
//!
//! Fetches market metadata and outcome prices. The API returns several
//! fields as stringified JSON arrays ("[\"0.55\", \"0.45\"]"); all of
//! that normalization happens here so the rest of the bot only sees
//! typed `Market` values.

use crate::client::MarketDataApi;
use crate::error::{BotError, Result};
use crate::types::{Market, Outcome};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Gamma API client for market data
#[derive(Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GammaMarket {
    id: String,
    question: String,
    #[serde(rename = "conditionId")]
    condition_id: Option<String>,
    volume: Option<String>,
    liquidity: Option<String>,
    active: bool,
    closed: bool,
    #[serde(rename = "negRisk", default)]
    neg_risk: bool,
    outcomes: Option<String>, // JSON string
    #[serde(rename = "outcomePrices")]
    outcome_prices: Option<String>, // JSON string "[\"0.55\", \"0.45\"]"
    #[serde(rename = "clobTokenIds")]
    clob_token_ids: Option<String>, // JSON string
}

impl GammaClient {
    /// Create a new Gamma client
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn parse_market(&self, gm: GammaMarket) -> Option<Market> {
        // Prices arrive as a JSON string of decimal strings
        let prices: Vec<Decimal> = gm
            .outcome_prices
            .as_ref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .map(|v| {
                v.iter()
                    .filter_map(|p| p.parse().ok())
                    .collect::<Vec<Decimal>>()
            })
            .unwrap_or_default();

        let token_ids: Vec<String> = gm
            .clob_token_ids
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        let outcome_names: Vec<String> = gm
            .outcomes
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]);

        let outcomes: Vec<Outcome> = outcome_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Outcome {
                token_id: token_ids.get(i).cloned().unwrap_or_default(),
                outcome: name,
                price: prices.get(i).copied().unwrap_or(Decimal::ZERO),
            })
            .collect();

        Some(Market {
            id: gm.id,
            condition_id: gm.condition_id.unwrap_or_default(),
            question: gm.question,
            outcomes,
            volume: gm
                .volume
                .as_ref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Decimal::ZERO),
            liquidity: gm
                .liquidity
                .as_ref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Decimal::ZERO),
            active: gm.active,
            closed: gm.closed,
            neg_risk: gm.neg_risk,
        })
    }
}

#[async_trait]
impl MarketDataApi for GammaClient {
    /// Look up a single market by condition id.
    async fn get_market(&self, condition_id: &str) -> Result<Market> {
        let url = format!("{}/markets", self.base_url);
        let resp: Vec<GammaMarket> = self
            .http
            .get(&url)
            .query(&[("condition_ids", condition_id)])
            .send()
            .await?
            .json()
            .await?;

        resp.into_iter()
            .next()
            .and_then(|gm| self.parse_market(gm))
            .ok_or_else(|| BotError::MarketNotFound(condition_id.to_string()))
    }

    /// Active markets sorted by volume.
    async fn get_top_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.base_url);
        let resp: Vec<GammaMarket> = self
            .http
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("_sort", "volume:desc"),
                ("_limit", &limit.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let markets: Vec<Market> = resp
            .into_iter()
            .filter_map(|m| self.parse_market(m))
            .collect();
        debug!("fetched {} active markets", markets.len());
        Ok(markets)
    }
}

//! CLOB (Central Limit Order Book) API client
//!
//! Handles order signing and submission, plus authenticated account
//! queries (balance, positions). Every endpoint has a typed
//! request/response schema; mapping to the domain types happens here.

use crate::client::auth::{ApiCredentials, OrderSignData, OrderSigner};
use crate::client::ExchangeApi;
use crate::error::{BotError, Result};
use crate::types::{Order, OrderStatus, OrderType, PositionRecord, Side};
use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, U256};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// USDC has 6 decimals; order amounts go over the wire in raw units.
const COLLATERAL_SCALE: i64 = 1_000_000;

/// CLOB API client for trading operations
#[derive(Clone)]
pub struct ClobClient {
    http: Client,
    base_url: String,
    signer: OrderSigner,
    credentials: ApiCredentials,
    /// Funder / proxy wallet that holds the balance and positions.
    funder: String,
}

#[derive(Debug, Serialize)]
struct SignedOrderRequest {
    order: OrderPayload,
    owner: String,
    #[serde(rename = "orderType")]
    order_type: String,
}

#[derive(Debug, Serialize)]
struct OrderPayload {
    salt: String,
    maker: String,
    signer: String,
    taker: String,
    #[serde(rename = "tokenId")]
    token_id: String,
    #[serde(rename = "makerAmount")]
    maker_amount: String,
    #[serde(rename = "takerAmount")]
    taker_amount: String,
    expiration: String,
    nonce: String,
    #[serde(rename = "feeRateBps")]
    fee_rate_bps: String,
    side: String,
    #[serde(rename = "signatureType")]
    signature_type: u8,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(rename = "orderID", default)]
    order_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    success: bool,
    #[serde(rename = "errorMsg", default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    #[serde(rename = "conditionId", default)]
    condition_id: String,
    #[serde(default)]
    asset: String,
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    size: Decimal,
    #[serde(rename = "avgPrice", default)]
    avg_price: Decimal,
    #[serde(rename = "curPrice", default)]
    cur_price: Decimal,
    #[serde(rename = "cashPnl", default)]
    cash_pnl: Decimal,
    #[serde(default)]
    redeemable: bool,
    #[serde(rename = "negativeRisk", default)]
    negative_risk: bool,
}

impl ClobClient {
    /// Create a new CLOB client
    pub fn new(
        base_url: &str,
        signer: OrderSigner,
        credentials: ApiCredentials,
        funder: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
            credentials,
            funder,
        })
    }

    fn auth_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<Vec<(&'static str, String)>> {
        if !self.credentials.is_complete() {
            return Err(BotError::Auth("missing API credentials".into()));
        }
        let timestamp = Utc::now().timestamp();
        let signature = self
            .credentials
            .sign_request(timestamp, method, path, body)?;
        Ok(vec![
            ("POLY_ADDRESS", self.signer.address_hex()),
            ("POLY_API_KEY", self.credentials.api_key.clone()),
            ("POLY_PASSPHRASE", self.credentials.api_passphrase.clone()),
            ("POLY_SIGNATURE", signature),
            ("POLY_TIMESTAMP", timestamp.to_string()),
        ])
    }

    /// Build and sign the wire payload for an order.
    fn build_payload(&self, order: &Order) -> Result<OrderPayload> {
        let price_f = order
            .price
            .to_f64()
            .ok_or_else(|| BotError::Execution("price out of range".into()))?;
        if !(0.0..=1.0).contains(&price_f) {
            return Err(BotError::Execution(format!(
                "price {} outside [0, 1]",
                order.price
            )));
        }

        let shares_raw = (order.size * Decimal::from(COLLATERAL_SCALE))
            .to_u128()
            .ok_or_else(|| BotError::Execution("size out of range".into()))?;
        let cost_raw = (order.size * order.price * Decimal::from(COLLATERAL_SCALE))
            .to_u128()
            .ok_or_else(|| BotError::Execution("cost out of range".into()))?;

        // Buy: give USDC, receive shares. Sell: the reverse.
        let (maker_amount, taker_amount, side_code) = match order.side {
            Side::Buy => (cost_raw, shares_raw, 0u8),
            Side::Sell => (shares_raw, cost_raw, 1u8),
        };

        let token_id = U256::from_dec_str(&order.token_id)
            .map_err(|e| BotError::Execution(format!("invalid token id: {}", e)))?;

        let salt = U256::from(Utc::now().timestamp_micros() as u64);
        let sign_data = OrderSignData {
            salt,
            maker: self
                .funder
                .parse::<Address>()
                .map_err(|e| BotError::Execution(format!("invalid funder: {}", e)))?,
            signer: self.signer.address(),
            taker: Address::zero(),
            token_id,
            maker_amount: U256::from(maker_amount),
            taker_amount: U256::from(taker_amount),
            expiration: U256::zero(),
            nonce: U256::zero(),
            fee_rate_bps: U256::zero(),
            side: side_code,
            signature_type: 1, // proxy wallet
        };
        let signature = self.signer.sign_order(&sign_data)?;

        Ok(OrderPayload {
            salt: salt.to_string(),
            maker: self.funder.clone(),
            signer: self.signer.address_hex(),
            taker: format!("{:?}", Address::zero()),
            token_id: order.token_id.clone(),
            maker_amount: maker_amount.to_string(),
            taker_amount: taker_amount.to_string(),
            expiration: "0".to_string(),
            nonce: "0".to_string(),
            fee_rate_bps: "0".to_string(),
            side: order.side.to_string(),
            signature_type: 1,
            signature,
        })
    }
}

#[async_trait]
impl ExchangeApi for ClobClient {
    /// Sign and submit an order.
    ///
    /// The venue's insufficient balance/allowance rejection is surfaced
    /// verbatim inside `BotError::Api` so the executor can recognize it.
    async fn submit_order(&self, order: &Order) -> Result<OrderStatus> {
        let payload = self.build_payload(order)?;
        let req = SignedOrderRequest {
            order: payload,
            owner: self.credentials.api_key.clone(),
            order_type: match order.order_type {
                OrderType::GTC => "GTC".to_string(),
                OrderType::FOK => "FOK".to_string(),
                OrderType::GTD => "GTD".to_string(),
            },
        };

        let body = serde_json::to_string(&req)
            .map_err(|e| BotError::Internal(format!("serialize order: {}", e)))?;
        let headers = self.auth_headers("POST", "/order", &body)?;

        let url = format!("{}/order", self.base_url);
        let mut builder = self.http.post(&url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let resp: OrderResponse = builder
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?
            .json()
            .await?;

        if !resp.success && resp.order_id.is_empty() {
            return Err(BotError::Api(resp.error_msg));
        }

        Ok(OrderStatus {
            order_id: resp.order_id,
            status: resp.status,
        })
    }

    async fn get_positions(&self) -> Result<Vec<PositionRecord>> {
        let headers = self.auth_headers("GET", "/positions", "")?;
        let url = format!("{}/positions", self.base_url);
        let mut builder = self.http.get(&url).query(&[("user", &self.funder)]);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let resp: Vec<PositionResponse> = builder.send().await?.json().await?;

        Ok(resp
            .into_iter()
            .filter(|p| p.size > Decimal::ZERO)
            .map(|p| PositionRecord {
                condition_id: p.condition_id,
                token_id: p.asset,
                outcome: p.outcome,
                question: p.title,
                size: p.size,
                avg_price: p.avg_price,
                current_price: p.cur_price,
                pnl: p.cash_pnl,
                redeemable: p.redeemable,
                neg_risk: p.negative_risk,
            })
            .collect())
    }

    async fn get_balance(&self) -> Result<Decimal> {
        let headers = self.auth_headers("GET", "/balance", "")?;
        let url = format!("{}/balance", self.base_url);
        let mut builder = self.http.get(&url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let resp: BalanceResponse = builder.send().await?.json().await?;

        let raw: Decimal = resp
            .balance
            .parse()
            .map_err(|e| BotError::Api(format!("invalid balance: {}", e)))?;
        // Balance endpoint reports raw 6-decimal units
        Ok(raw / Decimal::from(COLLATERAL_SCALE))
    }

    fn address(&self) -> &str {
        &self.funder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;
    use rust_decimal_macros::dec;

    fn test_client() -> ClobClient {
        let signer = OrderSigner::from_private_key(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            137,
        )
        .unwrap();
        let credentials = ApiCredentials {
            api_key: "key".into(),
            api_secret: URL_SAFE.encode(b"secret"),
            api_passphrase: "pass".into(),
        };
        ClobClient::new(
            "https://clob.polymarket.com",
            signer,
            credentials,
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_payload_buy_amounts() {
        let client = test_client();
        let order = Order {
            token_id: "123456".into(),
            side: Side::Buy,
            price: dec!(0.10),
            size: dec!(50),
            order_type: OrderType::GTC,
        };
        let payload = client.build_payload(&order).unwrap();

        // Buying 50 shares at 0.10: give 5 USDC, receive 50 shares
        assert_eq!(payload.maker_amount, "5000000");
        assert_eq!(payload.taker_amount, "50000000");
        assert_eq!(payload.side, "BUY");
        assert!(payload.signature.starts_with("0x"));
    }

    #[test]
    fn test_build_payload_sell_amounts() {
        let client = test_client();
        let order = Order {
            token_id: "123456".into(),
            side: Side::Sell,
            price: dec!(0.90),
            size: dec!(10),
            order_type: OrderType::GTC,
        };
        let payload = client.build_payload(&order).unwrap();

        // Selling 10 shares at 0.90: give 10 shares, receive 9 USDC
        assert_eq!(payload.maker_amount, "10000000");
        assert_eq!(payload.taker_amount, "9000000");
        assert_eq!(payload.side, "SELL");
    }

    #[test]
    fn test_build_payload_rejects_bad_price() {
        let client = test_client();
        let order = Order {
            token_id: "123456".into(),
            side: Side::Buy,
            price: dec!(1.5),
            size: dec!(10),
            order_type: OrderType::GTC,
        };
        assert!(client.build_payload(&order).is_err());
    }

    #[test]
    fn test_build_payload_rejects_bad_token() {
        let client = test_client();
        let order = Order {
            token_id: "not-a-number".into(),
            side: Side::Buy,
            price: dec!(0.5),
            size: dec!(10),
            order_type: OrderType::GTC,
        };
        assert!(client.build_payload(&order).is_err());
    }
}

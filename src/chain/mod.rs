//! On-chain settlement layer (Polygon)
//!
//! Three operations back the trading loop: depositing reserve USDC into
//! the venue trading wallet, redeeming resolved standard markets through
//! the CTF contract, and redeeming neg-risk markets through the
//! NegRiskAdapter. All calls are encoded manually (selector + ABI) and
//! sent through a `SignerMiddleware`.

use crate::config::ChainConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// USDC raw units per token (6 decimals).
const COLLATERAL_SCALE: f64 = 1_000_000.0;

/// Transaction confirmation timeout.
const TX_TIMEOUT_SECS: u64 = 120;

/// On-chain settlement operations as the controller consumes them
#[async_trait]
pub trait Settlement: Send + Sync {
    /// Move reserve collateral into the venue trading wallet.
    /// Returns the transaction hash.
    async fn deposit(&self, amount: Decimal) -> Result<String>;

    /// Redeem a resolved standard market via CTF `redeemPositions`.
    async fn redeem(&self, condition_id: &str, index_sets: &[u64]) -> Result<String>;

    /// Redeem a resolved neg-risk market via the NegRiskAdapter, which
    /// takes explicit amounts per outcome instead of index sets.
    async fn redeem_neg_risk(&self, condition_id: &str, amounts: &[Decimal]) -> Result<String>;
}

/// Ethers-backed settlement client
pub struct OnchainSettlement {
    config: ChainConfig,
}

impl OnchainSettlement {
    pub fn new(config: ChainConfig) -> Result<Self> {
        if config.private_key.is_empty() {
            return Err(BotError::Config("chain.private_key is required".into()));
        }
        Ok(Self { config })
    }

    fn build_client(&self) -> Result<SignerMiddleware<Provider<Http>, LocalWallet>> {
        let provider = Provider::<Http>::try_from(self.config.rpc_url.as_str())
            .map_err(|e| BotError::Chain(format!("RPC provider error: {}", e)))?;

        let wallet: LocalWallet = self
            .config
            .private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| BotError::Chain(format!("wallet parse error: {}", e)))?
            .with_chain_id(self.config.chain_id);

        Ok(SignerMiddleware::new(provider, wallet))
    }

    fn parse_address(&self, addr: &str, label: &str) -> Result<Address> {
        addr.parse()
            .map_err(|e| BotError::Chain(format!("{} address parse error: {}", label, e)))
    }

    async fn send_call(
        &self,
        to: Address,
        calldata: Vec<u8>,
        label: &str,
    ) -> Result<String> {
        let client = self.build_client()?;

        let tx = TransactionRequest::new()
            .to(to)
            .data(calldata)
            .from(client.address());

        let gas_estimate = client
            .estimate_gas(&tx.clone().into(), None)
            .await
            .map_err(|e| BotError::Chain(format!("{} gas estimation failed: {}", label, e)))?;
        let tx_with_gas = tx.gas(gas_estimate * 120 / 100);

        let pending_tx = client
            .send_transaction(tx_with_gas, None)
            .await
            .map_err(|e| BotError::Chain(format!("{} tx send failed: {}", label, e)))?;

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        info!(tx = %tx_hash, "{} tx sent, waiting for confirmation", label);

        match tokio::time::timeout(
            std::time::Duration::from_secs(TX_TIMEOUT_SECS),
            pending_tx,
        )
        .await
        {
            Ok(Ok(Some(receipt))) => {
                if receipt.status == Some(U64::from(1)) {
                    info!(
                        tx = %tx_hash,
                        block = receipt.block_number.unwrap_or_default().as_u64(),
                        "{} confirmed",
                        label
                    );
                    Ok(tx_hash)
                } else {
                    Err(BotError::Chain(format!("{} tx reverted: {}", label, tx_hash)))
                }
            }
            Ok(Ok(None)) => {
                warn!(tx = %tx_hash, "{} tx dropped without receipt", label);
                Err(BotError::Chain(format!("{} tx dropped: {}", label, tx_hash)))
            }
            Ok(Err(e)) => Err(BotError::Chain(format!("{} tx error: {}", label, e))),
            Err(_) => {
                // Still pending on-chain; surface the hash so the operator can check
                warn!(tx = %tx_hash, "{} tx confirmation timeout", label);
                Ok(tx_hash)
            }
        }
    }
}

/// Parse a hex condition ID string into a 32-byte array.
fn parse_condition_id(condition_id: &str) -> Result<[u8; 32]> {
    let hex_str = condition_id.strip_prefix("0x").unwrap_or(condition_id);
    let bytes = hex::decode(hex_str)
        .map_err(|e| BotError::Chain(format!("condition id hex decode error: {}", e)))?;
    if bytes.len() != 32 {
        return Err(BotError::Chain(format!(
            "condition id wrong length: {} bytes",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

fn to_raw_units(amount: Decimal, label: &str) -> Result<U256> {
    let value = amount
        .to_f64()
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| BotError::Chain(format!("invalid {} amount: {}", label, amount)))?;
    Ok(U256::from((value * COLLATERAL_SCALE) as u128))
}

fn encode_call(signature: &[u8], params: &[ethers::abi::Token]) -> Vec<u8> {
    let mut calldata = ethers::core::utils::keccak256(signature)[..4].to_vec();
    calldata.extend_from_slice(&ethers::abi::encode(params));
    calldata
}

#[async_trait]
impl Settlement for OnchainSettlement {
    /// ERC-20 `transfer` of reserve USDC to the venue trading wallet.
    /// The asynchronous bridging on the venue side means the balance is
    /// not immediately visible after confirmation.
    async fn deposit(&self, amount: Decimal) -> Result<String> {
        if amount <= Decimal::ZERO {
            return Err(BotError::Chain(format!("invalid deposit amount: {}", amount)));
        }
        if self.config.deposit_address.is_empty() {
            return Err(BotError::Config("chain.deposit_address is required".into()));
        }
        let usdc = self.parse_address(&self.config.usdc_address, "USDC")?;
        let to = self.parse_address(&self.config.deposit_address, "deposit")?;
        let raw = to_raw_units(amount, "deposit")?;

        let calldata = encode_call(
            b"transfer(address,uint256)",
            &[
                ethers::abi::Token::Address(to),
                ethers::abi::Token::Uint(raw),
            ],
        );

        info!(%amount, to = %self.config.deposit_address, "depositing reserve USDC");
        self.send_call(usdc, calldata, "Deposit").await
    }

    /// CTF `redeemPositions(collateral, parentCollectionId, conditionId,
    /// indexSets)` with the null parent collection Polymarket always uses.
    async fn redeem(&self, condition_id: &str, index_sets: &[u64]) -> Result<String> {
        let ctf = self.parse_address(&self.config.ctf_address, "CTF")?;
        let usdc = self.parse_address(&self.config.usdc_address, "USDC")?;
        let condition_bytes = parse_condition_id(condition_id)?;

        let sets: Vec<ethers::abi::Token> = index_sets
            .iter()
            .map(|s| ethers::abi::Token::Uint(U256::from(*s)))
            .collect();

        let calldata = encode_call(
            b"redeemPositions(address,bytes32,bytes32,uint256[])",
            &[
                ethers::abi::Token::Address(usdc),
                ethers::abi::Token::FixedBytes(vec![0u8; 32]),
                ethers::abi::Token::FixedBytes(condition_bytes.to_vec()),
                ethers::abi::Token::Array(sets),
            ],
        );

        info!(condition_id, ?index_sets, "redeeming standard market");
        self.send_call(ctf, calldata, "Redeem").await
    }

    /// NegRiskAdapter `redeemPositions(conditionId, amounts)` for
    /// combinatorial markets.
    async fn redeem_neg_risk(&self, condition_id: &str, amounts: &[Decimal]) -> Result<String> {
        let adapter = self.parse_address(&self.config.neg_risk_adapter, "NegRiskAdapter")?;
        let condition_bytes = parse_condition_id(condition_id)?;

        let amount_tokens = amounts
            .iter()
            .map(|a| to_raw_units(*a, "redeem").map(ethers::abi::Token::Uint))
            .collect::<Result<Vec<_>>>()?;

        let calldata = encode_call(
            b"redeemPositions(bytes32,uint256[])",
            &[
                ethers::abi::Token::FixedBytes(condition_bytes.to_vec()),
                ethers::abi::Token::Array(amount_tokens),
            ],
        );

        info!(condition_id, "redeeming neg-risk market");
        self.send_call(adapter, calldata, "NegRiskRedeem").await
    }
}

//! Authentication and signing for the CLOB API
//!
//! Orders are signed with EIP-712 typed data; authenticated REST calls
//! carry Level 2 HMAC headers derived from the API credentials.

use crate::error::{BotError, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Polymarket CTF Exchange contract on Polygon, the EIP-712 verifying
/// contract for order signatures.
const EXCHANGE_ADDRESS: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";

const ORDER_TYPE: &[u8] =
    b"Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)";

/// API credentials for Level 2 (HMAC) authentication
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
}

impl ApiCredentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty() && !self.api_passphrase.is_empty()
    }

    /// Build the L2 HMAC signature over `timestamp + method + path + body`.
    ///
    /// The secret is base64url-encoded; so is the output digest.
    pub fn sign_request(
        &self,
        timestamp: i64,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<String> {
        let secret = URL_SAFE
            .decode(&self.api_secret)
            .map_err(|e| BotError::Auth(format!("invalid api secret: {}", e)))?;

        let mut mac = Hmac::<Sha256>::new_from_slice(&secret)
            .map_err(|e| BotError::Auth(format!("hmac init: {}", e)))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());

        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}

/// Fields of an order as they are hashed for signing
#[derive(Debug, Clone)]
pub struct OrderSignData {
    pub salt: U256,
    pub maker: Address,
    pub signer: Address,
    pub taker: Address,
    pub token_id: U256,
    pub maker_amount: U256,
    pub taker_amount: U256,
    pub expiration: U256,
    pub nonce: U256,
    pub fee_rate_bps: U256,
    pub side: u8,
    pub signature_type: u8,
}

/// Wallet-backed order signer
#[derive(Clone)]
pub struct OrderSigner {
    wallet: LocalWallet,
    chain_id: u64,
}

impl OrderSigner {
    /// Create a signer from a hex private key, with or without 0x prefix.
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| BotError::Auth(format!("invalid private key: {}", e)))?;
        Ok(Self {
            wallet: wallet.with_chain_id(chain_id),
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn address_hex(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    /// Sign an order digest per the exchange's EIP-712 domain.
    pub fn sign_order(&self, order: &OrderSignData) -> Result<String> {
        let mut data = vec![0x19, 0x01];
        data.extend_from_slice(&self.domain_separator()?);
        data.extend_from_slice(&order_struct_hash(order));
        let digest = H256::from(keccak256(&data));

        let signature = self
            .wallet
            .sign_hash(digest)
            .map_err(|e| BotError::Auth(format!("signing failed: {}", e)))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    fn domain_separator(&self) -> Result<[u8; 32]> {
        let exchange: Address = EXCHANGE_ADDRESS
            .parse()
            .map_err(|e| BotError::Auth(format!("exchange address: {}", e)))?;

        let mut data = Vec::new();
        data.extend_from_slice(&keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        ));
        data.extend_from_slice(&keccak256(b"Polymarket CTF Exchange"));
        data.extend_from_slice(&keccak256(b"1"));
        data.extend_from_slice(&bytes32_of(U256::from(self.chain_id)));
        data.extend_from_slice(&address_bytes32(exchange));
        Ok(keccak256(&data))
    }
}

fn order_struct_hash(order: &OrderSignData) -> [u8; 32] {
    let mut data = Vec::new();
    data.extend_from_slice(&keccak256(ORDER_TYPE));
    data.extend_from_slice(&bytes32_of(order.salt));
    data.extend_from_slice(&address_bytes32(order.maker));
    data.extend_from_slice(&address_bytes32(order.signer));
    data.extend_from_slice(&address_bytes32(order.taker));
    data.extend_from_slice(&bytes32_of(order.token_id));
    data.extend_from_slice(&bytes32_of(order.maker_amount));
    data.extend_from_slice(&bytes32_of(order.taker_amount));
    data.extend_from_slice(&bytes32_of(order.expiration));
    data.extend_from_slice(&bytes32_of(order.nonce));
    data.extend_from_slice(&bytes32_of(order.fee_rate_bps));
    data.extend_from_slice(&bytes32_of(U256::from(order.side)));
    data.extend_from_slice(&bytes32_of(U256::from(order.signature_type)));
    keccak256(&data)
}

fn bytes32_of(value: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

fn address_bytes32(addr: Address) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(addr.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_signer_from_key() {
        let signer = OrderSigner::from_private_key(TEST_KEY, 137).unwrap();
        assert_ne!(signer.address(), Address::zero());

        // Same key without the prefix yields the same address
        let bare = OrderSigner::from_private_key(&TEST_KEY[2..], 137).unwrap();
        assert_eq!(signer.address(), bare.address());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(OrderSigner::from_private_key("nonsense", 137).is_err());
    }

    #[test]
    fn test_order_signature_deterministic() {
        let signer = OrderSigner::from_private_key(TEST_KEY, 137).unwrap();
        let order = OrderSignData {
            salt: U256::from(42u64),
            maker: signer.address(),
            signer: signer.address(),
            taker: Address::zero(),
            token_id: U256::from(7u64),
            maker_amount: U256::from(1_000_000u64),
            taker_amount: U256::from(2_000_000u64),
            expiration: U256::zero(),
            nonce: U256::zero(),
            fee_rate_bps: U256::zero(),
            side: 0,
            signature_type: 0,
        };
        let a = signer.sign_order(&order).unwrap();
        let b = signer.sign_order(&order).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("0x"));
    }

    #[test]
    fn test_hmac_signature() {
        let creds = ApiCredentials {
            api_key: "key".into(),
            api_secret: URL_SAFE.encode(b"super-secret"),
            api_passphrase: "pass".into(),
        };
        let sig = creds
            .sign_request(1700000000, "POST", "/order", "{}")
            .unwrap();
        assert!(!sig.is_empty());

        // Different body, different signature
        let other = creds
            .sign_request(1700000000, "POST", "/order", "{\"a\":1}")
            .unwrap();
        assert_ne!(sig, other);
    }

    #[test]
    fn test_incomplete_credentials() {
        let creds = ApiCredentials {
            api_key: "key".into(),
            api_secret: String::new(),
            api_passphrase: "pass".into(),
        };
        assert!(!creds.is_complete());
    }
}

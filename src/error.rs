//! Error types for the trading controller

use thiserror::Error;

/// All errors the bot can produce
#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Risk limit: {0}")]
    RiskLimit(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    /// Whether this error is the venue's insufficient balance/allowance
    /// rejection, which is recoverable via an on-chain deposit.
    pub fn is_insufficient_balance(&self) -> bool {
        match self {
            BotError::Api(msg) | BotError::Execution(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("not enough balance") || msg.contains("allowance")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_detection() {
        let err = BotError::Api("not enough balance / allowance".into());
        assert!(err.is_insufficient_balance());

        let err = BotError::Api("Insufficient allowance for order".into());
        assert!(err.is_insufficient_balance());

        let err = BotError::Api("order rejected: market closed".into());
        assert!(!err.is_insufficient_balance());

        let err = BotError::Auth("not enough balance".into());
        assert!(!err.is_insufficient_balance());
    }
}

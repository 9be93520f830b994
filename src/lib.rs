//! Autonomous Polymarket trading controller
//!
//! Scans binary prediction markets for mispriced outcomes, evaluates
//! them against configured risk limits, and executes limit orders on
//! the CLOB. A separate monitor redeems winning positions on chain
//! once markets resolve.
//!
//! ## Architecture
//!
//! ```text
//! Scanner → Evaluator → Executor → CLOB
//!    ↑          ↑           ↑
//! Positions  Balance    Settlement (deposit / redeem)
//!    └──────── Controller (risk gates, tick loop)
//!
//! RedemptionMonitor (independent loop) → Settlement
//! ```

pub mod balance;
pub mod chain;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod notify;
pub mod positions;
pub mod redemption;
pub mod scanner;
pub mod testing;
pub mod types;

#[cfg(test)]
mod config_tests;

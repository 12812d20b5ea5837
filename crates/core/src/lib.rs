//! Lending ledger and risk engine.
//!
//! This crate provides the pooled lending core:
//! - Token registry pairing approved tokens with price feeds
//! - Staged deposit/borrow ledger with atomic commits
//! - Safety factor computation over validated oracle prices
//! - Deposit, withdraw, borrow, repay and liquidation operations
//!
//! Tokens and price feeds are collaborators from `lending-chain`; the engine
//! only records positions and decides whether an operation may proceed.

pub mod config;
mod engine;
mod error;
mod events;
mod ledger;
mod liquidation;
mod oracle;
mod position;
mod registry;
mod risk;
pub mod u256_math;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, LiquidationConfig, MarketConfig, MarketsConfig, OracleConfig, RiskConfig};
pub use engine::{LendingEngine, SharedEngine};
pub use error::{LedgerError, LendingError, LendingResult};
pub use events::LendingEvent;
pub use ledger::{BalanceView, Changeset, Direction, Ledger, LedgerOp, Side, StagedView};
pub use liquidation::{LiquidationOutcome, LiquidationQuote};
pub use oracle::{PriceOracle, PriceSnapshot};
pub use position::{AccountSnapshot, Holding};
pub use registry::{ApprovedToken, TokenRegistry};
pub use risk::RiskEngine;

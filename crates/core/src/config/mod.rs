//! Configuration for the lending engine.
//!
//! This module provides:
//! - Engine runtime configuration (profiles, risk and liquidation parameters)
//! - Market configuration (tokens, feeds, decimals, initial prices)

mod engine;
mod markets;

pub use engine::{EngineConfig, LiquidationConfig, OracleConfig, RiskConfig};
pub use markets::{MarketConfig, MarketsConfig};

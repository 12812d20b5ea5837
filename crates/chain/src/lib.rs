//! Lending chain collaborator layer.
//!
//! This crate provides the external interfaces the lending engine consumes:
//! - Price feed read interface (Chainlink-style rounds) and a mock aggregator
//! - Fungible token interface (ERC-20 semantics) and an in-memory token
//!
//! Neither is reimplemented by the engine; both are injected into it.

pub mod oracle;
pub mod token;

pub use oracle::{MockAggregator, OracleError, PriceData, PriceFeed, RoundData};
pub use token::{FungibleToken, InMemoryToken, TokenError};

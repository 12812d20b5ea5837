//! Price feed abstraction.
//!
//! The lending engine only ever *reads* prices. This module defines the read
//! interface every feed must provide and a mock aggregator used by tests and
//! the replay binary.
//!
//! # Architecture
//!
//! - [`PriceFeed`]: Chainlink-style read interface (`latest_round`, `decimals`)
//! - [`RoundData`]: raw round as reported by the feed
//! - [`PriceData`]: validated price with its decimals, normalizable to WAD
//! - [`MockAggregator`]: in-memory aggregator whose answer can be updated
//!
//! # Example
//!
//! ```rust,ignore
//! use lending_chain::oracle::{MockAggregator, PriceFeed};
//!
//! let feed = MockAggregator::new(feed_address, 18, U256::from(10u64.pow(15)));
//! let round = feed.latest_round()?;
//! assert!(round.is_valid());
//! ```

mod mock;
mod types;

pub use mock::MockAggregator;
pub use types::PriceData;

use alloy::primitives::{Address, U256};
use std::fmt::Debug;
use thiserror::Error;

/// Errors raised while reading a price feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("feed {feed} has no round data")]
    NoData { feed: Address },

    #[error("feed {feed} returned an invalid round {round_id}: {reason}")]
    InvalidRound {
        feed: Address,
        round_id: u128,
        reason: &'static str,
    },

    #[error("feed {feed} is stale: last update {age_secs}s ago, max {max_age_secs}s")]
    Stale {
        feed: Address,
        age_secs: u64,
        max_age_secs: u64,
    },
}

/// Read interface of an external price feed.
///
/// Reads are synchronous. An implementation must return an error rather than
/// a default value when it has nothing to report.
pub trait PriceFeed: Send + Sync + Debug {
    /// Feed contract address.
    fn address(&self) -> Address;

    /// Decimals of the reported answer.
    fn decimals(&self) -> u8;

    /// Human-readable pair description (e.g. "USDC / ETH").
    fn description(&self) -> String {
        String::new()
    }

    /// Latest round reported by the feed.
    fn latest_round(&self) -> Result<RoundData, OracleError>;
}

/// Round data from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundData {
    /// Round ID
    pub round_id: u128,
    /// Price answer (feed decimals)
    pub answer: U256,
    /// Timestamp when round started
    pub started_at: u64,
    /// Timestamp when answer was computed
    pub updated_at: u64,
    /// Round ID for which answer was computed
    pub answered_in_round: u128,
}

impl RoundData {
    /// Check if this round's data is usable.
    pub fn is_valid(&self) -> bool {
        self.invalid_reason().is_none()
    }

    /// Why this round must not be used, if it must not.
    pub fn invalid_reason(&self) -> Option<&'static str> {
        if self.answer.is_zero() {
            Some("answer is zero")
        } else if self.updated_at == 0 {
            Some("round never completed")
        } else if self.answered_in_round < self.round_id {
            Some("answer carried over from an earlier round")
        } else {
            None
        }
    }

    /// Age of the answer in seconds relative to `now`.
    pub fn age_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.updated_at)
    }
}

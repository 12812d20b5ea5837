//! In-memory aggregator mirroring Chainlink's `MockV3Aggregator`.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::{OracleError, PriceFeed, RoundData};

/// Mock price aggregator.
///
/// Answers are set explicitly; every update opens a new round stamped with
/// the current wall-clock time.
#[derive(Debug)]
pub struct MockAggregator {
    address: Address,
    decimals: u8,
    description: String,
    round: RwLock<Option<RoundData>>,
}

impl MockAggregator {
    /// Create an aggregator reporting `initial_answer` in round 1.
    pub fn new(address: Address, decimals: u8, initial_answer: U256) -> Self {
        let feed = Self::empty(address, decimals);
        feed.update_answer(initial_answer);
        feed
    }

    /// Create an aggregator that has never reported.
    pub fn empty(address: Address, decimals: u8) -> Self {
        Self {
            address,
            decimals,
            description: String::new(),
            round: RwLock::new(None),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Publish a new answer in a fresh round.
    pub fn update_answer(&self, answer: U256) {
        let now = Utc::now().timestamp().max(0) as u64;
        let mut round = self.round.write();
        let round_id = round.as_ref().map_or(1, |r| r.round_id + 1);

        debug!(feed = %self.address, round_id, answer = %answer, "Mock feed updated");

        *round = Some(RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        });
    }

    /// Replace the current round verbatim (for simulating broken feeds).
    pub fn set_round(&self, data: RoundData) {
        *self.round.write() = Some(data);
    }
}

impl PriceFeed for MockAggregator {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn latest_round(&self) -> Result<RoundData, OracleError> {
        self.round
            .read()
            .clone()
            .ok_or(OracleError::NoData { feed: self.address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_advance_on_update() {
        let feed = MockAggregator::new(Address::repeat_byte(0x11), 18, U256::from(1_000u64));
        let first = feed.latest_round().unwrap();
        assert_eq!(first.round_id, 1);
        assert!(first.is_valid());

        feed.update_answer(U256::from(2_000u64));
        let second = feed.latest_round().unwrap();
        assert_eq!(second.round_id, 2);
        assert_eq!(second.answered_in_round, 2);
        assert_eq!(second.answer, U256::from(2_000u64));
    }

    #[test]
    fn test_empty_feed_reports_no_data() {
        let addr = Address::repeat_byte(0x22);
        let feed = MockAggregator::empty(addr, 8);
        assert_eq!(feed.latest_round(), Err(OracleError::NoData { feed: addr }));
    }
}

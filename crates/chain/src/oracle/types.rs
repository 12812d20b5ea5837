//! Oracle price types.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::RoundData;

/// Validated price with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    /// Price value (in feed decimals)
    pub price: U256,
    /// Price decimals
    pub decimals: u8,
    /// Timestamp when price was updated
    pub timestamp: u64,
    /// Round that produced this price
    pub round_id: u128,
}

impl PriceData {
    /// Create new price data.
    pub fn new(price: U256, decimals: u8, timestamp: u64, round_id: u128) -> Self {
        Self {
            price,
            decimals,
            timestamp,
            round_id,
        }
    }

    /// Build from a feed round.
    pub fn from_round(round: &RoundData, decimals: u8) -> Self {
        Self::new(round.answer, decimals, round.updated_at, round.round_id)
    }

    /// Get price as f64 (display only).
    pub fn price_f64(&self) -> f64 {
        let divisor = 10_f64.powi(self.decimals as i32);
        self.price.to_string().parse::<f64>().unwrap_or(0.0) / divisor
    }

    /// Check if price is stale.
    pub fn is_stale(&self, threshold_secs: u64, current_time: u64) -> bool {
        current_time.saturating_sub(self.timestamp) > threshold_secs
    }

    /// Normalize price to 18 decimals.
    ///
    /// Returns `None` if scaling up overflows.
    pub fn normalize_to_18(&self) -> Option<U256> {
        if self.decimals == 18 {
            Some(self.price)
        } else if self.decimals < 18 {
            let scale = U256::from(10u64).pow(U256::from(18 - self.decimals));
            self.price.checked_mul(scale)
        } else {
            let scale = U256::from(10u64).pow(U256::from(self.decimals - 18));
            Some(self.price / scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_data_conversion() {
        let price = PriceData::new(U256::from(200_000_000_000u64), 8, 1700000000, 1);
        assert!((price.price_f64() - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_price_normalization() {
        // 8 decimal price -> 18 decimals
        let price = PriceData::new(U256::from(100_000_000u64), 8, 1700000000, 1);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(18))));

        // 18 decimals untouched
        let price = PriceData::new(U256::from(10u128.pow(15)), 18, 1700000000, 1);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(15))));

        // 20 decimals scaled down
        let price = PriceData::new(U256::from(10u128.pow(20)), 20, 1700000000, 1);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(18))));
    }

    #[test]
    fn test_staleness() {
        let price = PriceData::new(U256::from(100_000_000u64), 8, 1700000000, 1);

        let threshold = 3600;
        assert!(price.is_stale(threshold, 1700000000 + 3601));
        assert!(!price.is_stale(threshold, 1700000000 + 3599));
    }
}

//! Price oracle adapter.
//!
//! Turns a token's feed round into a WAD price per whole token, refusing
//! anything it cannot vouch for. Prices are never defaulted and never cached
//! beyond one operation: each operation builds a [`PriceSnapshot`] so every
//! read it makes sees the same price, and drops it when done.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use lending_chain::{OracleError, PriceData};
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::config::OracleConfig;
use crate::error::{LendingError, LendingResult};
use crate::registry::{ApprovedToken, TokenRegistry};
use crate::u256_math;

/// Reads and validates feed prices.
#[derive(Debug, Clone, Default)]
pub struct PriceOracle {
    /// Maximum age of a feed answer before it is refused
    max_price_age_secs: Option<u64>,
}

impl PriceOracle {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            max_price_age_secs: config.max_price_age_secs,
        }
    }

    /// Latest validated price for `asset`, in feed decimals.
    pub fn latest_price(&self, asset: &ApprovedToken) -> LendingResult<PriceData> {
        let token = asset.address();
        let feed = asset.feed_address();
        let unavailable = |source: OracleError| LendingError::OracleUnavailable { token, source };

        let round = asset.price_feed.latest_round().map_err(unavailable)?;

        if let Some(reason) = round.invalid_reason() {
            warn!(%token, %feed, round_id = round.round_id, reason, "Rejecting feed round");
            return Err(unavailable(OracleError::InvalidRound {
                feed,
                round_id: round.round_id,
                reason,
            }));
        }

        let price = PriceData::from_round(&round, asset.price_feed.decimals());

        if let Some(max_age_secs) = self.max_price_age_secs {
            let now = Utc::now().timestamp().max(0) as u64;
            if price.is_stale(max_age_secs, now) {
                let age_secs = round.age_secs(now);
                warn!(%token, %feed, age_secs, max_age_secs, "Rejecting stale feed round");
                return Err(unavailable(OracleError::Stale {
                    feed,
                    age_secs,
                    max_age_secs,
                }));
            }
        }

        trace!(%token, round_id = price.round_id, price = price.price_f64(), "Feed price");
        Ok(price)
    }

    /// Latest validated price for `asset`, normalized to WAD.
    pub fn price_wad(&self, asset: &ApprovedToken) -> LendingResult<U256> {
        self.latest_price(asset)?
            .normalize_to_18()
            .ok_or(LendingError::ArithmeticOverflow("price normalization"))
    }
}

/// Operation-scoped price memo.
///
/// The first read of a token hits its feed; later reads within the same
/// snapshot reuse that answer.
#[derive(Debug)]
pub struct PriceSnapshot<'a> {
    oracle: &'a PriceOracle,
    registry: &'a TokenRegistry,
    prices: SmallVec<[(Address, U256); 4]>,
}

impl<'a> PriceSnapshot<'a> {
    pub fn new(oracle: &'a PriceOracle, registry: &'a TokenRegistry) -> Self {
        Self {
            oracle,
            registry,
            prices: SmallVec::new(),
        }
    }

    /// Registry this snapshot prices against.
    pub fn registry(&self) -> &'a TokenRegistry {
        self.registry
    }

    /// WAD price of one whole `token`.
    pub fn price_wad(&mut self, token: Address) -> LendingResult<U256> {
        if let Some((_, price)) = self.prices.iter().find(|(t, _)| *t == token) {
            return Ok(*price);
        }
        let asset = self.registry.require(token)?;
        let price = self.oracle.price_wad(asset)?;
        trace!(%token, price = %price, "Price read");
        self.prices.push((token, price));
        Ok(price)
    }

    /// WAD value of `amount` units of `token`.
    pub fn value_of(&mut self, token: Address, amount: U256) -> LendingResult<U256> {
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }
        let decimals = self.registry.require(token)?.decimals();
        let price = self.price_wad(token)?;
        u256_math::value_wad(amount, price, decimals)
            .ok_or(LendingError::ArithmeticOverflow("token value"))
    }

    /// WAD value of `amount` units of `token`, rounded up.
    ///
    /// Used for debt, so a dust borrow never prices to zero.
    pub fn value_of_up(&mut self, token: Address, amount: U256) -> LendingResult<U256> {
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }
        let decimals = self.registry.require(token)?.decimals();
        let price = self.price_wad(token)?;
        u256_math::value_wad_up(amount, price, decimals)
            .ok_or(LendingError::ArithmeticOverflow("token value"))
    }

    /// Units of `token` worth `value` WAD.
    pub fn amount_from_value(&mut self, token: Address, value: U256) -> LendingResult<U256> {
        let decimals = self.registry.require(token)?.decimals();
        let price = self.price_wad(token)?;
        u256_math::amount_from_value_wad(value, price, decimals)
            .ok_or(LendingError::ArithmeticOverflow("token amount from value"))
    }

    /// Number of distinct feeds read so far.
    pub fn reads(&self) -> usize {
        self.prices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use crate::u256_math::{units, WAD};
    use lending_chain::RoundData;

    #[test]
    fn test_price_normalized_to_wad() {
        let fx = Fixture::new();
        let oracle = PriceOracle::default();

        // 18-decimal feed passes through
        let usdc = fx.engine.registry().require(fx.usdc).unwrap();
        assert_eq!(oracle.price_wad(usdc).unwrap(), U256::from(10u64.pow(15)));

        // 8-decimal feed is scaled up
        let wbtc = fx.engine.registry().require(fx.wbtc).unwrap();
        fx.wbtc_feed.update_answer(U256::from(3_000_000_000_000u64)); // 30000.0 at 8 decimals
        assert_eq!(oracle.price_wad(wbtc).unwrap(), U256::from(30_000u64) * WAD);
    }

    #[test]
    fn test_empty_feed_is_unavailable() {
        let fx = Fixture::new();
        let asset = fx.engine.registry().require(fx.dead).unwrap();
        let err = PriceOracle::default().price_wad(asset).unwrap_err();
        assert!(matches!(
            err,
            LendingError::OracleUnavailable {
                source: OracleError::NoData { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_round_is_unavailable() {
        let fx = Fixture::new();
        fx.usdc_feed.set_round(RoundData {
            round_id: 7,
            answer: U256::from(1u64),
            started_at: 1,
            updated_at: 1,
            answered_in_round: 6,
        });
        let asset = fx.engine.registry().require(fx.usdc).unwrap();
        let err = PriceOracle::default().price_wad(asset).unwrap_err();
        assert!(matches!(
            err,
            LendingError::OracleUnavailable {
                source: OracleError::InvalidRound { round_id: 7, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_stale_round_rejected_when_age_limited() {
        let fx = Fixture::new();
        let two_hours_ago = (Utc::now().timestamp() - 7200) as u64;
        fx.usdc_feed.set_round(RoundData {
            round_id: 2,
            answer: U256::from(10u64.pow(15)),
            started_at: two_hours_ago,
            updated_at: two_hours_ago,
            answered_in_round: 2,
        });
        let asset = fx.engine.registry().require(fx.usdc).unwrap();

        // No age limit: accepted
        assert!(PriceOracle::default().price_wad(asset).is_ok());

        let limited = PriceOracle::new(&OracleConfig {
            max_price_age_secs: Some(3600),
        });
        let err = limited.price_wad(asset).unwrap_err();
        assert!(matches!(
            err,
            LendingError::OracleUnavailable {
                source: OracleError::Stale { max_age_secs: 3600, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_reads_each_feed_once() {
        let fx = Fixture::new();
        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());

        let first = prices.value_of(fx.usdc, units(10.0, 18)).unwrap();
        // A feed update mid-operation is not observed by the same snapshot
        fx.usdc_feed.update_answer(U256::from(10u64.pow(18)));
        let second = prices.value_of(fx.usdc, units(10.0, 18)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, units(0.01, 18));
        assert_eq!(prices.reads(), 1);
    }
}

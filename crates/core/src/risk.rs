//! Risk engine: collateral value, debt value and safety factor.
//!
//! Every function takes the balances to evaluate as a [`BalanceView`], so
//! the same code prices the live ledger and a staged, uncommitted one.
//! Results are never cached across calls.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;
use tracing::trace;

use crate::config::RiskConfig;
use crate::error::{LendingError, LendingResult};
use crate::ledger::{BalanceView, Side};
use crate::oracle::PriceSnapshot;
use crate::position::{AccountSnapshot, Holding};
use crate::u256_math;

/// Safety factor calculator.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    liquidation_threshold_bps: u32,
    min_safety_factor: U256,
}

impl RiskEngine {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            liquidation_threshold_bps: config.liquidation_threshold_bps,
            min_safety_factor: config.min_safety_factor_wad(),
        }
    }

    /// Minimum acceptable safety factor (WAD).
    pub fn min_safety_factor(&self) -> U256 {
        self.min_safety_factor
    }

    pub fn liquidation_threshold_bps(&self) -> u32 {
        self.liquidation_threshold_bps
    }

    /// Value and amount of every non-zero balance on one side of the book.
    ///
    /// Tokens the user holds none of are skipped without reading their feed.
    fn holdings(
        &self,
        side: Side,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<(SmallVec<[Holding; 4]>, U256)> {
        let mut holdings = SmallVec::new();
        let mut total = U256::ZERO;

        for asset in prices.registry().iter() {
            let token = asset.address();
            let amount = match side {
                Side::Deposit => view.deposit_of(user, token),
                Side::Borrow => view.borrow_of(user, token),
            };
            if amount.is_zero() {
                continue;
            }

            // Debt rounds up, collateral down
            let value = match side {
                Side::Deposit => prices.value_of(token, amount)?,
                Side::Borrow => prices.value_of_up(token, amount)?,
            };
            total = total
                .checked_add(value)
                .ok_or(LendingError::ArithmeticOverflow("position value"))?;
            holdings.push(Holding {
                token,
                amount,
                value,
            });
        }

        Ok((holdings, total))
    }

    /// Σ deposit × price over approved tokens (WAD).
    pub fn collateral_value(
        &self,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<U256> {
        Ok(self.holdings(Side::Deposit, prices, view, user)?.1)
    }

    /// Σ borrow × price over approved tokens (WAD), each term rounded up.
    pub fn debt_value(
        &self,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<U256> {
        Ok(self.holdings(Side::Borrow, prices, view, user)?.1)
    }

    /// Safety factor from already-computed values.
    pub fn safety_factor_from_values(&self, collateral_value: U256, debt_value: U256) -> LendingResult<U256> {
        u256_math::safety_factor_wad(collateral_value, debt_value, self.liquidation_threshold_bps)
            .ok_or(LendingError::ArithmeticOverflow("safety factor"))
    }

    /// Safety factor (WAD). `U256::MAX` when the user has no debt.
    pub fn safety_factor(
        &self,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<U256> {
        // Debt first: a debt-free user is safe without pricing collateral
        let debt_value = self.debt_value(prices, view, user)?;
        if debt_value.is_zero() {
            return Ok(U256::MAX);
        }
        let collateral_value = self.collateral_value(prices, view, user)?;
        let safety_factor = self.safety_factor_from_values(collateral_value, debt_value)?;

        trace!(
            %user,
            collateral = %collateral_value,
            debt = %debt_value,
            safety_factor = u256_math::wad_to_f64(safety_factor),
            "Safety factor computed"
        );
        Ok(safety_factor)
    }

    /// Whether a safety factor meets the minimum.
    pub fn meets_minimum(&self, safety_factor: U256) -> bool {
        safety_factor >= self.min_safety_factor
    }

    /// safety_factor(user) >= minimum.
    pub fn is_safe(
        &self,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<bool> {
        Ok(self.meets_minimum(self.safety_factor(prices, view, user)?))
    }

    /// Full position breakdown.
    pub fn account_snapshot(
        &self,
        prices: &mut PriceSnapshot<'_>,
        view: &impl BalanceView,
        user: Address,
    ) -> LendingResult<AccountSnapshot> {
        let (collaterals, collateral_value) = self.holdings(Side::Deposit, prices, view, user)?;
        let (debts, debt_value) = self.holdings(Side::Borrow, prices, view, user)?;
        let safety_factor = self.safety_factor_from_values(collateral_value, debt_value)?;

        Ok(AccountSnapshot {
            user,
            collaterals,
            debts,
            collateral_value,
            debt_value,
            safety_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::oracle::PriceOracle;
    use crate::test_support::{Fixture, DEPLOYER};
    use crate::u256_math::{units, WAD};

    #[test]
    fn test_zero_debt_is_safe_without_pricing() {
        let fx = Fixture::new();
        let mut ledger = Ledger::new();
        // Deposit in a token whose feed never reported
        ledger.increase_deposit(DEPLOYER, fx.dead, units(5.0, 18)).unwrap();

        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
        let risk = RiskEngine::new(&RiskConfig::default());

        assert_eq!(risk.safety_factor(&mut prices, &ledger, DEPLOYER), Ok(U256::MAX));
        assert_eq!(risk.is_safe(&mut prices, &ledger, DEPLOYER), Ok(true));
        assert_eq!(prices.reads(), 0);
    }

    #[test]
    fn test_boundary_borrow_is_exactly_one() {
        let fx = Fixture::new();
        let mut ledger = Ledger::new();
        ledger.increase_deposit(DEPLOYER, fx.usdc, units(10.0, 18)).unwrap();
        ledger.increase_borrow(DEPLOYER, fx.hd, units(7.5, 18)).unwrap();

        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
        let risk = RiskEngine::new(&RiskConfig::default());

        assert_eq!(risk.collateral_value(&mut prices, &ledger, DEPLOYER), Ok(units(0.01, 18)));
        assert_eq!(risk.debt_value(&mut prices, &ledger, DEPLOYER), Ok(units(0.0075, 18)));
        assert_eq!(risk.safety_factor(&mut prices, &ledger, DEPLOYER), Ok(WAD));
        assert_eq!(risk.is_safe(&mut prices, &ledger, DEPLOYER), Ok(true));
    }

    #[test]
    fn test_more_collateral_never_lowers_factor() {
        let fx = Fixture::new();
        let oracle = PriceOracle::default();
        let risk = RiskEngine::new(&RiskConfig::default());

        let mut ledger = Ledger::new();
        ledger.increase_borrow(DEPLOYER, fx.hd, units(3.0, 18)).unwrap();

        let mut last = U256::ZERO;
        for step in [1.0, 2.5, 4.0, 10.0, 100.0] {
            ledger.increase_deposit(DEPLOYER, fx.usdc, units(step, 18)).unwrap();
            let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
            let factor = risk.safety_factor(&mut prices, &ledger, DEPLOYER).unwrap();
            assert!(factor >= last);
            last = factor;
        }
    }

    #[test]
    fn test_dust_debt_is_never_free() {
        let fx = Fixture::new();
        let mut ledger = Ledger::new();
        ledger.increase_borrow(DEPLOYER, fx.hd, U256::from(999u64)).unwrap();

        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
        let risk = RiskEngine::new(&RiskConfig::default());

        assert_eq!(risk.debt_value(&mut prices, &ledger, DEPLOYER), Ok(U256::from(1u64)));
        assert_eq!(risk.safety_factor(&mut prices, &ledger, DEPLOYER), Ok(U256::ZERO));
        assert_eq!(risk.is_safe(&mut prices, &ledger, DEPLOYER), Ok(false));
    }

    #[test]
    fn test_mixed_decimals_snapshot() {
        let fx = Fixture::new();
        let mut ledger = Ledger::new();
        // 0.5 WBTC (8 decimals) at 30000 = 15000
        ledger.increase_deposit(DEPLOYER, fx.wbtc, U256::from(50_000_000u64)).unwrap();
        // 6000 USDC-equivalent debt: 6_000_000 HD at 0.001
        ledger.increase_borrow(DEPLOYER, fx.hd, units(6_000_000.0, 18)).unwrap();

        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
        let risk = RiskEngine::new(&RiskConfig::default());
        let snapshot = risk.account_snapshot(&mut prices, &ledger, DEPLOYER).unwrap();

        assert_eq!(snapshot.collateral_value, U256::from(15_000u64) * WAD);
        assert_eq!(snapshot.debt_value, U256::from(6_000u64) * WAD);
        // 15000 * 0.75 / 6000 = 1.875
        assert_eq!(snapshot.safety_factor, units(1.875, 18));
        assert_eq!(snapshot.collaterals.len(), 1);
        assert_eq!(snapshot.debts[0].token, fx.hd);
    }

    #[test]
    fn test_dead_feed_with_balance_is_fatal() {
        let fx = Fixture::new();
        let mut ledger = Ledger::new();
        ledger.increase_deposit(DEPLOYER, fx.dead, units(1.0, 18)).unwrap();
        ledger.increase_borrow(DEPLOYER, fx.hd, units(1.0, 18)).unwrap();

        let oracle = PriceOracle::default();
        let mut prices = PriceSnapshot::new(&oracle, fx.engine.registry());
        let risk = RiskEngine::new(&RiskConfig::default());

        let err = risk.safety_factor(&mut prices, &ledger, DEPLOYER).unwrap_err();
        assert!(matches!(err, LendingError::OracleUnavailable { token, .. } if token == fx.dead));
    }
}

//! Liquidation sizing.
//!
//! A liquidation repays a bounded share of one debt and pays the liquidator
//! the equivalent collateral value plus a bonus:
//!
//! ```text
//! repay  = debt * close_factor
//! seized = (value(repay) * (1 + bonus)) / price(collateral)
//! ```

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::LiquidationConfig;
use crate::error::{LendingError, LendingResult};
use crate::oracle::PriceSnapshot;
use crate::u256_math;

/// Amounts moved by one liquidation, before validation against balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationQuote {
    /// Debt token units repaid by the liquidator
    pub repay_amount: U256,
    /// Value of the repaid debt (WAD)
    pub repay_value: U256,
    /// Bonus value on top of the repaid value (WAD)
    pub bonus_value: U256,
    /// Collateral token units paid to the liquidator
    pub seize_amount: U256,
}

impl LiquidationQuote {
    /// Size a liquidation of `borrowed` units of `debt_token`.
    pub fn compute(
        config: &LiquidationConfig,
        prices: &mut PriceSnapshot<'_>,
        debt_token: Address,
        collateral_token: Address,
        borrowed: U256,
    ) -> LendingResult<Self> {
        let overflow = || LendingError::ArithmeticOverflow("liquidation quote");

        let repay_amount = u256_math::mul_bps(borrowed, config.close_factor_bps).ok_or_else(overflow)?;
        if repay_amount.is_zero() {
            return Err(LendingError::NothingToLiquidate { token: debt_token });
        }

        let repay_value = prices.value_of(debt_token, repay_amount)?;
        if repay_value.is_zero() {
            return Err(LendingError::NothingToLiquidate { token: debt_token });
        }

        let total_value =
            u256_math::mul_bps_up(repay_value, config.liquidation_bonus_bps).ok_or_else(overflow)?;
        let seize_amount = prices.amount_from_value(collateral_token, total_value)?;

        Ok(Self {
            repay_amount,
            repay_value,
            bonus_value: total_value - repay_value,
            seize_amount,
        })
    }
}

/// Result of a committed liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    pub borrower: Address,
    pub debt_token: Address,
    pub collateral_token: Address,
    /// Debt token units repaid
    pub repaid_amount: U256,
    /// Collateral token units paid to the liquidator
    pub seized_amount: U256,
    /// Borrower safety factor before the liquidation (WAD)
    pub safety_factor_before: U256,
    /// Borrower safety factor after the liquidation (WAD)
    pub safety_factor_after: U256,
}

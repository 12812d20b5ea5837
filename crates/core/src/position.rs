//! Derived account positions.
//!
//! Nothing here is stored; an [`AccountSnapshot`] is computed on demand from
//! ledger balances and a price snapshot.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::u256_math;

/// One token balance with its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Token address
    pub token: Address,
    /// Raw balance (token decimals)
    pub amount: U256,
    /// Value in the common unit (WAD)
    pub value: U256,
}

/// Point-in-time view of a user's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// User wallet address
    pub user: Address,
    /// Non-zero deposits
    pub collaterals: SmallVec<[Holding; 4]>,
    /// Non-zero borrows
    pub debts: SmallVec<[Holding; 4]>,
    /// Sum of deposit values (WAD)
    pub collateral_value: U256,
    /// Sum of borrow values (WAD)
    pub debt_value: U256,
    /// Safety factor (WAD, U256::MAX with no debt)
    pub safety_factor: U256,
}

impl AccountSnapshot {
    /// Safety factor as f64 (display only).
    pub fn safety_factor_f64(&self) -> f64 {
        u256_math::wad_to_f64(self.safety_factor)
    }

    pub fn collateral_value_f64(&self) -> f64 {
        u256_math::wad_to_f64(self.collateral_value)
    }

    pub fn debt_value_f64(&self) -> f64 {
        u256_math::wad_to_f64(self.debt_value)
    }

    /// Check if position is liquidatable against `min_safety_factor`.
    pub fn is_liquidatable(&self, min_safety_factor: U256) -> bool {
        self.safety_factor < min_safety_factor
    }
}

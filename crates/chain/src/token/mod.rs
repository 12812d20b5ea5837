//! Fungible token abstraction (ERC-20 semantics).
//!
//! The engine never reimplements token mechanics; it moves assets through
//! this trait. [`InMemoryToken`] is the implementation used by tests and the
//! replay binary.

mod erc20;

pub use erc20::InMemoryToken;

use alloy::primitives::{Address, U256};
use std::fmt::Debug;
use thiserror::Error;

/// Errors raised by token transfers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("{token}: insufficient balance for {account}: has {balance}, needs {needed}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        balance: U256,
        needed: U256,
    },

    #[error("{token}: insufficient allowance from {owner} to {spender}: allowed {allowance}, needs {needed}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        allowance: U256,
        needed: U256,
    },

    #[error("{token}: balance overflow for {account}")]
    Overflow { token: Address, account: Address },
}

/// ERC-20 style fungible token.
///
/// `spender` is explicit on `transfer_from` and `approve` because there is no
/// implicit message sender outside a chain.
pub trait FungibleToken: Send + Sync + Debug {
    /// Token contract address.
    fn address(&self) -> Address;

    /// Ticker symbol.
    fn symbol(&self) -> &str;

    /// Native decimal precision.
    fn decimals(&self) -> u8;

    /// Total supply in circulation.
    fn total_supply(&self) -> U256;

    /// Balance held by `account`.
    fn balance_of(&self, account: Address) -> U256;

    /// Amount `spender` may still move on behalf of `owner`.
    fn allowance(&self, owner: Address, spender: Address) -> U256;

    /// Set the allowance of `spender` over `owner`'s balance.
    fn approve(&self, owner: Address, spender: Address, amount: U256);

    /// Move `amount` from `from` to `to`.
    fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;
}

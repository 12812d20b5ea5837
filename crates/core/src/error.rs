//! Engine errors.

use alloy::primitives::{Address, U256};
use lending_chain::{OracleError, TokenError};
use thiserror::Error;

/// Ledger bookkeeping errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{side} underflow for {user} in {token}: balance {balance}, decrease {amount}")]
    Underflow {
        side: &'static str,
        user: Address,
        token: Address,
        balance: U256,
        amount: U256,
    },

    #[error("{side} overflow for {user} in {token}")]
    Overflow {
        side: &'static str,
        user: Address,
        token: Address,
    },
}

/// Errors surfaced by lending operations.
///
/// Every variant is raised before any state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingError {
    #[error("TokenNotApproved: {0}")]
    TokenNotApproved(Address),

    #[error("NeedsMoreThanZero")]
    AmountZero,

    #[error("Insufficient Funds: deposited {deposited}, requested {requested}")]
    InsufficientFunds { deposited: U256, requested: U256 },

    #[error("You will get Liquidated! safety factor would drop to {safety_factor}")]
    WouldBeLiquidated { safety_factor: U256 },

    #[error("Deposit more value! safety factor would drop to {safety_factor}")]
    DepositMoreValue { safety_factor: U256 },

    #[error("InsufficentTokensInPlatform: {token} has {available} available, requested {requested}")]
    InsufficientTokensInPlatform {
        token: Address,
        available: U256,
        requested: U256,
    },

    #[error("Repay exceeds debt: owed {owed}, repaying {requested}")]
    RepayExceedsDebt { owed: U256, requested: U256 },

    #[error("User Can't Be liquidated: safety factor {safety_factor}")]
    UserCannotBeLiquidated { safety_factor: U256 },

    #[error("Liquidator cannot liquidate their own position")]
    SelfLiquidation,

    #[error("Choose a different repay token: no {token} debt to liquidate")]
    NothingToLiquidate { token: Address },

    #[error("Insufficient collateral: seizure of {required} exceeds deposit of {available}")]
    InsufficientCollateral { available: U256, required: U256 },

    #[error("Oracle unavailable for {token}: {source}")]
    OracleUnavailable {
        token: Address,
        #[source]
        source: OracleError,
    },

    #[error("Token transfer failed: {0}")]
    Transfer(#[from] TokenError),

    /// Collateral payout failed and the repayment could not be returned.
    /// `amount` of `token` is held by the platform and owed to `liquidator`.
    #[error("Liquidation refund failed: {amount} of {token} owed to {liquidator} (payout: {transfer})")]
    LiquidationRefundFailed {
        liquidator: Address,
        token: Address,
        amount: U256,
        transfer: TokenError,
        #[source]
        refund: TokenError,
    },

    #[error("Ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

/// Result alias for engine operations.
pub type LendingResult<T> = Result<T, LendingError>;

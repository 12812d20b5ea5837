//! Deposit and borrow bookkeeping.
//!
//! The ledger stores (user, token) -> amount for deposits and borrows, plus
//! per-token totals. It knows nothing about prices or risk.
//!
//! Mutation happens in two steps: [`Ledger::stage`] computes the final value
//! of every touched entry with checked arithmetic, and [`Ledger::commit`]
//! writes those values. Staging can fail; committing cannot, so a staged
//! changeset is applied entirely or not at all.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::error::LedgerError;

/// Which book an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Deposit,
    Borrow,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Borrow => "borrow",
        }
    }
}

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

/// A single requested balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOp {
    pub side: Side,
    pub direction: Direction,
    pub user: Address,
    pub token: Address,
    pub amount: U256,
}

impl LedgerOp {
    pub fn increase_deposit(user: Address, token: Address, amount: U256) -> Self {
        Self::new(Side::Deposit, Direction::Increase, user, token, amount)
    }

    pub fn decrease_deposit(user: Address, token: Address, amount: U256) -> Self {
        Self::new(Side::Deposit, Direction::Decrease, user, token, amount)
    }

    pub fn increase_borrow(user: Address, token: Address, amount: U256) -> Self {
        Self::new(Side::Borrow, Direction::Increase, user, token, amount)
    }

    pub fn decrease_borrow(user: Address, token: Address, amount: U256) -> Self {
        Self::new(Side::Borrow, Direction::Decrease, user, token, amount)
    }

    fn new(side: Side, direction: Direction, user: Address, token: Address, amount: U256) -> Self {
        Self {
            side,
            direction,
            user,
            token,
            amount,
        }
    }

    fn apply(&self, current: U256) -> Result<U256, LedgerError> {
        match self.direction {
            Direction::Increase => current.checked_add(self.amount).ok_or(LedgerError::Overflow {
                side: self.side.as_str(),
                user: self.user,
                token: self.token,
            }),
            Direction::Decrease => current.checked_sub(self.amount).ok_or(LedgerError::Underflow {
                side: self.side.as_str(),
                user: self.user,
                token: self.token,
                balance: current,
                amount: self.amount,
            }),
        }
    }
}

/// Read access to per-user balances.
///
/// Implemented by the live [`Ledger`] and by [`StagedView`], so risk checks
/// can run against balances that have not been committed yet.
pub trait BalanceView {
    fn deposit_of(&self, user: Address, token: Address) -> U256;
    fn borrow_of(&self, user: Address, token: Address) -> U256;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedEntry {
    side: Side,
    user: Address,
    token: Address,
    value: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedTotal {
    side: Side,
    token: Address,
    value: U256,
}

/// Final values for every entry touched by a set of [`LedgerOp`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    entries: SmallVec<[StagedEntry; 4]>,
    totals: SmallVec<[StagedTotal; 4]>,
}

impl Changeset {
    fn entry(&self, side: Side, user: Address, token: Address) -> Option<U256> {
        self.entries
            .iter()
            .find(|e| e.side == side && e.user == user && e.token == token)
            .map(|e| e.value)
    }

    fn total(&self, side: Side, token: Address) -> Option<U256> {
        self.totals
            .iter()
            .find(|t| t.side == side && t.token == token)
            .map(|t| t.value)
    }

    fn set_entry(&mut self, side: Side, user: Address, token: Address, value: U256) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.side == side && e.user == user && e.token == token)
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(StagedEntry {
                side,
                user,
                token,
                value,
            }),
        }
    }

    fn set_total(&mut self, side: Side, token: Address, value: U256) {
        match self
            .totals
            .iter_mut()
            .find(|t| t.side == side && t.token == token)
        {
            Some(total) => total.value = value,
            None => self.totals.push(StagedTotal { side, token, value }),
        }
    }

    /// Number of (user, token) entries touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ledger overlaid with an uncommitted changeset.
#[derive(Debug, Clone, Copy)]
pub struct StagedView<'a> {
    ledger: &'a Ledger,
    changeset: &'a Changeset,
}

impl StagedView<'_> {
    pub fn total_deposits(&self, token: Address) -> U256 {
        self.changeset
            .total(Side::Deposit, token)
            .unwrap_or_else(|| self.ledger.total_deposits(token))
    }

    pub fn total_borrows(&self, token: Address) -> U256 {
        self.changeset
            .total(Side::Borrow, token)
            .unwrap_or_else(|| self.ledger.total_borrows(token))
    }
}

impl BalanceView for StagedView<'_> {
    fn deposit_of(&self, user: Address, token: Address) -> U256 {
        self.changeset
            .entry(Side::Deposit, user, token)
            .unwrap_or_else(|| self.ledger.deposit_of(user, token))
    }

    fn borrow_of(&self, user: Address, token: Address) -> U256 {
        self.changeset
            .entry(Side::Borrow, user, token)
            .unwrap_or_else(|| self.ledger.borrow_of(user, token))
    }
}

/// Deposit and borrow books with per-token totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    deposits: HashMap<(Address, Address), U256>,
    borrows: HashMap<(Address, Address), U256>,
    total_deposits: HashMap<Address, U256>,
    total_borrows: HashMap<Address, U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self, side: Side) -> &HashMap<(Address, Address), U256> {
        match side {
            Side::Deposit => &self.deposits,
            Side::Borrow => &self.borrows,
        }
    }

    fn totals(&self, side: Side) -> &HashMap<Address, U256> {
        match side {
            Side::Deposit => &self.total_deposits,
            Side::Borrow => &self.total_borrows,
        }
    }

    fn balance(&self, side: Side, user: Address, token: Address) -> U256 {
        self.book(side)
            .get(&(user, token))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn total(&self, side: Side, token: Address) -> U256 {
        self.totals(side).get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Sum of all users' deposits of `token`.
    pub fn total_deposits(&self, token: Address) -> U256 {
        self.total(Side::Deposit, token)
    }

    /// Sum of all users' outstanding borrows of `token`.
    pub fn total_borrows(&self, token: Address) -> U256 {
        self.total(Side::Borrow, token)
    }

    /// Amount of `token` available to borrow: deposits minus borrows.
    pub fn platform_float(&self, token: Address) -> U256 {
        self.total_deposits(token)
            .saturating_sub(self.total_borrows(token))
    }

    /// Compute the result of `ops` without touching the ledger.
    ///
    /// Ops are applied in order, so a later op sees the effect of an earlier
    /// one on the same entry.
    pub fn stage(&self, ops: &[LedgerOp]) -> Result<Changeset, LedgerError> {
        let mut changeset = Changeset::default();

        for op in ops {
            let current = changeset
                .entry(op.side, op.user, op.token)
                .unwrap_or_else(|| self.balance(op.side, op.user, op.token));
            changeset.set_entry(op.side, op.user, op.token, op.apply(current)?);

            let current_total = changeset
                .total(op.side, op.token)
                .unwrap_or_else(|| self.total(op.side, op.token));
            // Totals bound every user entry, so a per-user decrease that
            // passed above cannot underflow here.
            changeset.set_total(op.side, op.token, op.apply(current_total)?);
        }

        Ok(changeset)
    }

    /// Balances as they would be after `changeset` is committed.
    pub fn view<'a>(&'a self, changeset: &'a Changeset) -> StagedView<'a> {
        StagedView {
            ledger: self,
            changeset,
        }
    }

    /// Write a staged changeset.
    pub fn commit(&mut self, changeset: Changeset) {
        for entry in changeset.entries {
            let book = match entry.side {
                Side::Deposit => &mut self.deposits,
                Side::Borrow => &mut self.borrows,
            };
            book.insert((entry.user, entry.token), entry.value);
        }
        for total in changeset.totals {
            let totals = match total.side {
                Side::Deposit => &mut self.total_deposits,
                Side::Borrow => &mut self.total_borrows,
            };
            totals.insert(total.token, total.value);
        }
    }

    fn apply_one(&mut self, op: LedgerOp) -> Result<U256, LedgerError> {
        let changeset = self.stage(&[op])?;
        self.commit(changeset);
        Ok(self.balance(op.side, op.user, op.token))
    }

    /// Add to a user's deposit. Returns the new balance.
    pub fn increase_deposit(&mut self, user: Address, token: Address, amount: U256) -> Result<U256, LedgerError> {
        self.apply_one(LedgerOp::increase_deposit(user, token, amount))
    }

    /// Subtract from a user's deposit. Returns the new balance.
    pub fn decrease_deposit(&mut self, user: Address, token: Address, amount: U256) -> Result<U256, LedgerError> {
        self.apply_one(LedgerOp::decrease_deposit(user, token, amount))
    }

    /// Add to a user's debt. Returns the new balance.
    pub fn increase_borrow(&mut self, user: Address, token: Address, amount: U256) -> Result<U256, LedgerError> {
        self.apply_one(LedgerOp::increase_borrow(user, token, amount))
    }

    /// Subtract from a user's debt. Returns the new balance.
    pub fn decrease_borrow(&mut self, user: Address, token: Address, amount: U256) -> Result<U256, LedgerError> {
        self.apply_one(LedgerOp::decrease_borrow(user, token, amount))
    }
}

impl BalanceView for Ledger {
    fn deposit_of(&self, user: Address, token: Address) -> U256 {
        self.balance(Side::Deposit, user, token)
    }

    fn borrow_of(&self, user: Address, token: Address) -> U256 {
        self.balance(Side::Borrow, user, token)
    }
}

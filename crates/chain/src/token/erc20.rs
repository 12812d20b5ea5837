//! In-memory ERC-20 token.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use super::{FungibleToken, TokenError};

/// In-memory fungible token with balances and allowances.
#[derive(Debug)]
pub struct InMemoryToken {
    address: Address,
    symbol: String,
    decimals: u8,
    balances: DashMap<Address, U256>,
    allowances: DashMap<(Address, Address), U256>,
    total_supply: Mutex<U256>,
    /// Serializes balance movements so a transfer's debit and credit land together
    transfer_lock: Mutex<()>,
}

impl InMemoryToken {
    /// Create a token with zero supply.
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            balances: DashMap::new(),
            allowances: DashMap::new(),
            total_supply: Mutex::new(U256::ZERO),
            transfer_lock: Mutex::new(()),
        }
    }

    /// Create `amount` new tokens for `to`.
    pub fn mint(&self, to: Address, amount: U256) -> Result<(), TokenError> {
        let _guard = self.transfer_lock.lock();
        let mut supply = self.total_supply.lock();

        let new_supply = supply.checked_add(amount).ok_or(TokenError::Overflow {
            token: self.address,
            account: to,
        })?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow {
                token: self.address,
                account: to,
            })?;

        self.balances.insert(to, new_balance);
        *supply = new_supply;
        Ok(())
    }

    fn move_balance(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                token: self.address,
                account: from,
                balance: from_balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow {
                token: self.address,
                account: to,
            })?;

        self.balances.insert(from, from_balance - amount);
        self.balances.insert(to, to_balance);

        trace!(token = %self.symbol, %from, %to, amount = %amount, "Transfer");
        Ok(())
    }
}

impl FungibleToken for InMemoryToken {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn total_supply(&self) -> U256 {
        *self.total_supply.lock()
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).map_or(U256::ZERO, |b| *b)
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .map_or(U256::ZERO, |a| *a)
    }

    fn approve(&self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let _guard = self.transfer_lock.lock();
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let _guard = self.transfer_lock.lock();

        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                token: self.address,
                owner: from,
                spender,
                allowance,
                needed: amount,
            });
        }

        self.move_balance(from, to, amount)?;

        // Unlimited approvals are never decremented
        if allowance != U256::MAX {
            self.allowances.insert((from, spender), allowance - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xA1);
    const BOB: Address = Address::repeat_byte(0xB0);
    const VAULT: Address = Address::repeat_byte(0xFF);

    fn token() -> InMemoryToken {
        let token = InMemoryToken::new(Address::repeat_byte(0x01), "USDC", 6);
        token.mint(ALICE, U256::from(1_000u64)).unwrap();
        token
    }

    #[test]
    fn test_transfer_moves_balance() {
        let token = token();
        token.transfer(ALICE, BOB, U256::from(400u64)).unwrap();
        assert_eq!(token.balance_of(ALICE), U256::from(600u64));
        assert_eq!(token.balance_of(BOB), U256::from(400u64));
        assert_eq!(token.total_supply(), U256::from(1_000u64));
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let token = token();
        let err = token.transfer(BOB, ALICE, U256::from(1u64)).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(ALICE), U256::from(1_000u64));
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let token = token();
        token.approve(ALICE, VAULT, U256::from(500u64));

        token
            .transfer_from(VAULT, ALICE, VAULT, U256::from(300u64))
            .unwrap();
        assert_eq!(token.allowance(ALICE, VAULT), U256::from(200u64));
        assert_eq!(token.balance_of(VAULT), U256::from(300u64));

        let err = token
            .transfer_from(VAULT, ALICE, VAULT, U256::from(300u64))
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { .. }));
        assert_eq!(token.balance_of(VAULT), U256::from(300u64));
    }

    #[test]
    fn test_unlimited_allowance_not_decremented() {
        let token = token();
        token.approve(ALICE, VAULT, U256::MAX);
        token
            .transfer_from(VAULT, ALICE, VAULT, U256::from(10u64))
            .unwrap();
        assert_eq!(token.allowance(ALICE, VAULT), U256::MAX);
    }
}

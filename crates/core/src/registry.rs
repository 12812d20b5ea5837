//! Approved token registry.
//!
//! Owned by the engine and mutated only through the admin operation. A token
//! that is not registered here can be neither deposited nor borrowed.

use alloy::primitives::Address;
use lending_chain::{FungibleToken, PriceFeed};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{LendingError, LendingResult};

/// Registry entry: a token and the feed that prices it.
#[derive(Debug, Clone)]
pub struct ApprovedToken {
    /// Token collaborator
    pub token: Arc<dyn FungibleToken>,
    /// Price feed collaborator
    pub price_feed: Arc<dyn PriceFeed>,
}

impl ApprovedToken {
    pub fn new(token: Arc<dyn FungibleToken>, price_feed: Arc<dyn PriceFeed>) -> Self {
        Self { token, price_feed }
    }

    /// Token contract address.
    pub fn address(&self) -> Address {
        self.token.address()
    }

    /// Price feed contract address.
    pub fn feed_address(&self) -> Address {
        self.price_feed.address()
    }

    /// Token native decimals.
    pub fn decimals(&self) -> u8 {
        self.token.decimals()
    }

    pub fn symbol(&self) -> &str {
        self.token.symbol()
    }
}

/// Registry of approved tokens, ordered by address for deterministic iteration.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: BTreeMap<Address, ApprovedToken>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a token's price feed. Returns the previous entry.
    pub fn set_approved_token(
        &mut self,
        token: Arc<dyn FungibleToken>,
        price_feed: Arc<dyn PriceFeed>,
    ) -> Option<ApprovedToken> {
        let entry = ApprovedToken::new(token, price_feed);
        info!(
            token = %entry.address(),
            symbol = entry.symbol(),
            price_feed = %entry.feed_address(),
            "Approved token set"
        );
        self.tokens.insert(entry.address(), entry)
    }

    /// Look up a registered token.
    pub fn get(&self, token: &Address) -> Option<&ApprovedToken> {
        self.tokens.get(token)
    }

    /// Look up a registered token, failing with `TokenNotApproved`.
    pub fn require(&self, token: Address) -> LendingResult<&ApprovedToken> {
        self.tokens
            .get(&token)
            .ok_or(LendingError::TokenNotApproved(token))
    }

    pub fn is_approved(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Registered token addresses.
    pub fn addresses(&self) -> Vec<Address> {
        self.tokens.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApprovedToken> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use lending_chain::{InMemoryToken, MockAggregator};

    fn entry(byte: u8) -> (Arc<dyn FungibleToken>, Arc<dyn PriceFeed>) {
        let token: Arc<dyn FungibleToken> =
            Arc::new(InMemoryToken::new(Address::repeat_byte(byte), "TKN", 18));
        let feed: Arc<dyn PriceFeed> = Arc::new(MockAggregator::new(
            Address::repeat_byte(byte + 0x10),
            18,
            U256::from(1u64),
        ));
        (token, feed)
    }

    #[test]
    fn test_require_unregistered() {
        let registry = TokenRegistry::new();
        let missing = Address::repeat_byte(0x42);
        assert_eq!(
            registry.require(missing).unwrap_err(),
            LendingError::TokenNotApproved(missing)
        );
    }

    #[test]
    fn test_set_approved_token_updates_feed() {
        let mut registry = TokenRegistry::new();
        let (token, feed) = entry(0x01);
        assert!(registry.set_approved_token(token.clone(), feed).is_none());

        let new_feed: Arc<dyn PriceFeed> =
            Arc::new(MockAggregator::new(Address::repeat_byte(0x99), 8, U256::from(1u64)));
        let previous = registry.set_approved_token(token, new_feed).unwrap();
        assert_eq!(previous.feed_address(), Address::repeat_byte(0x11));

        let current = registry.require(Address::repeat_byte(0x01)).unwrap();
        assert_eq!(current.feed_address(), Address::repeat_byte(0x99));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_addresses_sorted() {
        let mut registry = TokenRegistry::new();
        let (b, fb) = entry(0x02);
        let (a, fa) = entry(0x01);
        registry.set_approved_token(b, fb);
        registry.set_approved_token(a, fa);
        assert_eq!(
            registry.addresses(),
            vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)]
        );
    }
}

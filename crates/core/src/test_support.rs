//! Shared fixture: an engine with USDC, HD and WBTC markets plus a token
//! whose feed never reported.

use alloy::primitives::{Address, U256};
use lending_chain::{FungibleToken, InMemoryToken, MockAggregator};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::LendingEngine;
use crate::u256_math::units;

pub const DEPLOYER: Address = Address::repeat_byte(0xD0);
pub const PLAYER: Address = Address::repeat_byte(0xE0);
/// Funded account with no approvals and no positions.
pub const OUTSIDER: Address = Address::repeat_byte(0xC0);
pub const PLATFORM: Address = Address::repeat_byte(0xFF);

/// Starting balance of every funded account, in whole tokens.
pub const INITIAL_BALANCE: f64 = 1_000_000.0;

pub struct Fixture {
    pub engine: LendingEngine,
    pub usdc: Address,
    pub hd: Address,
    pub wbtc: Address,
    pub dead: Address,
    pub usdc_token: Arc<InMemoryToken>,
    pub hd_token: Arc<InMemoryToken>,
    pub wbtc_token: Arc<InMemoryToken>,
    pub usdc_feed: Arc<MockAggregator>,
    pub hd_feed: Arc<MockAggregator>,
    pub wbtc_feed: Arc<MockAggregator>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = LendingEngine::new(config, PLATFORM);

        // 0.001 per token, 18-decimal feeds
        let (usdc_token, usdc_feed) = market(&mut engine, 0x01, "USDC", 18, 18, U256::from(10u64.pow(15)));
        let (hd_token, hd_feed) = market(&mut engine, 0x02, "HD", 18, 18, U256::from(10u64.pow(15)));
        // 30000 per token, 8-decimal token and feed
        let (wbtc_token, wbtc_feed) = market(&mut engine, 0x03, "WBTC", 8, 8, U256::from(3_000_000_000_000u64));

        let dead = Address::repeat_byte(0x04);
        let dead_token = Arc::new(InMemoryToken::new(dead, "DEAD", 18));
        let dead_feed = Arc::new(MockAggregator::empty(Address::repeat_byte(0xF4), 18));
        engine.set_approved_token(dead_token, dead_feed);

        engine.take_events();

        Self {
            engine,
            usdc: usdc_token.address(),
            hd: hd_token.address(),
            wbtc: wbtc_token.address(),
            dead,
            usdc_token,
            hd_token,
            wbtc_token,
            usdc_feed,
            hd_feed,
            wbtc_feed,
        }
    }

    pub fn token(&self, address: Address) -> &Arc<InMemoryToken> {
        if address == self.usdc {
            &self.usdc_token
        } else if address == self.hd {
            &self.hd_token
        } else if address == self.wbtc {
            &self.wbtc_token
        } else {
            panic!("no fixture token at {address}")
        }
    }

    pub fn balance(&self, token: Address, account: Address) -> U256 {
        self.token(token).balance_of(account)
    }
}

fn market(
    engine: &mut LendingEngine,
    byte: u8,
    symbol: &str,
    decimals: u8,
    feed_decimals: u8,
    answer: U256,
) -> (Arc<InMemoryToken>, Arc<MockAggregator>) {
    let token = Arc::new(InMemoryToken::new(Address::repeat_byte(byte), symbol, decimals));
    let feed = Arc::new(
        MockAggregator::new(Address::repeat_byte(0xF0 | byte), feed_decimals, answer)
            .with_description(format!("{symbol} / USD")),
    );

    let supply = units(INITIAL_BALANCE, decimals);
    for account in [DEPLOYER, PLAYER, OUTSIDER] {
        token.mint(account, supply).unwrap();
    }
    for account in [DEPLOYER, PLAYER] {
        token.approve(account, PLATFORM, U256::MAX);
    }

    engine.set_approved_token(token.clone(), feed.clone());
    (token, feed)
}

//! In-memory deployment of the configured markets.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use tracing::info;

use lending_chain::{FungibleToken, InMemoryToken, MockAggregator, PriceFeed};
use lending_core::{u256_math, LendingEngine, MarketConfig, MarketsConfig};

/// One deployed market: a token and the feed pricing it.
#[derive(Debug, Clone)]
pub struct Market {
    pub token: Arc<InMemoryToken>,
    pub feed: Arc<MockAggregator>,
}

impl Market {
    fn deploy(config: &MarketConfig) -> Result<Self> {
        let token = Arc::new(InMemoryToken::new(
            config.token_address()?,
            config.symbol.clone(),
            config.decimals,
        ));
        let feed = Arc::new(
            MockAggregator::new(
                config.feed_address()?,
                config.feed_decimals,
                config.initial_answer(),
            )
            .with_description(format!("{} / USD", config.symbol)),
        );
        Ok(Self { token, feed })
    }

    /// Whole-token amount in native units.
    pub fn units(&self, amount: f64) -> U256 {
        u256_math::units(amount, self.token.decimals())
    }

    /// Publish a new price per whole token.
    pub fn set_price(&self, price: f64) {
        self.feed.update_answer(u256_math::units(price, self.feed.decimals()));
    }
}

/// Markets keyed by upper-case symbol.
#[derive(Debug, Default)]
pub struct Deployment {
    markets: HashMap<String, Market>,
}

impl Deployment {
    /// Deploy every market and register the active ones with the engine.
    pub fn deploy(config: &MarketsConfig, engine: &mut LendingEngine) -> Result<Self> {
        let mut markets = HashMap::with_capacity(config.markets.len());

        for market_config in &config.markets {
            let market = Market::deploy(market_config)?;
            info!(
                symbol = %market_config.symbol,
                token = %market.token.address(),
                feed = %market.feed.address(),
                price = market_config.price,
                active = market_config.active,
                "Market deployed"
            );
            markets.insert(market_config.symbol.to_uppercase(), market);
        }

        let deployment = Self { markets };
        for market_config in config.active_markets() {
            let market = deployment.market(&market_config.symbol)?;
            engine.set_approved_token(market.token.clone(), market.feed.clone());
        }

        Ok(deployment)
    }

    pub fn market(&self, symbol: &str) -> Result<&Market> {
        self.markets
            .get(&symbol.to_uppercase())
            .ok_or_else(|| anyhow!("Unknown market symbol: {}", symbol))
    }

    pub fn address_of(&self, symbol: &str) -> Result<Address> {
        Ok(self.market(symbol)?.token.address())
    }
}

//! Market configuration loading from TOML files.
//!
//! A market is a token plus the feed that prices it. The replay binary uses
//! this to stand up in-memory tokens and mock feeds and register them with
//! the engine.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::u256_math;

/// Markets file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketsConfig {
    /// Address of the platform account holding pooled tokens
    pub platform: String,
    /// List of markets
    pub markets: Vec<MarketConfig>,
}

/// Individual market configuration (TOML-loadable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Token symbol (e.g., "USDC", "HD")
    pub symbol: String,
    /// Token contract address (as hex string)
    pub token: String,
    /// Price feed address (as hex string)
    pub price_feed: String,
    /// Token decimals
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Feed answer decimals
    #[serde(default = "default_decimals")]
    pub feed_decimals: u8,
    /// Initial price per whole token in the common value unit
    pub price: f64,
    /// Whether to register this market as an approved token
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_decimals() -> u8 {
    18
}

fn default_true() -> bool {
    true
}

impl MarketConfig {
    /// Parse token address.
    pub fn token_address(&self) -> anyhow::Result<Address> {
        self.token
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid token address '{}': {}", self.token, e))
    }

    /// Parse price feed address.
    pub fn feed_address(&self) -> anyhow::Result<Address> {
        self.price_feed
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid price feed address '{}': {}", self.price_feed, e))
    }

    /// Initial feed answer in feed decimals.
    pub fn initial_answer(&self) -> U256 {
        u256_math::units(self.price, self.feed_decimals)
    }
}

impl MarketsConfig {
    /// Load markets config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse markets config from TOML content.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.markets.is_empty() {
            anyhow::bail!("markets config defines no markets");
        }
        Ok(config)
    }

    /// Parse platform address.
    pub fn platform_address(&self) -> anyhow::Result<Address> {
        self.platform
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid platform address '{}': {}", self.platform, e))
    }

    /// Get active markets only.
    pub fn active_markets(&self) -> impl Iterator<Item = &MarketConfig> {
        self.markets.iter().filter(|m| m.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKETS: &str = r#"
        platform = "0x00000000000000000000000000000000000000ff"

        [[markets]]
        symbol = "USDC"
        token = "0x1111111111111111111111111111111111111111"
        price_feed = "0x2222222222222222222222222222222222222222"
        price = 0.001

        [[markets]]
        symbol = "WBTC"
        token = "0x3333333333333333333333333333333333333333"
        price_feed = "0x4444444444444444444444444444444444444444"
        decimals = 8
        feed_decimals = 8
        price = 30000.0
        active = false
    "#;

    #[test]
    fn test_parse_markets_config() {
        let config = MarketsConfig::from_toml(MARKETS).unwrap();
        assert_eq!(config.markets.len(), 2);
        assert_eq!(config.platform_address().unwrap(), Address::with_last_byte(0xff));

        let usdc = &config.markets[0];
        assert_eq!(usdc.decimals, 18);
        assert_eq!(usdc.feed_decimals, 18);
        assert_eq!(usdc.initial_answer(), U256::from(10u64.pow(15)));
        assert_eq!(usdc.token_address().unwrap(), Address::repeat_byte(0x11));

        let wbtc = &config.markets[1];
        assert_eq!(wbtc.initial_answer(), U256::from(3_000_000_000_000u64));

        let active: Vec<_> = config.active_markets().map(|m| m.symbol.as_str()).collect();
        assert_eq!(active, ["USDC"]);
    }

    #[test]
    fn test_bad_address_rejected() {
        let market = MarketConfig {
            symbol: "BAD".to_string(),
            token: "not-an-address".to_string(),
            price_feed: "0x2222222222222222222222222222222222222222".to_string(),
            decimals: 18,
            feed_decimals: 18,
            price: 1.0,
            active: true,
        };
        assert!(market.token_address().is_err());
        assert!(market.feed_address().is_ok());
    }

    #[test]
    fn test_empty_markets_rejected() {
        let err = MarketsConfig::from_toml("platform = \"0x00000000000000000000000000000000000000ff\"\nmarkets = []")
            .unwrap_err();
        assert!(err.to_string().contains("no markets"));
    }
}

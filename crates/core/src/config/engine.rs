//! Engine configuration with profile support.
//!
//! Protocol parameters (liquidation threshold, close factor, bonus, oracle
//! freshness) are configuration, not literals. Profiles give named presets;
//! a TOML file can override any field.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::u256_math::{self, WAD};

/// Main configuration structure containing all protocol parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Safety factor parameters
    #[serde(default)]
    pub risk: RiskConfig,

    /// Liquidation parameters
    #[serde(default)]
    pub liquidation: LiquidationConfig,

    /// Price feed freshness
    #[serde(default)]
    pub oracle: OracleConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Safety factor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Share of collateral value counted toward solvency (basis points, 7500 = 75%)
    #[serde(default = "default_liquidation_threshold")]
    pub liquidation_threshold_bps: u32,

    /// Minimum safety factor (basis points of 1.0, 10000 = 1.0)
    #[serde(default = "default_min_safety_factor")]
    pub min_safety_factor_bps: u32,
}

fn default_liquidation_threshold() -> u32 {
    7500
}
fn default_min_safety_factor() -> u32 {
    10_000
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            liquidation_threshold_bps: default_liquidation_threshold(),
            min_safety_factor_bps: default_min_safety_factor(),
        }
    }
}

impl RiskConfig {
    /// Minimum safety factor in WAD.
    pub fn min_safety_factor_wad(&self) -> U256 {
        WAD * u256_math::bps(self.min_safety_factor_bps) / u256_math::BPS_DENOMINATOR
    }
}

/// Liquidation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Share of a borrower's debt in one token repaid per call (basis points)
    #[serde(default = "default_close_factor")]
    pub close_factor_bps: u32,

    /// Bonus paid to the liquidator on top of repaid value (basis points)
    #[serde(default = "default_liquidation_bonus")]
    pub liquidation_bonus_bps: u32,
}

fn default_close_factor() -> u32 {
    5000
}
fn default_liquidation_bonus() -> u32 {
    500
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            close_factor_bps: default_close_factor(),
            liquidation_bonus_bps: default_liquidation_bonus(),
        }
    }
}

/// Price feed freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Refuse feed answers older than this (seconds). `None` disables the check.
    #[serde(default)]
    pub max_price_age_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            risk: RiskConfig::default(),
            liquidation: LiquidationConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML content.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Conservative profile: lower threshold and an hourly freshness bound.
    pub fn conservative() -> Self {
        Self {
            profile: "conservative".to_string(),
            risk: RiskConfig {
                liquidation_threshold_bps: 7000,
                min_safety_factor_bps: 10_000,
            },
            liquidation: LiquidationConfig {
                close_factor_bps: 5000,
                liquidation_bonus_bps: 500,
            },
            oracle: OracleConfig {
                max_price_age_secs: Some(3600),
            },
        }
    }

    /// Testing profile: default risk, larger bonus, no freshness bound.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            risk: RiskConfig::default(),
            liquidation: LiquidationConfig {
                close_factor_bps: 5000,
                liquidation_bonus_bps: 1000,
            },
            oracle: OracleConfig::default(),
        }
    }

    /// Get profile from environment variable LENDING_PROFILE, or default.
    /// Supported values: default, conservative, testing, or a path to a TOML file
    pub fn from_env() -> anyhow::Result<Self> {
        let profile = std::env::var("LENDING_PROFILE").unwrap_or_else(|_| "default".to_string());
        match profile.to_lowercase().as_str() {
            "conservative" | "safe" => Ok(Self::conservative()),
            "testing" | "test" => Ok(Self::testing()),
            p if p.ends_with(".toml") => Self::from_file(&profile),
            _ => Ok(Self::default()),
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.risk.liquidation_threshold_bps == 0 || self.risk.liquidation_threshold_bps > 10_000 {
            anyhow::bail!(
                "liquidation_threshold_bps must be in 1..=10000, got {}",
                self.risk.liquidation_threshold_bps
            );
        }
        if self.risk.min_safety_factor_bps == 0 {
            anyhow::bail!("min_safety_factor_bps must be positive");
        }
        if self.liquidation.close_factor_bps == 0 || self.liquidation.close_factor_bps > 10_000 {
            anyhow::bail!(
                "close_factor_bps must be in 1..=10000, got {}",
                self.liquidation.close_factor_bps
            );
        }
        if self.liquidation.liquidation_bonus_bps > 10_000 {
            anyhow::bail!(
                "liquidation_bonus_bps must be at most 10000, got {}",
                self.liquidation.liquidation_bonus_bps
            );
        }
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Engine configuration loaded");
        tracing::info!(
            liquidation_threshold_bps = self.risk.liquidation_threshold_bps,
            min_safety_factor_bps = self.risk.min_safety_factor_bps,
            "Risk parameters"
        );
        tracing::info!(
            close_factor_bps = self.liquidation.close_factor_bps,
            liquidation_bonus_bps = self.liquidation.liquidation_bonus_bps,
            "Liquidation parameters"
        );
        tracing::info!(
            max_price_age_secs = ?self.oracle.max_price_age_secs,
            "Oracle parameters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.risk.liquidation_threshold_bps, 7500);
        assert_eq!(config.liquidation.close_factor_bps, 5000);
        assert_eq!(config.liquidation.liquidation_bonus_bps, 500);
        assert_eq!(config.risk.min_safety_factor_wad(), WAD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profiles_validate() {
        assert!(EngineConfig::conservative().validate().is_ok());
        assert!(EngineConfig::testing().validate().is_ok());
        assert_eq!(
            EngineConfig::conservative().oracle.max_price_age_secs,
            Some(3600)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            profile = "custom"

            [liquidation]
            liquidation_bonus_bps = 800
            "#,
        )
        .unwrap();
        assert_eq!(config.profile, "custom");
        assert_eq!(config.liquidation.liquidation_bonus_bps, 800);
        assert_eq!(config.liquidation.close_factor_bps, 5000);
        assert_eq!(config.risk, RiskConfig::default());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = EngineConfig::from_toml(
            r#"
            [risk]
            liquidation_threshold_bps = 12000
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("liquidation_threshold_bps"));
    }

    #[test]
    fn test_serialization() {
        let config = EngineConfig::conservative();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("profile = \"conservative\""));

        let parsed = EngineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}

//! Lending engine scenario runner
//!
//! Stands up in-memory tokens and mock price feeds from a markets file,
//! registers them with the engine, replays a JSON scenario and prints a JSON
//! report of step results, emitted events and final account positions.
//!
//! Usage: `lending <scenario.json>`

mod markets;
mod scenario;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lending_core::{EngineConfig, LendingEngine, MarketsConfig};

use crate::markets::Deployment;
use crate::scenario::Scenario;

/// Environment variable names.
mod env {
    pub const MARKETS: &str = "LENDING_MARKETS";
    pub const LOG_JSON: &str = "LENDING_LOG_JSON";
}

const DEFAULT_MARKETS_PATH: &str = "config/markets.toml";

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    // Use LENDING_PROFILE to select: default, conservative, testing, or file path
    let engine_config = EngineConfig::from_env()?;
    engine_config.log_config();

    let scenario_path = std::env::args()
        .nth(1)
        .context("usage: lending <scenario.json>")?;

    let markets_path =
        std::env::var(env::MARKETS).unwrap_or_else(|_| DEFAULT_MARKETS_PATH.to_string());
    let markets = MarketsConfig::from_file(&markets_path)
        .with_context(|| format!("loading markets from {}", markets_path))?;
    let platform = markets.platform_address()?;

    info!(platform = %platform, markets = markets.markets.len(), "Deploying markets");

    let mut engine = LendingEngine::new(engine_config, platform);
    let deployment = Deployment::deploy(&markets, &mut engine)?;

    let scenario = Scenario::from_file(&scenario_path)?;
    info!(path = %scenario_path, steps = scenario.steps.len(), "Replaying scenario");

    let report = scenario.replay(&mut engine, &deployment)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lending_core=debug"));

    if std::env::var(env::LOG_JSON).is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

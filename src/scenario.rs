//! Scenario replay: a JSON list of steps run against the engine.
//!
//! ```json
//! {
//!   "accounts": { "deployer": "0x...", "player": "0x..." },
//!   "steps": [
//!     { "action": "mint", "account": "deployer", "token": "USDC", "amount": 1000 },
//!     { "action": "approve", "account": "deployer", "token": "USDC" },
//!     { "action": "deposit", "account": "deployer", "token": "USDC", "amount": 10 }
//!   ]
//! }
//! ```
//!
//! Engine rejections are recorded in the report and do not stop the replay.
//! Unknown accounts or symbols do.

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use lending_chain::FungibleToken;
use lending_core::{AccountSnapshot, LendingEngine, LendingEvent, LendingResult};

use crate::markets::Deployment;

/// Scenario file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Account name -> address
    pub accounts: BTreeMap<String, Address>,
    pub steps: Vec<Step>,
}

/// One replayed action. Amounts and prices are in whole tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Mint {
        account: String,
        token: String,
        amount: f64,
    },
    /// Unlimited allowance for the platform
    Approve { account: String, token: String },
    Deposit {
        account: String,
        token: String,
        amount: f64,
    },
    Withdraw {
        account: String,
        token: String,
        amount: f64,
    },
    Borrow {
        account: String,
        token: String,
        amount: f64,
    },
    Repay {
        account: String,
        token: String,
        amount: f64,
    },
    Liquidate {
        liquidator: String,
        borrower: String,
        debt_token: String,
        collateral_token: String,
    },
    SetPrice { token: String, price: f64 },
    Inspect { account: String },
}

/// Result of one step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: Step,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Value>,
}

/// Full replay output.
#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub events: Vec<LendingEvent>,
    pub accounts: BTreeMap<String, AccountSnapshot>,
    pub allowed_tokens: Vec<Address>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn account(&self, name: &str) -> Result<Address> {
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown account: {}", name))
    }

    /// Run every step and collect the report.
    pub fn replay(&self, engine: &mut LendingEngine, deployment: &Deployment) -> Result<Report> {
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let result = self.run_step(step, engine, deployment)?;
            let report = match result {
                Ok(outcome) => StepReport {
                    index,
                    step: step.clone(),
                    ok: true,
                    error: None,
                    outcome,
                },
                Err(err) => {
                    warn!(index, error = %err, "Step rejected");
                    StepReport {
                        index,
                        step: step.clone(),
                        ok: false,
                        error: Some(err.to_string()),
                        outcome: None,
                    }
                }
            };
            steps.push(report);
        }

        let mut accounts = BTreeMap::new();
        for (name, address) in &self.accounts {
            match engine.account_snapshot(*address) {
                Ok(snapshot) => {
                    accounts.insert(name.clone(), snapshot);
                }
                Err(err) => warn!(account = %name, error = %err, "Account snapshot unavailable"),
            }
        }

        info!(steps = steps.len(), "Scenario replayed");

        Ok(Report {
            steps,
            events: engine.take_events(),
            accounts,
            allowed_tokens: engine.allowed_tokens(),
        })
    }

    /// Outer error: malformed step. Inner error: engine rejection.
    fn run_step(
        &self,
        step: &Step,
        engine: &mut LendingEngine,
        deployment: &Deployment,
    ) -> Result<LendingResult<Option<Value>>> {
        let platform = engine.platform();

        let result = match step {
            Step::Mint {
                account,
                token,
                amount,
            } => {
                let market = deployment.market(token)?;
                market.token.mint(self.account(account)?, market.units(*amount))?;
                Ok(None)
            }
            Step::Approve { account, token } => {
                let market = deployment.market(token)?;
                market.token.approve(self.account(account)?, platform, U256::MAX);
                Ok(None)
            }
            Step::Deposit {
                account,
                token,
                amount,
            } => {
                let market = deployment.market(token)?;
                engine
                    .deposit(
                        self.account(account)?,
                        market.token.address(),
                        market.units(*amount),
                    )
                    .map(|_| None)
            }
            Step::Withdraw {
                account,
                token,
                amount,
            } => {
                let market = deployment.market(token)?;
                engine
                    .withdraw(
                        self.account(account)?,
                        market.token.address(),
                        market.units(*amount),
                    )
                    .map(|_| None)
            }
            Step::Borrow {
                account,
                token,
                amount,
            } => {
                let market = deployment.market(token)?;
                engine
                    .borrow(
                        self.account(account)?,
                        market.token.address(),
                        market.units(*amount),
                    )
                    .map(|_| None)
            }
            Step::Repay {
                account,
                token,
                amount,
            } => {
                let market = deployment.market(token)?;
                engine
                    .repay(
                        self.account(account)?,
                        market.token.address(),
                        market.units(*amount),
                    )
                    .map(|_| None)
            }
            Step::Liquidate {
                liquidator,
                borrower,
                debt_token,
                collateral_token,
            } => {
                let liquidator = self.account(liquidator)?;
                let borrower = self.account(borrower)?;
                let debt_token = deployment.address_of(debt_token)?;
                let collateral_token = deployment.address_of(collateral_token)?;
                match engine.liquidate(liquidator, borrower, debt_token, collateral_token) {
                    Ok(outcome) => Ok(Some(serde_json::to_value(outcome)?)),
                    Err(err) => Err(err),
                }
            }
            Step::SetPrice { token, price } => {
                deployment.market(token)?.set_price(*price);
                Ok(None)
            }
            Step::Inspect { account } => match engine.account_snapshot(self.account(account)?) {
                Ok(snapshot) => Ok(Some(serde_json::to_value(snapshot)?)),
                Err(err) => Err(err),
            },
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_json_shape() {
        let json = r#"{
            "accounts": { "deployer": "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0" },
            "steps": [
                { "action": "deposit", "account": "deployer", "token": "USDC", "amount": 10 },
                { "action": "set_price", "token": "USDC", "price": 0.0005 },
                { "action": "liquidate", "liquidator": "a", "borrower": "b",
                  "debt_token": "HD", "collateral_token": "USDC" }
            ]
        }"#;

        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[1], Step::SetPrice { price, .. } if price == 0.0005));
        assert_eq!(scenario.account("deployer").unwrap(), Address::repeat_byte(0xD0));
        assert!(scenario.account("nobody").is_err());
    }
}

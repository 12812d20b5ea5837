//! Lending engine: position operations, liquidation and queries.
//!
//! Every operation follows the same shape:
//! 1. validate preconditions against the current ledger
//! 2. stage the ledger changes and price the resulting position
//! 3. move tokens through the token collaborator
//! 4. commit the staged changes and emit an event
//!
//! Steps 1 and 2 never mutate anything, and step 4 cannot fail, so a failed
//! operation leaves the ledger exactly as it found it.

use alloy::primitives::{Address, U256};
use lending_chain::{FungibleToken, PriceFeed};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{LendingError, LendingResult};
use crate::events::LendingEvent;
use crate::ledger::{BalanceView, Changeset, Ledger, LedgerOp};
use crate::liquidation::{LiquidationOutcome, LiquidationQuote};
use crate::oracle::{PriceOracle, PriceSnapshot};
use crate::position::AccountSnapshot;
use crate::registry::TokenRegistry;
use crate::risk::RiskEngine;
use crate::u256_math;

/// Validated liquidation, ready to execute.
struct LiquidationPlan {
    quote: LiquidationQuote,
    changeset: Changeset,
    safety_factor_before: U256,
    safety_factor_after: U256,
}

/// Lending ledger and risk engine.
pub struct LendingEngine {
    config: EngineConfig,
    /// Account holding all pooled tokens
    platform: Address,
    registry: TokenRegistry,
    ledger: Ledger,
    oracle: PriceOracle,
    risk: RiskEngine,
    events: Vec<LendingEvent>,
}

impl std::fmt::Debug for LendingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingEngine")
            .field("profile", &self.config.profile)
            .field("platform", &self.platform)
            .field("approved_tokens", &self.registry.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl LendingEngine {
    /// Create an engine with an empty registry.
    pub fn new(config: EngineConfig, platform: Address) -> Self {
        Self::with_registry(config, platform, TokenRegistry::new())
    }

    /// Create an engine with a pre-built registry.
    pub fn with_registry(config: EngineConfig, platform: Address, registry: TokenRegistry) -> Self {
        let oracle = PriceOracle::new(&config.oracle);
        let risk = RiskEngine::new(&config.risk);
        Self {
            config,
            platform,
            registry,
            ledger: Ledger::new(),
            oracle,
            risk,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Account holding pooled tokens.
    pub fn platform(&self) -> Address {
        self.platform
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Events emitted since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[LendingEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LendingEvent> {
        std::mem::take(&mut self.events)
    }

    fn prices(&self) -> PriceSnapshot<'_> {
        PriceSnapshot::new(&self.oracle, &self.registry)
    }

    fn emit(&mut self, event: LendingEvent) {
        info!(kind = event.name(), ?event, "Event emitted");
        self.events.push(event);
    }

    /// Deposits of `token` leaving the pool must not dip into lent-out funds.
    fn ensure_float_covers(&self, token: Address, changeset: &Changeset, requested: U256) -> LendingResult<()> {
        let view = self.ledger.view(changeset);
        if view.total_deposits(token) < view.total_borrows(token) {
            return Err(LendingError::InsufficientTokensInPlatform {
                token,
                available: self.ledger.platform_float(token),
                requested,
            });
        }
        Ok(())
    }

    fn staged_safety_factor(&self, user: Address, changeset: &Changeset) -> LendingResult<U256> {
        let mut prices = self.prices();
        self.risk
            .safety_factor(&mut prices, &self.ledger.view(changeset), user)
    }

    // ==================== Admin ====================

    /// Register a token, or replace the feed of a registered one.
    pub fn set_approved_token(&mut self, token: Arc<dyn FungibleToken>, price_feed: Arc<dyn PriceFeed>) {
        let event = LendingEvent::AllowedTokenSet {
            token: token.address(),
            price_feed: price_feed.address(),
        };
        self.registry.set_approved_token(token, price_feed);
        self.emit(event);
    }

    // ==================== Position operations ====================

    /// Deposit `amount` of `token` as collateral, pulling it from `user`.
    #[instrument(skip(self), level = "debug")]
    pub fn deposit(&mut self, user: Address, token: Address, amount: U256) -> LendingResult<()> {
        ensure_nonzero(amount)?;
        let asset = self.registry.require(token)?.token.clone();

        let changeset = self
            .ledger
            .stage(&[LedgerOp::increase_deposit(user, token, amount)])?;

        asset.transfer_from(self.platform, user, self.platform, amount)?;
        self.ledger.commit(changeset);

        self.emit(LendingEvent::Deposit {
            user,
            token,
            amount,
        });
        Ok(())
    }

    /// Withdraw `amount` of deposited `token` back to `user`.
    #[instrument(skip(self), level = "debug")]
    pub fn withdraw(&mut self, user: Address, token: Address, amount: U256) -> LendingResult<()> {
        ensure_nonzero(amount)?;

        let deposited = self.ledger.deposit_of(user, token);
        if deposited < amount {
            return Err(LendingError::InsufficientFunds {
                deposited,
                requested: amount,
            });
        }
        let asset = self.registry.require(token)?.token.clone();

        let changeset = self
            .ledger
            .stage(&[LedgerOp::decrease_deposit(user, token, amount)])?;
        self.ensure_float_covers(token, &changeset, amount)?;

        let safety_factor = self.staged_safety_factor(user, &changeset)?;
        if !self.risk.meets_minimum(safety_factor) {
            warn!(
                %user,
                safety_factor = u256_math::wad_to_f64(safety_factor),
                "Withdraw rejected: position would be liquidatable"
            );
            return Err(LendingError::WouldBeLiquidated { safety_factor });
        }

        asset.transfer(self.platform, user, amount)?;
        self.ledger.commit(changeset);

        self.emit(LendingEvent::Withdraw {
            user,
            token,
            amount,
        });
        Ok(())
    }

    /// Borrow `amount` of `token` against deposited collateral.
    #[instrument(skip(self), level = "debug")]
    pub fn borrow(&mut self, user: Address, token: Address, amount: U256) -> LendingResult<()> {
        ensure_nonzero(amount)?;
        let asset = self.registry.require(token)?.token.clone();

        let available = self.ledger.platform_float(token);
        if available < amount {
            return Err(LendingError::InsufficientTokensInPlatform {
                token,
                available,
                requested: amount,
            });
        }

        let changeset = self
            .ledger
            .stage(&[LedgerOp::increase_borrow(user, token, amount)])?;

        let safety_factor = self.staged_safety_factor(user, &changeset)?;
        if !self.risk.meets_minimum(safety_factor) {
            warn!(
                %user,
                safety_factor = u256_math::wad_to_f64(safety_factor),
                "Borrow rejected: insufficient collateral value"
            );
            return Err(LendingError::DepositMoreValue { safety_factor });
        }

        asset.transfer(self.platform, user, amount)?;
        self.ledger.commit(changeset);

        self.emit(LendingEvent::Borrow {
            user,
            token,
            amount,
        });
        Ok(())
    }

    /// Repay `amount` of `user`'s `token` debt, pulling it from `user`.
    #[instrument(skip(self), level = "debug")]
    pub fn repay(&mut self, user: Address, token: Address, amount: U256) -> LendingResult<()> {
        ensure_nonzero(amount)?;

        let owed = self.ledger.borrow_of(user, token);
        if owed < amount {
            return Err(LendingError::RepayExceedsDebt {
                owed,
                requested: amount,
            });
        }
        let asset = self.registry.require(token)?.token.clone();

        let changeset = self
            .ledger
            .stage(&[LedgerOp::decrease_borrow(user, token, amount)])?;

        asset.transfer_from(self.platform, user, self.platform, amount)?;
        self.ledger.commit(changeset);

        self.emit(LendingEvent::Repay {
            user,
            token,
            amount,
        });
        Ok(())
    }

    // ==================== Liquidation ====================

    fn plan_liquidation(
        &self,
        borrower: Address,
        debt_token: Address,
        collateral_token: Address,
    ) -> LendingResult<LiquidationPlan> {
        let mut prices = self.prices();

        let safety_factor_before = self.risk.safety_factor(&mut prices, &self.ledger, borrower)?;
        if self.risk.meets_minimum(safety_factor_before) {
            return Err(LendingError::UserCannotBeLiquidated {
                safety_factor: safety_factor_before,
            });
        }

        let quote = LiquidationQuote::compute(
            &self.config.liquidation,
            &mut prices,
            debt_token,
            collateral_token,
            self.ledger.borrow_of(borrower, debt_token),
        )?;

        let available = self.ledger.deposit_of(borrower, collateral_token);
        if quote.seize_amount > available {
            return Err(LendingError::InsufficientCollateral {
                available,
                required: quote.seize_amount,
            });
        }

        let changeset = self.ledger.stage(&[
            LedgerOp::decrease_borrow(borrower, debt_token, quote.repay_amount),
            LedgerOp::decrease_deposit(borrower, collateral_token, quote.seize_amount),
        ])?;

        self.ensure_float_covers(collateral_token, &changeset, quote.seize_amount)?;

        let safety_factor_after =
            self.risk
                .safety_factor(&mut prices, &self.ledger.view(&changeset), borrower)?;

        Ok(LiquidationPlan {
            quote,
            changeset,
            safety_factor_before,
            safety_factor_after,
        })
    }

    /// Liquidate part of an unsafe `borrower`'s `debt_token` debt.
    ///
    /// The liquidator repays up to the close factor of that debt and receives
    /// its value plus the liquidation bonus in `collateral_token`.
    ///
    /// The ledger is left untouched on every error. If the collateral payout
    /// fails and the repayment cannot be handed back either, the repayment
    /// stays with the platform and the error is
    /// [`LendingError::LiquidationRefundFailed`], which names the amount owed
    /// back to the liquidator.
    #[instrument(skip(self), level = "debug")]
    pub fn liquidate(
        &mut self,
        liquidator: Address,
        borrower: Address,
        debt_token: Address,
        collateral_token: Address,
    ) -> LendingResult<LiquidationOutcome> {
        if liquidator == borrower {
            return Err(LendingError::SelfLiquidation);
        }
        let debt_asset = self.registry.require(debt_token)?.token.clone();
        let collateral_asset = self.registry.require(collateral_token)?.token.clone();

        let plan = self.plan_liquidation(borrower, debt_token, collateral_token)?;
        let LiquidationQuote {
            repay_amount,
            seize_amount,
            ..
        } = plan.quote;

        debt_asset.transfer_from(self.platform, liquidator, self.platform, repay_amount)?;
        if let Err(err) = collateral_asset.transfer(self.platform, liquidator, seize_amount) {
            // Hand the repayment back so the failed call moves nothing
            if let Err(refund_err) = debt_asset.transfer(self.platform, liquidator, repay_amount) {
                error!(
                    %liquidator,
                    %debt_token,
                    amount = %repay_amount,
                    error = %refund_err,
                    "Refund of liquidation repayment failed"
                );
                return Err(LendingError::LiquidationRefundFailed {
                    liquidator,
                    token: debt_token,
                    amount: repay_amount,
                    transfer: err,
                    refund: refund_err,
                });
            }
            return Err(err.into());
        }
        self.ledger.commit(plan.changeset);

        info!(
            %liquidator,
            %borrower,
            repaid = %repay_amount,
            seized = %seize_amount,
            bonus_value = u256_math::wad_to_f64(plan.quote.bonus_value),
            safety_factor_before = u256_math::wad_to_f64(plan.safety_factor_before),
            safety_factor_after = u256_math::wad_to_f64(plan.safety_factor_after),
            "Position liquidated"
        );

        self.emit(LendingEvent::Liquidate {
            liquidator,
            borrower,
            debt_token,
            collateral_token,
            repaid_amount: repay_amount,
            seized_amount: seize_amount,
        });

        Ok(LiquidationOutcome {
            borrower,
            debt_token,
            collateral_token,
            repaid_amount: repay_amount,
            seized_amount: seize_amount,
            safety_factor_before: plan.safety_factor_before,
            safety_factor_after: plan.safety_factor_after,
        })
    }

    // ==================== Queries ====================

    pub fn get_user_to_token_deposits(&self, user: Address, token: Address) -> U256 {
        self.ledger.deposit_of(user, token)
    }

    pub fn get_user_to_token_borrows(&self, user: Address, token: Address) -> U256 {
        self.ledger.borrow_of(user, token)
    }

    /// Current safety factor (WAD), priced from live feeds.
    pub fn get_safety_factor(&self, user: Address) -> LendingResult<U256> {
        self.risk.safety_factor(&mut self.prices(), &self.ledger, user)
    }

    pub fn is_safe(&self, user: Address) -> LendingResult<bool> {
        self.risk.is_safe(&mut self.prices(), &self.ledger, user)
    }

    /// Total deposit value (WAD).
    pub fn get_account_collateral_value(&self, user: Address) -> LendingResult<U256> {
        self.risk.collateral_value(&mut self.prices(), &self.ledger, user)
    }

    /// Total borrow value (WAD).
    pub fn get_account_borrowed_value(&self, user: Address) -> LendingResult<U256> {
        self.risk.debt_value(&mut self.prices(), &self.ledger, user)
    }

    /// (borrowed value, collateral value), both WAD, from one price snapshot.
    pub fn get_account_information(&self, user: Address) -> LendingResult<(U256, U256)> {
        let snapshot = self.account_snapshot(user)?;
        Ok((snapshot.debt_value, snapshot.collateral_value))
    }

    /// Value (WAD) of `amount` units of `token`.
    pub fn get_value(&self, token: Address, amount: U256) -> LendingResult<U256> {
        self.prices().value_of(token, amount)
    }

    /// Units of `token` worth `value` WAD.
    pub fn get_token_amount_from_value(&self, token: Address, value: U256) -> LendingResult<U256> {
        self.prices().amount_from_value(token, value)
    }

    pub fn allowed_tokens(&self) -> Vec<Address> {
        self.registry.addresses()
    }

    /// Amount of `token` available to borrow.
    pub fn platform_float(&self, token: Address) -> U256 {
        self.ledger.platform_float(token)
    }

    /// Full position breakdown for `user`.
    pub fn account_snapshot(&self, user: Address) -> LendingResult<AccountSnapshot> {
        let snapshot = self
            .risk
            .account_snapshot(&mut self.prices(), &self.ledger, user)?;
        debug!(
            %user,
            collateral = snapshot.collateral_value_f64(),
            debt = snapshot.debt_value_f64(),
            safety_factor = snapshot.safety_factor_f64(),
            liquidatable = snapshot.is_liquidatable(self.risk.min_safety_factor()),
            "Account snapshot"
        );
        Ok(snapshot)
    }
}

fn ensure_nonzero(amount: U256) -> LendingResult<()> {
    if amount.is_zero() {
        return Err(LendingError::AmountZero);
    }
    Ok(())
}

/// Thread-safe handle to a [`LendingEngine`].
///
/// Each call holds the lock for the whole operation, so operations from
/// different threads run one after another and never interleave.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<LendingEngine>>,
}

impl SharedEngine {
    pub fn new(engine: LendingEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// Calling back into the same `SharedEngine` from inside `f` deadlocks.
    pub fn with<R>(&self, f: impl FnOnce(&mut LendingEngine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }
}

//! MonoCooler - Collateralized Debt Market
//!
//! A single-collateral money market: accounts deposit the governance token
//! as collateral and borrow the treasury's debt token against it. Interest
//! compounds continuously through a global RAY accumulator, and accounts
//! above the liquidation LTV can be wiped by any keeper in batches.
//!
//! ## Core Operations
//!
//! - **add_collateral**: Deposit collateral, optionally delegating its votes
//! - **withdraw_collateral**: Remove undelegated collateral (LTV re-checked)
//! - **borrow**: Draw debt up to the max origination LTV
//! - **repay**: Pay debt down, capped at what is owed
//! - **batch_liquidate**: Wipe every unhealthy account in a list
//! - **apply_unhealthy_delegations**: Force-undelegate an unhealthy account
//!
//! ## Account Lifecycle
//!
//! ```text
//! NoPosition -> CollateralOnly -> CollateralAndDebt -> (liquidated) -> NoPosition
//! ```
//!
//! ## Atomicity
//!
//! Every mutating entry point runs inside a transaction: state and the event
//! log are snapshotted on entry and restored if any step fails. Calls into
//! the treasury and collateral token come last, after all checks passed.

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod accumulator;
pub mod delegation;
pub mod ledger;
pub mod ltv;

#[cfg(test)]
mod integration_tests;

use cooler_common::{
    capabilities::{CollateralCustody, DelegationLedger, GovernanceToken, TreasuryFunding},
    constants::{delegation as delegation_limits, interest, limits},
    errors::{CoolerError, CoolerResult, PausedOperation},
    events::{CoolerEvent, EventLog},
    math::{bps_to_wad, safe_add},
    types::{ensure_address, ensure_amount, Address, DelegationRequest, DelegationResult},
};

pub use accumulator::GlobalDebtState;
pub use delegation::{escrow_id, DelegationTracker};
pub use ledger::{AccountLedger, AccountState};
pub use ltv::{LiquidationStatus, LoanToValueConfig};

// ============ Configuration ============

/// Runtime parameters of the market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CoolerConfig {
    /// Annual interest rate, basis points
    pub interest_rate_bps: u64,
    pub ltv: LoanToValueConfig,
    /// Floor for any non-zero account debt
    pub min_debt_required: u128,
    pub borrows_paused: bool,
    pub liquidations_paused: bool,
    /// Delegations a withdrawal may rescind automatically
    pub max_auto_rescind: u32,
    /// Delegate cap for accounts without an override
    pub default_max_delegate_addresses: u32,
}

impl Default for CoolerConfig {
    fn default() -> Self {
        Self {
            interest_rate_bps: interest::DEFAULT_INTEREST_RATE_BPS,
            ltv: LoanToValueConfig::default(),
            min_debt_required: limits::MIN_DEBT_REQUIRED,
            borrows_paused: false,
            liquidations_paused: false,
            max_auto_rescind: delegation_limits::DEFAULT_AUTO_RESCIND_MAX,
            default_max_delegate_addresses: delegation_limits::DEFAULT_MAX_DELEGATE_ADDRESSES,
        }
    }
}

impl CoolerConfig {
    pub fn validate(&self) -> CoolerResult<()> {
        if self.interest_rate_bps > interest::MAX_INTEREST_RATE_BPS {
            return Err(CoolerError::InvalidParam {
                param: "interest_rate_bps",
                reason: "above maximum",
            });
        }
        LoanToValueConfig::new(self.ltv.max_origination_ltv, self.ltv.liquidation_ltv)?;
        if self.default_max_delegate_addresses > delegation_limits::MAX_DELEGATE_ADDRESSES_LIMIT {
            return Err(CoolerError::InvalidParam {
                param: "default_max_delegate_addresses",
                reason: "above limit",
            });
        }
        Ok(())
    }

    /// Annual rate in WAD
    pub fn interest_rate_wad(&self) -> u128 {
        bps_to_wad(self.interest_rate_bps)
    }
}

// ============ State ============

/// Everything the market persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MonoCoolerState {
    pub config: CoolerConfig,
    pub global: GlobalDebtState,
    pub accounts: AccountLedger,
    pub delegations: DelegationTracker,
    /// (account, authorized) => deadline
    pub authorizations: BTreeMap<(Address, Address), u64>,
}

impl MonoCoolerState {
    pub fn new(config: CoolerConfig, now: u64) -> CoolerResult<Self> {
        config.validate()?;
        Ok(Self {
            delegations: DelegationTracker::new(config.default_max_delegate_addresses),
            config,
            global: GlobalDebtState::new(now),
            accounts: AccountLedger::new(),
            authorizations: BTreeMap::new(),
        })
    }
}

/// Outcome of `batch_liquidate`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiquidationResult {
    pub total_collateral_claimed: u128,
    pub total_debt_wiped: u128,
    /// Accounts actually liquidated, in input order
    pub liquidated: Vec<Address>,
}

/// Read-only summary of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub collateral: u128,
    /// Debt rounded up
    pub current_debt: u128,
    /// Debt the collateral supports at origination
    pub max_origination_debt_amount: u128,
    /// Debt at which the account becomes liquidatable
    pub liquidation_debt_amount: u128,
    /// WAD, below 1.0 is liquidatable; `u128::MAX` without debt
    pub health_factor: u128,
    pub current_ltv: u128,
    pub total_delegated: u128,
    pub num_delegate_addresses: u32,
    pub max_delegate_addresses: u32,
}

// ============ MonoCooler ============

/// The market, wired to its treasury and collateral token
pub struct MonoCooler<T, G>
where
    T: TreasuryFunding,
    G: GovernanceToken + CollateralCustody,
{
    state: MonoCoolerState,
    treasury: T,
    collateral_token: G,
    events: EventLog,
    entered: bool,
}

impl<T, G> MonoCooler<T, G>
where
    T: TreasuryFunding,
    G: GovernanceToken + CollateralCustody,
{
    /// Open a market at `now` with validated `config`
    pub fn new(config: CoolerConfig, treasury: T, collateral_token: G, now: u64) -> CoolerResult<Self> {
        Ok(Self {
            state: MonoCoolerState::new(config, now)?,
            treasury,
            collateral_token,
            events: EventLog::new(),
            entered: false,
        })
    }

    /// Run `f` atomically: on error, state and events roll back
    fn transact<R>(&mut self, f: impl FnOnce(&mut Self) -> CoolerResult<R>) -> CoolerResult<R> {
        if self.entered {
            return Err(CoolerError::Reentrancy);
        }
        self.entered = true;
        let snapshot = self.state.clone();
        let mark = self.events.len();

        let result = f(self);
        if result.is_err() {
            self.state = snapshot;
            self.events.truncate(mark);
        }
        self.entered = false;
        result
    }

    fn refresh(&mut self, now: u64) -> CoolerResult<()> {
        let rate = self.state.config.interest_rate_wad();
        self.state.global.refresh(rate, now)
    }

    /// Caller acts for itself or holds an unexpired authorization
    fn ensure_authorized(&self, caller: &Address, account: &Address, now: u64) -> CoolerResult<()> {
        if caller == account || self.is_authorized(account, caller, now) {
            return Ok(());
        }
        Err(CoolerError::Unauthorized { caller: *caller, account: *account })
    }

    fn apply_requests(
        &mut self,
        account: &Address,
        requests: &[DelegationRequest],
        now: u64,
    ) -> CoolerResult<DelegationResult> {
        let result = self.state.delegations.apply_delegations(account, requests)?;
        for request in requests {
            self.events.emit(CoolerEvent::DelegationApplied {
                account: *account,
                delegate: request.delegate,
                amount: request.amount,
                timestamp: now,
            });
        }
        Ok(result)
    }

    // ============ Collateral ============

    /// Deposit `amount` collateral for `on_behalf_of`
    ///
    /// Anyone may add collateral for an account, but only the account itself
    /// may attach delegation requests.
    pub fn add_collateral(
        &mut self,
        caller: &Address,
        amount: u128,
        on_behalf_of: &Address,
        requests: &[DelegationRequest],
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        ensure_address(on_behalf_of, "on_behalf_of cannot be zero address")?;
        if !requests.is_empty() && caller != on_behalf_of {
            return Err(CoolerError::Unauthorized { caller: *caller, account: *on_behalf_of });
        }

        self.transact(|market| {
            let mut account = market.state.accounts.get(on_behalf_of);
            account.collateral = safe_add(account.collateral, amount)?;
            market.state.accounts.set(on_behalf_of, account);
            market.state.global.add_collateral(amount)?;
            market.state.delegations.deposit_undelegated(on_behalf_of, amount)?;

            if !requests.is_empty() {
                market.apply_requests(on_behalf_of, requests, now)?;
            }

            market.events.emit(CoolerEvent::CollateralAdded {
                caller: *caller,
                on_behalf_of: *on_behalf_of,
                amount,
                timestamp: now,
            });

            market.collateral_token.transfer_in(caller, amount)
        })
    }

    /// Withdraw collateral to `recipient`; `u128::MAX` withdraws as much as
    /// the origination LTV allows. Returns the amount withdrawn.
    pub fn withdraw_collateral(
        &mut self,
        caller: &Address,
        amount: u128,
        on_behalf_of: &Address,
        recipient: &Address,
        requests: &[DelegationRequest],
        now: u64,
    ) -> CoolerResult<u128> {
        ensure_amount(amount)?;
        ensure_address(recipient, "recipient cannot be zero address")?;
        self.ensure_authorized(caller, on_behalf_of, now)?;

        self.transact(|market| {
            market.refresh(now)?;
            let mut account = market.state.accounts.get(on_behalf_of);
            if account.collateral == 0 {
                return Err(CoolerError::AccountNotFound { account: *on_behalf_of });
            }

            if !requests.is_empty() {
                market.apply_requests(on_behalf_of, requests, now)?;
            }

            let amount = if amount == limits::MAX_AMOUNT {
                let debt = account.current_debt(market.state.global.interest_accumulator_ray, true)?;
                ltv::max_withdrawable_collateral(account.collateral, debt, &market.state.config.ltv)?
            } else {
                amount
            };
            ensure_amount(amount)?;
            if amount > account.collateral {
                return Err(CoolerError::ExceededCollateralBalance {
                    available: account.collateral,
                    requested: amount,
                });
            }

            let max_auto_rescind = market.state.config.max_auto_rescind;
            market
                .state
                .delegations
                .withdraw_undelegated(on_behalf_of, amount, max_auto_rescind)?;

            account.collateral -= amount;
            market.state.accounts.set(on_behalf_of, account);
            market.state.global.remove_collateral(amount)?;

            let status = ltv::compute_liquidity(
                &account,
                market.state.global.interest_accumulator_ray,
                &market.state.config.ltv,
            )?;
            ltv::validate_origination(&status, &market.state.config.ltv)?;

            market.events.emit(CoolerEvent::CollateralWithdrawn {
                caller: *caller,
                on_behalf_of: *on_behalf_of,
                recipient: *recipient,
                amount,
                timestamp: now,
            });

            market.collateral_token.transfer_out(recipient, amount)?;
            Ok(amount)
        })
    }

    // ============ Debt ============

    /// Borrow `amount` for `on_behalf_of`, sent to `recipient`; `u128::MAX`
    /// borrows up to the origination LTV. Returns the amount borrowed.
    pub fn borrow(
        &mut self,
        caller: &Address,
        amount: u128,
        on_behalf_of: &Address,
        recipient: &Address,
        now: u64,
    ) -> CoolerResult<u128> {
        if self.state.config.borrows_paused {
            return Err(CoolerError::Paused { operation: PausedOperation::Borrow });
        }
        ensure_amount(amount)?;
        ensure_address(recipient, "recipient cannot be zero address")?;
        self.ensure_authorized(caller, on_behalf_of, now)?;

        self.transact(|market| {
            market.refresh(now)?;
            let global_acc = market.state.global.interest_accumulator_ray;
            let mut account = market.state.accounts.get(on_behalf_of);
            let current_debt = account.current_debt(global_acc, false)?;

            let amount = if amount == limits::MAX_AMOUNT {
                ltv::max_origination_debt(account.collateral, &market.state.config.ltv)?
                    .saturating_sub(current_debt)
            } else {
                amount
            };
            ensure_amount(amount)?;

            let new_debt = safe_add(current_debt, amount)?;
            let minimum = market.state.config.min_debt_required;
            if new_debt < minimum {
                return Err(CoolerError::MinDebtNotMet { debt: new_debt, minimum });
            }

            account.checkpoint(new_debt, global_acc);
            market.state.accounts.set(on_behalf_of, account);
            market.state.global.add_debt(amount)?;

            let status = ltv::compute_liquidity(&account, global_acc, &market.state.config.ltv)?;
            ltv::validate_origination(&status, &market.state.config.ltv)?;

            market.events.emit(CoolerEvent::Borrow {
                caller: *caller,
                on_behalf_of: *on_behalf_of,
                recipient: *recipient,
                amount,
                new_debt,
                timestamp: now,
            });

            market.treasury.fund_from_treasury(amount, recipient)?;
            Ok(amount)
        })
    }

    /// Repay up to `amount` of `on_behalf_of`'s debt, paid by `caller`.
    /// Returns the amount actually repaid.
    pub fn repay(
        &mut self,
        caller: &Address,
        amount: u128,
        on_behalf_of: &Address,
        now: u64,
    ) -> CoolerResult<u128> {
        ensure_amount(amount)?;
        ensure_address(on_behalf_of, "on_behalf_of cannot be zero address")?;

        self.transact(|market| {
            market.refresh(now)?;
            let global_acc = market.state.global.interest_accumulator_ray;
            let mut account = market.state.accounts.get(on_behalf_of);
            if !account.has_debt() {
                return Err(CoolerError::NoDebt { account: *on_behalf_of });
            }

            let latest_debt = account.current_debt(global_acc, true)?;
            let repaid = amount.min(latest_debt);
            let remaining = latest_debt - repaid;

            let minimum = market.state.config.min_debt_required;
            if remaining > 0 && remaining < minimum {
                return Err(CoolerError::MinDebtNotMet { debt: remaining, minimum });
            }

            account.checkpoint(remaining, global_acc);
            market.state.accounts.set(on_behalf_of, account);
            market.state.global.reduce_debt(repaid);

            market.events.emit(CoolerEvent::Repay {
                caller: *caller,
                on_behalf_of: *on_behalf_of,
                amount: repaid,
                remaining_debt: remaining,
                timestamp: now,
            });

            market.treasury.repay_to_treasury(repaid, caller)?;
            Ok(repaid)
        })
    }

    // ============ Liquidation ============

    /// Liquidate every account in `accounts` above the liquidation LTV
    ///
    /// Healthy, empty or repeated accounts are skipped. Seized collateral is
    /// burned in one call and global debt is reduced once.
    pub fn batch_liquidate(
        &mut self,
        caller: &Address,
        accounts: &[Address],
        now: u64,
    ) -> CoolerResult<LiquidationResult> {
        if self.state.config.liquidations_paused {
            return Err(CoolerError::Paused { operation: PausedOperation::Liquidation });
        }
        if accounts.len() > limits::MAX_LIQUIDATION_BATCH {
            return Err(CoolerError::InvalidParam {
                param: "accounts",
                reason: "batch too large",
            });
        }

        self.transact(|market| {
            market.refresh(now)?;
            let global_acc = market.state.global.interest_accumulator_ray;
            let mut result = LiquidationResult::default();

            for account in accounts {
                let position = market.state.accounts.get(account);
                let status = ltv::compute_liquidity(&position, global_acc, &market.state.config.ltv)?;
                if !status.exceeded_liquidation_ltv {
                    continue;
                }

                market.state.delegations.remove_account(account)?;
                market.state.accounts.remove(account);

                result.total_collateral_claimed =
                    safe_add(result.total_collateral_claimed, status.collateral)?;
                result.total_debt_wiped = safe_add(result.total_debt_wiped, status.current_debt)?;
                result.liquidated.push(*account);

                market.events.emit(CoolerEvent::Liquidated {
                    caller: *caller,
                    account: *account,
                    collateral_seized: status.collateral,
                    debt_wiped: status.current_debt,
                    timestamp: now,
                });
            }

            market.state.global.reduce_debt(result.total_debt_wiped);
            market.state.global.remove_collateral(result.total_collateral_claimed)?;

            if result.total_collateral_claimed > 0 {
                market
                    .collateral_token
                    .burn_governance_token(result.total_collateral_claimed)?;
            }
            Ok(result)
        })
    }

    /// Force-undelegate an account above the liquidation LTV so it can be
    /// liquidated. Only undelegation requests are accepted.
    pub fn apply_unhealthy_delegations(
        &mut self,
        _caller: &Address,
        account: &Address,
        requests: &[DelegationRequest],
        now: u64,
    ) -> CoolerResult<DelegationResult> {
        if self.state.config.liquidations_paused {
            return Err(CoolerError::Paused { operation: PausedOperation::Liquidation });
        }
        if requests.iter().any(|r| !r.is_undelegation()) {
            return Err(CoolerError::InvalidParam {
                param: "requests",
                reason: "only undelegation allowed",
            });
        }

        self.transact(|market| {
            market.refresh(now)?;
            let position = market.state.accounts.get(account);
            let status = ltv::compute_liquidity(
                &position,
                market.state.global.interest_accumulator_ray,
                &market.state.config.ltv,
            )?;
            if !status.exceeded_liquidation_ltv {
                return Err(CoolerError::CannotLiquidate {
                    account: *account,
                    current_ltv: status.current_ltv,
                    liquidation_ltv: market.state.config.ltv.liquidation_ltv,
                });
            }
            market.apply_requests(account, requests, now)
        })
    }

    // ============ Delegation & Authorization ============

    /// Delegate or undelegate `on_behalf_of`'s collateral
    pub fn apply_delegations(
        &mut self,
        caller: &Address,
        on_behalf_of: &Address,
        requests: &[DelegationRequest],
        now: u64,
    ) -> CoolerResult<DelegationResult> {
        self.ensure_authorized(caller, on_behalf_of, now)?;
        self.transact(|market| market.apply_requests(on_behalf_of, requests, now))
    }

    /// Let `authorized` act for `caller` until `deadline` (0 revokes)
    pub fn set_authorization(
        &mut self,
        caller: &Address,
        authorized: &Address,
        deadline: u64,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_address(authorized, "authorized cannot be zero address")?;
        if deadline == 0 {
            self.state.authorizations.remove(&(*caller, *authorized));
        } else {
            self.state.authorizations.insert((*caller, *authorized), deadline);
        }
        self.events.emit(CoolerEvent::AuthorizationSet {
            account: *caller,
            authorized: *authorized,
            deadline,
            timestamp: now,
        });
        Ok(())
    }

    pub fn is_authorized(&self, account: &Address, authorized: &Address, now: u64) -> bool {
        self.state
            .authorizations
            .get(&(*account, *authorized))
            .map(|deadline| *deadline > now)
            .unwrap_or(false)
    }

    // ============ Admin ============
    //
    // Role checks live with the host; these setters only enforce parameter
    // invariants.

    pub fn set_loan_to_value(
        &mut self,
        max_origination_ltv: u128,
        liquidation_ltv: u128,
        now: u64,
    ) -> CoolerResult<()> {
        self.state.config.ltv = self.state.config.ltv.update(max_origination_ltv, liquidation_ltv)?;
        self.events.emit(CoolerEvent::LtvSet { max_origination_ltv, liquidation_ltv, timestamp: now });
        Ok(())
    }

    pub fn set_liquidations_paused(&mut self, paused: bool, now: u64) {
        self.state.config.liquidations_paused = paused;
        self.events.emit(CoolerEvent::LiquidationsPausedSet { paused, timestamp: now });
    }

    pub fn set_borrows_paused(&mut self, paused: bool, now: u64) {
        self.state.config.borrows_paused = paused;
        self.events.emit(CoolerEvent::BorrowsPausedSet { paused, timestamp: now });
    }

    /// Change the annual rate; interest up to `now` accrues at the old rate
    pub fn set_interest_rate_bps(&mut self, interest_rate_bps: u64, now: u64) -> CoolerResult<()> {
        if interest_rate_bps > interest::MAX_INTEREST_RATE_BPS {
            return Err(CoolerError::InvalidParam {
                param: "interest_rate_bps",
                reason: "above maximum",
            });
        }
        self.transact(|market| {
            market.refresh(now)?;
            market.state.config.interest_rate_bps = interest_rate_bps;
            market.events.emit(CoolerEvent::InterestRateSet { interest_rate_bps, timestamp: now });
            Ok(())
        })
    }

    pub fn set_max_delegate_addresses(&mut self, account: &Address, max: u32, now: u64) -> CoolerResult<()> {
        self.state.delegations.set_max_delegate_addresses(account, max)?;
        self.events.emit(CoolerEvent::MaxDelegateAddressesSet { account: *account, max, timestamp: now });
        Ok(())
    }

    pub fn set_min_debt_required(&mut self, min_debt_required: u128, now: u64) {
        self.state.config.min_debt_required = min_debt_required;
        self.events.emit(CoolerEvent::MinDebtRequiredSet { min_debt_required, timestamp: now });
    }

    // ============ Views ============

    fn preview_global(&self, now: u64) -> CoolerResult<GlobalDebtState> {
        self.state.global.preview(self.state.config.interest_rate_wad(), now)
    }

    /// Full position summary for `account` at `now`
    pub fn account_position(&self, account: &Address, now: u64) -> CoolerResult<AccountPosition> {
        let global = self.preview_global(now)?;
        let config = &self.state.config.ltv;
        let position = self.state.accounts.get(account);
        let status = ltv::compute_liquidity(&position, global.interest_accumulator_ray, config)?;

        Ok(AccountPosition {
            collateral: status.collateral,
            current_debt: status.current_debt,
            max_origination_debt_amount: ltv::max_origination_debt(status.collateral, config)?,
            liquidation_debt_amount: ltv::liquidation_debt(status.collateral, config)?,
            health_factor: ltv::health_factor(status.current_debt, status.collateral, config)?,
            current_ltv: status.current_ltv,
            total_delegated: self.state.delegations.total_delegated(account),
            num_delegate_addresses: self.state.delegations.num_delegate_addresses(account),
            max_delegate_addresses: self.state.delegations.max_delegate_addresses(account),
        })
    }

    /// Health of each account at `now`, in input order
    pub fn compute_liquidity(&self, accounts: &[Address], now: u64) -> CoolerResult<Vec<LiquidationStatus>> {
        let global = self.preview_global(now)?;
        accounts
            .iter()
            .map(|account| {
                ltv::compute_liquidity(
                    &self.state.accounts.get(account),
                    global.interest_accumulator_ray,
                    &self.state.config.ltv,
                )
            })
            .collect()
    }

    /// Debt change that would put `account` exactly at the origination LTV
    /// after changing its collateral by `collateral_delta`. Positive means
    /// more can be borrowed, negative means that much must be repaid.
    pub fn debt_delta_for_max_origination_ltv(
        &self,
        account: &Address,
        collateral_delta: i128,
        now: u64,
    ) -> CoolerResult<i128> {
        let global = self.preview_global(now)?;
        let position = self.state.accounts.get(account);

        let collateral = if collateral_delta >= 0 {
            safe_add(position.collateral, collateral_delta as u128)?
        } else {
            let removed = collateral_delta.unsigned_abs();
            if removed > position.collateral {
                return Err(CoolerError::ExceededCollateralBalance {
                    available: position.collateral,
                    requested: removed,
                });
            }
            position.collateral - removed
        };

        let max_debt = ltv::max_origination_debt(collateral, &self.state.config.ltv)?;
        let current_debt = position.current_debt(global.interest_accumulator_ray, true)?;
        let max_debt = i128::try_from(max_debt).map_err(|_| CoolerError::Overflow)?;
        let current_debt = i128::try_from(current_debt).map_err(|_| CoolerError::Overflow)?;
        max_debt.checked_sub(current_debt).ok_or(CoolerError::Underflow)
    }

    /// Aggregate debt accrued to `now`
    pub fn total_debt(&self, now: u64) -> CoolerResult<u128> {
        Ok(self.preview_global(now)?.total_debt)
    }

    /// Global index accrued to `now`
    pub fn interest_accumulator_ray(&self, now: u64) -> CoolerResult<u128> {
        Ok(self.preview_global(now)?.interest_accumulator_ray)
    }

    pub fn total_collateral(&self) -> u128 {
        self.state.global.total_collateral
    }

    pub fn account_state(&self, account: &Address) -> AccountState {
        self.state.accounts.get(account)
    }

    pub fn delegations(&self) -> &DelegationTracker {
        &self.state.delegations
    }

    pub fn config(&self) -> &CoolerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &MonoCoolerState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    pub fn collateral_token(&self) -> &G {
        &self.collateral_token
    }

    pub fn collateral_token_mut(&mut self) -> &mut G {
        &mut self.collateral_token
    }
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use cooler_common::constants::precision::WAD;
    use cooler_common::memory::{MemoryGovernanceToken, MemoryTreasury};

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];
    const KEEPER: Address = [9u8; 32];

    type TestCooler = MonoCooler<MemoryTreasury, MemoryGovernanceToken>;

    fn create_test_cooler() -> TestCooler {
        let config = CoolerConfig {
            interest_rate_bps: 0,
            ltv: LoanToValueConfig::new(7 * WAD / 10, 8 * WAD / 10).unwrap(),
            min_debt_required: 10 * WAD,
            ..Default::default()
        };
        let mut token = MemoryGovernanceToken::new();
        token.mint_governance_token(&ALICE, 1_000 * WAD).unwrap();
        token.mint_governance_token(&BOB, 1_000 * WAD).unwrap();

        MonoCooler::new(config, MemoryTreasury::new(1_000_000 * WAD), token, 0).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoolerConfig { interest_rate_bps: 10_000, ..Default::default() };
        let result = MonoCooler::new(config, MemoryTreasury::new(0), MemoryGovernanceToken::new(), 0);
        assert!(matches!(result, Err(CoolerError::InvalidParam { param: "interest_rate_bps", .. })));
    }

    #[test]
    fn test_add_collateral() {
        let mut cooler = create_test_cooler();

        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();

        assert_eq!(cooler.account_state(&ALICE).collateral, 100 * WAD);
        assert_eq!(cooler.total_collateral(), 100 * WAD);
        assert_eq!(cooler.delegations().undelegated_balance(&ALICE), 100 * WAD);
        assert_eq!(cooler.collateral_token().custody, 100 * WAD);
        assert_eq!(cooler.events().len(), 1);
    }

    #[test]
    fn test_add_collateral_validation() {
        let mut cooler = create_test_cooler();

        assert_eq!(cooler.add_collateral(&ALICE, 0, &ALICE, &[], 1), Err(CoolerError::ZeroAmount));
        assert!(matches!(
            cooler.add_collateral(&ALICE, WAD, &[0u8; 32], &[], 1),
            Err(CoolerError::InvalidAddress { .. })
        ));

        // Third parties may top up but not delegate
        cooler.add_collateral(&BOB, WAD, &ALICE, &[], 1).unwrap();
        let delegate = [7u8; 32];
        let result = cooler.add_collateral(&BOB, WAD, &ALICE, &[DelegationRequest::delegate(delegate, 1).unwrap()], 1);
        assert!(matches!(result, Err(CoolerError::Unauthorized { .. })));
    }

    #[test]
    fn test_failed_transfer_rolls_back() {
        let mut cooler = create_test_cooler();
        let poor = [5u8; 32];

        // `poor` holds no collateral token, so the final transfer fails
        let result = cooler.add_collateral(&poor, WAD, &poor, &[], 1);
        assert!(matches!(result, Err(CoolerError::InsufficientBalance { .. })));
        assert_eq!(cooler.account_state(&poor), AccountState::default());
        assert_eq!(cooler.total_collateral(), 0);
        assert!(!cooler.events().has_events());
    }

    #[test]
    fn test_borrow_and_repay() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();

        let borrowed = cooler.borrow(&ALICE, 50 * WAD, &ALICE, &ALICE, 1).unwrap();
        assert_eq!(borrowed, 50 * WAD);
        assert_eq!(cooler.treasury().balance_of(&ALICE), 50 * WAD);
        assert_eq!(cooler.total_debt(1).unwrap(), 50 * WAD);

        let repaid = cooler.repay(&ALICE, 50 * WAD, &ALICE, 2).unwrap();
        assert_eq!(repaid, 50 * WAD);
        assert_eq!(cooler.account_state(&ALICE).debt_checkpoint, 0);
        assert_eq!(cooler.total_debt(2).unwrap(), 0);
    }

    #[test]
    fn test_borrow_max_sentinel() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();

        let borrowed = cooler.borrow(&ALICE, u128::MAX, &ALICE, &ALICE, 1).unwrap();
        assert_eq!(borrowed, 70 * WAD);

        // Nothing left to draw
        assert_eq!(cooler.borrow(&ALICE, u128::MAX, &ALICE, &ALICE, 1), Err(CoolerError::ZeroAmount));
    }

    #[test]
    fn test_borrow_paused_and_min_debt() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();

        let result = cooler.borrow(&ALICE, 5 * WAD, &ALICE, &ALICE, 1);
        assert_eq!(result, Err(CoolerError::MinDebtNotMet { debt: 5 * WAD, minimum: 10 * WAD }));

        cooler.set_borrows_paused(true, 1);
        let result = cooler.borrow(&ALICE, 20 * WAD, &ALICE, &ALICE, 1);
        assert_eq!(result, Err(CoolerError::Paused { operation: PausedOperation::Borrow }));
    }

    #[test]
    fn test_borrow_requires_authorization() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();

        let result = cooler.borrow(&BOB, 20 * WAD, &ALICE, &BOB, 1);
        assert!(matches!(result, Err(CoolerError::Unauthorized { .. })));

        cooler.set_authorization(&ALICE, &BOB, 100, 1).unwrap();
        cooler.borrow(&BOB, 20 * WAD, &ALICE, &BOB, 50).unwrap();
        assert_eq!(cooler.treasury().balance_of(&BOB), 20 * WAD);

        // Deadline passed
        let result = cooler.borrow(&BOB, 20 * WAD, &ALICE, &BOB, 100);
        assert!(matches!(result, Err(CoolerError::Unauthorized { .. })));
    }

    #[test]
    fn test_repay_without_debt() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();
        assert_eq!(cooler.repay(&ALICE, WAD, &ALICE, 1), Err(CoolerError::NoDebt { account: ALICE }));
    }

    #[test]
    fn test_repay_capped_at_debt() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();
        cooler.borrow(&ALICE, 30 * WAD, &ALICE, &ALICE, 1).unwrap();
        cooler.treasury_mut().mint_to(&ALICE, 100 * WAD).unwrap();

        let repaid = cooler.repay(&ALICE, 1_000 * WAD, &ALICE, 1).unwrap();
        assert_eq!(repaid, 30 * WAD);
        assert_eq!(cooler.treasury().balance_of(&ALICE), 100 * WAD);
    }

    #[test]
    fn test_withdraw_collateral() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();
        cooler.borrow(&ALICE, 35 * WAD, &ALICE, &ALICE, 1).unwrap();

        // 35 debt needs 50 collateral at 0.7
        let result = cooler.withdraw_collateral(&ALICE, 51 * WAD, &ALICE, &ALICE, &[], 1);
        assert!(matches!(result, Err(CoolerError::ExceededMaxOriginationLtv { .. })));
        assert_eq!(cooler.account_state(&ALICE).collateral, 100 * WAD);

        let withdrawn = cooler.withdraw_collateral(&ALICE, u128::MAX, &ALICE, &BOB, &[], 1).unwrap();
        assert_eq!(withdrawn, 50 * WAD);
        assert_eq!(cooler.collateral_token().balance_of(&BOB), 1_050 * WAD);
    }

    #[test]
    fn test_withdraw_blocked_by_delegation() {
        let mut cooler = create_test_cooler();
        let delegate = [7u8; 32];
        cooler
            .add_collateral(&ALICE, 100 * WAD, &ALICE, &[DelegationRequest::delegate(delegate, 80 * WAD).unwrap()], 1)
            .unwrap();

        let result = cooler.withdraw_collateral(&ALICE, 30 * WAD, &ALICE, &ALICE, &[], 1);
        assert_eq!(
            result,
            Err(CoolerError::ExceededUndelegatedCollateralBalance { available: 20 * WAD, requested: 30 * WAD })
        );

        // Undelegating in the same call frees it
        let withdrawn = cooler
            .withdraw_collateral(&ALICE, 30 * WAD, &ALICE, &ALICE, &[DelegationRequest::undelegate(delegate, 10 * WAD).unwrap()], 1)
            .unwrap();
        assert_eq!(withdrawn, 30 * WAD);
        assert_eq!(cooler.delegations().total_delegated(&ALICE), 70 * WAD);
    }

    #[test]
    fn test_failed_withdraw_restores_delegations() {
        let config = CoolerConfig {
            interest_rate_bps: 0,
            ltv: LoanToValueConfig::new(7 * WAD / 10, 8 * WAD / 10).unwrap(),
            min_debt_required: 10 * WAD,
            max_auto_rescind: 2,
            ..Default::default()
        };
        let mut token = MemoryGovernanceToken::new();
        token.mint_governance_token(&ALICE, 1_000 * WAD).unwrap();
        let mut cooler = MonoCooler::new(config, MemoryTreasury::new(1_000_000 * WAD), token, 0).unwrap();

        let delegate = [7u8; 32];
        cooler
            .add_collateral(&ALICE, 100 * WAD, &ALICE, &[DelegationRequest::delegate(delegate, 80 * WAD).unwrap()], 1)
            .unwrap();
        cooler.borrow(&ALICE, 35 * WAD, &ALICE, &ALICE, 1).unwrap();
        let delegations_before = cooler.delegations().clone();
        let state_before = cooler.state().clone();

        // Undelegates 10 by request and auto-rescinds 30 more, then fails on LTV
        let result = cooler.withdraw_collateral(
            &ALICE,
            60 * WAD,
            &ALICE,
            &ALICE,
            &[DelegationRequest::undelegate(delegate, 10 * WAD).unwrap()],
            1,
        );

        assert!(matches!(result, Err(CoolerError::ExceededMaxOriginationLtv { .. })));
        assert_eq!(cooler.delegations(), &delegations_before);
        assert_eq!(cooler.delegations().escrow_balance(&delegate), 80 * WAD);
        assert_eq!(cooler.delegations().undelegated_balance(&ALICE), 20 * WAD);
        assert_eq!(cooler.state(), &state_before);
        assert_eq!(cooler.collateral_token().balance_of(&ALICE), 900 * WAD);
    }

    #[test]
    fn test_admin_setters() {
        let mut cooler = create_test_cooler();

        assert!(cooler.set_loan_to_value(5 * WAD / 10, 7 * WAD / 10, 1).is_err());
        cooler.set_loan_to_value(8 * WAD / 10, 9 * WAD / 10, 1).unwrap();
        assert_eq!(cooler.config().ltv.liquidation_ltv, 9 * WAD / 10);

        assert!(cooler.set_interest_rate_bps(interest::MAX_INTEREST_RATE_BPS + 1, 1).is_err());
        cooler.set_interest_rate_bps(100, 1).unwrap();
        assert_eq!(cooler.config().interest_rate_bps, 100);

        cooler.set_max_delegate_addresses(&ALICE, 20, 1).unwrap();
        assert_eq!(cooler.delegations().max_delegate_addresses(&ALICE), 20);

        cooler.set_min_debt_required(WAD, 1);
        assert_eq!(cooler.config().min_debt_required, WAD);
    }

    #[test]
    fn test_liquidation_paused() {
        let mut cooler = create_test_cooler();
        cooler.set_liquidations_paused(true, 1);
        let result = cooler.batch_liquidate(&KEEPER, &[ALICE], 1);
        assert_eq!(result, Err(CoolerError::Paused { operation: PausedOperation::Liquidation }));
    }

    #[test]
    fn test_account_position_view() {
        let mut cooler = create_test_cooler();
        cooler.add_collateral(&ALICE, 100 * WAD, &ALICE, &[], 1).unwrap();
        cooler.borrow(&ALICE, 40 * WAD, &ALICE, &ALICE, 1).unwrap();

        let position = cooler.account_position(&ALICE, 1).unwrap();
        assert_eq!(position.collateral, 100 * WAD);
        assert_eq!(position.current_debt, 40 * WAD);
        assert_eq!(position.max_origination_debt_amount, 70 * WAD);
        assert_eq!(position.liquidation_debt_amount, 80 * WAD);
        assert_eq!(position.health_factor, 2 * WAD);
        assert_eq!(position.current_ltv, 4 * WAD / 10);
        assert_eq!(position.max_delegate_addresses, 10);

        assert_eq!(cooler.debt_delta_for_max_origination_ltv(&ALICE, 0, 1).unwrap(), (30 * WAD) as i128);
        assert_eq!(
            cooler.debt_delta_for_max_origination_ltv(&ALICE, -(60 * WAD as i128), 1).unwrap(),
            -((12 * WAD) as i128)
        );
        assert!(cooler.debt_delta_for_max_origination_ltv(&ALICE, -(101 * WAD as i128), 1).is_err());
    }
}

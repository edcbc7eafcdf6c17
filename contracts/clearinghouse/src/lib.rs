//! Clearinghouse - Fixed-Term Collateralized Loans
//!
//! Issues discrete loans of the treasury's debt token against governance
//! token collateral. Unlike the MonoCooler market there is no running
//! accumulator: each loan is sized by a static loan-to-collateral ratio and
//! carries its full-term interest from the moment it is issued.
//!
//! ## Core Operations
//!
//! - **lend_to_cooler**: Lock collateral, fund the borrower, book receivables
//! - **repay_loan**: Pay interest then principal, release collateral pro rata
//! - **extend_loan**: Pay extension interest up front, push expiry out
//! - **claim_defaulted**: Sweep expired loans, burn collateral, reward keeper
//!
//! ## Loan Lifecycle
//!
//! ```text
//! Active --repay in full--> Repaid
//!   |
//!   +--expiry passes, keeper claims--> Defaulted
//! ```
//!
//! Keepers earn a reward in collateral that ramps linearly over the first
//! seven days after expiry, capped per loan.

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod loan;


use cooler_common::{
    capabilities::{CollateralCustody, GovernanceToken, TreasuryFunding},
    constants::{
        clearinghouse::{
            DEFAULT_DURATION, DEFAULT_INTEREST_RATE_BPS, DEFAULT_LOAN_TO_COLLATERAL, MAX_EXTENSIONS,
            MAX_REWARD_PER_LOAN,
        },
        interest::MAX_INTEREST_RATE_BPS,
    },
    errors::{CoolerError, CoolerResult},
    events::{CoolerEvent, EventLog},
    math::{safe_add, safe_sub},
    types::{ensure_address, ensure_amount, Address, LoanId},
};

pub use loan::{DiscreteLoan, LoanStatus, Repayment};

// ============ Configuration ============

/// Reserve the debt token is drawn from, fixed when the clearinghouse is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum ReserveToken {
    Dai,
    Usds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ClearinghouseConfig {
    /// Debt issued per unit of collateral (WAD)
    pub loan_to_collateral: u128,
    /// Annual simple interest, basis points
    pub interest_rate_bps: u64,
    /// Loan term in seconds
    pub duration: u64,
    /// Keeper reward cap per defaulted loan, in collateral
    pub max_reward_per_loan: u128,
    pub reserve: ReserveToken,
}

impl Default for ClearinghouseConfig {
    fn default() -> Self {
        Self {
            loan_to_collateral: DEFAULT_LOAN_TO_COLLATERAL,
            interest_rate_bps: DEFAULT_INTEREST_RATE_BPS,
            duration: DEFAULT_DURATION,
            max_reward_per_loan: MAX_REWARD_PER_LOAN,
            reserve: ReserveToken::Usds,
        }
    }
}

impl ClearinghouseConfig {
    pub fn validate(&self) -> CoolerResult<()> {
        if self.loan_to_collateral == 0 {
            return Err(CoolerError::InvalidParam {
                param: "loan_to_collateral",
                reason: "must be non-zero",
            });
        }
        if self.interest_rate_bps > MAX_INTEREST_RATE_BPS {
            return Err(CoolerError::InvalidParam {
                param: "interest_rate_bps",
                reason: "above maximum",
            });
        }
        if self.duration == 0 {
            return Err(CoolerError::InvalidParam {
                param: "duration",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }
}

// ============ State ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ClearinghouseState {
    pub config: ClearinghouseConfig,
    pub active: bool,
    pub loans: BTreeMap<LoanId, DiscreteLoan>,
    pub next_loan_id: LoanId,
    /// Outstanding principal across active loans
    pub principal_receivables: u128,
    /// Outstanding interest across active loans
    pub interest_receivables: u128,
}

/// Totals of one `claim_defaulted` sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultClaim {
    pub total_principal: u128,
    pub total_interest: u128,
    pub total_collateral: u128,
    pub keeper_reward: u128,
}

// ============ Clearinghouse ============

pub struct Clearinghouse<T, G>
where
    T: TreasuryFunding + Clone,
    G: GovernanceToken + CollateralCustody + Clone,
{
    state: ClearinghouseState,
    treasury: T,
    collateral_token: G,
    events: EventLog,
    entered: bool,
}

impl<T, G> Clearinghouse<T, G>
where
    T: TreasuryFunding + Clone,
    G: GovernanceToken + CollateralCustody + Clone,
{
    /// Create an active clearinghouse
    pub fn new(config: ClearinghouseConfig, treasury: T, collateral_token: G, now: u64) -> CoolerResult<Self> {
        config.validate()?;
        let mut events = EventLog::new();
        events.emit(CoolerEvent::ClearinghouseActivated { timestamp: now });
        Ok(Self {
            state: ClearinghouseState {
                config,
                active: true,
                loans: BTreeMap::new(),
                next_loan_id: 0,
                principal_receivables: 0,
                interest_receivables: 0,
            },
            treasury,
            collateral_token,
            events,
            entered: false,
        })
    }

    /// Run `f` atomically: state, capabilities and events roll back on error
    fn transact<R>(&mut self, f: impl FnOnce(&mut Self) -> CoolerResult<R>) -> CoolerResult<R> {
        if self.entered {
            return Err(CoolerError::Reentrancy);
        }
        self.entered = true;
        let state = self.state.clone();
        let treasury = self.treasury.clone();
        let collateral_token = self.collateral_token.clone();
        let mark = self.events.len();

        let result = f(self);
        if result.is_err() {
            self.state = state;
            self.treasury = treasury;
            self.collateral_token = collateral_token;
            self.events.truncate(mark);
        }
        self.entered = false;
        result
    }

    fn loan_mut(&mut self, loan_id: LoanId) -> CoolerResult<&mut DiscreteLoan> {
        self.state
            .loans
            .get_mut(&loan_id)
            .ok_or(CoolerError::LoanNotFound { loan_id })
    }

    // ============ Lending ============

    /// Lend `amount` to `borrower` for one term; returns the new loan id
    pub fn lend_to_cooler(&mut self, borrower: &Address, amount: u128, now: u64) -> CoolerResult<LoanId> {
        if !self.state.active {
            return Err(CoolerError::Inactive);
        }
        ensure_address(borrower, "borrower cannot be zero address")?;
        ensure_amount(amount)?;

        let collateral = self.collateral_for_loan(amount)?;
        let interest = self.interest_for_loan(amount, self.state.config.duration)?;
        let duration = self.state.config.duration;
        let expiry = now.checked_add(duration).ok_or(CoolerError::Overflow)?;

        self.transact(|house| {
            let loan_id = house.state.next_loan_id;
            house.state.next_loan_id = loan_id.checked_add(1).ok_or(CoolerError::Overflow)?;
            house.state.loans.insert(
                loan_id,
                DiscreteLoan {
                    id: loan_id,
                    borrower: *borrower,
                    principal: amount,
                    interest_due: interest,
                    collateral,
                    duration,
                    interest_rate_bps: house.state.config.interest_rate_bps,
                    expiry,
                    status: LoanStatus::Active,
                },
            );
            house.state.principal_receivables = safe_add(house.state.principal_receivables, amount)?;
            house.state.interest_receivables = safe_add(house.state.interest_receivables, interest)?;

            house.events.emit(CoolerEvent::LoanOriginated {
                loan_id,
                borrower: *borrower,
                principal: amount,
                interest,
                collateral,
                expiry,
                timestamp: now,
            });

            house.collateral_token.transfer_in(borrower, collateral)?;
            house.treasury.fund_from_treasury(amount, borrower)?;
            Ok(loan_id)
        })
    }

    /// Repay up to `amount` of a loan from `payer`
    ///
    /// Released collateral goes back to the borrower.
    pub fn repay_loan(&mut self, payer: &Address, loan_id: LoanId, amount: u128, now: u64) -> CoolerResult<Repayment> {
        ensure_amount(amount)?;

        self.transact(|house| {
            let loan = house.loan_mut(loan_id)?;
            if !loan.is_active() {
                return Err(CoolerError::LoanNotActive { loan_id });
            }
            if now > loan.expiry {
                return Err(CoolerError::LoanExpired { loan_id, expiry: loan.expiry });
            }
            let repayment = loan::apply_repayment(loan, amount)?;
            let borrower = loan.borrower;

            house.state.interest_receivables =
                house.state.interest_receivables.saturating_sub(repayment.interest_paid);
            house.state.principal_receivables =
                house.state.principal_receivables.saturating_sub(repayment.principal_paid);

            let paid = safe_add(repayment.interest_paid, repayment.principal_paid)?;
            house.events.emit(CoolerEvent::LoanRepaid {
                loan_id,
                payer: *payer,
                amount: paid,
                collateral_released: repayment.collateral_released,
                timestamp: now,
            });

            house.treasury.repay_to_treasury(paid, payer)?;
            if repayment.collateral_released > 0 {
                house.collateral_token.transfer_out(&borrower, repayment.collateral_released)?;
            }
            Ok(repayment)
        })
    }

    /// Extend a loan by `times` terms; `payer` pays the extra interest now.
    ///
    /// Principal and outstanding interest are unchanged.
    pub fn extend_loan(&mut self, payer: &Address, loan_id: LoanId, times: u8, now: u64) -> CoolerResult<u128> {
        if times == 0 || times > MAX_EXTENSIONS {
            return Err(CoolerError::InvalidParam {
                param: "times",
                reason: "out of range",
            });
        }

        self.transact(|house| {
            let loan = house.loan_mut(loan_id)?;
            if !loan.is_active() {
                return Err(CoolerError::LoanNotActive { loan_id });
            }
            if now > loan.expiry {
                return Err(CoolerError::LoanExpired { loan_id, expiry: loan.expiry });
            }

            let extension = loan.duration.checked_mul(times as u64).ok_or(CoolerError::Overflow)?;
            let interest = loan::interest_for_loan(loan.principal, loan.interest_rate_bps, extension)?;
            loan.expiry = loan.expiry.checked_add(extension).ok_or(CoolerError::Overflow)?;
            let new_expiry = loan.expiry;

            house.events.emit(CoolerEvent::LoanExtended {
                loan_id,
                times,
                interest_paid: interest,
                new_expiry,
                timestamp: now,
            });

            if interest > 0 {
                house.treasury.repay_to_treasury(interest, payer)?;
            }
            Ok(interest)
        })
    }

    /// Claim every listed loan that has expired unpaid
    ///
    /// The seized collateral is burned except for the keeper reward, which
    /// is paid to `keeper`. Fails on the first loan that is not in default.
    pub fn claim_defaulted(&mut self, keeper: &Address, loan_ids: &[LoanId], now: u64) -> CoolerResult<DefaultClaim> {
        ensure_address(keeper, "keeper cannot be zero address")?;
        if loan_ids.is_empty() {
            return Err(CoolerError::InvalidParam {
                param: "loan_ids",
                reason: "empty batch",
            });
        }

        self.transact(|house| {
            let max_reward = house.state.config.max_reward_per_loan;
            let mut claim = DefaultClaim::default();

            for &loan_id in loan_ids {
                let loan = house.loan_mut(loan_id)?;
                if !loan.is_defaulted_at(now) {
                    return Err(CoolerError::LoanNotDefaulted { loan_id, expiry: loan.expiry });
                }
                let reward = loan::keeper_reward(loan.collateral, max_reward, now - loan.expiry)?;

                claim.total_principal = safe_add(claim.total_principal, loan.principal)?;
                claim.total_interest = safe_add(claim.total_interest, loan.interest_due)?;
                claim.total_collateral = safe_add(claim.total_collateral, loan.collateral)?;
                claim.keeper_reward = safe_add(claim.keeper_reward, reward)?;
                loan.status = LoanStatus::Defaulted;
            }

            house.state.principal_receivables =
                house.state.principal_receivables.saturating_sub(claim.total_principal);
            house.state.interest_receivables =
                house.state.interest_receivables.saturating_sub(claim.total_interest);

            let to_burn = safe_sub(claim.total_collateral, claim.keeper_reward)?;
            house.events.emit(CoolerEvent::DefaultClaimed {
                keeper: *keeper,
                loans: loan_ids.len() as u32,
                collateral_burned: to_burn,
                keeper_reward: claim.keeper_reward,
                timestamp: now,
            });

            if to_burn > 0 {
                house.collateral_token.burn_governance_token(to_burn)?;
            }
            if claim.keeper_reward > 0 {
                house.collateral_token.transfer_out(keeper, claim.keeper_reward)?;
            }
            Ok(claim)
        })
    }

    // ============ Admin ============

    /// Stop issuing new loans. Repayment, extension and default claims continue.
    pub fn emergency_shutdown(&mut self, now: u64) -> CoolerResult<()> {
        if !self.state.active {
            return Err(CoolerError::Inactive);
        }
        self.state.active = false;
        self.events.emit(CoolerEvent::ClearinghouseShutdown { timestamp: now });
        Ok(())
    }

    pub fn activate(&mut self, now: u64) -> CoolerResult<()> {
        if self.state.active {
            return Err(CoolerError::InvalidParam {
                param: "active",
                reason: "already active",
            });
        }
        self.state.active = true;
        self.events.emit(CoolerEvent::ClearinghouseActivated { timestamp: now });
        Ok(())
    }

    // ============ Views ============

    /// Interest on `principal` for `duration` seconds at the current rate
    pub fn interest_for_loan(&self, principal: u128, duration: u64) -> CoolerResult<u128> {
        loan::interest_for_loan(principal, self.state.config.interest_rate_bps, duration)
    }

    pub fn collateral_for_loan(&self, principal: u128) -> CoolerResult<u128> {
        loan::collateral_for_loan(principal, self.state.config.loan_to_collateral)
    }

    /// Reward a keeper would earn claiming `loan_id` at `now`; 0 if not in default
    pub fn keeper_reward_for(&self, loan_id: LoanId, now: u64) -> CoolerResult<u128> {
        match self.state.loans.get(&loan_id) {
            Some(loan) if loan.is_defaulted_at(now) => {
                loan::keeper_reward(loan.collateral, self.state.config.max_reward_per_loan, now - loan.expiry)
            }
            Some(_) => Ok(0),
            None => Err(CoolerError::LoanNotFound { loan_id }),
        }
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&DiscreteLoan> {
        self.state.loans.get(&loan_id)
    }

    pub fn loans_of(&self, borrower: &Address) -> Vec<&DiscreteLoan> {
        self.state.loans.values().filter(|l| &l.borrower == borrower).collect()
    }

    /// Outstanding principal and interest
    pub fn receivables(&self) -> u128 {
        self.state.principal_receivables.saturating_add(self.state.interest_receivables)
    }

    pub fn principal_receivables(&self) -> u128 {
        self.state.principal_receivables
    }

    pub fn interest_receivables(&self) -> u128 {
        self.state.interest_receivables
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn reserve(&self) -> ReserveToken {
        self.state.config.reserve
    }

    pub fn config(&self) -> &ClearinghouseConfig {
        &self.state.config
    }

    pub fn state(&self) -> &ClearinghouseState {
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

//! Interest Accumulator
//!
//! A RAY-precision index tracking how much one unit of debt has grown since
//! the market opened. Accounts store a debt checkpoint together with the
//! index value at that moment, so interest accrues lazily without touching
//! every account.
//!
//! ## Refresh Rule
//!
//! ```text
//! elapsed     = now - last_updated_at
//! new_acc     = old_acc * e^(rate * elapsed / year)
//! total_debt  = ceil(total_debt * new_acc / old_acc)
//! ```
//!
//! A refresh at the same (or an earlier) timestamp changes nothing.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    constants::precision::RAY,
    errors::CoolerResult,
    math::{continuously_compounded, mul_div_up, safe_add, safe_sub},
};

/// Aggregate debt and the global interest index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GlobalDebtState {
    /// Outstanding debt as of `last_updated_at`
    pub total_debt: u128,
    /// Collateral held across all accounts
    pub total_collateral: u128,
    /// Global interest index (RAY, 1e27 = no growth yet)
    pub interest_accumulator_ray: u128,
    /// Timestamp of the last refresh
    pub last_updated_at: u64,
}

impl GlobalDebtState {
    /// Fresh market with no debt, starting at `now`
    pub fn new(now: u64) -> Self {
        Self {
            total_debt: 0,
            total_collateral: 0,
            interest_accumulator_ray: RAY,
            last_updated_at: now,
        }
    }

    /// Refreshed copy of the state at `now`, without persisting it
    pub fn preview(&self, rate_wad: u128, now: u64) -> CoolerResult<Self> {
        let elapsed = now.saturating_sub(self.last_updated_at);
        if elapsed == 0 {
            return Ok(*self);
        }

        let old_acc = self.interest_accumulator_ray;
        let new_acc = continuously_compounded(old_acc, rate_wad, elapsed)?;

        let total_debt = if self.total_debt == 0 {
            0
        } else {
            mul_div_up(self.total_debt, new_acc, old_acc)?
        };

        Ok(Self {
            total_debt,
            total_collateral: self.total_collateral,
            interest_accumulator_ray: new_acc,
            last_updated_at: now,
        })
    }

    /// Accrue interest up to `now` and persist it
    pub fn refresh(&mut self, rate_wad: u128, now: u64) -> CoolerResult<()> {
        *self = self.preview(rate_wad, now)?;
        Ok(())
    }

    pub fn add_debt(&mut self, amount: u128) -> CoolerResult<()> {
        self.total_debt = safe_add(self.total_debt, amount)?;
        Ok(())
    }

    /// Reduce aggregate debt, floored at zero
    ///
    /// Account debts round up while the aggregate does not, so the last
    /// repayments can exceed `total_debt` by dust.
    pub fn reduce_debt(&mut self, amount: u128) {
        self.total_debt = self.total_debt.saturating_sub(amount);
    }

    pub fn add_collateral(&mut self, amount: u128) -> CoolerResult<()> {
        self.total_collateral = safe_add(self.total_collateral, amount)?;
        Ok(())
    }

    pub fn remove_collateral(&mut self, amount: u128) -> CoolerResult<()> {
        self.total_collateral = safe_sub(self.total_collateral, amount)?;
        Ok(())
    }
}

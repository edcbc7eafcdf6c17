//! Discrete Loans
//!
//! Fixed-term loan records and the pricing rules shared by origination,
//! extension and default.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    constants::clearinghouse::{REWARD_BPS, REWARD_RAMP},
    errors::CoolerResult,
    math::{apply_bps, div_wad_up, mul_div_down, simple_interest_up},
    types::{Address, LoanId},
};

/// Loan lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LoanStatus {
    Active,
    Repaid,
    Defaulted,
}

/// One fixed-term loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DiscreteLoan {
    pub id: LoanId,
    pub borrower: Address,
    /// Outstanding principal
    pub principal: u128,
    /// Interest owed before any principal is repaid
    pub interest_due: u128,
    /// Collateral in custody backing the loan
    pub collateral: u128,
    /// Term length in seconds, reused by extensions
    pub duration: u64,
    /// Rate fixed at origination
    pub interest_rate_bps: u64,
    pub expiry: u64,
    pub status: LoanStatus,
}

impl DiscreteLoan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Active and past expiry
    pub fn is_defaulted_at(&self, now: u64) -> bool {
        self.is_active() && now > self.expiry
    }

    /// Principal plus interest still owed
    pub fn amount_owed(&self) -> u128 {
        self.principal.saturating_add(self.interest_due)
    }
}

/// Split of a repayment between interest and principal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repayment {
    pub interest_paid: u128,
    pub principal_paid: u128,
    pub collateral_released: u128,
}

/// Apply `amount` to `loan`: interest first, then principal.
///
/// Collateral is released pro rata to the principal repaid; repaying the
/// full principal releases all of it and closes the loan. `amount` above
/// what is owed is capped.
pub fn apply_repayment(loan: &mut DiscreteLoan, amount: u128) -> CoolerResult<Repayment> {
    let amount = amount.min(loan.amount_owed());
    if amount <= loan.interest_due {
        loan.interest_due -= amount;
        return Ok(Repayment { interest_paid: amount, ..Default::default() });
    }

    let interest_paid = loan.interest_due;
    let principal_paid = amount - interest_paid;
    let collateral_released = if principal_paid == loan.principal {
        loan.collateral
    } else {
        mul_div_down(loan.collateral, principal_paid, loan.principal)?
    };

    loan.interest_due = 0;
    loan.principal -= principal_paid;
    loan.collateral -= collateral_released;
    if loan.principal == 0 {
        loan.status = LoanStatus::Repaid;
    }

    Ok(Repayment { interest_paid, principal_paid, collateral_released })
}

/// Simple interest on `principal` for `duration` seconds, rounded up
pub fn interest_for_loan(principal: u128, interest_rate_bps: u64, duration: u64) -> CoolerResult<u128> {
    simple_interest_up(principal, interest_rate_bps, duration)
}

/// Collateral needed for `principal` at `loan_to_collateral` (WAD), rounded up
pub fn collateral_for_loan(principal: u128, loan_to_collateral: u128) -> CoolerResult<u128> {
    div_wad_up(principal, loan_to_collateral)
}

/// Keeper reward for sweeping a loan `elapsed` seconds after it expired.
///
/// Capped at the lesser of `max_reward_per_loan` and 5% of the collateral,
/// ramping linearly from zero to the cap over seven days.
pub fn keeper_reward(collateral: u128, max_reward_per_loan: u128, elapsed: u64) -> CoolerResult<u128> {
    let cap = apply_bps(collateral, REWARD_BPS)?.min(max_reward_per_loan);
    if elapsed >= REWARD_RAMP {
        return Ok(cap);
    }
    mul_div_down(cap, elapsed as u128, REWARD_RAMP as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooler_common::constants::{precision::WAD, time::ONE_DAY};

    fn create_test_loan() -> DiscreteLoan {
        DiscreteLoan {
            id: 0,
            borrower: [1u8; 32],
            principal: 1_000 * WAD,
            interest_due: 10 * WAD,
            collateral: 4 * WAD,
            duration: 121 * ONE_DAY,
            interest_rate_bps: 50,
            expiry: 121 * ONE_DAY,
            status: LoanStatus::Active,
        }
    }

    #[test]
    fn test_repayment_pays_interest_first() {
        let mut loan = create_test_loan();

        let repayment = apply_repayment(&mut loan, 6 * WAD).unwrap();
        assert_eq!(repayment.interest_paid, 6 * WAD);
        assert_eq!(repayment.collateral_released, 0);
        assert_eq!(loan.interest_due, 4 * WAD);

        // 4 interest + 250 principal releases a quarter of the collateral
        let repayment = apply_repayment(&mut loan, 254 * WAD).unwrap();
        assert_eq!(repayment.interest_paid, 4 * WAD);
        assert_eq!(repayment.principal_paid, 250 * WAD);
        assert_eq!(repayment.collateral_released, WAD);
        assert_eq!(loan.principal, 750 * WAD);
        assert!(loan.is_active());
    }

    #[test]
    fn test_full_repayment_closes_loan() {
        let mut loan = create_test_loan();

        let repayment = apply_repayment(&mut loan, u128::MAX).unwrap();

        assert_eq!(repayment.interest_paid, 10 * WAD);
        assert_eq!(repayment.principal_paid, 1_000 * WAD);
        assert_eq!(repayment.collateral_released, 4 * WAD);
        assert_eq!(loan.status, LoanStatus::Repaid);
        assert_eq!(loan.amount_owed(), 0);
    }

    #[test]
    fn test_default_boundary() {
        let loan = create_test_loan();
        assert!(!loan.is_defaulted_at(loan.expiry));
        assert!(loan.is_defaulted_at(loan.expiry + 1));
    }

    #[test]
    fn test_collateral_rounds_up() {
        assert_eq!(collateral_for_loan(2_889 * WAD, 2_889 * WAD).unwrap(), WAD);
        assert_eq!(collateral_for_loan(1, 2_889 * WAD).unwrap(), 1);
    }

    #[test]
    fn test_interest_rounds_up() {
        let year = cooler_common::constants::time::SECONDS_PER_YEAR;
        assert_eq!(interest_for_loan(1_000 * WAD, 50, year).unwrap(), 5 * WAD);
        // A dust loan still owes one unit
        assert_eq!(interest_for_loan(1, 50, year).unwrap(), 1);
    }

    #[test]
    fn test_keeper_reward_ramp() {
        let collateral = 100 * WAD;
        let max = WAD / 10;

        assert_eq!(keeper_reward(collateral, max, 0).unwrap(), 0);
        assert_eq!(keeper_reward(collateral, max, REWARD_RAMP / 2).unwrap(), WAD / 20);
        assert_eq!(keeper_reward(collateral, max, REWARD_RAMP).unwrap(), max);
        assert_eq!(keeper_reward(collateral, max, 30 * ONE_DAY).unwrap(), max);

        // Small loans are capped at 5% of their collateral
        assert_eq!(keeper_reward(WAD, max, REWARD_RAMP).unwrap(), WAD / 20);
    }
}

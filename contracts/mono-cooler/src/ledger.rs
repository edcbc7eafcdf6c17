//! Account Ledger
//!
//! Per-account collateral and debt checkpoints. Debt is stored as a
//! checkpoint plus the global index at the time it was taken:
//!
//! ```text
//! current_debt = checkpoint * global_acc / account_acc
//! ```
//!
//! Rounded up whenever the account owes the amount (repay, LTV checks,
//! liquidation), down when crediting a new borrow.

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    constants::precision::RAY,
    errors::CoolerResult,
    math::{mul_div_down, mul_div_up},
    types::Address,
};

/// Collateral and debt checkpoint for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccountState {
    /// Collateral held for the account
    pub collateral: u128,
    /// Debt as of `interest_accumulator_ray`
    pub debt_checkpoint: u128,
    /// Global index when the checkpoint was taken
    pub interest_accumulator_ray: u128,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            collateral: 0,
            debt_checkpoint: 0,
            interest_accumulator_ray: RAY,
        }
    }
}

impl AccountState {
    /// Debt at `global_acc`; zero checkpoint means zero debt
    pub fn current_debt(&self, global_acc: u128, round_up: bool) -> CoolerResult<u128> {
        if self.debt_checkpoint == 0 {
            return Ok(0);
        }
        if global_acc == self.interest_accumulator_ray {
            return Ok(self.debt_checkpoint);
        }
        if round_up {
            mul_div_up(self.debt_checkpoint, global_acc, self.interest_accumulator_ray)
        } else {
            mul_div_down(self.debt_checkpoint, global_acc, self.interest_accumulator_ray)
        }
    }

    /// Record `new_debt` as of `global_acc`
    ///
    /// Only valid right after the global index was refreshed.
    pub fn checkpoint(&mut self, new_debt: u128, global_acc: u128) {
        self.debt_checkpoint = new_debt;
        self.interest_accumulator_ray = global_acc;
    }

    pub fn has_debt(&self) -> bool {
        self.debt_checkpoint > 0
    }

    /// No collateral and no debt
    pub fn is_empty(&self) -> bool {
        self.collateral == 0 && self.debt_checkpoint == 0
    }
}

/// Account positions keyed by address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccountLedger {
    accounts: BTreeMap<Address, AccountState>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position for `account`, empty if it has none
    pub fn get(&self, account: &Address) -> AccountState {
        self.accounts.get(account).copied().unwrap_or_default()
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.accounts.contains_key(account)
    }

    /// Store a position; empty positions are dropped
    pub fn set(&mut self, account: &Address, state: AccountState) {
        if state.is_empty() {
            self.accounts.remove(account);
        } else {
            self.accounts.insert(*account, state);
        }
    }

    pub fn current_debt(&self, account: &Address, global_acc: u128, round_up: bool) -> CoolerResult<u128> {
        self.get(account).current_debt(global_acc, round_up)
    }

    /// Checkpoint `account` at `new_debt`, creating it if needed
    pub fn checkpoint(&mut self, account: &Address, new_debt: u128, global_acc: u128) {
        let mut state = self.get(account);
        state.checkpoint(new_debt, global_acc);
        self.set(account, state);
    }

    pub fn collateral_of(&self, account: &Address) -> u128 {
        self.get(account).collateral
    }

    /// Delete a position, returning what it held
    pub fn remove(&mut self, account: &Address) -> AccountState {
        self.accounts.remove(account).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.accounts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooler_common::constants::precision::WAD;

    const ALICE: Address = [1u8; 32];

    #[test]
    fn test_zero_checkpoint_has_zero_debt() {
        let state = AccountState { collateral: WAD, ..Default::default() };
        assert_eq!(state.current_debt(RAY * 2, true).unwrap(), 0);
    }

    #[test]
    fn test_round_up_never_below_round_down() {
        let state = AccountState {
            collateral: 0,
            debt_checkpoint: 1_000_000_007,
            interest_accumulator_ray: RAY,
        };
        // 1.0000000003x growth forces a fractional result
        let global_acc = RAY + 300_000_000_000_000_000;
        let up = state.current_debt(global_acc, true).unwrap();
        let down = state.current_debt(global_acc, false).unwrap();
        assert!(up >= down);
        assert_eq!(up - down, 1);
    }

    #[test]
    fn test_ledger_checkpoint_and_remove() {
        let mut ledger = AccountLedger::new();
        assert_eq!(ledger.get(&ALICE), AccountState::default());

        ledger.checkpoint(&ALICE, 500, RAY);
        assert!(ledger.contains(&ALICE));
        assert_eq!(ledger.current_debt(&ALICE, RAY * 2, true).unwrap(), 1_000);

        let removed = ledger.remove(&ALICE);
        assert_eq!(removed.debt_checkpoint, 500);
        assert!(!ledger.contains(&ALICE));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_full_payoff_drops_empty_position() {
        let mut ledger = AccountLedger::new();
        ledger.checkpoint(&ALICE, 500, RAY);
        ledger.checkpoint(&ALICE, 0, RAY);
        assert!(!ledger.contains(&ALICE));
    }
}

//! Collateral Delegation Tracker
//!
//! Splits each account's collateral into an undelegated balance and amounts
//! delegated to voting delegates. Delegated collateral sits in a per-delegate
//! escrow whose id is the SHA-256 of the delegate address.
//!
//! ## Rules
//!
//! - `total_delegated + undelegated` always equals the account's collateral
//! - Withdrawals draw only from the undelegated balance, optionally
//!   rescinding a bounded number of delegations first
//! - Each account may delegate to at most `max_delegate_addresses` distinct
//!   delegates (default 10, adjustable per account)
//! - Every public mutation is all-or-nothing

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    capabilities::DelegationLedger,
    constants::delegation::{DEFAULT_MAX_DELEGATE_ADDRESSES, MAX_DELEGATE_ADDRESSES_LIMIT},
    errors::{CoolerError, CoolerResult},
    math::{safe_add, safe_sub},
    types::{derive_id, ensure_address, Address, DelegationRequest, DelegationResult},
};

// ============ State ============

/// Delegation bookkeeping for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccountDelegations {
    /// Collateral free to withdraw or delegate
    pub undelegated: u128,
    /// Sum of `delegations`
    pub total_delegated: u128,
    /// Delegate => amount
    pub delegations: BTreeMap<Address, u128>,
    /// Per-account override of the delegate cap
    pub max_delegate_addresses: Option<u32>,
}

impl AccountDelegations {
    fn is_empty(&self) -> bool {
        self.undelegated == 0 && self.delegations.is_empty() && self.max_delegate_addresses.is_none()
    }
}

/// Escrow holding collateral delegated to one delegate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DelegateEscrow {
    pub escrow_id: [u8; 32],
    pub total: u128,
    /// Account => amount held for it
    pub deposits: BTreeMap<Address, u128>,
}

impl DelegateEscrow {
    fn new(delegate: &Address) -> Self {
        Self {
            escrow_id: escrow_id(delegate),
            total: 0,
            deposits: BTreeMap::new(),
        }
    }
}

/// Escrow identifier for `delegate`
pub fn escrow_id(delegate: &Address) -> [u8; 32] {
    derive_id(&[delegate])
}

/// Delegation ledger for every account in the market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DelegationTracker {
    accounts: BTreeMap<Address, AccountDelegations>,
    escrows: BTreeMap<Address, DelegateEscrow>,
    default_max_delegate_addresses: u32,
}

impl Default for DelegationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELEGATE_ADDRESSES)
    }
}

impl DelegationTracker {
    pub fn new(default_max_delegate_addresses: u32) -> Self {
        Self {
            accounts: BTreeMap::new(),
            escrows: BTreeMap::new(),
            default_max_delegate_addresses,
        }
    }

    // ============ Views ============

    pub fn undelegated_balance(&self, account: &Address) -> u128 {
        self.accounts.get(account).map(|a| a.undelegated).unwrap_or(0)
    }

    pub fn total_delegated(&self, account: &Address) -> u128 {
        self.accounts.get(account).map(|a| a.total_delegated).unwrap_or(0)
    }

    /// Delegates and amounts for `account`, ordered by delegate
    pub fn account_delegations(&self, account: &Address) -> Vec<(Address, u128)> {
        self.accounts
            .get(account)
            .map(|a| a.delegations.iter().map(|(d, amount)| (*d, *amount)).collect())
            .unwrap_or_default()
    }

    pub fn num_delegate_addresses(&self, account: &Address) -> u32 {
        self.accounts
            .get(account)
            .map(|a| a.delegations.len() as u32)
            .unwrap_or(0)
    }

    /// Delegate cap for `account`, override first
    pub fn max_delegate_addresses(&self, account: &Address) -> u32 {
        self.accounts
            .get(account)
            .and_then(|a| a.max_delegate_addresses)
            .unwrap_or(self.default_max_delegate_addresses)
    }

    /// Collateral held in `delegate`'s escrow across all accounts
    pub fn escrow_balance(&self, delegate: &Address) -> u128 {
        self.escrows.get(delegate).map(|e| e.total).unwrap_or(0)
    }

    pub fn escrow(&self, delegate: &Address) -> Option<&DelegateEscrow> {
        self.escrows.get(delegate)
    }

    // ============ Admin ============

    /// Override the delegate cap for one account
    pub fn set_max_delegate_addresses(&mut self, account: &Address, max: u32) -> CoolerResult<()> {
        ensure_address(account, "account cannot be zero address")?;
        if max > MAX_DELEGATE_ADDRESSES_LIMIT {
            return Err(CoolerError::InvalidParam {
                param: "max_delegate_addresses",
                reason: "above limit",
            });
        }
        self.accounts.entry(*account).or_default().max_delegate_addresses = Some(max);
        Ok(())
    }

    // ============ Liquidation ============

    /// Return every delegation of `account` to its undelegated balance
    pub fn rescind_all(&mut self, account: &Address) -> CoolerResult<u128> {
        self.atomically(|tracker| {
            let delegates: Vec<Address> = tracker
                .accounts
                .get(account)
                .map(|a| a.delegations.keys().copied().collect())
                .unwrap_or_default();

            let mut rescinded = 0u128;
            for delegate in delegates {
                rescinded = safe_add(rescinded, tracker.undelegate(account, &delegate, None)?)?;
            }
            Ok(rescinded)
        })
    }

    /// Drop all balances of `account`, rescinding first; returns the collateral released
    ///
    /// A per-account delegate cap override survives.
    pub fn remove_account(&mut self, account: &Address) -> CoolerResult<u128> {
        self.atomically(|tracker| {
            tracker.rescind_all(account)?;
            let released = match tracker.accounts.get_mut(account) {
                Some(state) => core::mem::take(&mut state.undelegated),
                None => 0,
            };
            tracker.prune(account);
            Ok(released)
        })
    }

    // ============ Internals ============

    fn atomically<R>(&mut self, f: impl FnOnce(&mut Self) -> CoolerResult<R>) -> CoolerResult<R> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    fn prune(&mut self, account: &Address) {
        if self.accounts.get(account).map(|a| a.is_empty()).unwrap_or(false) {
            self.accounts.remove(account);
        }
    }

    fn delegate(&mut self, account: &Address, delegate: &Address, amount: u128) -> CoolerResult<()> {
        let default_max = self.default_max_delegate_addresses;
        let state = self.accounts.entry(*account).or_default();

        if state.undelegated < amount {
            return Err(CoolerError::ExceededUndelegatedCollateralBalance {
                available: state.undelegated,
                requested: amount,
            });
        }

        if !state.delegations.contains_key(delegate) {
            let max = state.max_delegate_addresses.unwrap_or(default_max);
            let count = state.delegations.len() as u32 + 1;
            if count > max {
                return Err(CoolerError::TooManyDelegates { count, max });
            }
        }

        let current = state.delegations.get(delegate).copied().unwrap_or(0);
        state.delegations.insert(*delegate, safe_add(current, amount)?);
        state.total_delegated = safe_add(state.total_delegated, amount)?;
        state.undelegated -= amount;

        let escrow = self
            .escrows
            .entry(*delegate)
            .or_insert_with(|| DelegateEscrow::new(delegate));
        let held = escrow.deposits.get(account).copied().unwrap_or(0);
        escrow.deposits.insert(*account, safe_add(held, amount)?);
        escrow.total = safe_add(escrow.total, amount)?;
        Ok(())
    }

    /// Undelegate `amount` (everything when `None`); returns the amount moved
    fn undelegate(&mut self, account: &Address, delegate: &Address, amount: Option<u128>) -> CoolerResult<u128> {
        let delegated = self
            .accounts
            .get(account)
            .and_then(|a| a.delegations.get(delegate))
            .copied()
            .unwrap_or(0);
        if delegated == 0 {
            return Err(CoolerError::InvalidDelegateEscrow { delegate: *delegate });
        }

        let amount = match amount {
            None => delegated,
            Some(requested) if requested > delegated => {
                return Err(CoolerError::InsufficientBalance { available: delegated, requested });
            }
            Some(requested) => requested,
        };

        let escrow = self
            .escrows
            .get_mut(delegate)
            .ok_or(CoolerError::InvalidDelegateEscrow { delegate: *delegate })?;
        let held = escrow.deposits.get(account).copied().unwrap_or(0);
        let remaining_held = safe_sub(held, amount)?;
        if remaining_held == 0 {
            escrow.deposits.remove(account);
        } else {
            escrow.deposits.insert(*account, remaining_held);
        }
        escrow.total = safe_sub(escrow.total, amount)?;

        let state = self
            .accounts
            .get_mut(account)
            .ok_or(CoolerError::InvalidDelegateEscrow { delegate: *delegate })?;
        let remaining = delegated - amount;
        if remaining == 0 {
            state.delegations.remove(delegate);
        } else {
            state.delegations.insert(*delegate, remaining);
        }
        state.total_delegated = safe_sub(state.total_delegated, amount)?;
        state.undelegated = safe_add(state.undelegated, amount)?;
        Ok(amount)
    }
}

impl DelegationLedger for DelegationTracker {
    fn deposit_undelegated(&mut self, account: &Address, amount: u128) -> CoolerResult<()> {
        ensure_address(account, "account cannot be zero address")?;
        let state = self.accounts.entry(*account).or_default();
        state.undelegated = safe_add(state.undelegated, amount)?;
        Ok(())
    }

    fn withdraw_undelegated(
        &mut self,
        account: &Address,
        amount: u128,
        max_auto_rescind: u32,
    ) -> CoolerResult<u128> {
        self.atomically(|tracker| {
            let mut rescinded = 0u128;

            if tracker.undelegated_balance(account) < amount && max_auto_rescind > 0 {
                let candidates = tracker.account_delegations(account);
                for (delegate, delegated) in candidates.into_iter().take(max_auto_rescind as usize) {
                    let available = tracker.undelegated_balance(account);
                    if available >= amount {
                        break;
                    }
                    let needed = (amount - available).min(delegated);
                    rescinded = safe_add(rescinded, tracker.undelegate(account, &delegate, Some(needed))?)?;
                }
            }

            let available = tracker.undelegated_balance(account);
            if available < amount {
                return Err(CoolerError::ExceededUndelegatedCollateralBalance {
                    available,
                    requested: amount,
                });
            }
            if let Some(state) = tracker.accounts.get_mut(account) {
                state.undelegated -= amount;
            }
            tracker.prune(account);
            Ok(rescinded)
        })
    }

    fn apply_delegations(
        &mut self,
        account: &Address,
        requests: &[DelegationRequest],
    ) -> CoolerResult<DelegationResult> {
        self.atomically(|tracker| {
            let mut result = DelegationResult::default();

            for request in requests {
                ensure_address(&request.delegate, "delegate cannot be zero address")?;
                if request.amount == 0 {
                    return Err(CoolerError::InvalidParam {
                        param: "amount",
                        reason: "zero delegation request",
                    });
                }

                if request.amount > 0 {
                    let amount = request.amount as u128;
                    tracker.delegate(account, &request.delegate, amount)?;
                    result.total_delegated = safe_add(result.total_delegated, amount)?;
                } else {
                    let amount = if request.amount == i128::MIN {
                        None
                    } else {
                        Some(request.amount.unsigned_abs())
                    };
                    let moved = tracker.undelegate(account, &request.delegate, amount)?;
                    result.total_undelegated = safe_add(result.total_undelegated, moved)?;
                }
            }

            result.undelegated_balance = tracker.undelegated_balance(account);
            Ok(result)
        })
    }
}

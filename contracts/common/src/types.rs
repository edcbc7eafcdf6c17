//! Core Types for the Lending Core
//!
//! Identifiers and request types shared by the MonoCooler, the deposit
//! manager and the clearinghouse.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{CoolerError, CoolerResult};

/// Type alias for account/contract addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for asset identifiers
pub type AssetId = Address;

/// Type alias for receipt token identifiers
pub type ReceiptTokenId = [u8; 32];

/// Type alias for clearinghouse loan identifiers
pub type LoanId = u64;

/// The zero address, never a valid account, recipient or delegate
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Fail with `InvalidAddress` if `address` is the zero address
pub fn ensure_address(address: &Address, reason: &'static str) -> CoolerResult<()> {
    if *address == ZERO_ADDRESS {
        return Err(CoolerError::InvalidAddress { reason });
    }
    Ok(())
}

/// Fail with `ZeroAmount` if `amount` is zero
pub fn ensure_amount(amount: u128) -> CoolerResult<()> {
    if amount == 0 {
        return Err(CoolerError::ZeroAmount);
    }
    Ok(())
}

/// SHA-256 over the concatenated parts, used for escrow, receipt token and
/// other derived identifiers
pub fn derive_id(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

// ============ Delegation Types ============

/// A single change to an account's delegated collateral
///
/// Positive `amount` delegates undelegated collateral to `delegate`,
/// negative undelegates. `i128::MIN` undelegates everything held for that
/// delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DelegationRequest {
    /// Voting delegate receiving (or losing) collateral weight
    pub delegate: Address,
    /// Signed collateral delta
    pub amount: i128,
}

impl DelegationRequest {
    /// Delegate `amount` collateral to `delegate`
    pub fn delegate(delegate: Address, amount: u128) -> CoolerResult<Self> {
        Ok(Self { delegate, amount: Self::signed(amount)? })
    }

    /// Undelegate `amount` collateral from `delegate`
    pub fn undelegate(delegate: Address, amount: u128) -> CoolerResult<Self> {
        Ok(Self { delegate, amount: -Self::signed(amount)? })
    }

    fn signed(amount: u128) -> CoolerResult<i128> {
        i128::try_from(amount).map_err(|_| CoolerError::InvalidParam {
            param: "amount",
            reason: "exceeds i128::MAX",
        })
    }

    /// Undelegate everything held for `delegate`
    pub fn undelegate_all(delegate: Address) -> Self {
        Self { delegate, amount: i128::MIN }
    }

    /// True when this request only removes delegation
    pub fn is_undelegation(&self) -> bool {
        self.amount < 0
    }
}

/// Net effect of applying a batch of delegation requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelegationResult {
    /// Collateral newly delegated
    pub total_delegated: u128,
    /// Collateral returned to the undelegated balance
    pub total_undelegated: u128,
    /// Undelegated balance after the batch
    pub undelegated_balance: u128,
}

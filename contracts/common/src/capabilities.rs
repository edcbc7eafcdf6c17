//! Capability Interfaces
//!
//! Narrow traits for the collaborators the lending core calls out to. Each
//! component receives its capabilities at construction and never reaches
//! for global state.
//!
//! Implementations must be all-or-nothing: a call that returns `Err` has
//! changed nothing. Components rely on this to keep their own rollback
//! local.

use crate::errors::CoolerResult;
use crate::types::{Address, DelegationRequest, DelegationResult};

/// Reserve funding (treasury debt facility)
pub trait TreasuryFunding {
    /// Send `amount` of the debt token from the treasury to `recipient`
    fn fund_from_treasury(&mut self, amount: u128, recipient: &Address) -> CoolerResult<()>;

    /// Pull `amount` of the debt token from `payer` back into the treasury
    fn repay_to_treasury(&mut self, amount: u128, payer: &Address) -> CoolerResult<()>;
}

/// Governance token issuance
///
/// Burning is reserved for seized collateral; normal borrow and repay
/// never mint or burn.
pub trait GovernanceToken {
    fn mint_governance_token(&mut self, to: &Address, amount: u128) -> CoolerResult<()>;

    /// Burn `amount` of collateral currently held in protocol custody
    fn burn_governance_token(&mut self, amount: u128) -> CoolerResult<()>;
}

/// Collateral custody for deposited governance tokens
pub trait CollateralCustody {
    /// Move `amount` from `from` into protocol custody
    fn transfer_in(&mut self, from: &Address, amount: u128) -> CoolerResult<()>;

    /// Release `amount` from protocol custody to `to`
    fn transfer_out(&mut self, to: &Address, amount: u128) -> CoolerResult<()>;
}

/// Voting delegation ledger for deposited collateral
///
/// Must never allow more delegation than the account's undelegated balance.
pub trait DelegationLedger {
    /// Credit `amount` to the account's undelegated balance
    fn deposit_undelegated(&mut self, account: &Address, amount: u128) -> CoolerResult<()>;

    /// Debit `amount` from the undelegated balance, rescinding up to
    /// `max_auto_rescind` delegations first if it runs short. Returns the
    /// amount that had to be rescinded.
    fn withdraw_undelegated(
        &mut self,
        account: &Address,
        amount: u128,
        max_auto_rescind: u32,
    ) -> CoolerResult<u128>;

    /// Apply a batch of delegate/undelegate requests for `account`
    fn apply_delegations(
        &mut self,
        account: &Address,
        requests: &[DelegationRequest],
    ) -> CoolerResult<DelegationResult>;
}

/// ERC-4626 style yield-bearing vault
///
/// Share/asset conversions round in the vault's favour: `preview_withdraw`
/// rounds up, `preview_redeem` and `convert_to_assets` round down.
pub trait YieldVault {
    /// Deposit `assets`, minting shares to `receiver`. Returns shares minted.
    fn deposit(&mut self, assets: u128, receiver: &Address) -> CoolerResult<u128>;

    /// Withdraw exactly `assets` to `receiver`, burning shares from `owner`.
    /// Returns shares burned.
    fn withdraw(&mut self, assets: u128, receiver: &Address, owner: &Address) -> CoolerResult<u128>;

    /// Assets received for redeeming `shares` now
    fn preview_redeem(&self, shares: u128) -> u128;

    /// Shares burned to withdraw `assets` now
    fn preview_withdraw(&self, assets: u128) -> u128;

    fn convert_to_assets(&self, shares: u128) -> u128;

    /// Shares held by `owner`
    fn balance_of(&self, owner: &Address) -> u128;
}

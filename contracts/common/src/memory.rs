//! In-Memory Capabilities
//!
//! Ledger-backed implementations of the capability traits. Used by the
//! component test suites and by off-chain simulation of keeper flows.
//!
//! ## Key Features
//!
//! - **MemoryTreasury**: reserve pool with per-address debt token balances
//! - **MemoryGovernanceToken**: collateral token with protocol custody and burn
//! - **MemoryVault**: ERC-4626 share math with virtual offset and yield donation

use crate::capabilities::{CollateralCustody, GovernanceToken, TreasuryFunding, YieldVault};
use crate::errors::{CoolerError, CoolerResult};
use crate::math::{mul_div_down, mul_div_up, safe_add, safe_sub};
use crate::types::Address;
use crate::BTreeMap;

fn debit(
    balances: &mut BTreeMap<Address, u128>,
    owner: &Address,
    amount: u128,
) -> CoolerResult<()> {
    let available = balances.get(owner).copied().unwrap_or(0);
    if available < amount {
        return Err(CoolerError::InsufficientBalance { available, requested: amount });
    }
    let remaining = available - amount;
    if remaining == 0 {
        balances.remove(owner);
    } else {
        balances.insert(*owner, remaining);
    }
    Ok(())
}

fn credit(
    balances: &mut BTreeMap<Address, u128>,
    owner: &Address,
    amount: u128,
) -> CoolerResult<()> {
    let current = balances.get(owner).copied().unwrap_or(0);
    balances.insert(*owner, safe_add(current, amount)?);
    Ok(())
}

// ============ Treasury ============

/// Treasury reserve pool lending the debt token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTreasury {
    /// Debt token held by the treasury
    pub reserves: u128,
    /// Debt token held by everyone else
    pub balances: BTreeMap<Address, u128>,
    /// Net amount funded out and not yet repaid
    pub outstanding: u128,
}

impl MemoryTreasury {
    pub fn new(reserves: u128) -> Self {
        Self { reserves, ..Default::default() }
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Give `owner` debt tokens from outside the treasury (test faucet)
    pub fn mint_to(&mut self, owner: &Address, amount: u128) -> CoolerResult<()> {
        credit(&mut self.balances, owner, amount)
    }
}

impl TreasuryFunding for MemoryTreasury {
    fn fund_from_treasury(&mut self, amount: u128, recipient: &Address) -> CoolerResult<()> {
        if self.reserves < amount {
            return Err(CoolerError::InsufficientBalance {
                available: self.reserves,
                requested: amount,
            });
        }
        credit(&mut self.balances, recipient, amount)?;
        self.reserves -= amount;
        self.outstanding = safe_add(self.outstanding, amount)?;
        Ok(())
    }

    fn repay_to_treasury(&mut self, amount: u128, payer: &Address) -> CoolerResult<()> {
        let reserves = safe_add(self.reserves, amount)?;
        debit(&mut self.balances, payer, amount)?;
        self.reserves = reserves;
        self.outstanding = self.outstanding.saturating_sub(amount);
        Ok(())
    }
}

// ============ Governance Token ============

/// Governance token used as collateral, with a protocol custody balance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryGovernanceToken {
    pub total_supply: u128,
    /// Tokens held by the protocol on behalf of accounts
    pub custody: u128,
    pub balances: BTreeMap<Address, u128>,
    /// Cumulative amount burned
    pub burned: u128,
}

impl MemoryGovernanceToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }
}

impl GovernanceToken for MemoryGovernanceToken {
    fn mint_governance_token(&mut self, to: &Address, amount: u128) -> CoolerResult<()> {
        let supply = safe_add(self.total_supply, amount)?;
        credit(&mut self.balances, to, amount)?;
        self.total_supply = supply;
        Ok(())
    }

    fn burn_governance_token(&mut self, amount: u128) -> CoolerResult<()> {
        if self.custody < amount {
            return Err(CoolerError::InsufficientBalance {
                available: self.custody,
                requested: amount,
            });
        }
        self.custody -= amount;
        self.total_supply = safe_sub(self.total_supply, amount)?;
        self.burned = safe_add(self.burned, amount)?;
        Ok(())
    }
}

impl CollateralCustody for MemoryGovernanceToken {
    fn transfer_in(&mut self, from: &Address, amount: u128) -> CoolerResult<()> {
        let custody = safe_add(self.custody, amount)?;
        debit(&mut self.balances, from, amount)?;
        self.custody = custody;
        Ok(())
    }

    fn transfer_out(&mut self, to: &Address, amount: u128) -> CoolerResult<()> {
        if self.custody < amount {
            return Err(CoolerError::InsufficientBalance {
                available: self.custody,
                requested: amount,
            });
        }
        credit(&mut self.balances, to, amount)?;
        self.custody -= amount;
        Ok(())
    }
}

// ============ Yield Vault ============

/// ERC-4626 vault over a single asset
///
/// Conversions use a virtual share and asset of one so an empty vault
/// prices shares 1:1 and donations cannot inflate the first depositor away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryVault {
    pub total_assets: u128,
    pub total_shares: u128,
    /// Shares held per owner
    pub shares: BTreeMap<Address, u128>,
    /// Underlying asset paid out per receiver
    pub withdrawn: BTreeMap<Address, u128>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrue yield: assets grow without minting shares
    pub fn donate_yield(&mut self, amount: u128) -> CoolerResult<()> {
        self.total_assets = safe_add(self.total_assets, amount)?;
        Ok(())
    }

    /// Simulate a loss in the underlying strategy
    pub fn report_loss(&mut self, amount: u128) {
        self.total_assets = self.total_assets.saturating_sub(amount);
    }

    pub fn withdrawn_by(&self, receiver: &Address) -> u128 {
        self.withdrawn.get(receiver).copied().unwrap_or(0)
    }

    fn to_shares(&self, assets: u128, round_up: bool) -> CoolerResult<u128> {
        let supply = safe_add(self.total_shares, 1)?;
        let total = safe_add(self.total_assets, 1)?;
        if round_up {
            mul_div_up(assets, supply, total)
        } else {
            mul_div_down(assets, supply, total)
        }
    }

    fn to_assets(&self, shares: u128) -> u128 {
        // Saturates rather than fails; views never error
        mul_div_down(
            shares,
            self.total_assets.saturating_add(1),
            self.total_shares.saturating_add(1),
        )
        .unwrap_or(u128::MAX)
    }
}

impl YieldVault for MemoryVault {
    fn deposit(&mut self, assets: u128, receiver: &Address) -> CoolerResult<u128> {
        let minted = self.to_shares(assets, false)?;
        if minted == 0 {
            return Err(CoolerError::ZeroAmount);
        }
        let total_assets = safe_add(self.total_assets, assets)?;
        let total_shares = safe_add(self.total_shares, minted)?;
        credit(&mut self.shares, receiver, minted)?;
        self.total_assets = total_assets;
        self.total_shares = total_shares;
        Ok(minted)
    }

    fn withdraw(&mut self, assets: u128, receiver: &Address, owner: &Address) -> CoolerResult<u128> {
        let burned = self.to_shares(assets, true)?;
        if self.total_assets < assets {
            return Err(CoolerError::InsufficientBalance {
                available: self.total_assets,
                requested: assets,
            });
        }
        debit(&mut self.shares, owner, burned)?;
        credit(&mut self.withdrawn, receiver, assets)?;
        self.total_assets -= assets;
        self.total_shares = safe_sub(self.total_shares, burned)?;
        Ok(burned)
    }

    fn preview_redeem(&self, shares: u128) -> u128 {
        self.to_assets(shares)
    }

    fn preview_withdraw(&self, assets: u128) -> u128 {
        self.to_shares(assets, true).unwrap_or(u128::MAX)
    }

    fn convert_to_assets(&self, shares: u128) -> u128 {
        self.to_assets(shares)
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.shares.get(owner).copied().unwrap_or(0)
    }
}

//! Deposit Manager - Receipt Token Liability Ledger
//!
//! Operators (deposit facilities) deposit assets into a shared yield-bearing
//! vault on behalf of depositors and mint receipt tokens 1:1. The manager
//! tracks, per asset and operator, the receipt liabilities against the vault
//! shares held for that operator.
//!
//! ## Core Operations
//!
//! - **deposit**: Asset into the vault, receipt tokens out
//! - **withdraw**: Receipt tokens burned, asset out of the vault
//! - **claim_yield**: Operator sweeps vault growth above its liabilities
//! - **borrowing_withdraw / repay / default**: Operator lends deposits out
//!
//! ## Solvency
//!
//! ```text
//! shares_in_assets + borrowed >= liabilities
//! ```
//!
//! Checked after the state change, inside the same call. A claim or
//! borrowing withdrawal that breaks it fails with `Insolvent` and the vault
//! withdrawal is rolled back with everything else. Deposits, repayments and
//! withdrawals move assets in lockstep with liabilities or borrowings and
//! tolerate the one-unit share rounding of the vault, no more.

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod receipt;


use cooler_common::{
    capabilities::YieldVault,
    constants::deposit::{MAX_DEPOSIT_PERIOD_MONTHS, SOLVENCY_BUFFER},
    errors::{CoolerError, CoolerResult},
    events::{CoolerEvent, EventLog},
    math::{safe_add, safe_sub},
    types::{ensure_address, ensure_amount, Address, AssetId, ReceiptTokenId},
};

pub use receipt::{receipt_token_id, ReceiptLedger};

// ============ State ============

/// Per-asset configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AssetConfig {
    /// Ceiling on outstanding deposits across all operators
    pub deposit_cap: u128,
    /// Outstanding deposits across all operators
    pub total_deposited: u128,
}

/// Liabilities and backing of one operator for one asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OperatorPosition {
    /// Receipt tokens outstanding (1:1 with assets owed)
    pub liabilities: u128,
    /// Vault shares held for the operator
    pub shares: u128,
    /// Assets lent out by the operator and not yet returned
    pub borrowed: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositManagerState {
    pub assets: BTreeMap<AssetId, AssetConfig>,
    /// (asset, operator) => position; present once the operator is enabled
    pub operators: BTreeMap<(AssetId, Address), OperatorPosition>,
    pub receipts: ReceiptLedger,
}

// ============ Deposit Manager ============

/// Receipt ledger over one vault per asset
pub struct DepositManager<V>
where
    V: YieldVault + Clone,
{
    /// Owner of all vault shares
    address: Address,
    state: DepositManagerState,
    vaults: BTreeMap<AssetId, V>,
    events: EventLog,
    entered: bool,
}

impl<V> DepositManager<V>
where
    V: YieldVault + Clone,
{
    pub fn new(address: Address) -> CoolerResult<Self> {
        ensure_address(&address, "manager address cannot be zero address")?;
        Ok(Self {
            address,
            state: DepositManagerState::default(),
            vaults: BTreeMap::new(),
            events: EventLog::new(),
            entered: false,
        })
    }

    /// Run `f` atomically: state, vaults and events roll back on error
    fn transact<R>(&mut self, f: impl FnOnce(&mut Self) -> CoolerResult<R>) -> CoolerResult<R> {
        if self.entered {
            return Err(CoolerError::Reentrancy);
        }
        self.entered = true;
        let state = self.state.clone();
        let vaults = self.vaults.clone();
        let mark = self.events.len();

        let result = f(self);
        if result.is_err() {
            self.state = state;
            self.vaults = vaults;
            self.events.truncate(mark);
        }
        self.entered = false;
        result
    }

    // ============ Configuration ============

    /// Register `vault` for `asset` with a deposit cap
    pub fn configure_asset(&mut self, asset: &AssetId, vault: V, deposit_cap: u128, now: u64) -> CoolerResult<()> {
        ensure_address(asset, "asset cannot be zero address")?;
        if self.state.assets.contains_key(asset) {
            return Err(CoolerError::InvalidParam {
                param: "asset",
                reason: "already configured",
            });
        }
        self.state.assets.insert(*asset, AssetConfig { deposit_cap, total_deposited: 0 });
        self.vaults.insert(*asset, vault);
        self.events.emit(CoolerEvent::AssetConfigured { asset: *asset, deposit_cap, timestamp: now });
        Ok(())
    }

    pub fn set_deposit_cap(&mut self, asset: &AssetId, deposit_cap: u128, now: u64) -> CoolerResult<()> {
        let config = self
            .state
            .assets
            .get_mut(asset)
            .ok_or(CoolerError::AssetNotConfigured { asset: *asset })?;
        config.deposit_cap = deposit_cap;
        self.events.emit(CoolerEvent::AssetConfigured { asset: *asset, deposit_cap, timestamp: now });
        Ok(())
    }

    /// Allow `operator` to deposit `asset`
    pub fn enable_operator(&mut self, asset: &AssetId, operator: &Address, now: u64) -> CoolerResult<()> {
        ensure_address(operator, "operator cannot be zero address")?;
        if !self.state.assets.contains_key(asset) {
            return Err(CoolerError::AssetNotConfigured { asset: *asset });
        }
        self.state.operators.entry((*asset, *operator)).or_default();
        self.events.emit(CoolerEvent::OperatorEnabled {
            asset: *asset,
            operator: *operator,
            timestamp: now,
        });
        Ok(())
    }

    // ============ Internals ============

    fn position(&self, asset: &AssetId, operator: &Address) -> CoolerResult<OperatorPosition> {
        if !self.state.assets.contains_key(asset) {
            return Err(CoolerError::AssetNotConfigured { asset: *asset });
        }
        self.state
            .operators
            .get(&(*asset, *operator))
            .copied()
            .ok_or(CoolerError::OperatorNotEnabled { asset: *asset, operator: *operator })
    }

    fn vault_mut(&mut self, asset: &AssetId) -> CoolerResult<&mut V> {
        self.vaults
            .get_mut(asset)
            .ok_or(CoolerError::AssetNotConfigured { asset: *asset })
    }

    fn shares_in_assets(&self, asset: &AssetId, shares: u128) -> u128 {
        self.vaults
            .get(asset)
            .map(|vault| vault.preview_redeem(shares))
            .unwrap_or(0)
    }

    /// Withdraw `amount` from the vault for `position`, debiting its shares
    fn withdraw_from_vault(
        &mut self,
        asset: &AssetId,
        position: &mut OperatorPosition,
        amount: u128,
        recipient: &Address,
    ) -> CoolerResult<()> {
        let owner = self.address;
        let burned = self.vault_mut(asset)?.withdraw(amount, recipient, &owner)?;
        if burned > position.shares {
            return Err(CoolerError::Insolvent {
                liabilities: position.liabilities,
                assets: self.shares_in_assets(asset, position.shares),
                borrowed: position.borrowed,
            });
        }
        position.shares -= burned;
        Ok(())
    }

    /// `shares_in_assets + borrowed + buffer >= liabilities`
    fn check_solvency(&self, asset: &AssetId, position: &OperatorPosition, buffer: u128) -> CoolerResult<()> {
        let assets = self.shares_in_assets(asset, position.shares);
        let backing = assets.saturating_add(position.borrowed).saturating_add(buffer);
        if backing < position.liabilities {
            return Err(CoolerError::Insolvent {
                liabilities: position.liabilities,
                assets,
                borrowed: position.borrowed,
            });
        }
        Ok(())
    }

    fn validate_period(deposit_period_months: u8) -> CoolerResult<()> {
        if deposit_period_months == 0 || deposit_period_months > MAX_DEPOSIT_PERIOD_MONTHS {
            return Err(CoolerError::InvalidParam {
                param: "deposit_period_months",
                reason: "out of range",
            });
        }
        Ok(())
    }

    // ============ Deposits ============

    /// Deposit `amount` of `asset` for `depositor`; returns the receipt token id
    pub fn deposit(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        depositor: &Address,
        amount: u128,
        deposit_period_months: u8,
        now: u64,
    ) -> CoolerResult<ReceiptTokenId> {
        ensure_amount(amount)?;
        ensure_address(depositor, "depositor cannot be zero address")?;
        Self::validate_period(deposit_period_months)?;
        let mut position = self.position(asset, operator)?;

        self.transact(|manager| {
            let config = manager
                .state
                .assets
                .get_mut(asset)
                .ok_or(CoolerError::AssetNotConfigured { asset: *asset })?;
            let deposited = safe_add(config.total_deposited, amount)?;
            if deposited > config.deposit_cap {
                return Err(CoolerError::DepositCapExceeded { deposited, cap: config.deposit_cap });
            }
            config.total_deposited = deposited;

            let owner = manager.address;
            let shares = manager.vault_mut(asset)?.deposit(amount, &owner)?;
            position.shares = safe_add(position.shares, shares)?;
            position.liabilities = safe_add(position.liabilities, amount)?;
            // Minted shares round down and can be worth less than `amount`
            manager.check_solvency(asset, &position, SOLVENCY_BUFFER)?;
            manager.state.operators.insert((*asset, *operator), position);

            let token = receipt_token_id(operator, asset, deposit_period_months);
            manager.state.receipts.mint(&token, depositor, amount)?;

            manager.events.emit(CoolerEvent::ReceiptDeposit {
                operator: *operator,
                asset: *asset,
                depositor: *depositor,
                receipt_token: token,
                amount,
                shares,
                timestamp: now,
            });
            Ok(token)
        })
    }

    /// Burn `depositor`'s receipt tokens and send `amount` of `asset` to `recipient`
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        depositor: &Address,
        recipient: &Address,
        amount: u128,
        deposit_period_months: u8,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        ensure_address(recipient, "recipient cannot be zero address")?;
        let mut position = self.position(asset, operator)?;

        self.transact(|manager| {
            let token = receipt_token_id(operator, asset, deposit_period_months);
            manager.state.receipts.burn(&token, depositor, amount)?;

            position.liabilities = safe_sub(position.liabilities, amount)?;
            if let Some(config) = manager.state.assets.get_mut(asset) {
                config.total_deposited = config.total_deposited.saturating_sub(amount);
            }

            manager.withdraw_from_vault(asset, &mut position, amount, recipient)?;
            manager.check_solvency(asset, &position, SOLVENCY_BUFFER)?;
            manager.state.operators.insert((*asset, *operator), position);

            manager.events.emit(CoolerEvent::ReceiptWithdraw {
                operator: *operator,
                asset: *asset,
                depositor: *depositor,
                recipient: *recipient,
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    // ============ Yield ============

    /// Yield `operator` can claim without breaking solvency
    ///
    /// One unit below the naive surplus, absorbing the rounding gap between
    /// `preview_redeem` and `preview_withdraw`.
    pub fn max_claim_yield(&self, asset: &AssetId, operator: &Address) -> u128 {
        let position = match self.position(asset, operator) {
            Ok(position) => position,
            Err(_) => return 0,
        };
        let assets = self.shares_in_assets(asset, position.shares);
        assets
            .saturating_add(position.borrowed)
            .checked_sub(position.liabilities)
            .and_then(|surplus| surplus.checked_sub(SOLVENCY_BUFFER))
            .unwrap_or(0)
    }

    /// Send `amount` of vault growth to `recipient`
    pub fn claim_yield(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        recipient: &Address,
        amount: u128,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        ensure_address(recipient, "recipient cannot be zero address")?;
        let mut position = self.position(asset, operator)?;

        self.transact(|manager| {
            manager.withdraw_from_vault(asset, &mut position, amount, recipient)?;
            manager.check_solvency(asset, &position, 0)?;
            manager.state.operators.insert((*asset, *operator), position);

            manager.events.emit(CoolerEvent::YieldClaimed {
                operator: *operator,
                asset: *asset,
                recipient: *recipient,
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    // ============ Borrowing ============

    /// Lend `amount` of deposited assets to `recipient`
    pub fn borrowing_withdraw(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        recipient: &Address,
        amount: u128,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        ensure_address(recipient, "recipient cannot be zero address")?;
        let mut position = self.position(asset, operator)?;

        self.transact(|manager| {
            position.borrowed = safe_add(position.borrowed, amount)?;
            manager.withdraw_from_vault(asset, &mut position, amount, recipient)?;
            manager.check_solvency(asset, &position, 0)?;
            manager.state.operators.insert((*asset, *operator), position);

            manager.events.emit(CoolerEvent::BorrowingWithdraw {
                operator: *operator,
                asset: *asset,
                recipient: *recipient,
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Return `amount` of borrowed assets, paid by `payer`, to the vault
    pub fn borrowing_repay(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        payer: &Address,
        amount: u128,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        let mut position = self.position(asset, operator)?;
        if amount > position.borrowed {
            return Err(CoolerError::ExceededBorrowedAmount { borrowed: position.borrowed, requested: amount });
        }

        self.transact(|manager| {
            // A position already short after a vault loss may still repay
            let solvent = manager.check_solvency(asset, &position, SOLVENCY_BUFFER).is_ok();
            let owner = manager.address;
            let shares = manager.vault_mut(asset)?.deposit(amount, &owner)?;
            position.shares = safe_add(position.shares, shares)?;
            position.borrowed -= amount;
            if solvent {
                manager.check_solvency(asset, &position, SOLVENCY_BUFFER)?;
            }
            manager.state.operators.insert((*asset, *operator), position);

            manager.events.emit(CoolerEvent::BorrowingRepay {
                operator: *operator,
                asset: *asset,
                payer: *payer,
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Write off `amount` of borrowed assets against `payer`'s receipt tokens
    pub fn borrowing_default(
        &mut self,
        operator: &Address,
        asset: &AssetId,
        payer: &Address,
        amount: u128,
        deposit_period_months: u8,
        now: u64,
    ) -> CoolerResult<()> {
        ensure_amount(amount)?;
        let mut position = self.position(asset, operator)?;
        if amount > position.borrowed {
            return Err(CoolerError::ExceededBorrowedAmount { borrowed: position.borrowed, requested: amount });
        }

        self.transact(|manager| {
            let token = receipt_token_id(operator, asset, deposit_period_months);
            manager.state.receipts.burn(&token, payer, amount)?;

            position.borrowed -= amount;
            position.liabilities = safe_sub(position.liabilities, amount)?;
            if let Some(config) = manager.state.assets.get_mut(asset) {
                config.total_deposited = config.total_deposited.saturating_sub(amount);
            }
            manager.state.operators.insert((*asset, *operator), position);

            manager.events.emit(CoolerEvent::BorrowingDefault {
                operator: *operator,
                asset: *asset,
                payer: *payer,
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    // ============ Views ============

    pub fn operator_liabilities(&self, asset: &AssetId, operator: &Address) -> u128 {
        self.position(asset, operator).map(|p| p.liabilities).unwrap_or(0)
    }

    /// `(shares, assets)` held for `operator`
    pub fn operator_assets(&self, asset: &AssetId, operator: &Address) -> (u128, u128) {
        let shares = self.position(asset, operator).map(|p| p.shares).unwrap_or(0);
        (shares, self.shares_in_assets(asset, shares))
    }

    pub fn borrowed_amount(&self, asset: &AssetId, operator: &Address) -> u128 {
        self.position(asset, operator).map(|p| p.borrowed).unwrap_or(0)
    }

    pub fn receipt_balance(&self, token: &ReceiptTokenId, holder: &Address) -> u128 {
        self.state.receipts.balance_of(token, holder)
    }

    pub fn receipt_supply(&self, token: &ReceiptTokenId) -> u128 {
        self.state.receipts.total_supply(token)
    }

    pub fn receipt_token_id(&self, operator: &Address, asset: &AssetId, deposit_period_months: u8) -> ReceiptTokenId {
        receipt_token_id(operator, asset, deposit_period_months)
    }

    pub fn asset_config(&self, asset: &AssetId) -> Option<&AssetConfig> {
        self.state.assets.get(asset)
    }

    pub fn is_operator_enabled(&self, asset: &AssetId, operator: &Address) -> bool {
        self.state.operators.contains_key(&(*asset, *operator))
    }

    pub fn vault(&self, asset: &AssetId) -> Option<&V> {
        self.vaults.get(asset)
    }

    /// Direct vault access, for yield accrual in simulations
    pub fn vault_for_simulation(&mut self, asset: &AssetId) -> Option<&mut V> {
        self.vaults.get_mut(asset)
    }

    pub fn state(&self) -> &DepositManagerState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

// ============ Tests ============

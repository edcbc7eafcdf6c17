//! Receipt Tokens
//!
//! Receipt tokens are minted 1:1 with deposited assets. A token id is bound
//! to one operator, asset and deposit period.

use cooler_common::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    errors::{CoolerError, CoolerResult},
    math::{safe_add, safe_sub},
    types::{derive_id, Address, AssetId, ReceiptTokenId},
};

/// Deterministic receipt token id for `(operator, asset, period)`
pub fn receipt_token_id(operator: &Address, asset: &AssetId, deposit_period_months: u8) -> ReceiptTokenId {
    derive_id(&[operator.as_slice(), asset.as_slice(), &[deposit_period_months]])
}

/// Balances and supply of every receipt token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ReceiptLedger {
    balances: BTreeMap<(ReceiptTokenId, Address), u128>,
    supply: BTreeMap<ReceiptTokenId, u128>,
}

impl ReceiptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: &ReceiptTokenId, holder: &Address) -> u128 {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self, token: &ReceiptTokenId) -> u128 {
        self.supply.get(token).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, token: &ReceiptTokenId, to: &Address, amount: u128) -> CoolerResult<()> {
        let balance = safe_add(self.balance_of(token, to), amount)?;
        let supply = safe_add(self.total_supply(token), amount)?;
        self.balances.insert((*token, *to), balance);
        self.supply.insert(*token, supply);
        Ok(())
    }

    pub fn burn(&mut self, token: &ReceiptTokenId, from: &Address, amount: u128) -> CoolerResult<()> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(CoolerError::InsufficientReceiptBalance { available, requested: amount });
        }
        let supply = safe_sub(self.total_supply(token), amount)?;

        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&(*token, *from));
        } else {
            self.balances.insert((*token, *from), remaining);
        }
        if supply == 0 {
            self.supply.remove(token);
        } else {
            self.supply.insert(*token, supply);
        }
        Ok(())
    }
}

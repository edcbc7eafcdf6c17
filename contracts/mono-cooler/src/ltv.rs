//! Loan-to-Value Engine
//!
//! LTV is quoted as debt token per collateral token in WAD. Both thresholds
//! are compared strictly: an account exactly at a threshold has not
//! exceeded it.
//!
//! ## Thresholds
//!
//! - **max_origination_ltv**: ceiling for borrows and collateral withdrawals
//! - **liquidation_ltv**: above this the account can be liquidated
//!
//! `max_origination_ltv < liquidation_ltv` always holds, and the liquidation
//! threshold never moves down once set.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use cooler_common::{
    constants::{ltv, precision::WAD},
    errors::{CoolerError, CoolerResult},
    math::{div_wad_down, div_wad_up, mul_div_up, mul_wad_down},
};

use crate::ledger::AccountState;

/// Configured LTV thresholds (WAD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LoanToValueConfig {
    pub max_origination_ltv: u128,
    pub liquidation_ltv: u128,
}

impl Default for LoanToValueConfig {
    fn default() -> Self {
        Self {
            max_origination_ltv: ltv::DEFAULT_MAX_ORIGINATION_LTV,
            liquidation_ltv: ltv::DEFAULT_LIQUIDATION_LTV,
        }
    }
}

impl LoanToValueConfig {
    /// Validated threshold pair
    pub fn new(max_origination_ltv: u128, liquidation_ltv: u128) -> CoolerResult<Self> {
        if max_origination_ltv == 0 {
            return Err(CoolerError::InvalidParam {
                param: "max_origination_ltv",
                reason: "must be positive",
            });
        }
        if max_origination_ltv >= liquidation_ltv {
            return Err(CoolerError::InvalidParam {
                param: "max_origination_ltv",
                reason: "must be below liquidation_ltv",
            });
        }
        if liquidation_ltv > ltv::MAX_LTV {
            return Err(CoolerError::InvalidParam {
                param: "liquidation_ltv",
                reason: "above maximum",
            });
        }
        Ok(Self { max_origination_ltv, liquidation_ltv })
    }

    /// Replacement thresholds; the liquidation LTV may not decrease
    pub fn update(&self, max_origination_ltv: u128, liquidation_ltv: u128) -> CoolerResult<Self> {
        if liquidation_ltv < self.liquidation_ltv {
            return Err(CoolerError::InvalidParam {
                param: "liquidation_ltv",
                reason: "cannot decrease",
            });
        }
        Self::new(max_origination_ltv, liquidation_ltv)
    }
}

/// Health snapshot of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStatus {
    pub collateral: u128,
    /// Debt rounded up
    pub current_debt: u128,
    /// 0 with no collateral and no debt, `u128::MAX` with debt but no collateral
    pub current_ltv: u128,
    pub exceeded_liquidation_ltv: bool,
    pub exceeded_max_origination_ltv: bool,
}

/// `ceil(debt * WAD / collateral)`
pub fn calculate_ltv(debt: u128, collateral: u128) -> CoolerResult<u128> {
    if collateral == 0 {
        return Ok(if debt == 0 { 0 } else { u128::MAX });
    }
    div_wad_up(debt, collateral)
}

/// Health of `account` at the global index `global_acc`
pub fn compute_liquidity(
    account: &AccountState,
    global_acc: u128,
    config: &LoanToValueConfig,
) -> CoolerResult<LiquidationStatus> {
    let current_debt = account.current_debt(global_acc, true)?;
    let current_ltv = calculate_ltv(current_debt, account.collateral)?;

    Ok(LiquidationStatus {
        collateral: account.collateral,
        current_debt,
        current_ltv,
        exceeded_liquidation_ltv: current_ltv > config.liquidation_ltv,
        exceeded_max_origination_ltv: current_ltv > config.max_origination_ltv,
    })
}

/// Fail if the account sits above the origination ceiling
///
/// Only run after actions that can raise LTV (borrow, withdrawal).
pub fn validate_origination(status: &LiquidationStatus, config: &LoanToValueConfig) -> CoolerResult<()> {
    if status.exceeded_max_origination_ltv {
        return Err(CoolerError::ExceededMaxOriginationLtv {
            current_ltv: status.current_ltv,
            max_origination_ltv: config.max_origination_ltv,
        });
    }
    Ok(())
}

/// Largest debt `collateral` supports at origination
pub fn max_origination_debt(collateral: u128, config: &LoanToValueConfig) -> CoolerResult<u128> {
    mul_wad_down(collateral, config.max_origination_ltv)
}

/// Debt at which `collateral` becomes liquidatable
pub fn liquidation_debt(collateral: u128, config: &LoanToValueConfig) -> CoolerResult<u128> {
    mul_wad_down(collateral, config.liquidation_ltv)
}

/// `liquidation_debt / debt` in WAD; `u128::MAX` without debt
///
/// Below `WAD` the account can be liquidated.
pub fn health_factor(debt: u128, collateral: u128, config: &LoanToValueConfig) -> CoolerResult<u128> {
    if debt == 0 {
        return Ok(u128::MAX);
    }
    div_wad_down(liquidation_debt(collateral, config)?, debt)
}

/// Collateral that can leave while staying at or under the origination LTV
pub fn max_withdrawable_collateral(
    collateral: u128,
    debt: u128,
    config: &LoanToValueConfig,
) -> CoolerResult<u128> {
    if debt == 0 {
        return Ok(collateral);
    }
    let required = mul_div_up(debt, WAD, config.max_origination_ltv)?;
    Ok(collateral.saturating_sub(required))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooler_common::constants::precision::RAY;

    fn test_config() -> LoanToValueConfig {
        LoanToValueConfig::new(7 * WAD / 10, 8 * WAD / 10).unwrap()
    }

    fn position(collateral: u128, debt: u128) -> AccountState {
        AccountState {
            collateral,
            debt_checkpoint: debt,
            interest_accumulator_ray: RAY,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(LoanToValueConfig::new(8 * WAD / 10, 8 * WAD / 10).is_err());
        assert!(LoanToValueConfig::new(0, WAD).is_err());
        assert!(LoanToValueConfig::new(WAD, ltv::MAX_LTV + 1).is_err());

        let config = test_config();
        // Liquidation LTV can only go up
        assert!(config.update(6 * WAD / 10, 7 * WAD / 10).is_err());
        let raised = config.update(75 * WAD / 100, 9 * WAD / 10).unwrap();
        assert_eq!(raised.liquidation_ltv, 9 * WAD / 10);
    }

    #[test]
    fn test_boundary_is_strict() {
        let config = test_config();

        let at_ceiling = compute_liquidity(&position(100, 70), RAY, &config).unwrap();
        assert_eq!(at_ceiling.current_ltv, 7 * WAD / 10);
        assert!(!at_ceiling.exceeded_max_origination_ltv);
        assert!(validate_origination(&at_ceiling, &config).is_ok());

        let above = compute_liquidity(&position(100, 71), RAY, &config).unwrap();
        assert!(above.exceeded_max_origination_ltv);
        assert!(!above.exceeded_liquidation_ltv);
        assert!(matches!(
            validate_origination(&above, &config),
            Err(CoolerError::ExceededMaxOriginationLtv { .. })
        ));

        let at_liquidation = compute_liquidity(&position(100, 80), RAY, &config).unwrap();
        assert!(!at_liquidation.exceeded_liquidation_ltv);
        let liquidatable = compute_liquidity(&position(100, 81), RAY, &config).unwrap();
        assert!(liquidatable.exceeded_liquidation_ltv);
    }

    #[test]
    fn test_ltv_edge_cases() {
        assert_eq!(calculate_ltv(0, 0).unwrap(), 0);
        assert_eq!(calculate_ltv(1, 0).unwrap(), u128::MAX);
        // Rounds up
        assert_eq!(calculate_ltv(1, 3).unwrap(), WAD / 3 + 1);

        let config = test_config();
        let empty = compute_liquidity(&position(0, 0), RAY, &config).unwrap();
        assert!(!empty.exceeded_liquidation_ltv);
    }

    #[test]
    fn test_capacity_helpers() {
        let config = test_config();
        assert_eq!(max_origination_debt(100 * WAD, &config).unwrap(), 70 * WAD);
        assert_eq!(liquidation_debt(100 * WAD, &config).unwrap(), 80 * WAD);
        assert_eq!(health_factor(0, 100 * WAD, &config).unwrap(), u128::MAX);
        assert_eq!(health_factor(40 * WAD, 100 * WAD, &config).unwrap(), 2 * WAD);

        // 35 debt needs 50 collateral at 0.7
        assert_eq!(max_withdrawable_collateral(100 * WAD, 35 * WAD, &config).unwrap(), 50 * WAD);
        assert_eq!(max_withdrawable_collateral(10 * WAD, 35 * WAD, &config).unwrap(), 0);
    }
}

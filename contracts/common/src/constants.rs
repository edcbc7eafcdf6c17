//! Protocol Constants
//!
//! All magic numbers and default configuration values for the lending core.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (higher debt floors, real keeper rewards)
//! - Default (no feature) - Testnet values (lower minimums for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! cooler-common = { path = "...", features = ["mainnet"] }
//! ```

/// Fixed-point scales
pub mod precision {
    /// 1.0 in WAD (18 decimals), used for LTVs, rates and token amounts
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    /// 1.0 in RAY (27 decimals), used for the interest accumulator
    pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

    /// Basis points denominator (10_000 = 100%)
    pub const BPS_DENOMINATOR: u128 = 10_000;

    /// WAD per basis point (1e18 / 1e4)
    pub const WAD_PER_BPS: u128 = WAD / BPS_DENOMINATOR;
}

/// Time-related constants
pub mod time {
    /// Seconds in one day
    pub const ONE_DAY: u64 = 86_400;

    /// Seconds in a 365 day year (interest is quoted per 365 days)
    pub const SECONDS_PER_YEAR: u64 = 365 * ONE_DAY;
}

/// Interest accrual
pub mod interest {
    /// Default annual interest rate (0.5% APR)
    pub const DEFAULT_INTEREST_RATE_BPS: u64 = 50;

    /// Maximum annual interest rate an admin may set (10% APR)
    pub const MAX_INTEREST_RATE_BPS: u64 = 1_000;

    /// Taylor expansion terms are dropped once they fall below one ray unit,
    /// this bounds the loop for pathological inputs.
    pub const MAX_EXP_TERMS: u32 = 96;

    /// Exponents above this (in WAD) are rejected before evaluating `e^x`.
    /// `e^80` already exceeds the u128 accumulator headroom.
    pub const MAX_EXP_WAD: u128 = 80 * super::precision::WAD;
}

/// Loan-to-value defaults (debt token per collateral token, WAD)
pub mod ltv {
    use super::precision::WAD;

    /// Default maximum origination LTV (2,961.64 debt per collateral)
    pub const DEFAULT_MAX_ORIGINATION_LTV: u128 = 2_961_640_000_000_000_000_000;

    /// Default liquidation LTV (origination plus 1%)
    pub const DEFAULT_LIQUIDATION_LTV: u128 = 2_991_256_400_000_000_000_000;

    /// Upper bound on any configured LTV, protects against fat-fingered admin input
    pub const MAX_LTV: u128 = 1_000_000 * WAD;
}

/// Debt limits
///
/// Values differ between mainnet and testnet to allow easier testing.
pub mod limits {
    use super::precision::WAD;

    /// Minimum debt an account with debt must carry
    /// - Mainnet: 1,000 debt tokens (keeps liquidations worth a keeper's time)
    /// - Testnet: 1 debt token
    #[cfg(feature = "mainnet")]
    pub const MIN_DEBT_REQUIRED: u128 = 1_000 * WAD;
    #[cfg(not(feature = "mainnet"))]
    pub const MIN_DEBT_REQUIRED: u128 = WAD;

    /// Sentinel amount meaning "as much as allowed" for borrow and withdraw
    pub const MAX_AMOUNT: u128 = u128::MAX;

    /// Maximum accounts processed by one `batch_liquidate` call
    pub const MAX_LIQUIDATION_BATCH: usize = 100;
}

/// Collateral delegation
pub mod delegation {
    /// Default cap on distinct delegate addresses per account
    pub const DEFAULT_MAX_DELEGATE_ADDRESSES: u32 = 10;

    /// Hard ceiling an admin override can raise the per-account cap to
    pub const MAX_DELEGATE_ADDRESSES_LIMIT: u32 = 500;

    /// Delegations a withdrawal may rescind on its own when the undelegated
    /// balance runs short. 0 means the caller must undelegate explicitly.
    pub const DEFAULT_AUTO_RESCIND_MAX: u32 = 0;
}

/// Clearinghouse (fixed-term loans)
pub mod clearinghouse {
    use super::precision::WAD;
    use super::time::ONE_DAY;

    /// Default loan term (121 days)
    pub const DEFAULT_DURATION: u64 = 121 * ONE_DAY;

    /// Default loan-to-collateral (debt per collateral, WAD)
    pub const DEFAULT_LOAN_TO_COLLATERAL: u128 = 2_889 * WAD;

    /// Default annual interest (0.5% APR)
    pub const DEFAULT_INTEREST_RATE_BPS: u64 = 50;

    /// Keeper reward cap per defaulted loan, in collateral
    /// - Mainnet: 0.1 collateral tokens
    /// - Testnet: 1 collateral token
    #[cfg(feature = "mainnet")]
    pub const MAX_REWARD_PER_LOAN: u128 = WAD / 10;
    #[cfg(not(feature = "mainnet"))]
    pub const MAX_REWARD_PER_LOAN: u128 = WAD;

    /// Keeper reward as a share of the defaulted collateral (5%)
    pub const REWARD_BPS: u128 = 500;

    /// Window over which the keeper reward ramps up linearly
    pub const REWARD_RAMP: u64 = 7 * ONE_DAY;

    /// Maximum number of extensions in one `extend_loan` call
    pub const MAX_EXTENSIONS: u8 = 12;
}

/// Deposit manager
pub mod deposit {
    /// Rounding buffer kept between vault assets and receipt liabilities.
    /// Absorbs ERC-4626 `previewRedeem`/`previewWithdraw` rounding asymmetry.
    pub const SOLVENCY_BUFFER: u128 = 1;

    /// Longest deposit period (months) accepted for a receipt token
    pub const MAX_DEPOSIT_PERIOD_MONTHS: u8 = 36;
}

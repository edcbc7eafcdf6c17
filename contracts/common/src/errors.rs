//! Error Types for the Lending Core
//!
//! Every failure aborts the whole call. Variants carry the numeric context a
//! keeper or UI needs to re-simulate (attempted vs. allowed amounts).

use crate::types::Address;

/// Result type alias for lending core operations
pub type CoolerResult<T> = Result<T, CoolerError>;

/// Main error enum for all lending core errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoolerError {
    // ============ Parameter Errors ============
    /// Malformed parameter or configuration
    InvalidParam { param: &'static str, reason: &'static str },

    /// Zero address where an address is required
    InvalidAddress { reason: &'static str },

    /// Zero amount where a positive amount is required
    ZeroAmount,

    /// Caller may not act for this account
    Unauthorized { caller: Address, account: Address },

    // ============ Position Errors ============
    /// Borrow or withdrawal would push LTV above the origination ceiling
    ExceededMaxOriginationLtv { current_ltv: u128, max_origination_ltv: u128 },

    /// Resulting debt is below the dust floor
    MinDebtNotMet { debt: u128, minimum: u128 },

    /// Withdrawal asked for more than the undelegated collateral
    ExceededUndelegatedCollateralBalance { available: u128, requested: u128 },

    /// Withdrawal asked for more than the account's collateral
    ExceededCollateralBalance { available: u128, requested: u128 },

    /// Account is under the liquidation LTV
    CannotLiquidate { account: Address, current_ltv: u128, liquidation_ltv: u128 },

    /// Account has no position
    AccountNotFound { account: Address },

    /// Account has no debt to repay
    NoDebt { account: Address },

    // ============ Control Errors ============
    /// Borrows or liquidations are administratively paused
    Paused { operation: PausedOperation },

    /// Facility is shut down
    Inactive,

    /// Entry point re-entered while a call is in flight
    Reentrancy,

    // ============ Delegation Errors ============
    /// Account would exceed its delegate address cap
    TooManyDelegates { count: u32, max: u32 },

    /// No escrow position for this account and delegate
    InvalidDelegateEscrow { delegate: Address },

    // ============ Receipt Ledger Errors ============
    /// Receipt liabilities would exceed backing assets
    Insolvent { liabilities: u128, assets: u128, borrowed: u128 },

    /// Asset has no vault configured
    AssetNotConfigured { asset: Address },

    /// Operator is not enabled for this asset
    OperatorNotEnabled { asset: Address, operator: Address },

    /// Deposit would exceed the asset cap
    DepositCapExceeded { deposited: u128, cap: u128 },

    /// Holder has fewer receipt tokens than requested
    InsufficientReceiptBalance { available: u128, requested: u128 },

    /// Repayment or default exceeds what the operator borrowed
    ExceededBorrowedAmount { borrowed: u128, requested: u128 },

    // ============ Loan Errors ============
    /// No loan with this id
    LoanNotFound { loan_id: u64 },

    /// Loan is repaid or defaulted
    LoanNotActive { loan_id: u64 },

    /// Loan has not reached expiry yet
    LoanNotDefaulted { loan_id: u64, expiry: u64 },

    /// Loan expired and can no longer be repaid or extended
    LoanExpired { loan_id: u64, expiry: u64 },

    // ============ Capability Errors ============
    /// Not enough balance held by a capability
    InsufficientBalance { available: u128, requested: u128 },

    /// External capability rejected the call
    CapabilityFailed { capability: &'static str },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

/// Operations that can be administratively paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PausedOperation {
    /// New borrows
    Borrow,
    /// Liquidations and unhealthy delegation rescinds
    Liquidation,
}

impl CoolerError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParam { .. } => "E001_INVALID_PARAM",
            Self::InvalidAddress { .. } => "E002_INVALID_ADDRESS",
            Self::ZeroAmount => "E003_ZERO_AMOUNT",
            Self::Unauthorized { .. } => "E004_UNAUTHORIZED",
            Self::ExceededMaxOriginationLtv { .. } => "E010_EXCEEDED_MAX_ORIGINATION_LTV",
            Self::MinDebtNotMet { .. } => "E011_MIN_DEBT_NOT_MET",
            Self::ExceededUndelegatedCollateralBalance { .. } => "E012_EXCEEDED_UNDELEGATED",
            Self::ExceededCollateralBalance { .. } => "E013_EXCEEDED_COLLATERAL",
            Self::CannotLiquidate { .. } => "E014_CANNOT_LIQUIDATE",
            Self::AccountNotFound { .. } => "E015_ACCOUNT_NOT_FOUND",
            Self::NoDebt { .. } => "E016_NO_DEBT",
            Self::Paused { .. } => "E020_PAUSED",
            Self::Inactive => "E021_INACTIVE",
            Self::Reentrancy => "E022_REENTRANCY",
            Self::TooManyDelegates { .. } => "E030_TOO_MANY_DELEGATES",
            Self::InvalidDelegateEscrow { .. } => "E031_INVALID_DELEGATE_ESCROW",
            Self::Insolvent { .. } => "E040_INSOLVENT",
            Self::AssetNotConfigured { .. } => "E041_ASSET_NOT_CONFIGURED",
            Self::OperatorNotEnabled { .. } => "E042_OPERATOR_NOT_ENABLED",
            Self::DepositCapExceeded { .. } => "E043_DEPOSIT_CAP",
            Self::InsufficientReceiptBalance { .. } => "E044_RECEIPT_BALANCE",
            Self::ExceededBorrowedAmount { .. } => "E045_EXCEEDED_BORROWED",
            Self::LoanNotFound { .. } => "E050_LOAN_NOT_FOUND",
            Self::LoanNotActive { .. } => "E051_LOAN_NOT_ACTIVE",
            Self::LoanNotDefaulted { .. } => "E052_LOAN_NOT_DEFAULTED",
            Self::LoanExpired { .. } => "E053_LOAN_EXPIRED",
            Self::InsufficientBalance { .. } => "E060_INSUFFICIENT_BALANCE",
            Self::CapabilityFailed { .. } => "E061_CAPABILITY_FAILED",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if this error is recoverable (user can fix it)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ExceededMaxOriginationLtv { .. } => true, // Add collateral or borrow less
            Self::MinDebtNotMet { .. } => true,             // Borrow more or repay in full
            Self::ExceededUndelegatedCollateralBalance { .. } => true, // Undelegate first
            Self::InsufficientBalance { .. } => true,       // Get more funds
            Self::LoanNotDefaulted { .. } => true,          // Wait for expiry
            Self::Paused { .. } => true,                    // Wait for unpause
            _ => false,
        }
    }
}

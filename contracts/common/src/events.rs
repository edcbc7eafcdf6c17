//! Protocol Events
//!
//! Events are emitted during execution and can be indexed off-chain for
//! keepers, UIs and analytics. A component's `EventLog` is truncated back
//! when a call aborts, so only committed state changes leave a trace.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::types::{Address, AssetId, LoanId, ReceiptTokenId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // MonoCooler Events (0x01 - 0x1F)
    CollateralAdded = 0x01,
    CollateralWithdrawn = 0x02,
    Borrow = 0x03,
    Repay = 0x04,
    Liquidated = 0x05,
    DelegationApplied = 0x06,
    AuthorizationSet = 0x07,

    // MonoCooler Admin Events (0x20 - 0x3F)
    InterestRateSet = 0x20,
    LtvSet = 0x21,
    BorrowsPausedSet = 0x22,
    LiquidationsPausedSet = 0x23,
    MaxDelegateAddressesSet = 0x24,
    MinDebtRequiredSet = 0x25,

    // Deposit Manager Events (0x40 - 0x5F)
    ReceiptDeposit = 0x40,
    ReceiptWithdraw = 0x41,
    YieldClaimed = 0x42,
    BorrowingWithdraw = 0x43,
    BorrowingRepay = 0x44,
    BorrowingDefault = 0x45,
    AssetConfigured = 0x46,
    OperatorEnabled = 0x47,

    // Clearinghouse Events (0x60 - 0x7F)
    LoanOriginated = 0x60,
    LoanRepaid = 0x61,
    LoanExtended = 0x62,
    DefaultClaimed = 0x63,
    ClearinghouseActivated = 0x64,
    ClearinghouseShutdown = 0x65,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum CoolerEvent {
    // ============ MonoCooler Events ============

    /// Collateral deposited for an account
    CollateralAdded {
        caller: Address,
        on_behalf_of: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Collateral withdrawn from an account
    CollateralWithdrawn {
        caller: Address,
        on_behalf_of: Address,
        recipient: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Debt drawn against an account
    Borrow {
        caller: Address,
        on_behalf_of: Address,
        recipient: Address,
        amount: u128,
        new_debt: u128,
        timestamp: u64,
    },

    /// Debt paid down
    Repay {
        caller: Address,
        on_behalf_of: Address,
        amount: u128,
        remaining_debt: u128,
        timestamp: u64,
    },

    /// Unhealthy account wiped by a keeper
    Liquidated {
        caller: Address,
        account: Address,
        collateral_seized: u128,
        debt_wiped: u128,
        timestamp: u64,
    },

    /// Delegation requests applied for an account
    DelegationApplied {
        account: Address,
        delegate: Address,
        amount: i128,
        timestamp: u64,
    },

    /// Operator authorization granted or revoked
    AuthorizationSet {
        account: Address,
        authorized: Address,
        deadline: u64,
        timestamp: u64,
    },

    // ============ MonoCooler Admin Events ============

    /// Annual interest rate changed
    InterestRateSet { interest_rate_bps: u64, timestamp: u64 },

    /// LTV bounds changed
    LtvSet {
        max_origination_ltv: u128,
        liquidation_ltv: u128,
        timestamp: u64,
    },

    /// Borrow pause toggled
    BorrowsPausedSet { paused: bool, timestamp: u64 },

    /// Liquidation pause toggled
    LiquidationsPausedSet { paused: bool, timestamp: u64 },

    /// Per-account delegate cap changed
    MaxDelegateAddressesSet { account: Address, max: u32, timestamp: u64 },

    /// Debt floor changed
    MinDebtRequiredSet { min_debt_required: u128, timestamp: u64 },

    // ============ Deposit Manager Events ============

    /// Asset deposited, receipt tokens minted
    ReceiptDeposit {
        operator: Address,
        asset: AssetId,
        depositor: Address,
        receipt_token: ReceiptTokenId,
        amount: u128,
        shares: u128,
        timestamp: u64,
    },

    /// Receipt tokens burned, asset withdrawn
    ReceiptWithdraw {
        operator: Address,
        asset: AssetId,
        depositor: Address,
        recipient: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Operator swept vault yield
    YieldClaimed {
        operator: Address,
        asset: AssetId,
        recipient: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Operator lent deposited assets out
    BorrowingWithdraw {
        operator: Address,
        asset: AssetId,
        recipient: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Borrowed assets returned
    BorrowingRepay {
        operator: Address,
        asset: AssetId,
        payer: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Borrowed assets written off against receipt tokens
    BorrowingDefault {
        operator: Address,
        asset: AssetId,
        payer: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Vault and cap registered for an asset
    AssetConfigured {
        asset: AssetId,
        deposit_cap: u128,
        timestamp: u64,
    },

    /// Operator allowed to deposit an asset
    OperatorEnabled {
        asset: AssetId,
        operator: Address,
        timestamp: u64,
    },

    // ============ Clearinghouse Events ============

    /// Fixed-term loan issued
    LoanOriginated {
        loan_id: LoanId,
        borrower: Address,
        principal: u128,
        interest: u128,
        collateral: u128,
        expiry: u64,
        timestamp: u64,
    },

    /// Loan repaid in part or in full
    LoanRepaid {
        loan_id: LoanId,
        payer: Address,
        amount: u128,
        collateral_released: u128,
        timestamp: u64,
    },

    /// Loan term extended
    LoanExtended {
        loan_id: LoanId,
        times: u8,
        interest_paid: u128,
        new_expiry: u64,
        timestamp: u64,
    },

    /// Expired loans swept by a keeper
    DefaultClaimed {
        keeper: Address,
        loans: u32,
        collateral_burned: u128,
        keeper_reward: u128,
        timestamp: u64,
    },

    /// Clearinghouse reopened for lending
    ClearinghouseActivated { timestamp: u64 },

    /// Clearinghouse stopped lending
    ClearinghouseShutdown { timestamp: u64 },
}

impl CoolerEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::CollateralAdded { .. } => EventType::CollateralAdded,
            Self::CollateralWithdrawn { .. } => EventType::CollateralWithdrawn,
            Self::Borrow { .. } => EventType::Borrow,
            Self::Repay { .. } => EventType::Repay,
            Self::Liquidated { .. } => EventType::Liquidated,
            Self::DelegationApplied { .. } => EventType::DelegationApplied,
            Self::AuthorizationSet { .. } => EventType::AuthorizationSet,
            Self::InterestRateSet { .. } => EventType::InterestRateSet,
            Self::LtvSet { .. } => EventType::LtvSet,
            Self::BorrowsPausedSet { .. } => EventType::BorrowsPausedSet,
            Self::LiquidationsPausedSet { .. } => EventType::LiquidationsPausedSet,
            Self::MaxDelegateAddressesSet { .. } => EventType::MaxDelegateAddressesSet,
            Self::MinDebtRequiredSet { .. } => EventType::MinDebtRequiredSet,
            Self::ReceiptDeposit { .. } => EventType::ReceiptDeposit,
            Self::ReceiptWithdraw { .. } => EventType::ReceiptWithdraw,
            Self::YieldClaimed { .. } => EventType::YieldClaimed,
            Self::BorrowingWithdraw { .. } => EventType::BorrowingWithdraw,
            Self::BorrowingRepay { .. } => EventType::BorrowingRepay,
            Self::BorrowingDefault { .. } => EventType::BorrowingDefault,
            Self::AssetConfigured { .. } => EventType::AssetConfigured,
            Self::OperatorEnabled { .. } => EventType::OperatorEnabled,
            Self::LoanOriginated { .. } => EventType::LoanOriginated,
            Self::LoanRepaid { .. } => EventType::LoanRepaid,
            Self::LoanExtended { .. } => EventType::LoanExtended,
            Self::DefaultClaimed { .. } => EventType::DefaultClaimed,
            Self::ClearinghouseActivated { .. } => EventType::ClearinghouseActivated,
            Self::ClearinghouseShutdown { .. } => EventType::ClearinghouseShutdown,
        }
    }

    /// Get the timestamp of the call that emitted the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::CollateralAdded { timestamp, .. }
            | Self::CollateralWithdrawn { timestamp, .. }
            | Self::Borrow { timestamp, .. }
            | Self::Repay { timestamp, .. }
            | Self::Liquidated { timestamp, .. }
            | Self::DelegationApplied { timestamp, .. }
            | Self::AuthorizationSet { timestamp, .. }
            | Self::InterestRateSet { timestamp, .. }
            | Self::LtvSet { timestamp, .. }
            | Self::BorrowsPausedSet { timestamp, .. }
            | Self::LiquidationsPausedSet { timestamp, .. }
            | Self::MaxDelegateAddressesSet { timestamp, .. }
            | Self::MinDebtRequiredSet { timestamp, .. }
            | Self::ReceiptDeposit { timestamp, .. }
            | Self::ReceiptWithdraw { timestamp, .. }
            | Self::YieldClaimed { timestamp, .. }
            | Self::BorrowingWithdraw { timestamp, .. }
            | Self::BorrowingRepay { timestamp, .. }
            | Self::BorrowingDefault { timestamp, .. }
            | Self::AssetConfigured { timestamp, .. }
            | Self::OperatorEnabled { timestamp, .. }
            | Self::LoanOriginated { timestamp, .. }
            | Self::LoanRepaid { timestamp, .. }
            | Self::LoanExtended { timestamp, .. }
            | Self::DefaultClaimed { timestamp, .. }
            | Self::ClearinghouseActivated { timestamp }
            | Self::ClearinghouseShutdown { timestamp } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<CoolerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: CoolerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[CoolerEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<CoolerEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&CoolerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events emitted after `len`, used when a call aborts
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

//! Error Types for the xALGO Consensus Pool
//!
//! Every failure aborts the whole call: the engine discards its staged
//! state and ledger copies, so an error always means "nothing happened".

use core::fmt;

use crate::types::{Address, AdminRole, AssetId, MintingKind};

/// Result type alias for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Main error enum for all consensus pool errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    // ============ Authorization Errors ============
    /// Caller does not hold the role the operation requires
    Unauthorized { expected: Address, actual: Address },

    /// Caller is neither the admin nor the holder of the role being replaced
    RoleUpdateUnauthorized { role: AdminRole, caller: Address },

    /// Caller is not the active admin of the proposer
    NotProposerAdmin { proposer_index: u8, caller: Address },

    // ============ Precondition Errors ============
    /// Contract has not been initialised (or was reset by an upgrade)
    NotInitialised,

    /// Contract is already initialised
    AlreadyInitialised,

    /// Proposer pool is full
    PoolAtCapacity { max: u64 },

    /// Pool has no proposers to price against or move funds through
    NoProposers,

    /// Proposer index does not refer to a registered proposer
    ProposerIndexOutOfRange { index: u8, num_proposers: u64 },

    /// Proposer account has not delegated its signing authority to the pool
    ProposerNotDelegated { proposer: Address },

    /// Rebalancing target would exceed the per-proposer cap
    ProposerBalanceCapExceeded { target: u64, max: u64 },

    /// Fee above 100%
    FeeTooHigh { fee: u64, max: u64 },

    /// Premium above 1%
    PremiumTooHigh { premium: u64, max: u64 },

    /// Minting of the given kind is paused
    MintingPaused { kind: MintingKind },

    /// Operation would produce nothing
    ZeroAmount,

    /// Result below the caller's slippage guard
    BelowMinimum { amount: u64, minimum: u64 },

    /// Scheduled upgrade is not yet executable
    UpgradeNotReady { effective_at: u64, now: u64 },

    /// Supplied program does not match the committed hash
    CodeHashMismatch { program: ProgramKind },

    /// Delayed mint cannot be claimed yet
    DelayedMintNotReady { eligible_round: u64, current_round: u64 },

    /// Raw parameter has the wrong width
    InvalidLength { param: &'static str, expected: usize, actual: usize },

    /// Transaction component has the wrong shape (rekey, close-out, sender, receiver...)
    InvalidTransaction { reason: &'static str },

    /// Unknown operation code or missing operation parameter
    InvalidCall { reason: &'static str },

    /// Payment amount does not match what the operation expects
    PaymentMismatch { expected: u64, actual: u64 },

    // ============ Arithmetic Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,

    /// Proposer active balance dropped since the last sync
    ActiveBalanceDecreased { last: u64, current: u64 },

    /// Rebalancing could not place the full amount
    AllocationIncomplete { remaining: u64 },

    // ============ Storage Errors ============
    /// Record already exists
    RecordExists { kind: RecordKind },

    /// Record does not exist
    RecordNotFound { kind: RecordKind },

    /// Stored record has an unexpected size
    RecordMalformed { kind: RecordKind, expected: usize, actual: usize },

    // ============ Ledger Errors ============
    /// Account cannot cover the transfer while keeping its minimum balance
    InsufficientBalance { account: Address, available: u64, requested: u64 },

    /// Account is not opted in to the asset
    NotOptedIn { account: Address, asset_id: AssetId },

    /// Account unknown to the ledger
    AccountNotFound { account: Address },

    /// xGov registry unknown to the ledger
    RegistryNotFound { registry_id: u64 },
}

/// Programs committed to by a scheduled upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Approval,
    Clear,
}

/// Persisted record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ProposerList,
    ProposerAdmin,
    PendingUpgrade,
    DelayedMint,
}

impl ConsensusError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::RoleUpdateUnauthorized { .. } => "E002_ROLE_UPDATE_UNAUTHORIZED",
            Self::NotProposerAdmin { .. } => "E003_NOT_PROPOSER_ADMIN",
            Self::NotInitialised => "E010_NOT_INITIALISED",
            Self::AlreadyInitialised => "E011_ALREADY_INITIALISED",
            Self::PoolAtCapacity { .. } => "E012_POOL_AT_CAPACITY",
            Self::NoProposers => "E013_NO_PROPOSERS",
            Self::ProposerIndexOutOfRange { .. } => "E014_PROPOSER_INDEX",
            Self::ProposerNotDelegated { .. } => "E015_PROPOSER_NOT_DELEGATED",
            Self::ProposerBalanceCapExceeded { .. } => "E016_PROPOSER_CAP",
            Self::FeeTooHigh { .. } => "E017_FEE_TOO_HIGH",
            Self::PremiumTooHigh { .. } => "E018_PREMIUM_TOO_HIGH",
            Self::MintingPaused { .. } => "E019_MINTING_PAUSED",
            Self::ZeroAmount => "E020_ZERO_AMOUNT",
            Self::BelowMinimum { .. } => "E021_BELOW_MINIMUM",
            Self::UpgradeNotReady { .. } => "E022_UPGRADE_NOT_READY",
            Self::CodeHashMismatch { .. } => "E023_CODE_HASH_MISMATCH",
            Self::DelayedMintNotReady { .. } => "E024_DELAYED_MINT_NOT_READY",
            Self::InvalidLength { .. } => "E025_INVALID_LENGTH",
            Self::InvalidTransaction { .. } => "E026_INVALID_TXN",
            Self::InvalidCall { .. } => "E027_INVALID_CALL",
            Self::PaymentMismatch { .. } => "E028_PAYMENT_MISMATCH",
            Self::Overflow => "E030_OVERFLOW",
            Self::Underflow => "E031_UNDERFLOW",
            Self::DivisionByZero => "E032_DIV_ZERO",
            Self::ActiveBalanceDecreased { .. } => "E033_ACTIVE_BALANCE_DECREASED",
            Self::AllocationIncomplete { .. } => "E034_ALLOCATION_INCOMPLETE",
            Self::RecordExists { .. } => "E040_RECORD_EXISTS",
            Self::RecordNotFound { .. } => "E041_RECORD_NOT_FOUND",
            Self::RecordMalformed { .. } => "E042_RECORD_MALFORMED",
            Self::InsufficientBalance { .. } => "E050_INSUFFICIENT_BALANCE",
            Self::NotOptedIn { .. } => "E051_NOT_OPTED_IN",
            Self::AccountNotFound { .. } => "E052_ACCOUNT_NOT_FOUND",
            Self::RegistryNotFound { .. } => "E053_REGISTRY_NOT_FOUND",
        }
    }

    /// Returns true if the caller can fix the condition and resubmit
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::BelowMinimum { .. } => true,             // Lower min_received
            Self::DelayedMintNotReady { .. } => true,      // Wait for the round
            Self::UpgradeNotReady { .. } => true,          // Wait for the delay
            Self::InsufficientBalance { .. } => true,      // Top up the account
            Self::NotOptedIn { .. } => true,               // Opt in first
            Self::NotInitialised => true,                  // Call initialise
            _ => false,
        }
    }
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.code(), self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConsensusError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            ConsensusError::Unauthorized { expected: [1u8; 32], actual: [2u8; 32] },
            ConsensusError::NotProposerAdmin { proposer_index: 0, caller: [0u8; 32] },
            ConsensusError::NotInitialised,
            ConsensusError::AlreadyInitialised,
            ConsensusError::ZeroAmount,
            ConsensusError::Overflow,
            ConsensusError::Underflow,
            ConsensusError::RecordExists { kind: RecordKind::DelayedMint },
            ConsensusError::RecordNotFound { kind: RecordKind::DelayedMint },
            ConsensusError::ActiveBalanceDecreased { last: 2, current: 1 },
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_display_starts_with_code() {
        let err = ConsensusError::FeeTooHigh { fee: 10_001, max: 10_000 };
        let rendered = format!("{}", err);
        assert!(rendered.starts_with("E017_FEE_TOO_HIGH"));
    }

    #[test]
    fn test_recoverable() {
        assert!(ConsensusError::BelowMinimum { amount: 1, minimum: 2 }.is_recoverable());
        assert!(!ConsensusError::Overflow.is_recoverable());
    }
}

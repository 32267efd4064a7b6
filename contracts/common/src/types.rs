//! Core Types for the xALGO Consensus Pool
//!
//! This module defines the fundamental data structures shared by the
//! engine, the storage codec and the event log.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{fees, governance, minting::NONCE_SIZE, proposers};

/// Type alias for account addresses (32-byte public key)
pub type Address = [u8; 32];

/// Type alias for ledger asset identifiers
pub type AssetId = u64;

/// Type alias for application identifiers
pub type AppId = u64;

/// SHA-256 digest
pub type Hash32 = [u8; 32];

/// Per-depositor delayed mint nonce
pub type Nonce = [u8; NONCE_SIZE];

/// The all-zero address, meaning "unset" in transaction fields and records
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Roles ============

/// Administrator roles held in global state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum AdminRole {
    /// Protocol owner
    Admin = 0,
    /// Manages proposer registration and proposer admins
    RegisterAdmin = 1,
    /// Manages xGov subscriptions
    XGovAdmin = 2,
}

impl AdminRole {
    /// Global state key naming this role
    pub fn key(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::RegisterAdmin => "register_admin",
            AdminRole::XGovAdmin => "xgov_admin",
        }
    }

    /// Parse a role from its global state key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "admin" => Some(AdminRole::Admin),
            "register_admin" => Some(AdminRole::RegisterAdmin),
            "xgov_admin" => Some(AdminRole::XGovAdmin),
            _ => None,
        }
    }
}

/// Minting paths that can be paused independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum MintingKind {
    /// Mint at the current rate in the same call
    Immediate = 0,
    /// Two-phase mint priced after the round delay
    Delayed = 1,
}

impl MintingKind {
    /// Global state key of the flag enabling this path
    pub fn key(&self) -> &'static str {
        match self {
            MintingKind::Immediate => "can_immediate_mint",
            MintingKind::Delayed => "can_delay_mint",
        }
    }

    /// Parse a minting kind from its flag key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "can_immediate_mint" => Some(MintingKind::Immediate),
            "can_delay_mint" => Some(MintingKind::Delayed),
            _ => None,
        }
    }
}

// ============ Global State ============

/// Singleton global parameters of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GlobalState {
    /// Cleared by every code upgrade; operations require it set
    pub initialised: bool,
    /// Protocol owner
    pub admin: Address,
    /// Manages proposers and their admins
    pub register_admin: Address,
    /// Manages xGov subscriptions
    pub xgov_admin: Address,
    /// Derivative token asset id
    pub x_algo_id: AssetId,
    /// Governance delay in seconds
    pub time_delay: u64,
    /// Number of proposers in the proposer list
    pub num_proposers: u64,
    /// Cap on a single proposer's balance when depositing
    pub max_proposer_balance: u64,
    /// Fee on rewards (4 d.p.)
    pub fee: u64,
    /// Immediate mint discount (16 d.p.)
    pub premium: u64,
    /// Proposers' balance (excluding reserves and pending stake) at last sync
    pub last_proposers_active_balance: u64,
    /// Stake deposited through delayed mints not yet claimed
    pub total_pending_stake: u64,
    /// Fees accrued but not yet paid to the admin
    pub total_unclaimed_fees: u64,
    /// Whether immediate minting is enabled
    pub can_immediate_mint: bool,
    /// Whether delayed minting is enabled
    pub can_delay_mint: bool,
}

impl GlobalState {
    /// Creates the state of a freshly deployed, not yet initialised pool
    pub fn new(admin: Address, register_admin: Address, xgov_admin: Address, x_algo_id: AssetId) -> Self {
        Self {
            initialised: false,
            admin,
            register_admin,
            xgov_admin,
            x_algo_id,
            time_delay: governance::DEFAULT_TIME_DELAY,
            num_proposers: 0,
            max_proposer_balance: proposers::DEFAULT_MAX_PROPOSER_BALANCE,
            fee: fees::DEFAULT_FEE,
            premium: fees::DEFAULT_PREMIUM,
            last_proposers_active_balance: 0,
            total_pending_stake: 0,
            total_unclaimed_fees: 0,
            can_immediate_mint: true,
            can_delay_mint: true,
        }
    }

    /// Address currently holding the role
    pub fn role(&self, role: AdminRole) -> Address {
        match role {
            AdminRole::Admin => self.admin,
            AdminRole::RegisterAdmin => self.register_admin,
            AdminRole::XGovAdmin => self.xgov_admin,
        }
    }

    /// Replace the holder of a role
    pub fn set_role(&mut self, role: AdminRole, address: Address) {
        match role {
            AdminRole::Admin => self.admin = address,
            AdminRole::RegisterAdmin => self.register_admin = address,
            AdminRole::XGovAdmin => self.xgov_admin = address,
        }
    }

    /// Whether the given minting path is enabled
    pub fn can_mint(&self, kind: MintingKind) -> bool {
        match kind {
            MintingKind::Immediate => self.can_immediate_mint,
            MintingKind::Delayed => self.can_delay_mint,
        }
    }

    /// Enable or disable a minting path
    pub fn set_can_mint(&mut self, kind: MintingKind, enabled: bool) {
        match kind {
            MintingKind::Immediate => self.can_immediate_mint = enabled,
            MintingKind::Delayed => self.can_delay_mint = enabled,
        }
    }

    /// Serialize state to bytes for snapshots
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize state from snapshot bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

// ============ Transaction Components ============

/// Rekey and close-out fields of a transaction (zero address = unset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TxnShape {
    pub rekey_to: Address,
    pub close_remainder_to: Address,
    pub asset_close_to: Address,
}

/// ALGO payment grouped with a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PaymentTxn {
    pub sender: Address,
    pub receiver: Address,
    pub amount: u64,
    pub shape: TxnShape,
}

impl PaymentTxn {
    /// Plain payment with no rekey or close-out
    pub fn new(sender: Address, receiver: Address, amount: u64) -> Self {
        Self { sender, receiver, amount, shape: TxnShape::default() }
    }
}

/// Asset transfer grouped with a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AssetTransferTxn {
    pub sender: Address,
    pub receiver: Address,
    pub asset_id: AssetId,
    pub amount: u64,
    pub shape: TxnShape,
}

impl AssetTransferTxn {
    /// Plain asset transfer with no rekey or close-out
    pub fn new(sender: Address, receiver: Address, asset_id: AssetId, amount: u64) -> Self {
        Self { sender, receiver, asset_id, amount, shape: TxnShape::default() }
    }
}

/// Participation keys for taking a proposer online
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct KeyRegistration {
    pub vote_key: [u8; 32],
    pub selection_key: [u8; 32],
    pub state_proof_key: [u8; 64],
    pub vote_first: u64,
    pub vote_last: u64,
    pub vote_key_dilution: u64,
}

// ============ Query Results ============

/// Snapshot returned by the rate query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RateSnapshot {
    /// Backing value: active balance minus unclaimed fees
    pub algo_balance: u64,
    /// Derivative tokens outside the application account
    pub x_algo_circulating_supply: u64,
    /// Full balance of each proposer, in index order
    pub proposers_balances: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_keys_roundtrip() {
        for role in [AdminRole::Admin, AdminRole::RegisterAdmin, AdminRole::XGovAdmin] {
            assert_eq!(AdminRole::from_key(role.key()), Some(role));
        }
        assert_eq!(AdminRole::from_key("owner"), None);
    }

    #[test]
    fn test_set_role() {
        let mut state = GlobalState::new([1u8; 32], [2u8; 32], [3u8; 32], 7);
        state.set_role(AdminRole::XGovAdmin, [9u8; 32]);
        assert_eq!(state.role(AdminRole::XGovAdmin), [9u8; 32]);
        assert_eq!(state.role(AdminRole::Admin), [1u8; 32]);
    }

    #[test]
    fn test_minting_flags() {
        let mut state = GlobalState::new([1u8; 32], [2u8; 32], [3u8; 32], 7);
        assert!(state.can_mint(MintingKind::Immediate));
        state.set_can_mint(MintingKind::Immediate, false);
        assert!(!state.can_mint(MintingKind::Immediate));
        assert!(state.can_mint(MintingKind::Delayed));
        assert_eq!(MintingKind::from_key("can_delay_mint"), Some(MintingKind::Delayed));
    }

    #[test]
    fn test_state_snapshot() {
        let mut state = GlobalState::new([1u8; 32], [2u8; 32], [3u8; 32], 7);
        state.total_pending_stake = 42;
        let restored = GlobalState::from_bytes(&state.to_bytes()).unwrap();
        assert_eq!(state, restored);
    }
}

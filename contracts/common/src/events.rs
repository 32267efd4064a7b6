//! Protocol Events for the xALGO Consensus Pool
//!
//! Every state-changing operation emits one event. Events are collected in
//! an [`EventLog`] and only published when the operation commits.
//!
//! Besides borsh/serde serialization, each event has a stable indexer
//! encoding: a 4-byte selector (first 4 bytes of SHA-512/256 of the event
//! signature) followed by the fixed-width big-endian fields.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use crate::types::{Address, AdminRole, AppId, Hash32, MintingKind, Nonce};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Governance Events (0x01 - 0x1F)
    Initialised = 0x01,
    AdminUpdated = 0x02,
    UpdateScheduled = 0x03,
    ContractUpdated = 0x04,
    MaxProposerBalanceUpdated = 0x05,
    FeeUpdated = 0x06,
    PremiumUpdated = 0x07,
    MintingPaused = 0x08,

    // Proposer Events (0x20 - 0x3F)
    ProposerAdded = 0x20,
    ProposerAdminSet = 0x21,
    RegisteredOnline = 0x22,
    RegisteredOffline = 0x23,
    XGovSubscribed = 0x24,
    XGovUnsubscribed = 0x25,

    // Pool Events (0x40 - 0x5F)
    FeeClaimed = 0x40,
    ImmediateMint = 0x41,
    DelayedMint = 0x42,
    ClaimDelayedMint = 0x43,
    Burn = 0x44,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum ConsensusEvent {
    // ============ Governance Events ============

    /// Emitted when the pool is (re-)initialised
    Initialised { by: Address, round: u64 },

    /// Emitted when a role changes hands
    AdminUpdated {
        role: AdminRole,
        old_admin: Address,
        new_admin: Address,
        round: u64,
    },

    /// Emitted when a code upgrade is committed
    UpdateScheduled {
        effective_at: u64,
        approval_sha256: Hash32,
        clear_sha256: Hash32,
        round: u64,
    },

    /// Emitted when a committed upgrade is executed
    ContractUpdated {
        approval_sha256: Hash32,
        clear_sha256: Hash32,
        refunded: u64,
        round: u64,
    },

    /// Emitted when the per-proposer cap changes
    MaxProposerBalanceUpdated { max_proposer_balance: u64, round: u64 },

    /// Emitted when the fee changes
    FeeUpdated { fee: u64, round: u64 },

    /// Emitted when the premium changes
    PremiumUpdated { premium: u64, round: u64 },

    /// Emitted when a minting path is paused or resumed
    MintingPaused { kind: MintingKind, paused: bool, round: u64 },

    // ============ Proposer Events ============

    /// Emitted when a proposer joins the pool
    ProposerAdded { proposer: Address, index: u8, round: u64 },

    /// Emitted when a proposer admin is assigned
    ProposerAdminSet {
        proposer: Address,
        admin: Address,
        effective_at: u64,
        round: u64,
    },

    /// Emitted when a proposer registers participation keys
    RegisteredOnline {
        proposer: Address,
        vote_key: [u8; 32],
        selection_key: [u8; 32],
        vote_first: u64,
        vote_last: u64,
        fee: u64,
        round: u64,
    },

    /// Emitted when a proposer goes offline
    RegisteredOffline { proposer: Address, round: u64 },

    /// Emitted when a proposer subscribes to xGov
    XGovSubscribed {
        proposer: Address,
        registry_id: AppId,
        voting_address: Address,
        fee: u64,
        round: u64,
    },

    /// Emitted when a proposer unsubscribes from xGov
    XGovUnsubscribed { proposer: Address, registry_id: AppId, round: u64 },

    // ============ Pool Events ============

    /// Emitted when accrued fees are paid to the admin
    FeeClaimed { admin: Address, amount: u64, round: u64 },

    /// Emitted on immediate mint
    ImmediateMint {
        sender: Address,
        receiver: Address,
        algo_sent: u64,
        x_algo_minted: u64,
        round: u64,
    },

    /// Emitted when a delayed mint is queued
    DelayedMint {
        sender: Address,
        nonce: Nonce,
        receiver: Address,
        stake: u64,
        eligible_round: u64,
        round: u64,
    },

    /// Emitted when a delayed mint is settled
    ClaimDelayedMint {
        minter: Address,
        nonce: Nonce,
        receiver: Address,
        stake: u64,
        x_algo_minted: u64,
        round: u64,
    },

    /// Emitted on burn
    Burn {
        sender: Address,
        receiver: Address,
        x_algo_burned: u64,
        algo_sent: u64,
        round: u64,
    },
}

impl ConsensusEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Initialised { .. } => EventType::Initialised,
            Self::AdminUpdated { .. } => EventType::AdminUpdated,
            Self::UpdateScheduled { .. } => EventType::UpdateScheduled,
            Self::ContractUpdated { .. } => EventType::ContractUpdated,
            Self::MaxProposerBalanceUpdated { .. } => EventType::MaxProposerBalanceUpdated,
            Self::FeeUpdated { .. } => EventType::FeeUpdated,
            Self::PremiumUpdated { .. } => EventType::PremiumUpdated,
            Self::MintingPaused { .. } => EventType::MintingPaused,
            Self::ProposerAdded { .. } => EventType::ProposerAdded,
            Self::ProposerAdminSet { .. } => EventType::ProposerAdminSet,
            Self::RegisteredOnline { .. } => EventType::RegisteredOnline,
            Self::RegisteredOffline { .. } => EventType::RegisteredOffline,
            Self::XGovSubscribed { .. } => EventType::XGovSubscribed,
            Self::XGovUnsubscribed { .. } => EventType::XGovUnsubscribed,
            Self::FeeClaimed { .. } => EventType::FeeClaimed,
            Self::ImmediateMint { .. } => EventType::ImmediateMint,
            Self::DelayedMint { .. } => EventType::DelayedMint,
            Self::ClaimDelayedMint { .. } => EventType::ClaimDelayedMint,
            Self::Burn { .. } => EventType::Burn,
        }
    }

    /// Get the round when the event occurred
    pub fn round(&self) -> u64 {
        match self {
            Self::Initialised { round, .. }
            | Self::AdminUpdated { round, .. }
            | Self::UpdateScheduled { round, .. }
            | Self::ContractUpdated { round, .. }
            | Self::MaxProposerBalanceUpdated { round, .. }
            | Self::FeeUpdated { round, .. }
            | Self::PremiumUpdated { round, .. }
            | Self::MintingPaused { round, .. }
            | Self::ProposerAdded { round, .. }
            | Self::ProposerAdminSet { round, .. }
            | Self::RegisteredOnline { round, .. }
            | Self::RegisteredOffline { round, .. }
            | Self::XGovSubscribed { round, .. }
            | Self::XGovUnsubscribed { round, .. }
            | Self::FeeClaimed { round, .. }
            | Self::ImmediateMint { round, .. }
            | Self::DelayedMint { round, .. }
            | Self::ClaimDelayedMint { round, .. }
            | Self::Burn { round, .. } => *round,
        }
    }

    /// Event signature hashed into the log selector
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Initialised { .. } => "Initialised(address)",
            Self::AdminUpdated { .. } => "AdminUpdated(uint8,address,address)",
            Self::UpdateScheduled { .. } => "UpdateScheduled(uint64,byte[32],byte[32])",
            Self::ContractUpdated { .. } => "ContractUpdated(byte[32],byte[32],uint64)",
            Self::MaxProposerBalanceUpdated { .. } => "UpdateMaxProposerBalance(uint64)",
            Self::FeeUpdated { .. } => "UpdateFee(uint64)",
            Self::PremiumUpdated { .. } => "UpdatePremium(uint64)",
            Self::MintingPaused { .. } => "PauseMinting(uint8,uint64)",
            Self::ProposerAdded { .. } => "AddProposer(address)",
            Self::ProposerAdminSet { .. } => "SetProposerAdmin(address,address,uint64)",
            Self::RegisteredOnline { .. } => "RegisterOnline(address,address,address,uint64,uint64,uint64)",
            Self::RegisteredOffline { .. } => "RegisterOffline(address)",
            Self::XGovSubscribed { .. } => "SubscribeXGov(address,uint64,address,uint64)",
            Self::XGovUnsubscribed { .. } => "UnsubscribeXGov(address,uint64)",
            Self::FeeClaimed { .. } => "ClaimFee(address,uint64)",
            Self::ImmediateMint { .. } => "ImmediateMint(address,address,uint64,uint64)",
            Self::DelayedMint { .. } => "DelayedMint(byte[36],address,address,uint64)",
            Self::ClaimDelayedMint { .. } => "ClaimDelayedMint(byte[36],address,address,uint64,uint64)",
            Self::Burn { .. } => "Burn(address,uint64,uint64)",
        }
    }

    /// First 4 bytes of SHA-512/256 of the signature
    pub fn selector(&self) -> [u8; 4] {
        let digest = Sha512_256::digest(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        selector
    }

    /// Stable indexer encoding: selector followed by fixed-width fields
    pub fn encode_log(&self) -> Vec<u8> {
        let mut log = Vec::new();
        log.extend_from_slice(&self.selector());
        match self {
            Self::Initialised { by, .. } => log.extend_from_slice(by),
            Self::AdminUpdated { role, old_admin, new_admin, .. } => {
                log.push(*role as u8);
                log.extend_from_slice(old_admin);
                log.extend_from_slice(new_admin);
            }
            Self::UpdateScheduled { effective_at, approval_sha256, clear_sha256, .. } => {
                log.extend_from_slice(&effective_at.to_be_bytes());
                log.extend_from_slice(approval_sha256);
                log.extend_from_slice(clear_sha256);
            }
            Self::ContractUpdated { approval_sha256, clear_sha256, refunded, .. } => {
                log.extend_from_slice(approval_sha256);
                log.extend_from_slice(clear_sha256);
                log.extend_from_slice(&refunded.to_be_bytes());
            }
            Self::MaxProposerBalanceUpdated { max_proposer_balance, .. } => {
                log.extend_from_slice(&max_proposer_balance.to_be_bytes());
            }
            Self::FeeUpdated { fee, .. } => log.extend_from_slice(&fee.to_be_bytes()),
            Self::PremiumUpdated { premium, .. } => log.extend_from_slice(&premium.to_be_bytes()),
            Self::MintingPaused { kind, paused, .. } => {
                log.push(*kind as u8);
                log.extend_from_slice(&(*paused as u64).to_be_bytes());
            }
            Self::ProposerAdded { proposer, .. } => log.extend_from_slice(proposer),
            Self::ProposerAdminSet { proposer, admin, effective_at, .. } => {
                log.extend_from_slice(proposer);
                log.extend_from_slice(admin);
                log.extend_from_slice(&effective_at.to_be_bytes());
            }
            Self::RegisteredOnline { proposer, vote_key, selection_key, vote_first, vote_last, fee, .. } => {
                log.extend_from_slice(proposer);
                log.extend_from_slice(vote_key);
                log.extend_from_slice(selection_key);
                log.extend_from_slice(&vote_first.to_be_bytes());
                log.extend_from_slice(&vote_last.to_be_bytes());
                log.extend_from_slice(&fee.to_be_bytes());
            }
            Self::RegisteredOffline { proposer, .. } => log.extend_from_slice(proposer),
            Self::XGovSubscribed { proposer, registry_id, voting_address, fee, .. } => {
                log.extend_from_slice(proposer);
                log.extend_from_slice(&registry_id.to_be_bytes());
                log.extend_from_slice(voting_address);
                log.extend_from_slice(&fee.to_be_bytes());
            }
            Self::XGovUnsubscribed { proposer, registry_id, .. } => {
                log.extend_from_slice(proposer);
                log.extend_from_slice(&registry_id.to_be_bytes());
            }
            Self::FeeClaimed { admin, amount, .. } => {
                log.extend_from_slice(admin);
                log.extend_from_slice(&amount.to_be_bytes());
            }
            Self::ImmediateMint { sender, receiver, algo_sent, x_algo_minted, .. } => {
                log.extend_from_slice(sender);
                log.extend_from_slice(receiver);
                log.extend_from_slice(&algo_sent.to_be_bytes());
                log.extend_from_slice(&x_algo_minted.to_be_bytes());
            }
            Self::DelayedMint { sender, nonce, receiver, stake, .. } => {
                // record name "dm" ++ sender ++ nonce identifies the request
                log.extend_from_slice(crate::constants::records::DELAY_MINT_PREFIX);
                log.extend_from_slice(sender);
                log.extend_from_slice(nonce);
                log.extend_from_slice(sender);
                log.extend_from_slice(receiver);
                log.extend_from_slice(&stake.to_be_bytes());
            }
            Self::ClaimDelayedMint { minter, nonce, receiver, stake, x_algo_minted, .. } => {
                log.extend_from_slice(crate::constants::records::DELAY_MINT_PREFIX);
                log.extend_from_slice(minter);
                log.extend_from_slice(nonce);
                log.extend_from_slice(minter);
                log.extend_from_slice(receiver);
                log.extend_from_slice(&stake.to_be_bytes());
                log.extend_from_slice(&x_algo_minted.to_be_bytes());
            }
            Self::Burn { sender, x_algo_burned, algo_sent, .. } => {
                log.extend_from_slice(sender);
                log.extend_from_slice(&x_algo_burned.to_be_bytes());
                log.extend_from_slice(&algo_sent.to_be_bytes());
            }
        }
        log
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

/// Event log for collecting multiple events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ConsensusEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: ConsensusEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[ConsensusEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<ConsensusEvent> {
        self.events
    }

    /// Append every event of another log
    pub fn extend(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&ConsensusEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&ConsensusEvent> {
        self.events.last()
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

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

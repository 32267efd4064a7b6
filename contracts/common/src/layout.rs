//! Storage Layout Codec
//!
//! Persistent records are fixed-offset byte strings. Field order and width
//! match the deployed pool, except that the proposer-admin record extends
//! the deployed 40-byte layout with the previous admin at offset 40.
//!
//! | Record          | Name                        | Layout                                        |
//! |-----------------|-----------------------------|-----------------------------------------------|
//! | Proposer list   | `pr`                        | 30 × address                                  |
//! | Proposer admin  | `ap` ++ proposer            | empty, or timestamp @0, admin @8, previous @40 |
//! | Pending upgrade | `sc`                        | timestamp @0, approval @8, clear @40          |
//! | Delayed mint    | `dm` ++ depositor ++ nonce  | receiver @0, stake @32, round @40             |
//!
//! Integers are big-endian.

use crate::Vec;
use crate::constants::proposers::{ADDRESS_SIZE, MAX_NUM_PROPOSERS};
use crate::constants::records;
use crate::errors::{ConsensusError, ConsensusResult, RecordKind};
use crate::types::{Address, Hash32, Nonce, ZERO_ADDRESS};

/// A record with a fixed encoded size
pub trait FixedRecord: Sized {
    /// Kind reported in storage errors
    const KIND: RecordKind;
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode into exactly `SIZE` bytes
    fn encode(&self) -> Vec<u8>;

    /// Decode from exactly `SIZE` bytes
    fn decode(bytes: &[u8]) -> ConsensusResult<Self>;
}

fn check_size(kind: RecordKind, expected: usize, bytes: &[u8]) -> ConsensusResult<()> {
    if bytes.len() != expected {
        return Err(ConsensusError::RecordMalformed { kind, expected, actual: bytes.len() });
    }
    Ok(())
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_be_bytes(buf)
}

fn read_address(bytes: &[u8], offset: usize) -> Address {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[offset..offset + 32]);
    buf
}

// ============ Record Names ============

/// Name of the admin record of a proposer
pub fn proposer_admin_record_name(proposer: &Address) -> Vec<u8> {
    let mut name = Vec::with_capacity(records::ADDED_PROPOSER_PREFIX.len() + 32);
    name.extend_from_slice(records::ADDED_PROPOSER_PREFIX);
    name.extend_from_slice(proposer);
    name
}

/// Name of a delayed mint record
pub fn delay_mint_record_name(depositor: &Address, nonce: &Nonce) -> Vec<u8> {
    let mut name = Vec::with_capacity(records::DELAY_MINT_PREFIX.len() + 32 + nonce.len());
    name.extend_from_slice(records::DELAY_MINT_PREFIX);
    name.extend_from_slice(depositor);
    name.extend_from_slice(nonce);
    name
}

// ============ Proposer List ============

/// Fixed-capacity, append-only list of proposer addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposerList {
    bytes: Vec<u8>,
}

impl ProposerList {
    /// Capacity in bytes
    pub const SIZE: usize = MAX_NUM_PROPOSERS as usize * ADDRESS_SIZE;

    /// Zero-filled list
    pub fn new() -> Self {
        Self { bytes: vec_of_zeros(Self::SIZE) }
    }

    /// Wrap stored bytes
    pub fn from_bytes(bytes: &[u8]) -> ConsensusResult<Self> {
        check_size(RecordKind::ProposerList, Self::SIZE, bytes)?;
        Ok(Self { bytes: bytes.to_vec() })
    }

    /// Stored bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Address at `index`, bounded by the number of registered proposers
    pub fn get(&self, index: u64, num_proposers: u64) -> ConsensusResult<Address> {
        if index >= num_proposers || index >= MAX_NUM_PROPOSERS {
            return Err(ConsensusError::ProposerIndexOutOfRange {
                index: index.min(u8::MAX as u64) as u8,
                num_proposers,
            });
        }
        Ok(read_address(&self.bytes, index as usize * ADDRESS_SIZE))
    }

    /// Write `proposer` into slot `index`
    pub fn set(&mut self, index: u64, proposer: &Address) -> ConsensusResult<()> {
        if index >= MAX_NUM_PROPOSERS {
            return Err(ConsensusError::PoolAtCapacity { max: MAX_NUM_PROPOSERS });
        }
        let offset = index as usize * ADDRESS_SIZE;
        self.bytes[offset..offset + ADDRESS_SIZE].copy_from_slice(proposer);
        Ok(())
    }

    /// Registered proposers in index order
    pub fn addresses(&self, num_proposers: u64) -> Vec<Address> {
        let count = num_proposers.min(MAX_NUM_PROPOSERS) as usize;
        (0..count)
            .map(|i| read_address(&self.bytes, i * ADDRESS_SIZE))
            .collect()
    }
}

impl Default for ProposerList {
    fn default() -> Self {
        Self::new()
    }
}

fn vec_of_zeros(len: usize) -> Vec<u8> {
    let mut v = Vec::with_capacity(len);
    v.resize(len, 0);
    v
}

// ============ Proposer Admin ============

/// Admin assignment of a proposer
///
/// The record is created empty when the proposer is added. Once populated,
/// `admin` becomes active at `timestamp`; until then `previous_admin` (if
/// any) keeps acting for the proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposerAdminRecord {
    pub timestamp: u64,
    pub admin: Address,
    pub previous_admin: Option<Address>,
}

impl ProposerAdminRecord {
    pub const TIMESTAMP: usize = 0;
    pub const ADMIN: usize = 8;
    pub const PREVIOUS_ADMIN: usize = 40;

    /// Admin entitled to act at `now`
    pub fn active_admin(&self, now: u64) -> Option<Address> {
        if now >= self.timestamp {
            Some(self.admin)
        } else {
            self.previous_admin
        }
    }

    /// Whether the record holds a change not yet in effect
    pub fn is_pending(&self, now: u64) -> bool {
        now < self.timestamp
    }
}

impl FixedRecord for ProposerAdminRecord {
    const KIND: RecordKind = RecordKind::ProposerAdmin;
    const SIZE: usize = 72;

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.admin);
        bytes.extend_from_slice(&self.previous_admin.unwrap_or(ZERO_ADDRESS));
        bytes
    }

    fn decode(bytes: &[u8]) -> ConsensusResult<Self> {
        check_size(Self::KIND, Self::SIZE, bytes)?;
        let previous = read_address(bytes, Self::PREVIOUS_ADMIN);
        Ok(Self {
            timestamp: read_u64(bytes, Self::TIMESTAMP),
            admin: read_address(bytes, Self::ADMIN),
            previous_admin: if previous == ZERO_ADDRESS { None } else { Some(previous) },
        })
    }
}

// ============ Pending Upgrade ============

/// Committed code upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingUpgrade {
    pub timestamp: u64,
    pub approval_sha256: Hash32,
    pub clear_sha256: Hash32,
}

impl PendingUpgrade {
    pub const TIMESTAMP: usize = 0;
    pub const APPROVAL: usize = 8;
    pub const CLEAR: usize = 40;
}

impl FixedRecord for PendingUpgrade {
    const KIND: RecordKind = RecordKind::PendingUpgrade;
    const SIZE: usize = 72;

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.approval_sha256);
        bytes.extend_from_slice(&self.clear_sha256);
        bytes
    }

    fn decode(bytes: &[u8]) -> ConsensusResult<Self> {
        check_size(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            timestamp: read_u64(bytes, Self::TIMESTAMP),
            approval_sha256: read_address(bytes, Self::APPROVAL),
            clear_sha256: read_address(bytes, Self::CLEAR),
        })
    }
}

// ============ Delayed Mint ============

/// Stake waiting to be priced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedMintRequest {
    pub receiver: Address,
    pub stake: u64,
    pub round: u64,
}

impl DelayedMintRequest {
    pub const RECEIVER: usize = 0;
    pub const STAKE: usize = 32;
    pub const ROUND: usize = 40;

    /// Whether the request can be claimed at `current_round`
    pub fn is_claimable(&self, current_round: u64) -> bool {
        current_round >= self.round
    }
}

impl FixedRecord for DelayedMintRequest {
    const KIND: RecordKind = RecordKind::DelayedMint;
    const SIZE: usize = 48;

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.receiver);
        bytes.extend_from_slice(&self.stake.to_be_bytes());
        bytes.extend_from_slice(&self.round.to_be_bytes());
        bytes
    }

    fn decode(bytes: &[u8]) -> ConsensusResult<Self> {
        check_size(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            receiver: read_address(bytes, Self::RECEIVER),
            stake: read_u64(bytes, Self::STAKE),
            round: read_u64(bytes, Self::ROUND),
        })
    }
}

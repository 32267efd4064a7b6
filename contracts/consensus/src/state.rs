//! Pool state: global parameters plus named byte records

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use xalgo_common::{
    constants::records,
    errors::{ConsensusError, ConsensusResult, RecordKind},
    layout::{
        delay_mint_record_name, proposer_admin_record_name, DelayedMintRequest, FixedRecord,
        PendingUpgrade, ProposerAdminRecord, ProposerList,
    },
    types::{Address, GlobalState, Nonce},
};

/// Everything the pool persists
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConsensusState {
    /// Singleton parameters
    pub global: GlobalState,
    /// Record name -> fixed-layout value
    records: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ConsensusState {
    /// State with no records
    pub fn new(global: GlobalState) -> Self {
        Self { global, records: BTreeMap::new() }
    }

    // ============ Raw Records ============

    /// Raw record value
    pub fn record(&self, name: &[u8]) -> Option<&[u8]> {
        self.records.get(name).map(|v| v.as_slice())
    }

    /// Whether a record exists
    pub fn has_record(&self, name: &[u8]) -> bool {
        self.records.contains_key(name)
    }

    /// Store a record, returning the previous value
    pub(crate) fn insert_record(&mut self, name: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        self.records.insert(name, value)
    }

    /// Remove a record, returning its value
    pub(crate) fn remove_record(&mut self, name: &[u8]) -> Option<Vec<u8>> {
        self.records.remove(name)
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ============ Typed Records ============

    /// The proposer list
    pub fn proposer_list(&self) -> ConsensusResult<ProposerList> {
        let bytes = self
            .record(records::PROPOSERS)
            .ok_or(ConsensusError::RecordNotFound { kind: RecordKind::ProposerList })?;
        ProposerList::from_bytes(bytes)
    }

    /// Address of the proposer at `index`
    pub fn proposer(&self, index: u8) -> ConsensusResult<Address> {
        self.proposer_list()?
            .get(index as u64, self.global.num_proposers)
    }

    /// Registered proposers in index order
    pub fn proposers(&self) -> ConsensusResult<Vec<Address>> {
        Ok(self.proposer_list()?.addresses(self.global.num_proposers))
    }

    /// Admin record of a proposer
    ///
    /// `Ok(None)` means the proposer was added but never assigned an admin.
    pub fn proposer_admin(&self, proposer: &Address) -> ConsensusResult<Option<ProposerAdminRecord>> {
        let bytes = self
            .record(&proposer_admin_record_name(proposer))
            .ok_or(ConsensusError::RecordNotFound { kind: RecordKind::ProposerAdmin })?;
        if bytes.is_empty() {
            return Ok(None);
        }
        ProposerAdminRecord::decode(bytes).map(Some)
    }

    /// Scheduled code upgrade, if any
    pub fn pending_upgrade(&self) -> ConsensusResult<Option<PendingUpgrade>> {
        self.record(records::SC_UPDATE)
            .map(PendingUpgrade::decode)
            .transpose()
    }

    /// Delayed mint request of `depositor` under `nonce`
    pub fn delayed_mint(&self, depositor: &Address, nonce: &Nonce) -> ConsensusResult<DelayedMintRequest> {
        let bytes = self
            .record(&delay_mint_record_name(depositor, nonce))
            .ok_or(ConsensusError::RecordNotFound { kind: RecordKind::DelayedMint })?;
        DelayedMintRequest::decode(bytes)
    }
}

//! Call Encoding
//!
//! Calls arrive as a CBOR-encoded [`ConsensusWitness`]: an operation code
//! plus the optional fields that operation reads. Raw byte fields (addresses,
//! hashes, keys, nonces) are length-checked when converted to a
//! [`ConsensusAction`].

use serde::{Deserialize, Serialize};

use xalgo_common::{
    errors::{ConsensusError, ConsensusResult},
    types::{AdminRole, AppId, AssetTransferTxn, KeyRegistration, MintingKind, PaymentTxn},
    validation::{parse_address, parse_hash, parse_nonce, parse_state_proof_key},
};

use crate::ConsensusAction;

// ============ Operation Codes ============

/// Operation codes (encoded in the witness)
pub mod op {
    // Governance
    pub const INITIALISE: u8 = 0x00;
    pub const UPDATE_ADMIN: u8 = 0x01;
    pub const SCHEDULE_UPDATE_SC: u8 = 0x02;
    pub const UPDATE_SC: u8 = 0x03;

    // Proposers
    pub const ADD_PROPOSER: u8 = 0x10;
    pub const SET_PROPOSER_ADMIN: u8 = 0x11;
    pub const REGISTER_ONLINE: u8 = 0x12;
    pub const REGISTER_OFFLINE: u8 = 0x13;
    pub const SUBSCRIBE_XGOV: u8 = 0x14;
    pub const UNSUBSCRIBE_XGOV: u8 = 0x15;

    // Parameters
    pub const UPDATE_MAX_PROPOSER_BALANCE: u8 = 0x20;
    pub const UPDATE_FEE: u8 = 0x21;
    pub const UPDATE_PREMIUM: u8 = 0x22;
    pub const PAUSE_MINTING: u8 = 0x23;
    pub const CLAIM_FEE: u8 = 0x24;

    // Exchange
    pub const IMMEDIATE_MINT: u8 = 0x30;
    pub const DELAYED_MINT: u8 = 0x31;
    pub const CLAIM_DELAYED_MINT: u8 = 0x32;
    pub const BURN: u8 = 0x33;
    pub const GET_RATE: u8 = 0x34;
}

// ============ Witness ============

/// Witness data for every pool operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusWitness {
    /// Operation type (see `op` module)
    pub op: u8,
    /// New admin, proposer or minter
    pub address: Option<Vec<u8>>,
    /// Receiver of minted xALGO or burn proceeds
    pub receiver: Option<Vec<u8>>,
    /// xGov voting address
    pub voting_address: Option<Vec<u8>>,
    /// Fee, premium, balance cap or slippage minimum
    pub amount: Option<u64>,
    /// Proposer index
    pub index: Option<u8>,
    /// Role key, e.g. `register_admin`
    pub role: Option<String>,
    /// Minting flag key, e.g. `can_delay_mint`
    pub minting_type: Option<String>,
    /// Pause flag
    pub flag: Option<bool>,
    pub nonce: Option<Vec<u8>>,
    /// Approval program hash (schedule) or program (update)
    pub approval: Option<Vec<u8>>,
    /// Clear program hash (schedule) or program (update)
    pub clear: Option<Vec<u8>>,
    pub vote_key: Option<Vec<u8>>,
    pub selection_key: Option<Vec<u8>>,
    pub state_proof_key: Option<Vec<u8>>,
    pub vote_first: Option<u64>,
    pub vote_last: Option<u64>,
    pub vote_key_dilution: Option<u64>,
    pub registry_id: Option<AppId>,
    /// Grouped ALGO payment
    pub payment: Option<PaymentTxn>,
    /// Grouped xALGO transfer
    pub asset_transfer: Option<AssetTransferTxn>,
}

impl ConsensusWitness {
    fn with_op(op: u8) -> Self {
        Self { op, ..Self::default() }
    }

    pub fn initialise() -> Self {
        Self::with_op(op::INITIALISE)
    }

    pub fn update_admin(role: AdminRole, new_admin: &[u8]) -> Self {
        Self {
            role: Some(role.key().to_string()),
            address: Some(new_admin.to_vec()),
            ..Self::with_op(op::UPDATE_ADMIN)
        }
    }

    pub fn schedule_update_sc(approval_sha256: &[u8], clear_sha256: &[u8]) -> Self {
        Self {
            approval: Some(approval_sha256.to_vec()),
            clear: Some(clear_sha256.to_vec()),
            ..Self::with_op(op::SCHEDULE_UPDATE_SC)
        }
    }

    pub fn update_sc(approval_program: &[u8], clear_program: &[u8]) -> Self {
        Self {
            approval: Some(approval_program.to_vec()),
            clear: Some(clear_program.to_vec()),
            ..Self::with_op(op::UPDATE_SC)
        }
    }

    pub fn add_proposer(proposer: &[u8]) -> Self {
        Self { address: Some(proposer.to_vec()), ..Self::with_op(op::ADD_PROPOSER) }
    }

    pub fn set_proposer_admin(index: u8, new_admin: &[u8]) -> Self {
        Self {
            index: Some(index),
            address: Some(new_admin.to_vec()),
            ..Self::with_op(op::SET_PROPOSER_ADMIN)
        }
    }

    pub fn register_online(payment: PaymentTxn, index: u8, keys: &KeyRegistration) -> Self {
        Self {
            payment: Some(payment),
            index: Some(index),
            vote_key: Some(keys.vote_key.to_vec()),
            selection_key: Some(keys.selection_key.to_vec()),
            state_proof_key: Some(keys.state_proof_key.to_vec()),
            vote_first: Some(keys.vote_first),
            vote_last: Some(keys.vote_last),
            vote_key_dilution: Some(keys.vote_key_dilution),
            ..Self::with_op(op::REGISTER_ONLINE)
        }
    }

    pub fn register_offline(index: u8) -> Self {
        Self { index: Some(index), ..Self::with_op(op::REGISTER_OFFLINE) }
    }

    pub fn subscribe_xgov(payment: PaymentTxn, index: u8, registry_id: AppId, voting_address: &[u8]) -> Self {
        Self {
            payment: Some(payment),
            index: Some(index),
            registry_id: Some(registry_id),
            voting_address: Some(voting_address.to_vec()),
            ..Self::with_op(op::SUBSCRIBE_XGOV)
        }
    }

    pub fn unsubscribe_xgov(index: u8, registry_id: AppId) -> Self {
        Self {
            index: Some(index),
            registry_id: Some(registry_id),
            ..Self::with_op(op::UNSUBSCRIBE_XGOV)
        }
    }

    pub fn update_max_proposer_balance(max_proposer_balance: u64) -> Self {
        Self { amount: Some(max_proposer_balance), ..Self::with_op(op::UPDATE_MAX_PROPOSER_BALANCE) }
    }

    pub fn update_fee(fee: u64) -> Self {
        Self { amount: Some(fee), ..Self::with_op(op::UPDATE_FEE) }
    }

    pub fn update_premium(premium: u64) -> Self {
        Self { amount: Some(premium), ..Self::with_op(op::UPDATE_PREMIUM) }
    }

    pub fn pause_minting(kind: MintingKind, to_pause: bool) -> Self {
        Self {
            minting_type: Some(kind.key().to_string()),
            flag: Some(to_pause),
            ..Self::with_op(op::PAUSE_MINTING)
        }
    }

    pub fn claim_fee() -> Self {
        Self::with_op(op::CLAIM_FEE)
    }

    pub fn immediate_mint(payment: PaymentTxn, receiver: &[u8], min_received: u64) -> Self {
        Self {
            payment: Some(payment),
            receiver: Some(receiver.to_vec()),
            amount: Some(min_received),
            ..Self::with_op(op::IMMEDIATE_MINT)
        }
    }

    pub fn delayed_mint(payment: PaymentTxn, receiver: &[u8], nonce: &[u8]) -> Self {
        Self {
            payment: Some(payment),
            receiver: Some(receiver.to_vec()),
            nonce: Some(nonce.to_vec()),
            ..Self::with_op(op::DELAYED_MINT)
        }
    }

    pub fn claim_delayed_mint(minter: &[u8], nonce: &[u8]) -> Self {
        Self {
            address: Some(minter.to_vec()),
            nonce: Some(nonce.to_vec()),
            ..Self::with_op(op::CLAIM_DELAYED_MINT)
        }
    }

    pub fn burn(transfer: AssetTransferTxn, receiver: &[u8], min_received: u64) -> Self {
        Self {
            asset_transfer: Some(transfer),
            receiver: Some(receiver.to_vec()),
            amount: Some(min_received),
            ..Self::with_op(op::BURN)
        }
    }

    pub fn get_rate() -> Self {
        Self::with_op(op::GET_RATE)
    }
}

// ============ Codec ============

/// Decode a CBOR witness
pub fn decode_witness(bytes: &[u8]) -> ConsensusResult<ConsensusWitness> {
    ciborium::from_reader(bytes).map_err(|_| ConsensusError::InvalidCall { reason: "malformed witness" })
}

/// Encode a witness as CBOR
pub fn encode_witness(witness: &ConsensusWitness) -> ConsensusResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(witness, &mut bytes)
        .map_err(|_| ConsensusError::InvalidCall { reason: "unencodable witness" })?;
    Ok(bytes)
}

fn required<T: Clone>(field: &Option<T>, reason: &'static str) -> ConsensusResult<T> {
    field.clone().ok_or(ConsensusError::InvalidCall { reason })
}

fn required_bytes<'a>(field: &'a Option<Vec<u8>>, reason: &'static str) -> ConsensusResult<&'a [u8]> {
    field.as_deref().ok_or(ConsensusError::InvalidCall { reason })
}

fn required_str<'a>(field: &'a Option<String>, reason: &'static str) -> ConsensusResult<&'a str> {
    field.as_deref().ok_or(ConsensusError::InvalidCall { reason })
}

fn key_registration(w: &ConsensusWitness) -> ConsensusResult<KeyRegistration> {
    Ok(KeyRegistration {
        vote_key: parse_hash("vote_key", required_bytes(&w.vote_key, "missing vote_key")?)?,
        selection_key: parse_hash("selection_key", required_bytes(&w.selection_key, "missing selection_key")?)?,
        state_proof_key: parse_state_proof_key(required_bytes(&w.state_proof_key, "missing state_proof_key")?)?,
        vote_first: required(&w.vote_first, "missing vote_first")?,
        vote_last: required(&w.vote_last, "missing vote_last")?,
        vote_key_dilution: required(&w.vote_key_dilution, "missing vote_key_dilution")?,
    })
}

/// Convert a witness to the action it encodes
pub fn witness_to_action(w: &ConsensusWitness) -> ConsensusResult<ConsensusAction> {
    let address = |param: &'static str| -> ConsensusResult<_> {
        parse_address(param, required_bytes(&w.address, "missing address")?)
    };
    let receiver = || -> ConsensusResult<_> {
        parse_address("receiver", required_bytes(&w.receiver, "missing receiver")?)
    };
    let index = || required(&w.index, "missing proposer index");
    let nonce = || -> ConsensusResult<_> { parse_nonce(required_bytes(&w.nonce, "missing nonce")?) };

    let action = match w.op {
        op::INITIALISE => ConsensusAction::Initialise,
        op::UPDATE_ADMIN => {
            let key = required_str(&w.role, "missing role")?;
            ConsensusAction::UpdateAdmin {
                role: AdminRole::from_key(key).ok_or(ConsensusError::InvalidCall { reason: "unknown role" })?,
                new_admin: address("new_admin")?,
            }
        }
        op::SCHEDULE_UPDATE_SC => ConsensusAction::ScheduleUpdateSc {
            approval_sha256: parse_hash("approval_sha256", required_bytes(&w.approval, "missing approval hash")?)?,
            clear_sha256: parse_hash("clear_sha256", required_bytes(&w.clear, "missing clear hash")?)?,
        },
        op::UPDATE_SC => ConsensusAction::UpdateSc {
            approval_program: required(&w.approval, "missing approval program")?,
            clear_program: required(&w.clear, "missing clear program")?,
        },
        op::ADD_PROPOSER => ConsensusAction::AddProposer { proposer: address("proposer")? },
        op::SET_PROPOSER_ADMIN => ConsensusAction::SetProposerAdmin {
            proposer_index: index()?,
            new_admin: address("new_admin")?,
        },
        op::REGISTER_ONLINE => ConsensusAction::RegisterOnline {
            payment: required(&w.payment, "missing payment")?,
            proposer_index: index()?,
            keys: key_registration(w)?,
        },
        op::REGISTER_OFFLINE => ConsensusAction::RegisterOffline { proposer_index: index()? },
        op::SUBSCRIBE_XGOV => ConsensusAction::SubscribeXGov {
            payment: required(&w.payment, "missing payment")?,
            proposer_index: index()?,
            registry_id: required(&w.registry_id, "missing registry id")?,
            voting_address: parse_address(
                "voting_address",
                required_bytes(&w.voting_address, "missing voting address")?,
            )?,
        },
        op::UNSUBSCRIBE_XGOV => ConsensusAction::UnsubscribeXGov {
            proposer_index: index()?,
            registry_id: required(&w.registry_id, "missing registry id")?,
        },
        op::UPDATE_MAX_PROPOSER_BALANCE => ConsensusAction::UpdateMaxProposerBalance {
            max_proposer_balance: required(&w.amount, "missing max proposer balance")?,
        },
        op::UPDATE_FEE => ConsensusAction::UpdateFee { fee: required(&w.amount, "missing fee")? },
        op::UPDATE_PREMIUM => ConsensusAction::UpdatePremium { premium: required(&w.amount, "missing premium")? },
        op::PAUSE_MINTING => {
            let key = required_str(&w.minting_type, "missing minting type")?;
            ConsensusAction::PauseMinting {
                kind: MintingKind::from_key(key)
                    .ok_or(ConsensusError::InvalidCall { reason: "unknown minting type" })?,
                to_pause: required(&w.flag, "missing pause flag")?,
            }
        }
        op::CLAIM_FEE => ConsensusAction::ClaimFee,
        op::IMMEDIATE_MINT => ConsensusAction::ImmediateMint {
            payment: required(&w.payment, "missing payment")?,
            receiver: receiver()?,
            min_received: w.amount.unwrap_or(0),
        },
        op::DELAYED_MINT => ConsensusAction::DelayedMint {
            payment: required(&w.payment, "missing payment")?,
            receiver: receiver()?,
            nonce: nonce()?,
        },
        op::CLAIM_DELAYED_MINT => ConsensusAction::ClaimDelayedMint { minter: address("minter")?, nonce: nonce()? },
        op::BURN => ConsensusAction::Burn {
            transfer: required(&w.asset_transfer, "missing asset transfer")?,
            receiver: receiver()?,
            min_received: w.amount.unwrap_or(0),
        },
        op::GET_RATE => ConsensusAction::GetRate,
        _ => return Err(ConsensusError::InvalidCall { reason: "unknown operation" }),
    };
    Ok(action)
}

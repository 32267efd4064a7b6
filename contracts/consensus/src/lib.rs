//! xALGO Consensus Pool
//!
//! Liquid staking engine: ALGO deposits are spread across a bounded set of
//! proposer accounts that delegated their signing authority to the pool,
//! and depositors receive xALGO priced against the pool's backing value.
//!
//! ## Core Operations
//!
//! - **ImmediateMint**: Deposit ALGO, receive xALGO at the current rate minus the premium
//! - **DelayedMint / ClaimDelayedMint**: Deposit now, get priced after a round delay
//! - **Burn**: Return xALGO, receive a proportional share of the pool
//! - **ClaimFee**: Pay accrued protocol fees to the admin
//! - **GetRate**: Snapshot of backing value, supply and proposer balances
//!
//! ## Governance
//!
//! Three roles (admin, register admin, xGov admin) gate administration.
//! Code upgrades and contested proposer admin changes are time delayed.
//!
//! ## Execution Model
//!
//! Every call is one atomic transition. [`ConsensusEngine::execute`] stages
//! copies of the state and ledger in a [`ConsensusContext`], runs the
//! operation against them and swaps them in only if it succeeded. Events
//! emitted by a failed call are discarded with the rest of its effects.

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub mod call;
pub mod config;
pub mod exchange;
pub mod governance;
pub mod ledger;
pub mod participation;
pub mod pool;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;


pub use config::ConsensusConfig;
pub use ledger::{AccountLedger, Ledger};
pub use state::ConsensusState;

use xalgo_common::{
    constants::records,
    errors::{ConsensusError, ConsensusResult, RecordKind},
    events::{ConsensusEvent, EventLog},
    layout::ProposerList,
    math::record_min_balance,
    types::{
        Address, AdminRole, AppId, AssetTransferTxn, GlobalState, Hash32, KeyRegistration,
        MintingKind, Nonce, PaymentTxn, RateSnapshot, TxnShape,
    },
    validation::{rekey_and_close_to_check, require_role},
};

// ============ Calls ============

/// Per-call environment supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Account that signed the call
    pub sender: Address,
    /// Latest block timestamp (seconds)
    pub timestamp: u64,
    /// Current round
    pub round: u64,
    /// Rekey / close-out fields of the call itself
    pub shape: TxnShape,
}

impl CallContext {
    /// Plain call with no rekey or close-out
    pub fn new(sender: Address, timestamp: u64, round: u64) -> Self {
        Self { sender, timestamp, round, shape: TxnShape::default() }
    }
}

/// Every operation the pool exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusAction {
    Initialise,
    UpdateAdmin { role: AdminRole, new_admin: Address },
    ScheduleUpdateSc { approval_sha256: Hash32, clear_sha256: Hash32 },
    /// Programs the call would install
    UpdateSc { approval_program: Vec<u8>, clear_program: Vec<u8> },
    AddProposer { proposer: Address },
    UpdateMaxProposerBalance { max_proposer_balance: u64 },
    UpdateFee { fee: u64 },
    ClaimFee,
    UpdatePremium { premium: u64 },
    PauseMinting { kind: MintingKind, to_pause: bool },
    SetProposerAdmin { proposer_index: u8, new_admin: Address },
    RegisterOnline { payment: PaymentTxn, proposer_index: u8, keys: KeyRegistration },
    RegisterOffline { proposer_index: u8 },
    SubscribeXGov { payment: PaymentTxn, proposer_index: u8, registry_id: AppId, voting_address: Address },
    UnsubscribeXGov { proposer_index: u8, registry_id: AppId },
    ImmediateMint { payment: PaymentTxn, receiver: Address, min_received: u64 },
    DelayedMint { payment: PaymentTxn, receiver: Address, nonce: Nonce },
    ClaimDelayedMint { minter: Address, nonce: Nonce },
    Burn { transfer: AssetTransferTxn, receiver: Address, min_received: u64 },
    GetRate,
}

impl ConsensusAction {
    /// Operation name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialise => "initialise",
            Self::UpdateAdmin { .. } => "update_admin",
            Self::ScheduleUpdateSc { .. } => "schedule_update_sc",
            Self::UpdateSc { .. } => "update_sc",
            Self::AddProposer { .. } => "add_proposer",
            Self::UpdateMaxProposerBalance { .. } => "update_max_proposer_balance",
            Self::UpdateFee { .. } => "update_fee",
            Self::ClaimFee => "claim_fee",
            Self::UpdatePremium { .. } => "update_premium",
            Self::PauseMinting { .. } => "pause_minting",
            Self::SetProposerAdmin { .. } => "set_proposer_admin",
            Self::RegisterOnline { .. } => "register_online",
            Self::RegisterOffline { .. } => "register_offline",
            Self::SubscribeXGov { .. } => "subscribe_xgov",
            Self::UnsubscribeXGov { .. } => "unsubscribe_xgov",
            Self::ImmediateMint { .. } => "immediate_mint",
            Self::DelayedMint { .. } => "delayed_mint",
            Self::ClaimDelayedMint { .. } => "claim_delayed_mint",
            Self::Burn { .. } => "burn",
            Self::GetRate => "get_rate",
        }
    }
}

/// What a successful call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    None,
    /// xALGO minted to the receiver
    Minted { amount: u64 },
    /// Delayed mint recorded, claimable from `eligible_round`
    DelayedMintQueued { eligible_round: u64 },
    /// ALGO paid out for burnt xALGO
    Burned { algo_sent: u64 },
    /// Fees paid to the admin
    FeeClaimed { amount: u64 },
    /// Upgrade executed, margin refunded to the caller
    Upgraded { refunded: u64 },
    Rate(RateSnapshot),
}

// ============ Execution Context ============

/// Staged state and ledger a single call operates on
pub struct ConsensusContext<L: Ledger> {
    /// Application account
    pub app: Address,
    /// xALGO units ever created
    pub max_supply: u64,
    /// Staged pool state
    pub state: ConsensusState,
    /// Staged ledger
    pub ledger: L,
    /// Call signer
    pub sender: Address,
    /// Latest block timestamp
    pub timestamp: u64,
    /// Current round
    pub round: u64,
    /// Events of this call
    pub events: EventLog,
}

impl<L: Ledger> ConsensusContext<L> {
    /// Global parameters
    pub fn global(&self) -> &GlobalState {
        &self.state.global
    }

    /// Global parameters, mutable
    pub fn global_mut(&mut self) -> &mut GlobalState {
        &mut self.state.global
    }

    /// Record an event for this call
    pub fn emit(&mut self, event: ConsensusEvent) {
        self.events.emit(event);
    }

    // ============ Guards ============

    pub fn require_initialised(&self) -> ConsensusResult<()> {
        if !self.state.global.initialised {
            return Err(ConsensusError::NotInitialised);
        }
        Ok(())
    }

    /// Caller must hold `role`
    pub fn require_role(&self, role: AdminRole) -> ConsensusResult<()> {
        require_role(self.state.global.role(role), self.sender)
    }

    /// Caller must be the admin of the proposer at `index` at the current time.
    /// Returns the proposer address.
    pub fn require_proposer_admin(&self, index: u8) -> ConsensusResult<Address> {
        let proposer = self.state.proposer(index)?;
        let active = self
            .state
            .proposer_admin(&proposer)?
            .and_then(|record| record.active_admin(self.timestamp));
        if active != Some(self.sender) {
            return Err(ConsensusError::NotProposerAdmin { proposer_index: index, caller: self.sender });
        }
        Ok(proposer)
    }

    // ============ Balances ============

    /// xALGO held outside the application account
    pub fn x_algo_circulating_supply(&self) -> ConsensusResult<u64> {
        let asset_id = self.state.global.x_algo_id;
        let held = self
            .ledger
            .asset_balance(&self.app, asset_id)
            .ok_or(ConsensusError::NotOptedIn { account: self.app, asset_id })?;
        self.max_supply.checked_sub(held).ok_or(ConsensusError::Underflow)
    }

    /// Backing value: last synced active balance minus unclaimed fees
    pub fn algo_backing(&self) -> ConsensusResult<u64> {
        let global = &self.state.global;
        global
            .last_proposers_active_balance
            .checked_sub(global.total_unclaimed_fees)
            .ok_or(ConsensusError::Underflow)
    }

    /// ALGO in the application account above its minimum balance
    pub fn app_margin(&self) -> u64 {
        self.ledger
            .balance(&self.app)
            .saturating_sub(self.ledger.min_balance(&self.app))
    }

    /// Pay the whole application margin to the caller
    pub fn refund_margin(&mut self) -> ConsensusResult<u64> {
        let refund = self.app_margin();
        let (app, sender) = (self.app, self.sender);
        self.ledger.pay(&app, &sender, refund)?;
        Ok(refund)
    }

    // ============ Records ============

    /// Store a new record, reserving its minimum balance
    pub fn create_record(&mut self, kind: RecordKind, name: Vec<u8>, value: Vec<u8>) -> ConsensusResult<()> {
        if self.state.has_record(&name) {
            return Err(ConsensusError::RecordExists { kind });
        }
        let cost = record_min_balance(name.len(), value.len())?;
        let app = self.app;
        self.ledger.reserve_storage(&app, cost)?;
        self.state.insert_record(name, value);
        Ok(())
    }

    /// Create or overwrite a record, adjusting the reserve when its size changes
    pub fn write_record(&mut self, kind: RecordKind, name: Vec<u8>, value: Vec<u8>) -> ConsensusResult<()> {
        let old_size = match self.state.record(&name) {
            Some(old) => old.len(),
            None => return self.create_record(kind, name, value),
        };
        if old_size != value.len() {
            let app = self.app;
            self.ledger.release_storage(&app, record_min_balance(name.len(), old_size)?)?;
            self.ledger.reserve_storage(&app, record_min_balance(name.len(), value.len())?)?;
        }
        self.state.insert_record(name, value);
        Ok(())
    }

    /// Delete a record, releasing its reserve
    pub fn delete_record(&mut self, kind: RecordKind, name: &[u8]) -> ConsensusResult<Vec<u8>> {
        let value = self
            .state
            .remove_record(name)
            .ok_or(ConsensusError::RecordNotFound { kind })?;
        let app = self.app;
        self.ledger.release_storage(&app, record_min_balance(name.len(), value.len())?)?;
        Ok(value)
    }
}

// ============ Engine ============

/// A deployed consensus pool bound to a host ledger
#[derive(Debug, Clone)]
pub struct ConsensusEngine<L: Ledger> {
    app: Address,
    max_supply: u64,
    state: ConsensusState,
    ledger: L,
    events: EventLog,
}

impl<L: Ledger> ConsensusEngine<L> {
    /// Deploy a pool on `ledger`.
    ///
    /// The application account must exist, be opted in to xALGO and hold
    /// enough margin for the proposer list record. The pool starts
    /// uninitialised.
    pub fn deploy(config: &ConsensusConfig, ledger: L) -> ConsensusResult<Self> {
        config.validate()?;
        if ledger.asset_balance(&config.app_address, config.x_algo_id).is_none() {
            return Err(ConsensusError::NotOptedIn { account: config.app_address, asset_id: config.x_algo_id });
        }

        let mut ctx = ConsensusContext {
            app: config.app_address,
            max_supply: config.max_supply,
            state: ConsensusState::new(config.initial_state()),
            ledger,
            sender: config.admin,
            timestamp: 0,
            round: 0,
            events: EventLog::new(),
        };
        ctx.create_record(
            RecordKind::ProposerList,
            records::PROPOSERS.to_vec(),
            ProposerList::new().as_bytes().to_vec(),
        )?;

        info!(x_algo_id = config.x_algo_id, "consensus pool deployed");
        Ok(Self {
            app: ctx.app,
            max_supply: ctx.max_supply,
            state: ctx.state,
            ledger: ctx.ledger,
            events: ctx.events,
        })
    }

    /// Execute one call atomically.
    ///
    /// On error neither state, ledger nor event log change.
    pub fn execute(&mut self, call: &CallContext, action: ConsensusAction) -> ConsensusResult<ActionOutcome> {
        let op = action.name();
        debug!(op = op, round = call.round, timestamp = call.timestamp, "dispatching consensus action");

        let mut ctx = self.stage(call);
        let result = rekey_and_close_to_check(&call.shape).and_then(|_| dispatch(&mut ctx, action));
        match result {
            Ok(outcome) => {
                info!(op = op, events = ctx.events.len(), "consensus action committed");
                self.state = ctx.state;
                self.ledger = ctx.ledger;
                self.events.extend(ctx.events);
                Ok(outcome)
            }
            Err(err) => {
                warn!(op = op, code = err.code(), "consensus action rejected");
                Err(err)
            }
        }
    }

    /// Copy committed state and ledger into a context for `call`
    pub fn stage(&self, call: &CallContext) -> ConsensusContext<L> {
        ConsensusContext {
            app: self.app,
            max_supply: self.max_supply,
            state: self.state.clone(),
            ledger: self.ledger.clone(),
            sender: call.sender,
            timestamp: call.timestamp,
            round: call.round,
            events: EventLog::new(),
        }
    }

    /// Decode a CBOR call witness and execute it
    pub fn execute_raw(&mut self, call: &CallContext, witness: &[u8]) -> ConsensusResult<ActionOutcome> {
        let witness = call::decode_witness(witness)?;
        let action = call::witness_to_action(&witness)?;
        self.execute(call, action)
    }

    /// Application account
    pub fn app_address(&self) -> Address {
        self.app
    }

    /// Committed state
    pub fn state(&self) -> &ConsensusState {
        &self.state
    }

    /// Committed global parameters
    pub fn global(&self) -> &GlobalState {
        &self.state.global
    }

    /// Host ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Host ledger, for simulating activity outside the pool
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Events committed since the last [`Self::take_events`]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drain the committed events for an indexer, leaving the log empty
    pub fn take_events(&mut self) -> Vec<ConsensusEvent> {
        core::mem::take(&mut self.events).into_events()
    }
}

/// SHA-256 of a program
pub fn program_hash(program: &[u8]) -> Hash32 {
    let digest = Sha256::digest(program);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Route an action to its handler
fn dispatch<L: Ledger>(ctx: &mut ConsensusContext<L>, action: ConsensusAction) -> ConsensusResult<ActionOutcome> {
    match action {
        ConsensusAction::Initialise => governance::initialise(ctx),
        ConsensusAction::UpdateAdmin { role, new_admin } => {
            governance::update_admin(ctx, role, new_admin)
        }
        ConsensusAction::ScheduleUpdateSc { approval_sha256, clear_sha256 } => {
            governance::schedule_update_sc(ctx, approval_sha256, clear_sha256)
        }
        ConsensusAction::UpdateSc { approval_program, clear_program } => {
            governance::update_sc(ctx, &approval_program, &clear_program)
        }
        ConsensusAction::AddProposer { proposer } => pool::add_proposer(ctx, proposer),
        ConsensusAction::UpdateMaxProposerBalance { max_proposer_balance } => {
            governance::update_max_proposer_balance(ctx, max_proposer_balance)
        }
        ConsensusAction::UpdateFee { fee } => governance::update_fee(ctx, fee),
        ConsensusAction::ClaimFee => sync::claim_fee(ctx),
        ConsensusAction::UpdatePremium { premium } => governance::update_premium(ctx, premium),
        ConsensusAction::PauseMinting { kind, to_pause } => {
            governance::pause_minting(ctx, kind, to_pause)
        }
        ConsensusAction::SetProposerAdmin { proposer_index, new_admin } => {
            governance::set_proposer_admin(ctx, proposer_index, new_admin)
        }
        ConsensusAction::RegisterOnline { payment, proposer_index, keys } => {
            participation::register_online(ctx, &payment, proposer_index, &keys)
        }
        ConsensusAction::RegisterOffline { proposer_index } => {
            participation::register_offline(ctx, proposer_index)
        }
        ConsensusAction::SubscribeXGov { payment, proposer_index, registry_id, voting_address } => {
            participation::subscribe_xgov(ctx, &payment, proposer_index, registry_id, voting_address)
        }
        ConsensusAction::UnsubscribeXGov { proposer_index, registry_id } => {
            participation::unsubscribe_xgov(ctx, proposer_index, registry_id)
        }
        ConsensusAction::ImmediateMint { payment, receiver, min_received } => {
            exchange::immediate_mint(ctx, &payment, receiver, min_received)
        }
        ConsensusAction::DelayedMint { payment, receiver, nonce } => {
            exchange::delayed_mint(ctx, &payment, receiver, nonce)
        }
        ConsensusAction::ClaimDelayedMint { minter, nonce } => {
            exchange::claim_delayed_mint(ctx, minter, nonce)
        }
        ConsensusAction::Burn { transfer, receiver, min_received } => {
            exchange::burn(ctx, &transfer, receiver, min_received)
        }
        ConsensusAction::GetRate => exchange::get_rate(ctx),
    }
}

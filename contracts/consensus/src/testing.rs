//! Test fixture: a deployed pool on an in-memory ledger

use xalgo_common::{
    constants::{
        storage::{ACCOUNT_MIN_BALANCE, ASSET_MIN_BALANCE},
        token::MAX_SUPPLY,
    },
    errors::{ConsensusError, ConsensusResult},
    types::{Address, AssetId, AssetTransferTxn, KeyRegistration, Nonce, PaymentTxn},
};

use crate::{
    ActionOutcome, AccountLedger, CallContext, ConsensusAction, ConsensusConfig, ConsensusContext,
    ConsensusEngine, Ledger,
};

pub const APP: Address = [0xA0; 32];
pub const ADMIN: Address = [0xAD; 32];
pub const REGISTER_ADMIN: Address = [0xAE; 32];
pub const XGOV_ADMIN: Address = [0xAF; 32];
pub const USER: Address = [0x11; 32];
pub const OTHER: Address = [0x22; 32];

pub const X_ALGO_ID: AssetId = 1_000;
/// Spendable ALGO the app starts with to fund record storage
pub const APP_MARGIN: u64 = 10_000_000;
pub const USER_FUNDS: u64 = 1_000_000_000_000;

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const GENESIS_ROUND: u64 = 40_000_000;

/// Address of the proposer registered at `index` by [`Fixture::with_proposers`]
pub fn proposer(index: u8) -> Address {
    let mut address = [0x50; 32];
    address[31] = index;
    address
}

/// Participation keys valid for rounds 1_000..3_000_000
pub fn keys() -> KeyRegistration {
    KeyRegistration {
        vote_key: [0x0B; 32],
        selection_key: [0x0C; 32],
        state_proof_key: [0x0D; 64],
        vote_first: 1_000,
        vote_last: 3_000_000,
        vote_key_dilution: 1_733,
    }
}

pub struct Fixture {
    pub engine: ConsensusEngine<AccountLedger>,
    pub timestamp: u64,
    pub round: u64,
}

impl Fixture {
    /// Deployed pool that still needs `initialise`
    pub fn uninitialised() -> Self {
        let mut ledger = AccountLedger::new();
        ledger.create_account(APP, ACCOUNT_MIN_BALANCE + ASSET_MIN_BALANCE + APP_MARGIN);
        ledger.create_asset(&APP, X_ALGO_ID, MAX_SUPPLY);
        for user in [USER, OTHER] {
            ledger.create_account(user, USER_FUNDS);
            ledger.opt_in(&user, X_ALGO_ID);
        }
        for admin in [ADMIN, REGISTER_ADMIN, XGOV_ADMIN] {
            ledger.create_account(admin, ACCOUNT_MIN_BALANCE);
        }

        let mut config = ConsensusConfig::new(APP, X_ALGO_ID, ADMIN);
        config.register_admin = REGISTER_ADMIN;
        config.xgov_admin = XGOV_ADMIN;
        let engine = ConsensusEngine::deploy(&config, ledger).expect("deploy");

        Self { engine, timestamp: GENESIS_TIMESTAMP, round: GENESIS_ROUND }
    }

    /// Initialised pool without proposers
    pub fn new() -> Self {
        let mut fx = Self::uninitialised();
        fx.exec(ADMIN, ConsensusAction::Initialise).expect("initialise");
        fx
    }

    /// Initialised pool with `n` empty proposers delegated to the app
    pub fn with_proposers(n: u8) -> Self {
        let mut fx = Self::new();
        for i in 0..n {
            fx.add_proposer(proposer(i)).expect("add proposer");
        }
        fx
    }

    pub fn add_proposer(&mut self, address: Address) -> ConsensusResult<ActionOutcome> {
        let ledger = self.engine.ledger_mut();
        ledger.create_account(address, ACCOUNT_MIN_BALANCE);
        ledger.set_auth_address(&address, APP);
        self.exec(REGISTER_ADMIN, ConsensusAction::AddProposer { proposer: address })
    }

    pub fn call(&self, sender: Address) -> CallContext {
        CallContext::new(sender, self.timestamp, self.round)
    }

    pub fn exec(&mut self, sender: Address, action: ConsensusAction) -> ConsensusResult<ActionOutcome> {
        let call = self.call(sender);
        self.engine.execute(&call, action)
    }

    /// Staged context for calling module functions directly
    pub fn context(&self, sender: Address) -> ConsensusContext<AccountLedger> {
        self.engine.stage(&self.call(sender))
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp += seconds;
    }

    pub fn advance_rounds(&mut self, rounds: u64) {
        self.round += rounds;
    }

    /// Replenish the app margin after a refund drained it
    pub fn top_up_app_margin(&mut self) {
        self.engine.ledger_mut().fund(&APP, APP_MARGIN);
    }

    // ============ Exchange Helpers ============

    pub fn mint_action(&self, sender: Address, amount: u64, receiver: Address, min_received: u64) -> ConsensusAction {
        ConsensusAction::ImmediateMint {
            payment: PaymentTxn::new(sender, APP, amount),
            receiver,
            min_received,
        }
    }

    /// Immediate mint of `amount` by USER; returns xALGO minted
    pub fn mint(&mut self, amount: u64) -> ConsensusResult<u64> {
        let action = self.mint_action(USER, amount, USER, 0);
        match self.exec(USER, action)? {
            ActionOutcome::Minted { amount } => Ok(amount),
            _ => Err(ConsensusError::InvalidCall { reason: "expected mint outcome" }),
        }
    }

    /// Delayed mint of `amount` by USER to USER
    pub fn delayed_mint(&mut self, amount: u64, nonce: Nonce) -> ConsensusResult<ActionOutcome> {
        let action = ConsensusAction::DelayedMint {
            payment: PaymentTxn::new(USER, APP, amount),
            receiver: USER,
            nonce,
        };
        self.exec(USER, action)
    }

    /// Burn `amount` xALGO held by USER; returns ALGO paid out
    pub fn burn(&mut self, amount: u64) -> ConsensusResult<u64> {
        let action = ConsensusAction::Burn {
            transfer: AssetTransferTxn::new(USER, APP, X_ALGO_ID, amount),
            receiver: USER,
            min_received: 0,
        };
        match self.exec(USER, action)? {
            ActionOutcome::Burned { algo_sent } => Ok(algo_sent),
            _ => Err(ConsensusError::InvalidCall { reason: "expected burn outcome" }),
        }
    }

    // ============ Queries ============

    pub fn balance(&self, account: &Address) -> u64 {
        self.engine.ledger().balance(account)
    }

    pub fn x_algo_balance(&self, account: &Address) -> u64 {
        self.engine
            .ledger()
            .asset_balance(account, X_ALGO_ID)
            .unwrap_or(0)
    }
}

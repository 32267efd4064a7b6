//! Deployment configuration for a consensus pool

use serde::{Deserialize, Serialize};

use xalgo_common::{
    constants::{fees, governance, proposers, token},
    errors::{ConsensusError, ConsensusResult},
    types::{Address, AssetId, GlobalState, ZERO_ADDRESS},
};

/// Parameters fixed or seeded at deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Application account holding the xALGO reserve and record storage
    pub app_address: Address,
    /// xALGO asset id
    pub x_algo_id: AssetId,
    /// Protocol owner
    pub admin: Address,
    /// Proposer registration admin
    pub register_admin: Address,
    /// xGov subscription admin
    pub xgov_admin: Address,
    /// Governance delay in seconds
    pub time_delay: u64,
    /// Cap on a single proposer's balance when depositing
    pub max_proposer_balance: u64,
    /// Fee on rewards (4 d.p.)
    pub fee: u64,
    /// Immediate mint discount (16 d.p.)
    pub premium: u64,
    /// xALGO units ever created
    pub max_supply: u64,
    /// Whether immediate minting starts enabled
    pub can_immediate_mint: bool,
    /// Whether delayed minting starts enabled
    pub can_delay_mint: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            app_address: ZERO_ADDRESS,
            x_algo_id: 0,
            admin: ZERO_ADDRESS,
            register_admin: ZERO_ADDRESS,
            xgov_admin: ZERO_ADDRESS,
            time_delay: governance::DEFAULT_TIME_DELAY,
            max_proposer_balance: proposers::DEFAULT_MAX_PROPOSER_BALANCE,
            fee: fees::DEFAULT_FEE,
            premium: fees::DEFAULT_PREMIUM,
            max_supply: token::MAX_SUPPLY,
            can_immediate_mint: true,
            can_delay_mint: true,
        }
    }
}

impl ConsensusConfig {
    /// Config with every role held by `admin` and default parameters
    pub fn new(app_address: Address, x_algo_id: AssetId, admin: Address) -> Self {
        Self {
            app_address,
            x_algo_id,
            admin,
            register_admin: admin,
            xgov_admin: admin,
            ..Self::default()
        }
    }

    /// Check parameter bounds
    pub fn validate(&self) -> ConsensusResult<()> {
        if self.app_address == ZERO_ADDRESS {
            return Err(ConsensusError::InvalidCall { reason: "app_address must be set" });
        }
        if self.admin == ZERO_ADDRESS {
            return Err(ConsensusError::InvalidCall { reason: "admin must be set" });
        }
        if self.fee > fees::MAX_FEE {
            return Err(ConsensusError::FeeTooHigh { fee: self.fee, max: fees::MAX_FEE });
        }
        if self.premium > fees::MAX_PREMIUM {
            return Err(ConsensusError::PremiumTooHigh { premium: self.premium, max: fees::MAX_PREMIUM });
        }
        Ok(())
    }

    /// Global state of a freshly deployed, not yet initialised pool
    pub fn initial_state(&self) -> GlobalState {
        let mut state = GlobalState::new(self.admin, self.register_admin, self.xgov_admin, self.x_algo_id);
        state.time_delay = self.time_delay;
        state.max_proposer_balance = self.max_proposer_balance;
        state.fee = self.fee;
        state.premium = self.premium;
        state.can_immediate_mint = self.can_immediate_mint;
        state.can_delay_mint = self.can_delay_mint;
        state
    }
}

//! Protocol Constants
//!
//! All magic numbers and configuration values for the xALGO consensus pool.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (multi-day governance delay)
//! - Default (no feature) - Testnet values (short delay for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! xalgo-common = { path = "...", features = ["mainnet"] }
//! ```

/// Derivative token supply
pub mod token {
    /// Total units ever created; circulating supply is this minus what the app holds
    pub const MAX_SUPPLY: u64 = 10_000_000_000_000_000; // 10e15
}

/// Fixed-point scales
pub mod precision {
    /// One with 4 decimal places (fee scale, 10_000 = 100%)
    pub const ONE_4_DP: u64 = 10_000;

    /// One with 16 decimal places (premium scale)
    pub const ONE_16_DP: u64 = 10_000_000_000_000_000;
}

/// Fee and premium bounds
pub mod fees {
    use super::precision::{ONE_16_DP, ONE_4_DP};

    /// Fee cannot exceed 100% of accrued rewards
    pub const MAX_FEE: u64 = ONE_4_DP;

    /// Premium cannot exceed 1% of minted amount
    pub const MAX_PREMIUM: u64 = ONE_16_DP / 100;

    /// Default protocol fee (10%)
    pub const DEFAULT_FEE: u64 = 1_000;

    /// Default immediate mint premium (0%)
    pub const DEFAULT_PREMIUM: u64 = 0;
}

/// Proposer pool limits
pub mod proposers {
    /// Maximum number of proposer accounts in the pool
    pub const MAX_NUM_PROPOSERS: u64 = 30;

    /// Width of a proposer address in the proposer list
    pub const ADDRESS_SIZE: usize = 32;

    /// Default cap on a single proposer's balance (70M ALGO)
    pub const DEFAULT_MAX_PROPOSER_BALANCE: u64 = 70_000_000_000_000;
}

/// Minting configuration
pub mod minting {
    /// Rounds a delayed mint must wait before it can be claimed
    pub const DELAY_MINT_ROUNDS: u64 = 320;

    /// Width of a delayed mint nonce
    pub const NONCE_SIZE: usize = 2;
}

/// Governance delays
///
/// Values differ between mainnet and testnet to allow easier testing.
pub mod governance {
    /// Delay before a scheduled upgrade or contested admin change takes effect
    /// - Mainnet: 7 days
    /// - Testnet: 1 hour
    #[cfg(feature = "mainnet")]
    pub const DEFAULT_TIME_DELAY: u64 = 7 * 24 * 60 * 60;
    #[cfg(not(feature = "mainnet"))]
    pub const DEFAULT_TIME_DELAY: u64 = 60 * 60;
}

/// Storage (box) minimum balance costs, in microALGO
pub mod storage {
    /// Flat cost per record
    pub const RECORD_FLAT_MIN_BALANCE: u64 = 2_500;

    /// Cost per byte of record name plus record value
    pub const RECORD_BYTE_MIN_BALANCE: u64 = 400;

    /// Minimum balance every ledger account must hold
    pub const ACCOUNT_MIN_BALANCE: u64 = 100_000;

    /// Minimum balance added per asset opt-in
    pub const ASSET_MIN_BALANCE: u64 = 100_000;
}

/// Record names and layouts
pub mod records {
    /// Proposer list record name
    pub const PROPOSERS: &[u8] = b"pr";

    /// Prefix of per-proposer admin records
    pub const ADDED_PROPOSER_PREFIX: &[u8] = b"ap";

    /// Pending code upgrade record name
    pub const SC_UPDATE: &[u8] = b"sc";

    /// Prefix of delayed mint records
    pub const DELAY_MINT_PREFIX: &[u8] = b"dm";
}

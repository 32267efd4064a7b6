//! Fixed-Point Math for the xALGO Consensus Pool
//!
//! Every operand is an unsigned 64-bit integer. Intermediate products are
//! widened to 128 bits and any result that does not fit back into 64 bits
//! is an error, never a wraparound.

use crate::constants::precision::{ONE_16_DP, ONE_4_DP};
use crate::errors::{ConsensusError, ConsensusResult};

/// Multiplication with scale down: `floor(n1 * n2 / scale)`
///
/// # Arguments
/// * `n1` - factor with X decimals
/// * `n2` - factor with Y decimals
/// * `scale` - divisor, 1eZ
///
/// # Returns
/// The product with (X + Y - Z) decimals
pub fn mul_scale(n1: u64, n2: u64, scale: u64) -> ConsensusResult<u64> {
    let result = (n1 as u128)
        .checked_mul(n2 as u128)
        .ok_or(ConsensusError::Overflow)?
        .checked_div(scale as u128)
        .ok_or(ConsensusError::DivisionByZero)?;

    u64::try_from(result).map_err(|_| ConsensusError::Overflow)
}

/// Minimum of two integers
pub fn minimum(n1: u64, n2: u64) -> u64 {
    if n1 < n2 {
        n1
    } else {
        n2
    }
}

/// Ceiling division
pub fn ceil_div(n: u64, d: u64) -> ConsensusResult<u64> {
    if d == 0 {
        return Err(ConsensusError::DivisionByZero);
    }
    let q = n / d;
    if n % d == 0 {
        Ok(q)
    } else {
        q.checked_add(1).ok_or(ConsensusError::Overflow)
    }
}

/// Fee owed on rewards accrued since the last sync
///
/// fee_delta = floor(rewards * fee / 1e4)
pub fn calculate_fee_delta(rewards: u64, fee: u64) -> ConsensusResult<u64> {
    mul_scale(rewards, fee, ONE_4_DP)
}

/// Derivative tokens for an immediate mint
///
/// If the pool has no backing value or no xALGO in circulation the deposit
/// mints 1:1. Otherwise:
/// mint = floor(floor(deposit * supply / backing) * (1e16 - premium) / 1e16)
pub fn calculate_immediate_mint(
    algo_sent: u64,
    x_algo_circulating_supply: u64,
    algo_balance: u64,
    premium: u64,
) -> ConsensusResult<u64> {
    if algo_balance == 0 || x_algo_circulating_supply == 0 {
        return Ok(algo_sent);
    }
    let at_rate = mul_scale(algo_sent, x_algo_circulating_supply, algo_balance)?;
    let discount = ONE_16_DP.checked_sub(premium).ok_or(ConsensusError::Underflow)?;
    mul_scale(at_rate, discount, ONE_16_DP)
}

/// Derivative tokens for a claimed delayed mint (no premium)
pub fn calculate_delayed_mint(
    stake: u64,
    x_algo_circulating_supply: u64,
    algo_balance: u64,
) -> ConsensusResult<u64> {
    if algo_balance == 0 || x_algo_circulating_supply == 0 {
        return Ok(stake);
    }
    mul_scale(stake, x_algo_circulating_supply, algo_balance)
}

/// ALGO paid out for burning derivative tokens
///
/// `x_algo_circulating_supply` is measured after the burn transfer reached
/// the application account, so the burnt amount is added back:
/// payout = floor(burn * backing / (supply + burn))
pub fn calculate_burn_payout(
    burn_amount: u64,
    algo_balance: u64,
    x_algo_circulating_supply: u64,
) -> ConsensusResult<u64> {
    let supply_before = x_algo_circulating_supply
        .checked_add(burn_amount)
        .ok_or(ConsensusError::Overflow)?;
    mul_scale(burn_amount, algo_balance, supply_before)
}

/// Minimum balance reserved by a stored record
///
/// cost = 2500 + 400 * (name_len + size)
pub fn record_min_balance(name_len: usize, size: usize) -> ConsensusResult<u64> {
    use crate::constants::storage::{RECORD_BYTE_MIN_BALANCE, RECORD_FLAT_MIN_BALANCE};

    let bytes = (name_len as u64)
        .checked_add(size as u64)
        .ok_or(ConsensusError::Overflow)?;
    bytes
        .checked_mul(RECORD_BYTE_MIN_BALANCE)
        .and_then(|b| b.checked_add(RECORD_FLAT_MIN_BALANCE))
        .ok_or(ConsensusError::Overflow)
}

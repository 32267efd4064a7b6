//! Accrual Synchronizer
//!
//! Attributes growth of the proposers' active balance since the last sync
//! to rewards, books the protocol fee on it and advances the baseline.

use tracing::debug;

use xalgo_common::{
    errors::{ConsensusError, ConsensusResult},
    events::ConsensusEvent,
    math::calculate_fee_delta,
};

use crate::{pool, ActionOutcome, ConsensusContext, Ledger};

/// Proposers' balance above their reserves, minus stake awaiting delayed mint
pub fn proposers_active_balance<L: Ledger>(ctx: &ConsensusContext<L>) -> ConsensusResult<u64> {
    pool::total_proposer_balance(ctx, false)?
        .checked_sub(ctx.state.global.total_pending_stake)
        .ok_or(ConsensusError::Underflow)
}

/// Sync the active balance baseline and unclaimed fees.
///
/// Returns the fee booked by this sync. A drop in active balance is
/// rejected rather than absorbed.
pub fn sync<L: Ledger>(ctx: &mut ConsensusContext<L>) -> ConsensusResult<u64> {
    let active = proposers_active_balance(ctx)?;
    let global = ctx.global_mut();

    let last = global.last_proposers_active_balance;
    let rewards = active
        .checked_sub(last)
        .ok_or(ConsensusError::ActiveBalanceDecreased { last, current: active })?;
    let fee_delta = calculate_fee_delta(rewards, global.fee)?;

    global.total_unclaimed_fees = global
        .total_unclaimed_fees
        .checked_add(fee_delta)
        .ok_or(ConsensusError::Overflow)?;
    global.last_proposers_active_balance = active;

    if rewards > 0 {
        debug!(rewards, fee_delta, active, "synced proposers active balance");
    }
    Ok(fee_delta)
}

/// Sync, then pay every unclaimed fee to the admin. Returns the amount paid.
pub fn send_unclaimed_fees<L: Ledger>(ctx: &mut ConsensusContext<L>) -> ConsensusResult<u64> {
    sync(ctx)?;

    let admin = ctx.state.global.admin;
    let amount = ctx.state.global.total_unclaimed_fees;
    pool::send_from_pool(ctx, &admin, amount)?;

    let global = ctx.global_mut();
    global.last_proposers_active_balance = global
        .last_proposers_active_balance
        .checked_sub(amount)
        .ok_or(ConsensusError::Underflow)?;
    global.total_unclaimed_fees = 0;
    Ok(amount)
}

/// Pay accrued fees to the admin; callable by anyone
pub fn claim_fee<L: Ledger>(ctx: &mut ConsensusContext<L>) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;

    let amount = send_unclaimed_fees(ctx)?;
    let admin = ctx.state.global.admin;
    ctx.emit(ConsensusEvent::FeeClaimed { admin, amount, round: ctx.round });
    Ok(ActionOutcome::FeeClaimed { amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{proposer, Fixture, ADMIN};

    #[test]
    fn test_sync_books_fee_on_rewards() {
        let mut fx = Fixture::with_proposers(2);
        fx.mint(1_000_000).unwrap();

        fx.engine.ledger_mut().accrue_rewards(&proposer(0), 10_000);
        let mut ctx = fx.context(ADMIN);
        let fee_delta = sync(&mut ctx).unwrap();

        // default fee is 10%
        assert_eq!(fee_delta, 1_000);
        assert_eq!(ctx.global().total_unclaimed_fees, 1_000);
        assert_eq!(ctx.global().last_proposers_active_balance, 1_010_000);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut fx = Fixture::with_proposers(2);
        fx.mint(1_000_000).unwrap();
        fx.engine.ledger_mut().accrue_rewards(&proposer(1), 5_000);

        let mut ctx = fx.context(ADMIN);
        sync(&mut ctx).unwrap();
        let first = ctx.global().clone();
        assert_eq!(sync(&mut ctx).unwrap(), 0);
        assert_eq!(ctx.global(), &first);
    }

    #[test]
    fn test_sync_rejects_balance_drop() {
        let mut fx = Fixture::with_proposers(2);
        fx.mint(1_000_000).unwrap();
        fx.engine.ledger_mut().debit(&proposer(0), 1);

        let mut ctx = fx.context(ADMIN);
        assert_eq!(
            sync(&mut ctx),
            Err(ConsensusError::ActiveBalanceDecreased { last: 1_000_000, current: 999_999 })
        );
    }

    #[test]
    fn test_send_unclaimed_fees_moves_baseline() {
        let mut fx = Fixture::with_proposers(2);
        fx.mint(1_000_000).unwrap();
        fx.engine.ledger_mut().accrue_rewards(&proposer(0), 20_000);

        let mut ctx = fx.context(ADMIN);
        assert_eq!(send_unclaimed_fees(&mut ctx).unwrap(), 2_000);
        assert_eq!(ctx.global().total_unclaimed_fees, 0);
        assert_eq!(ctx.global().last_proposers_active_balance, 1_018_000);
        assert_eq!(proposers_active_balance(&ctx).unwrap(), 1_018_000);
    }
}

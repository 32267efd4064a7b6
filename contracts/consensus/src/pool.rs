//! Proposer Pool Manager
//!
//! Keeps the proposer list and moves ALGO in and out of the proposers so
//! their balances stay close to an equal split.
//!
//! Deposits top up proposers below `ceil((total + amount) / n)`, withdrawals
//! drain proposers above `floor((total - amount) / n)`, both in index order.
//! Either the whole amount is placed or the call fails.

use tracing::trace;

use xalgo_common::{
    constants::{proposers::MAX_NUM_PROPOSERS, records},
    errors::{ConsensusError, ConsensusResult, RecordKind},
    events::ConsensusEvent,
    layout::proposer_admin_record_name,
    math::{ceil_div, minimum},
    types::{Address, AdminRole},
};

use crate::{ActionOutcome, ConsensusContext, Ledger};

/// One proposer leg of a rebalancing move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Proposer index
    pub index: usize,
    /// ALGO moved to or from the proposer
    pub amount: u64,
}

// ============ Planning ============

fn checked_total(balances: &[u64]) -> ConsensusResult<u64> {
    balances
        .iter()
        .try_fold(0u64, |acc, &b| acc.checked_add(b))
        .ok_or(ConsensusError::Overflow)
}

/// Plan how to spread a deposit of `amount` over proposers with `balances`
pub fn plan_deposit(balances: &[u64], amount: u64, max_proposer_balance: u64) -> ConsensusResult<Vec<Allocation>> {
    if amount == 0 {
        return Ok(Vec::new());
    }
    if balances.is_empty() {
        return Err(ConsensusError::NoProposers);
    }

    let total = checked_total(balances)?
        .checked_add(amount)
        .ok_or(ConsensusError::Overflow)?;
    let target = ceil_div(total, balances.len() as u64)?;
    if target > max_proposer_balance {
        return Err(ConsensusError::ProposerBalanceCapExceeded { target, max: max_proposer_balance });
    }

    let mut remaining = amount;
    let mut plan = Vec::new();
    for (index, &balance) in balances.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if balance < target {
            let alloc = minimum(target - balance, remaining);
            plan.push(Allocation { index, amount: alloc });
            remaining -= alloc;
        }
    }

    if remaining != 0 {
        return Err(ConsensusError::AllocationIncomplete { remaining });
    }
    Ok(plan)
}

/// Plan how to collect a withdrawal of `amount` from proposers with `balances`
pub fn plan_withdrawal(balances: &[u64], amount: u64) -> ConsensusResult<Vec<Allocation>> {
    if amount == 0 {
        return Ok(Vec::new());
    }
    if balances.is_empty() {
        return Err(ConsensusError::NoProposers);
    }

    let total = checked_total(balances)?
        .checked_sub(amount)
        .ok_or(ConsensusError::Underflow)?;
    let target = total / balances.len() as u64;

    let mut remaining = amount;
    let mut plan = Vec::new();
    for (index, &balance) in balances.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if balance > target {
            let alloc = minimum(balance - target, remaining);
            plan.push(Allocation { index, amount: alloc });
            remaining -= alloc;
        }
    }

    if remaining != 0 {
        return Err(ConsensusError::AllocationIncomplete { remaining });
    }
    Ok(plan)
}

// ============ Balances ============

/// Balance of each proposer, optionally including its minimum balance
pub fn proposer_balances<L: Ledger>(ctx: &ConsensusContext<L>, include_min: bool) -> ConsensusResult<Vec<u64>> {
    ctx.state
        .proposers()?
        .iter()
        .map(|proposer| {
            let balance = ctx.ledger.balance(proposer);
            if include_min {
                Ok(balance)
            } else {
                balance
                    .checked_sub(ctx.ledger.min_balance(proposer))
                    .ok_or(ConsensusError::Underflow)
            }
        })
        .collect()
}

/// Sum of proposer balances
pub fn total_proposer_balance<L: Ledger>(ctx: &ConsensusContext<L>, include_min: bool) -> ConsensusResult<u64> {
    checked_total(&proposer_balances(ctx, include_min)?)
}

// ============ Fund Movement ============

/// Forward `amount` already held by the application account to the proposers
pub fn receive_to_pool<L: Ledger>(ctx: &mut ConsensusContext<L>, amount: u64) -> ConsensusResult<()> {
    let proposers = ctx.state.proposers()?;
    let balances = proposer_balances(ctx, true)?;
    let plan = plan_deposit(&balances, amount, ctx.state.global.max_proposer_balance)?;

    let app = ctx.app;
    for leg in plan {
        trace!(index = leg.index, amount = leg.amount, "allocating to proposer");
        ctx.ledger.pay(&app, &proposers[leg.index], leg.amount)?;
    }
    Ok(())
}

/// Collect `amount` from the proposers and pay it to `receiver`
pub fn send_from_pool<L: Ledger>(ctx: &mut ConsensusContext<L>, receiver: &Address, amount: u64) -> ConsensusResult<()> {
    let proposers = ctx.state.proposers()?;
    let balances = proposer_balances(ctx, true)?;
    let plan = plan_withdrawal(&balances, amount)?;

    let app = ctx.app;
    for leg in plan {
        trace!(index = leg.index, amount = leg.amount, "collecting from proposer");
        ctx.ledger.pay(&proposers[leg.index], &app, leg.amount)?;
    }
    ctx.ledger.pay(&app, receiver, amount)
}

// ============ Registration ============

/// Append a proposer that delegated its signing authority to the pool
pub fn add_proposer<L: Ledger>(ctx: &mut ConsensusContext<L>, proposer: Address) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::RegisterAdmin)?;

    if ctx.ledger.auth_address(&proposer) != Some(ctx.app) {
        return Err(ConsensusError::ProposerNotDelegated { proposer });
    }

    let index = ctx.state.global.num_proposers;
    if index >= MAX_NUM_PROPOSERS {
        return Err(ConsensusError::PoolAtCapacity { max: MAX_NUM_PROPOSERS });
    }

    // empty admin record marks the proposer as added
    ctx.create_record(RecordKind::ProposerAdmin, proposer_admin_record_name(&proposer), Vec::new())?;

    let mut list = ctx.state.proposer_list()?;
    list.set(index, &proposer)?;
    ctx.write_record(RecordKind::ProposerList, records::PROPOSERS.to_vec(), list.as_bytes().to_vec())?;
    ctx.global_mut().num_proposers = index + 1;

    ctx.emit(ConsensusEvent::ProposerAdded { proposer, index: index as u8, round: ctx.round });
    Ok(ActionOutcome::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_spreads_evenly() {
        let plan = plan_deposit(&[100_000, 100_000, 100_000], 300, u64::MAX).unwrap();
        assert_eq!(
            plan,
            vec![
                Allocation { index: 0, amount: 100 },
                Allocation { index: 1, amount: 100 },
                Allocation { index: 2, amount: 100 },
            ]
        );
    }

    #[test]
    fn test_deposit_fills_lowest_first_in_index_order() {
        // target = ceil(1_000 / 2) = 500
        let plan = plan_deposit(&[600, 200], 200, u64::MAX).unwrap();
        assert_eq!(plan, vec![Allocation { index: 1, amount: 200 }]);
    }

    #[test]
    fn test_deposit_rounds_target_up() {
        // target = ceil(301 / 3) = 101
        let plan = plan_deposit(&[0, 0, 0], 301, u64::MAX).unwrap();
        let placed: u64 = plan.iter().map(|a| a.amount).sum();
        assert_eq!(placed, 301);
        assert_eq!(plan[0].amount, 101);
        assert_eq!(plan[2].amount, 99);
    }

    #[test]
    fn test_deposit_cap() {
        assert_eq!(
            plan_deposit(&[100, 100], 100, 149),
            Err(ConsensusError::ProposerBalanceCapExceeded { target: 150, max: 149 })
        );
        assert!(plan_deposit(&[100, 100], 100, 150).is_ok());
    }

    #[test]
    fn test_deposit_without_proposers() {
        assert_eq!(plan_deposit(&[], 1, u64::MAX), Err(ConsensusError::NoProposers));
        assert_eq!(plan_deposit(&[], 0, u64::MAX).unwrap(), vec![]);
    }

    #[test]
    fn test_withdrawal_drains_highest() {
        // target = floor(700 / 2) = 350
        let plan = plan_withdrawal(&[600, 200], 100).unwrap();
        assert_eq!(plan, vec![Allocation { index: 0, amount: 100 }]);
    }

    #[test]
    fn test_withdrawal_rounds_target_down() {
        // target = floor(299 / 3) = 99
        let plan = plan_withdrawal(&[100, 100, 100], 1).unwrap();
        assert_eq!(plan, vec![Allocation { index: 0, amount: 1 }]);

        let plan = plan_withdrawal(&[100, 100, 100], 4).unwrap();
        let collected: u64 = plan.iter().map(|a| a.amount).sum();
        assert_eq!(collected, 4);
    }

    #[test]
    fn test_withdrawal_more_than_held() {
        assert_eq!(plan_withdrawal(&[10, 10], 21), Err(ConsensusError::Underflow));
        assert!(plan_withdrawal(&[10, 10], 20).is_ok());
    }

    #[test]
    fn test_zero_amount_is_noop() {
        assert!(plan_withdrawal(&[10], 0).unwrap().is_empty());
        assert!(plan_deposit(&[10], 0, 0).unwrap().is_empty());
    }
}

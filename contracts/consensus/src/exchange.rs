//! Mint / Burn Exchange
//!
//! Converts ALGO to xALGO and back at the pool rate.
//!
//! ## Pricing
//!
//! - Immediate mint: `deposit * supply / backing`, discounted by the premium
//! - Delayed mint: same rate without the premium, taken at claim time
//! - Burn: `burn * backing / supply`, with supply measured before the burn
//!
//! Every path syncs first so the rate reflects all rewards observed so far.
//! xALGO is never created or destroyed: the application account holds the
//! unissued supply and minting and burning move tokens in and out of it.

use tracing::info;

use xalgo_common::{
    constants::minting::DELAY_MINT_ROUNDS,
    errors::{ConsensusError, ConsensusResult, RecordKind},
    events::ConsensusEvent,
    layout::{delay_mint_record_name, DelayedMintRequest, FixedRecord},
    math::{calculate_burn_payout, calculate_delayed_mint, calculate_immediate_mint},
    types::{Address, AssetTransferTxn, MintingKind, Nonce, PaymentTxn, RateSnapshot},
    validation::{check_asset_transfer, check_payment},
};

use crate::{pool, sync, ActionOutcome, ConsensusContext, Ledger};

fn require_minting<L: Ledger>(ctx: &ConsensusContext<L>, kind: MintingKind) -> ConsensusResult<()> {
    if !ctx.state.global.can_mint(kind) {
        return Err(ConsensusError::MintingPaused { kind });
    }
    Ok(())
}

fn check_minimum(amount: u64, minimum: u64) -> ConsensusResult<()> {
    if amount == 0 {
        return Err(ConsensusError::ZeroAmount);
    }
    if amount < minimum {
        return Err(ConsensusError::BelowMinimum { amount, minimum });
    }
    Ok(())
}

/// Take the grouped payment into the application account and on to the proposers
fn deposit<L: Ledger>(ctx: &mut ConsensusContext<L>, payment: &PaymentTxn) -> ConsensusResult<u64> {
    let (sender, app) = (ctx.sender, ctx.app);
    check_payment(payment, &sender, &app)?;
    ctx.ledger.pay(&sender, &app, payment.amount)?;
    pool::receive_to_pool(ctx, payment.amount)?;
    Ok(payment.amount)
}

fn send_x_algo<L: Ledger>(ctx: &mut ConsensusContext<L>, receiver: &Address, amount: u64) -> ConsensusResult<()> {
    let (app, asset_id) = (ctx.app, ctx.state.global.x_algo_id);
    ctx.ledger.transfer_asset(asset_id, &app, receiver, amount)
}

fn add_to_baseline<L: Ledger>(ctx: &mut ConsensusContext<L>, amount: u64) -> ConsensusResult<()> {
    let global = ctx.global_mut();
    global.last_proposers_active_balance = global
        .last_proposers_active_balance
        .checked_add(amount)
        .ok_or(ConsensusError::Overflow)?;
    Ok(())
}

// ============ Minting ============

/// Deposit ALGO and receive xALGO at the current rate minus the premium
pub fn immediate_mint<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    payment: &PaymentTxn,
    receiver: Address,
    min_received: u64,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    require_minting(ctx, MintingKind::Immediate)?;

    sync::sync(ctx)?;
    // rate is taken before the deposit reaches the baseline
    let supply = ctx.x_algo_circulating_supply()?;
    let backing = ctx.algo_backing()?;
    let algo_sent = deposit(ctx, payment)?;

    let minted = calculate_immediate_mint(algo_sent, supply, backing, ctx.state.global.premium)?;
    add_to_baseline(ctx, algo_sent)?;
    check_minimum(minted, min_received)?;
    send_x_algo(ctx, &receiver, minted)?;

    info!(algo_sent, minted, "immediate mint");
    ctx.emit(ConsensusEvent::ImmediateMint {
        sender: ctx.sender,
        receiver,
        algo_sent,
        x_algo_minted: minted,
        round: ctx.round,
    });
    Ok(ActionOutcome::Minted { amount: minted })
}

/// Deposit ALGO now and queue the mint until the round delay has passed
pub fn delayed_mint<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    payment: &PaymentTxn,
    receiver: Address,
    nonce: Nonce,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    require_minting(ctx, MintingKind::Delayed)?;

    sync::sync(ctx)?;
    let stake = deposit(ctx, payment)?;
    if stake == 0 {
        return Err(ConsensusError::ZeroAmount);
    }
    let global = ctx.global_mut();
    global.total_pending_stake = global
        .total_pending_stake
        .checked_add(stake)
        .ok_or(ConsensusError::Overflow)?;

    let eligible_round = ctx
        .round
        .checked_add(DELAY_MINT_ROUNDS)
        .ok_or(ConsensusError::Overflow)?;
    let request = DelayedMintRequest { receiver, stake, round: eligible_round };
    let sender = ctx.sender;
    ctx.create_record(RecordKind::DelayedMint, delay_mint_record_name(&sender, &nonce), request.encode())?;

    info!(stake, eligible_round, "delayed mint queued");
    ctx.emit(ConsensusEvent::DelayedMint { sender, nonce, receiver, stake, eligible_round, round: ctx.round });
    Ok(ActionOutcome::DelayedMintQueued { eligible_round })
}

/// Settle a matured delayed mint at the current rate.
///
/// Anyone may claim; xALGO goes to the recorded receiver and the freed
/// storage margin goes to the caller.
pub fn claim_delayed_mint<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    minter: Address,
    nonce: Nonce,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;

    let request = ctx.state.delayed_mint(&minter, &nonce)?;
    if !request.is_claimable(ctx.round) {
        return Err(ConsensusError::DelayedMintNotReady {
            eligible_round: request.round,
            current_round: ctx.round,
        });
    }

    sync::sync(ctx)?;
    let supply = ctx.x_algo_circulating_supply()?;
    let backing = ctx.algo_backing()?;
    let minted = calculate_delayed_mint(request.stake, supply, backing)?;
    if minted == 0 {
        return Err(ConsensusError::ZeroAmount);
    }

    // stake moves from pending into the active baseline
    add_to_baseline(ctx, request.stake)?;
    let global = ctx.global_mut();
    global.total_pending_stake = global
        .total_pending_stake
        .checked_sub(request.stake)
        .ok_or(ConsensusError::Underflow)?;

    send_x_algo(ctx, &request.receiver, minted)?;
    ctx.delete_record(RecordKind::DelayedMint, &delay_mint_record_name(&minter, &nonce))?;
    ctx.refund_margin()?;

    info!(stake = request.stake, minted, "delayed mint claimed");
    ctx.emit(ConsensusEvent::ClaimDelayedMint {
        minter,
        nonce,
        receiver: request.receiver,
        stake: request.stake,
        x_algo_minted: minted,
        round: ctx.round,
    });
    Ok(ActionOutcome::Minted { amount: minted })
}

// ============ Burning ============

/// Return xALGO and receive a proportional share of the backing
pub fn burn<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    transfer: &AssetTransferTxn,
    receiver: Address,
    min_received: u64,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;

    let (sender, app, asset_id) = (ctx.sender, ctx.app, ctx.state.global.x_algo_id);
    check_asset_transfer(transfer, &sender, &app, asset_id)?;
    ctx.ledger.transfer_asset(asset_id, &sender, &app, transfer.amount)?;

    sync::sync(ctx)?;
    let supply_after = ctx.x_algo_circulating_supply()?;
    let backing = ctx.algo_backing()?;
    let algo_sent = calculate_burn_payout(transfer.amount, backing, supply_after)?;
    check_minimum(algo_sent, min_received)?;

    pool::send_from_pool(ctx, &receiver, algo_sent)?;
    let global = ctx.global_mut();
    global.last_proposers_active_balance = global
        .last_proposers_active_balance
        .checked_sub(algo_sent)
        .ok_or(ConsensusError::Underflow)?;

    info!(burned = transfer.amount, algo_sent, "burn");
    ctx.emit(ConsensusEvent::Burn {
        sender,
        receiver,
        x_algo_burned: transfer.amount,
        algo_sent,
        round: ctx.round,
    });
    Ok(ActionOutcome::Burned { algo_sent })
}

// ============ Queries ============

/// Current backing value, circulating supply and proposer balances
pub fn get_rate<L: Ledger>(ctx: &mut ConsensusContext<L>) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    if ctx.state.global.num_proposers == 0 {
        return Err(ConsensusError::NoProposers);
    }

    sync::sync(ctx)?;
    Ok(ActionOutcome::Rate(RateSnapshot {
        algo_balance: ctx.algo_backing()?,
        x_algo_circulating_supply: ctx.x_algo_circulating_supply()?,
        proposers_balances: pool::proposer_balances(ctx, true)?,
    }))
}

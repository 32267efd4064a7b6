//! Governance Controller
//!
//! Role management, parameter updates, minting pauses, time-delayed code
//! upgrades and proposer admin rotation.
//!
//! ## Access Control
//!
//! | Operation                   | Caller                           |
//! |-----------------------------|----------------------------------|
//! | initialise                  | anyone, once per deployment      |
//! | update_admin                | admin or current holder of role  |
//! | schedule_update_sc          | admin                            |
//! | update_sc                   | admin, after the time delay      |
//! | update_max_proposer_balance | admin                            |
//! | update_fee / update_premium | admin                            |
//! | pause_minting               | admin                            |
//! | set_proposer_admin          | register admin or proposer admin |

use tracing::info;

use xalgo_common::{
    check,
    constants::{fees, records},
    errors::{ConsensusError, ConsensusResult, ProgramKind, RecordKind},
    events::ConsensusEvent,
    layout::{proposer_admin_record_name, FixedRecord, PendingUpgrade, ProposerAdminRecord},
    types::{Address, AdminRole, Hash32, MintingKind},
};

use crate::{program_hash, sync, ActionOutcome, ConsensusContext, Ledger};

fn after_delay<L: Ledger>(ctx: &ConsensusContext<L>) -> ConsensusResult<u64> {
    ctx.timestamp
        .checked_add(ctx.state.global.time_delay)
        .ok_or(ConsensusError::Overflow)
}

// ============ Lifecycle ============

/// Mark the pool initialised; required after deployment and every upgrade
pub fn initialise<L: Ledger>(ctx: &mut ConsensusContext<L>) -> ConsensusResult<ActionOutcome> {
    if ctx.state.global.initialised {
        return Err(ConsensusError::AlreadyInitialised);
    }
    ctx.global_mut().initialised = true;
    ctx.emit(ConsensusEvent::Initialised { by: ctx.sender, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Hand a role to a new address
pub fn update_admin<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    role: AdminRole,
    new_admin: Address,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;

    let old_admin = ctx.state.global.role(role);
    if ctx.sender != ctx.state.global.admin && ctx.sender != old_admin {
        return Err(ConsensusError::RoleUpdateUnauthorized { role, caller: ctx.sender });
    }

    ctx.global_mut().set_role(role, new_admin);
    info!(role = role.key(), "role transferred");
    ctx.emit(ConsensusEvent::AdminUpdated { role, old_admin, new_admin, round: ctx.round });
    Ok(ActionOutcome::None)
}

// ============ Code Upgrade ============

/// Commit to new program hashes, executable after the time delay
pub fn schedule_update_sc<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    approval_sha256: Hash32,
    clear_sha256: Hash32,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;

    let effective_at = after_delay(ctx)?;
    let upgrade = PendingUpgrade { timestamp: effective_at, approval_sha256, clear_sha256 };
    ctx.write_record(RecordKind::PendingUpgrade, records::SC_UPDATE.to_vec(), upgrade.encode())?;

    ctx.emit(ConsensusEvent::UpdateScheduled { effective_at, approval_sha256, clear_sha256, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Execute the committed upgrade.
///
/// The supplied programs must hash to the committed values. The pool is
/// left uninitialised and its margin goes to the caller.
pub fn update_sc<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    approval_program: &[u8],
    clear_program: &[u8],
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;

    let upgrade = ctx
        .state
        .pending_upgrade()?
        .ok_or(ConsensusError::RecordNotFound { kind: RecordKind::PendingUpgrade })?;
    if ctx.timestamp < upgrade.timestamp {
        return Err(ConsensusError::UpgradeNotReady { effective_at: upgrade.timestamp, now: ctx.timestamp });
    }
    if program_hash(approval_program) != upgrade.approval_sha256 {
        return Err(ConsensusError::CodeHashMismatch { program: ProgramKind::Approval });
    }
    if program_hash(clear_program) != upgrade.clear_sha256 {
        return Err(ConsensusError::CodeHashMismatch { program: ProgramKind::Clear });
    }

    ctx.delete_record(RecordKind::PendingUpgrade, records::SC_UPDATE)?;
    let refunded = ctx.refund_margin()?;
    ctx.global_mut().initialised = false;

    info!(refunded, "contract updated");
    ctx.emit(ConsensusEvent::ContractUpdated {
        approval_sha256: upgrade.approval_sha256,
        clear_sha256: upgrade.clear_sha256,
        refunded,
        round: ctx.round,
    });
    Ok(ActionOutcome::Upgraded { refunded })
}

// ============ Parameters ============

pub fn update_max_proposer_balance<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    max_proposer_balance: u64,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;

    ctx.global_mut().max_proposer_balance = max_proposer_balance;
    ctx.emit(ConsensusEvent::MaxProposerBalanceUpdated { max_proposer_balance, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Change the fee. Fees accrued at the old rate are paid out first.
pub fn update_fee<L: Ledger>(ctx: &mut ConsensusContext<L>, fee: u64) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;
    check!(fee <= fees::MAX_FEE, ConsensusError::FeeTooHigh { fee, max: fees::MAX_FEE });

    let amount = sync::send_unclaimed_fees(ctx)?;
    let admin = ctx.state.global.admin;
    ctx.emit(ConsensusEvent::FeeClaimed { admin, amount, round: ctx.round });

    ctx.global_mut().fee = fee;
    ctx.emit(ConsensusEvent::FeeUpdated { fee, round: ctx.round });
    Ok(ActionOutcome::FeeClaimed { amount })
}

pub fn update_premium<L: Ledger>(ctx: &mut ConsensusContext<L>, premium: u64) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;
    check!(premium <= fees::MAX_PREMIUM, ConsensusError::PremiumTooHigh { premium, max: fees::MAX_PREMIUM });

    ctx.global_mut().premium = premium;
    ctx.emit(ConsensusEvent::PremiumUpdated { premium, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Pause or resume one minting path
pub fn pause_minting<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    kind: MintingKind,
    to_pause: bool,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::Admin)?;

    ctx.global_mut().set_can_mint(kind, !to_pause);
    ctx.emit(ConsensusEvent::MintingPaused { kind, paused: to_pause, round: ctx.round });
    Ok(ActionOutcome::None)
}

// ============ Proposer Admins ============

/// Assign the admin of the proposer at `index`.
///
/// The register admin replaces an existing admin only after the time delay;
/// the outgoing admin keeps acting until then but cannot reassign the
/// proposer while that change is pending. Assigning a first admin, or an
/// admin handing over its own proposer, takes effect immediately.
pub fn set_proposer_admin<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    proposer_index: u8,
    new_admin: Address,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;

    let now = ctx.timestamp;
    let (proposer, record) = if ctx.sender == ctx.state.global.register_admin {
        let proposer = ctx.state.proposer(proposer_index)?;
        let record = match ctx.state.proposer_admin(&proposer)? {
            Some(existing) => ProposerAdminRecord {
                timestamp: after_delay(ctx)?,
                admin: new_admin,
                previous_admin: existing.active_admin(now),
            },
            None => ProposerAdminRecord { timestamp: now, admin: new_admin, previous_admin: None },
        };
        (proposer, record)
    } else {
        let proposer = ctx.require_proposer_admin(proposer_index)?;
        if let Some(existing) = ctx.state.proposer_admin(&proposer)? {
            check!(
                !existing.is_pending(now),
                ConsensusError::NotProposerAdmin { proposer_index, caller: ctx.sender }
            );
        }
        (proposer, ProposerAdminRecord { timestamp: now, admin: new_admin, previous_admin: None })
    };

    ctx.write_record(RecordKind::ProposerAdmin, proposer_admin_record_name(&proposer), record.encode())?;
    ctx.emit(ConsensusEvent::ProposerAdminSet {
        proposer,
        admin: new_admin,
        effective_at: record.timestamp,
        round: ctx.round,
    });
    Ok(ActionOutcome::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{proposer, Fixture, ADMIN, REGISTER_ADMIN, USER, XGOV_ADMIN};
    use crate::ConsensusAction;
    use xalgo_common::constants::governance::DEFAULT_TIME_DELAY;

    #[test]
    fn test_initialise_once() {
        let mut fx = Fixture::uninitialised();
        assert!(fx.exec(USER, ConsensusAction::Initialise).is_ok());
        assert_eq!(fx.exec(USER, ConsensusAction::Initialise), Err(ConsensusError::AlreadyInitialised));
    }

    #[test]
    fn test_operations_require_initialised() {
        let mut fx = Fixture::uninitialised();
        assert_eq!(
            fx.exec(ADMIN, ConsensusAction::UpdateFee { fee: 10 }),
            Err(ConsensusError::NotInitialised)
        );
        assert_eq!(fx.exec(USER, ConsensusAction::ClaimFee), Err(ConsensusError::NotInitialised));
    }

    #[test]
    fn test_role_holder_can_hand_over() {
        let mut fx = Fixture::new();
        let new_holder = [0x77u8; 32];

        fx.exec(XGOV_ADMIN, ConsensusAction::UpdateAdmin { role: AdminRole::XGovAdmin, new_admin: new_holder })
            .unwrap();
        assert_eq!(fx.engine.global().xgov_admin, new_holder);

        // admin may replace any role
        fx.exec(ADMIN, ConsensusAction::UpdateAdmin { role: AdminRole::RegisterAdmin, new_admin: new_holder })
            .unwrap();
        assert_eq!(fx.engine.global().register_admin, new_holder);
    }

    #[test]
    fn test_role_update_rejects_others() {
        let mut fx = Fixture::new();
        let result = fx.exec(
            XGOV_ADMIN,
            ConsensusAction::UpdateAdmin { role: AdminRole::Admin, new_admin: XGOV_ADMIN },
        );
        assert_eq!(
            result,
            Err(ConsensusError::RoleUpdateUnauthorized { role: AdminRole::Admin, caller: XGOV_ADMIN })
        );
    }

    #[test]
    fn test_fee_bounds() {
        let mut fx = Fixture::with_proposers(1);
        assert!(fx.exec(ADMIN, ConsensusAction::UpdateFee { fee: fees::MAX_FEE }).is_ok());
        assert_eq!(
            fx.exec(ADMIN, ConsensusAction::UpdateFee { fee: fees::MAX_FEE + 1 }),
            Err(ConsensusError::FeeTooHigh { fee: fees::MAX_FEE + 1, max: fees::MAX_FEE })
        );
        assert!(matches!(
            fx.exec(USER, ConsensusAction::UpdateFee { fee: 0 }),
            Err(ConsensusError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_premium_bounds() {
        let mut fx = Fixture::new();
        assert!(fx.exec(ADMIN, ConsensusAction::UpdatePremium { premium: fees::MAX_PREMIUM }).is_ok());
        assert_eq!(fx.engine.global().premium, fees::MAX_PREMIUM);
        assert!(matches!(
            fx.exec(ADMIN, ConsensusAction::UpdatePremium { premium: fees::MAX_PREMIUM + 1 }),
            Err(ConsensusError::PremiumTooHigh { .. })
        ));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut fx = Fixture::new();
        fx.exec(ADMIN, ConsensusAction::PauseMinting { kind: MintingKind::Delayed, to_pause: true })
            .unwrap();
        assert!(!fx.engine.global().can_delay_mint);
        assert!(fx.engine.global().can_immediate_mint);

        fx.exec(ADMIN, ConsensusAction::PauseMinting { kind: MintingKind::Delayed, to_pause: false })
            .unwrap();
        assert!(fx.engine.global().can_delay_mint);
    }

    #[test]
    fn test_max_proposer_balance_update() {
        let mut fx = Fixture::new();
        fx.exec(ADMIN, ConsensusAction::UpdateMaxProposerBalance { max_proposer_balance: 5 })
            .unwrap();
        assert_eq!(fx.engine.global().max_proposer_balance, 5);
    }

    #[test]
    fn test_upgrade_waits_for_delay() {
        let mut fx = Fixture::new();
        let (approval, clear) = (b"approval v2".to_vec(), b"clear v2".to_vec());
        fx.exec(
            ADMIN,
            ConsensusAction::ScheduleUpdateSc {
                approval_sha256: program_hash(&approval),
                clear_sha256: program_hash(&clear),
            },
        )
        .unwrap();

        let update = ConsensusAction::UpdateSc { approval_program: approval, clear_program: clear };
        fx.advance_time(DEFAULT_TIME_DELAY - 1);
        assert!(matches!(fx.exec(ADMIN, update.clone()), Err(ConsensusError::UpgradeNotReady { .. })));

        fx.advance_time(1);
        assert!(matches!(fx.exec(ADMIN, update), Ok(ActionOutcome::Upgraded { .. })));
        assert!(!fx.engine.global().initialised);
        assert_eq!(fx.engine.state().pending_upgrade().unwrap(), None);
    }

    #[test]
    fn test_upgrade_checks_both_hashes() {
        let mut fx = Fixture::new();
        fx.exec(
            ADMIN,
            ConsensusAction::ScheduleUpdateSc {
                approval_sha256: program_hash(b"a"),
                clear_sha256: program_hash(b"c"),
            },
        )
        .unwrap();
        fx.advance_time(DEFAULT_TIME_DELAY);

        let wrong_approval =
            ConsensusAction::UpdateSc { approval_program: b"x".to_vec(), clear_program: b"c".to_vec() };
        assert_eq!(
            fx.exec(ADMIN, wrong_approval),
            Err(ConsensusError::CodeHashMismatch { program: ProgramKind::Approval })
        );

        let wrong_clear =
            ConsensusAction::UpdateSc { approval_program: b"a".to_vec(), clear_program: b"x".to_vec() };
        assert_eq!(
            fx.exec(ADMIN, wrong_clear),
            Err(ConsensusError::CodeHashMismatch { program: ProgramKind::Clear })
        );
    }

    #[test]
    fn test_upgrade_without_schedule() {
        let mut fx = Fixture::new();
        let update = ConsensusAction::UpdateSc { approval_program: vec![], clear_program: vec![] };
        assert_eq!(
            fx.exec(ADMIN, update),
            Err(ConsensusError::RecordNotFound { kind: RecordKind::PendingUpgrade })
        );
    }

    #[test]
    fn test_first_proposer_admin_is_immediate() {
        let mut fx = Fixture::with_proposers(1);
        let admin = [0x61u8; 32];
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: admin })
            .unwrap();

        let ctx = fx.context(USER);
        let record = ctx.state.proposer_admin(&proposer(0)).unwrap().unwrap();
        assert_eq!(record.active_admin(fx.timestamp), Some(admin));
    }

    #[test]
    fn test_replacing_proposer_admin_is_deferred() {
        let mut fx = Fixture::with_proposers(1);
        let (first, second) = ([0x61u8; 32], [0x62u8; 32]);
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: first })
            .unwrap();
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: second })
            .unwrap();

        // outgoing admin still acts during the delay
        assert_eq!(fx.context(first).require_proposer_admin(0), Ok(proposer(0)));
        assert!(fx.context(second).require_proposer_admin(0).is_err());

        fx.advance_time(DEFAULT_TIME_DELAY);
        assert!(fx.context(first).require_proposer_admin(0).is_err());
        assert_eq!(fx.context(second).require_proposer_admin(0), Ok(proposer(0)));
    }

    #[test]
    fn test_proposer_admin_hands_over_immediately() {
        let mut fx = Fixture::with_proposers(1);
        let (first, second) = ([0x61u8; 32], [0x62u8; 32]);
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: first })
            .unwrap();
        fx.exec(first, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: second })
            .unwrap();
        assert_eq!(fx.context(second).require_proposer_admin(0), Ok(proposer(0)));

        assert!(matches!(
            fx.exec(first, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: first }),
            Err(ConsensusError::NotProposerAdmin { .. })
        ));
    }

    #[test]
    fn test_outgoing_admin_cannot_cancel_pending_rotation() {
        let mut fx = Fixture::with_proposers(1);
        let (first, second) = ([0x61u8; 32], [0x62u8; 32]);
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: first })
            .unwrap();
        fx.exec(REGISTER_ADMIN, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: second })
            .unwrap();

        assert_eq!(
            fx.exec(first, ConsensusAction::SetProposerAdmin { proposer_index: 0, new_admin: first }),
            Err(ConsensusError::NotProposerAdmin { proposer_index: 0, caller: first })
        );

        fx.advance_time(DEFAULT_TIME_DELAY);
        assert!(fx.context(first).require_proposer_admin(0).is_err());
        assert_eq!(fx.context(second).require_proposer_admin(0), Ok(proposer(0)));
    }
}

//! Proposer Participation
//!
//! Consensus key registration and xGov subscriptions for proposers. The pool
//! holds signing authority over every proposer, so these calls act on the
//! proposer accounts through the ledger on behalf of their admins.

use tracing::info;

use xalgo_common::{
    errors::{ConsensusError, ConsensusResult},
    events::ConsensusEvent,
    types::{Address, AdminRole, AppId, KeyRegistration, PaymentTxn},
    validation::check_payment,
};

use crate::{ActionOutcome, ConsensusContext, Ledger};

/// Take a proposer online with `keys`.
///
/// The grouped payment from the proposer admin covers the registration fee.
pub fn register_online<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    payment: &PaymentTxn,
    proposer_index: u8,
    keys: &KeyRegistration,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    let proposer = ctx.require_proposer_admin(proposer_index)?;
    check_payment(payment, &ctx.sender, &proposer)?;

    let sender = ctx.sender;
    ctx.ledger.pay(&sender, &proposer, payment.amount)?;
    ctx.ledger.register_online(&proposer, keys, payment.amount)?;

    info!(proposer_index, vote_last = keys.vote_last, "proposer registered online");
    ctx.emit(ConsensusEvent::RegisteredOnline {
        proposer,
        vote_key: keys.vote_key,
        selection_key: keys.selection_key,
        vote_first: keys.vote_first,
        vote_last: keys.vote_last,
        fee: payment.amount,
        round: ctx.round,
    });
    Ok(ActionOutcome::None)
}

/// Take a proposer offline; register admin or proposer admin
pub fn register_offline<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    proposer_index: u8,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    let proposer = if ctx.sender == ctx.state.global.register_admin {
        ctx.state.proposer(proposer_index)?
    } else {
        ctx.require_proposer_admin(proposer_index)?
    };

    ctx.ledger.register_offline(&proposer)?;
    info!(proposer_index, "proposer registered offline");
    ctx.emit(ConsensusEvent::RegisteredOffline { proposer, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Subscribe a proposer to an xGov registry.
///
/// The xGov admin pays the registry's current fee to the application
/// account, which forwards it to the registry.
pub fn subscribe_xgov<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    payment: &PaymentTxn,
    proposer_index: u8,
    registry_id: AppId,
    voting_address: Address,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::XGovAdmin)?;
    let proposer = ctx.state.proposer(proposer_index)?;

    let fee = ctx
        .ledger
        .xgov_fee(registry_id)
        .ok_or(ConsensusError::RegistryNotFound { registry_id })?;
    let app = ctx.app;
    check_payment(payment, &ctx.sender, &app)?;
    if payment.amount != fee {
        return Err(ConsensusError::PaymentMismatch { expected: fee, actual: payment.amount });
    }

    let sender = ctx.sender;
    ctx.ledger.pay(&sender, &app, payment.amount)?;
    ctx.ledger
        .subscribe_xgov(registry_id, &proposer, &voting_address, &app, fee)?;

    ctx.emit(ConsensusEvent::XGovSubscribed { proposer, registry_id, voting_address, fee, round: ctx.round });
    Ok(ActionOutcome::None)
}

/// Remove a proposer's xGov subscription
pub fn unsubscribe_xgov<L: Ledger>(
    ctx: &mut ConsensusContext<L>,
    proposer_index: u8,
    registry_id: AppId,
) -> ConsensusResult<ActionOutcome> {
    ctx.require_initialised()?;
    ctx.require_role(AdminRole::XGovAdmin)?;
    let proposer = ctx.state.proposer(proposer_index)?;

    ctx.ledger.unsubscribe_xgov(registry_id, &proposer)?;
    ctx.emit(ConsensusEvent::XGovUnsubscribed { proposer, registry_id, round: ctx.round });
    Ok(ActionOutcome::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Participation;
    use crate::testing::{keys, proposer, Fixture, APP, REGISTER_ADMIN, USER, XGOV_ADMIN};
    use crate::ConsensusAction;

    const PROPOSER_ADMIN: Address = [0x61u8; 32];
    const REGISTRY: AppId = 9_000;
    const REGISTRY_ADDRESS: Address = [0x90u8; 32];

    fn fixture_with_admin() -> Fixture {
        let mut fx = Fixture::with_proposers(2);
        fx.engine.ledger_mut().create_account(PROPOSER_ADMIN, 10_000_000);
        fx.exec(
            REGISTER_ADMIN,
            ConsensusAction::SetProposerAdmin { proposer_index: 1, new_admin: PROPOSER_ADMIN },
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_register_online_and_offline() {
        let mut fx = fixture_with_admin();
        let before = fx.balance(&proposer(1));

        let action = ConsensusAction::RegisterOnline {
            payment: PaymentTxn::new(PROPOSER_ADMIN, proposer(1), 2_000_000),
            proposer_index: 1,
            keys: keys(),
        };
        fx.exec(PROPOSER_ADMIN, action).unwrap();
        assert!(matches!(
            fx.engine.ledger().participation(&proposer(1)),
            Participation::Online { vote_last: 3_000_000, .. }
        ));
        // fee passes through the proposer
        assert_eq!(fx.balance(&proposer(1)), before);

        fx.exec(REGISTER_ADMIN, ConsensusAction::RegisterOffline { proposer_index: 1 })
            .unwrap();
        assert_eq!(fx.engine.ledger().participation(&proposer(1)), Participation::Offline);
    }

    #[test]
    fn test_register_online_requires_proposer_admin() {
        let mut fx = fixture_with_admin();
        let action = ConsensusAction::RegisterOnline {
            payment: PaymentTxn::new(USER, proposer(1), 0),
            proposer_index: 1,
            keys: keys(),
        };
        assert!(matches!(fx.exec(USER, action), Err(ConsensusError::NotProposerAdmin { .. })));

        // no admin assigned for proposer 0
        let action = ConsensusAction::RegisterOnline {
            payment: PaymentTxn::new(PROPOSER_ADMIN, proposer(0), 0),
            proposer_index: 0,
            keys: keys(),
        };
        assert!(matches!(fx.exec(PROPOSER_ADMIN, action), Err(ConsensusError::NotProposerAdmin { .. })));
    }

    #[test]
    fn test_register_offline_by_stranger() {
        let mut fx = fixture_with_admin();
        assert!(matches!(
            fx.exec(USER, ConsensusAction::RegisterOffline { proposer_index: 1 }),
            Err(ConsensusError::NotProposerAdmin { .. })
        ));
        assert!(fx.exec(PROPOSER_ADMIN, ConsensusAction::RegisterOffline { proposer_index: 1 }).is_ok());
    }

    #[test]
    fn test_xgov_subscription() {
        let mut fx = Fixture::with_proposers(1);
        fx.engine.ledger_mut().add_xgov_registry(REGISTRY, REGISTRY_ADDRESS, 1_000);
        fx.engine.ledger_mut().create_account(XGOV_ADMIN, 1_000_000);
        let voting = [0x33u8; 32];

        let wrong_fee = ConsensusAction::SubscribeXGov {
            payment: PaymentTxn::new(XGOV_ADMIN, APP, 999),
            proposer_index: 0,
            registry_id: REGISTRY,
            voting_address: voting,
        };
        assert_eq!(
            fx.exec(XGOV_ADMIN, wrong_fee),
            Err(ConsensusError::PaymentMismatch { expected: 1_000, actual: 999 })
        );

        let subscribe = ConsensusAction::SubscribeXGov {
            payment: PaymentTxn::new(XGOV_ADMIN, APP, 1_000),
            proposer_index: 0,
            registry_id: REGISTRY,
            voting_address: voting,
        };
        fx.exec(XGOV_ADMIN, subscribe).unwrap();
        assert_eq!(fx.engine.ledger().xgov_subscription(REGISTRY, &proposer(0)), Some(voting));
        assert_eq!(fx.balance(&REGISTRY_ADDRESS), 1_000);

        fx.exec(XGOV_ADMIN, ConsensusAction::UnsubscribeXGov { proposer_index: 0, registry_id: REGISTRY })
            .unwrap();
        assert_eq!(fx.engine.ledger().xgov_subscription(REGISTRY, &proposer(0)), None);
    }

    #[test]
    fn test_xgov_unknown_registry() {
        let mut fx = Fixture::with_proposers(1);
        let subscribe = ConsensusAction::SubscribeXGov {
            payment: PaymentTxn::new(XGOV_ADMIN, APP, 0),
            proposer_index: 0,
            registry_id: REGISTRY,
            voting_address: [0x33u8; 32],
        };
        assert_eq!(fx.exec(XGOV_ADMIN, subscribe), Err(ConsensusError::RegistryNotFound { registry_id: REGISTRY }));
    }
}

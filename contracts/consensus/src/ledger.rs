//! Ledger Seam
//!
//! The pool never owns funds directly. It observes proposer balances and
//! moves ALGO and xALGO through the [`Ledger`] trait, which the host
//! implements. Ledgers are `Clone` so an operation can stage a private copy
//! and swap it in only when every step succeeded.
//!
//! [`AccountLedger`] is the in-memory reference host used by the tests.

use std::collections::BTreeMap;

use xalgo_common::{
    constants::storage::{ACCOUNT_MIN_BALANCE, ASSET_MIN_BALANCE},
    errors::{ConsensusError, ConsensusResult},
    types::{Address, AppId, AssetId, KeyRegistration},
};

/// Host ledger capabilities used by the engine
pub trait Ledger: Clone {
    /// Total ALGO balance of an account (0 if unknown)
    fn balance(&self, account: &Address) -> u64;

    /// Minimum ALGO balance an account must keep (0 if unknown)
    fn min_balance(&self, account: &Address) -> u64;

    /// Address authorised to sign for the account, if rekeyed
    fn auth_address(&self, account: &Address) -> Option<Address>;

    /// Asset holding of an account; `None` when not opted in
    fn asset_balance(&self, account: &Address, asset_id: AssetId) -> Option<u64>;

    /// Move ALGO, keeping the sender at or above its minimum balance
    fn pay(&mut self, from: &Address, to: &Address, amount: u64) -> ConsensusResult<()>;

    /// Move an asset between two opted-in accounts
    fn transfer_asset(
        &mut self,
        asset_id: AssetId,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> ConsensusResult<()>;

    /// Raise an account's minimum balance to cover stored records
    fn reserve_storage(&mut self, account: &Address, amount: u64) -> ConsensusResult<()>;

    /// Lower an account's minimum balance after records are freed
    fn release_storage(&mut self, account: &Address, amount: u64) -> ConsensusResult<()>;

    /// Register participation keys for an account, paying `fee` from it
    fn register_online(
        &mut self,
        account: &Address,
        keys: &KeyRegistration,
        fee: u64,
    ) -> ConsensusResult<()>;

    /// Take an account offline
    fn register_offline(&mut self, account: &Address) -> ConsensusResult<()>;

    /// Account address of an xGov registry application
    fn xgov_registry_address(&self, registry_id: AppId) -> Option<Address>;

    /// Subscription fee currently charged by an xGov registry
    fn xgov_fee(&self, registry_id: AppId) -> Option<u64>;

    /// Subscribe `proposer` to a registry, with `payer` paying `fee` to it
    fn subscribe_xgov(
        &mut self,
        registry_id: AppId,
        proposer: &Address,
        voting_address: &Address,
        payer: &Address,
        fee: u64,
    ) -> ConsensusResult<()>;

    /// Remove the subscription of `proposer`
    fn unsubscribe_xgov(&mut self, registry_id: AppId, proposer: &Address) -> ConsensusResult<()>;
}

// ============ In-Memory Ledger ============

/// Consensus participation status of an account
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Participation {
    #[default]
    Offline,
    Online {
        vote_key: [u8; 32],
        selection_key: [u8; 32],
        vote_first: u64,
        vote_last: u64,
    },
}

/// Account held by [`AccountLedger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: u64,
    pub min_balance: u64,
    pub auth_address: Option<Address>,
    pub assets: BTreeMap<AssetId, u64>,
    pub participation: Participation,
}

impl Account {
    fn new(balance: u64) -> Self {
        Self {
            balance,
            min_balance: ACCOUNT_MIN_BALANCE,
            auth_address: None,
            assets: BTreeMap::new(),
            participation: Participation::Offline,
        }
    }

    /// Balance above the minimum balance
    pub fn spendable(&self) -> u64 {
        self.balance.saturating_sub(self.min_balance)
    }
}

/// xGov registry known to [`AccountLedger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XGovRegistry {
    pub address: Address,
    pub fee: u64,
    /// proposer -> voting address
    pub subscriptions: BTreeMap<Address, Address>,
}

/// BTreeMap-backed reference ledger
#[derive(Debug, Clone, Default)]
pub struct AccountLedger {
    accounts: BTreeMap<Address, Account>,
    registries: BTreeMap<AppId, XGovRegistry>,
}

impl AccountLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or top up) an account with `balance` microALGO
    pub fn create_account(&mut self, address: Address, balance: u64) {
        self.accounts
            .entry(address)
            .and_modify(|a| a.balance = a.balance.saturating_add(balance))
            .or_insert_with(|| Account::new(balance));
    }

    /// Add ALGO to an account out of thin air
    pub fn fund(&mut self, address: &Address, amount: u64) {
        self.create_account(*address, amount);
    }

    /// Credit rewards to an account, as block proposal would
    pub fn accrue_rewards(&mut self, address: &Address, amount: u64) {
        self.fund(address, amount);
    }

    /// Remove ALGO from an account (slashing-like loss), ignoring the minimum balance
    pub fn debit(&mut self, address: &Address, amount: u64) {
        if let Some(account) = self.accounts.get_mut(address) {
            account.balance = account.balance.saturating_sub(amount);
        }
    }

    /// Rekey an account to `auth`
    pub fn set_auth_address(&mut self, address: &Address, auth: Address) {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0))
            .auth_address = Some(auth);
    }

    /// Opt an account in to an asset
    pub fn opt_in(&mut self, address: &Address, asset_id: AssetId) {
        let account = self.accounts.entry(*address).or_insert_with(|| Account::new(0));
        if !account.assets.contains_key(&asset_id) {
            account.assets.insert(asset_id, 0);
            account.min_balance = account.min_balance.saturating_add(ASSET_MIN_BALANCE);
        }
    }

    /// Create an asset whose whole supply sits with `creator`
    pub fn create_asset(&mut self, creator: &Address, asset_id: AssetId, total: u64) {
        self.opt_in(creator, asset_id);
        if let Some(account) = self.accounts.get_mut(creator) {
            account.assets.insert(asset_id, total);
        }
    }

    /// Register an xGov registry application and its account
    pub fn add_xgov_registry(&mut self, registry_id: AppId, address: Address, fee: u64) {
        self.create_account(address, 0);
        self.registries.insert(
            registry_id,
            XGovRegistry { address, fee, subscriptions: BTreeMap::new() },
        );
    }

    /// Look up an account
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Participation status of an account
    pub fn participation(&self, address: &Address) -> Participation {
        self.accounts
            .get(address)
            .map(|a| a.participation.clone())
            .unwrap_or_default()
    }

    /// Voting address a proposer subscribed with
    pub fn xgov_subscription(&self, registry_id: AppId, proposer: &Address) -> Option<Address> {
        self.registries
            .get(&registry_id)
            .and_then(|r| r.subscriptions.get(proposer).copied())
    }

    fn account_mut(&mut self, address: &Address) -> ConsensusResult<&mut Account> {
        self.accounts
            .get_mut(address)
            .ok_or(ConsensusError::AccountNotFound { account: *address })
    }

    fn debit_spendable(&mut self, address: &Address, amount: u64) -> ConsensusResult<()> {
        let account = self.account_mut(address)?;
        let available = account.spendable();
        if amount > available {
            return Err(ConsensusError::InsufficientBalance {
                account: *address,
                available,
                requested: amount,
            });
        }
        account.balance -= amount;
        Ok(())
    }
}

impl Ledger for AccountLedger {
    fn balance(&self, account: &Address) -> u64 {
        self.accounts.get(account).map(|a| a.balance).unwrap_or(0)
    }

    fn min_balance(&self, account: &Address) -> u64 {
        self.accounts.get(account).map(|a| a.min_balance).unwrap_or(0)
    }

    fn auth_address(&self, account: &Address) -> Option<Address> {
        self.accounts.get(account).and_then(|a| a.auth_address)
    }

    fn asset_balance(&self, account: &Address, asset_id: AssetId) -> Option<u64> {
        self.accounts
            .get(account)
            .and_then(|a| a.assets.get(&asset_id).copied())
    }

    fn pay(&mut self, from: &Address, to: &Address, amount: u64) -> ConsensusResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit_spendable(from, amount)?;
        let receiver = self.accounts.entry(*to).or_insert_with(|| Account::new(0));
        receiver.balance = receiver
            .balance
            .checked_add(amount)
            .ok_or(ConsensusError::Overflow)?;
        Ok(())
    }

    fn transfer_asset(
        &mut self,
        asset_id: AssetId,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> ConsensusResult<()> {
        let held = self
            .asset_balance(from, asset_id)
            .ok_or(ConsensusError::NotOptedIn { account: *from, asset_id })?;
        if self.asset_balance(to, asset_id).is_none() {
            return Err(ConsensusError::NotOptedIn { account: *to, asset_id });
        }
        if amount > held {
            return Err(ConsensusError::InsufficientBalance {
                account: *from,
                available: held,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        if let Some(holding) = self.account_mut(from)?.assets.get_mut(&asset_id) {
            *holding -= amount;
        }
        if let Some(holding) = self.account_mut(to)?.assets.get_mut(&asset_id) {
            *holding = holding.checked_add(amount).ok_or(ConsensusError::Overflow)?;
        }
        Ok(())
    }

    fn reserve_storage(&mut self, account: &Address, amount: u64) -> ConsensusResult<()> {
        let acc = self.account_mut(account)?;
        let available = acc.spendable();
        if amount > available {
            return Err(ConsensusError::InsufficientBalance {
                account: *account,
                available,
                requested: amount,
            });
        }
        acc.min_balance += amount;
        Ok(())
    }

    fn release_storage(&mut self, account: &Address, amount: u64) -> ConsensusResult<()> {
        let acc = self.account_mut(account)?;
        acc.min_balance = acc
            .min_balance
            .checked_sub(amount)
            .ok_or(ConsensusError::Underflow)?;
        Ok(())
    }

    fn register_online(
        &mut self,
        account: &Address,
        keys: &KeyRegistration,
        fee: u64,
    ) -> ConsensusResult<()> {
        self.debit_spendable(account, fee)?;
        self.account_mut(account)?.participation = Participation::Online {
            vote_key: keys.vote_key,
            selection_key: keys.selection_key,
            vote_first: keys.vote_first,
            vote_last: keys.vote_last,
        };
        Ok(())
    }

    fn register_offline(&mut self, account: &Address) -> ConsensusResult<()> {
        self.account_mut(account)?.participation = Participation::Offline;
        Ok(())
    }

    fn xgov_registry_address(&self, registry_id: AppId) -> Option<Address> {
        self.registries.get(&registry_id).map(|r| r.address)
    }

    fn xgov_fee(&self, registry_id: AppId) -> Option<u64> {
        self.registries.get(&registry_id).map(|r| r.fee)
    }

    fn subscribe_xgov(
        &mut self,
        registry_id: AppId,
        proposer: &Address,
        voting_address: &Address,
        payer: &Address,
        fee: u64,
    ) -> ConsensusResult<()> {
        let registry_address = self
            .xgov_registry_address(registry_id)
            .ok_or(ConsensusError::RegistryNotFound { registry_id })?;
        self.pay(payer, &registry_address, fee)?;
        if let Some(registry) = self.registries.get_mut(&registry_id) {
            registry.subscriptions.insert(*proposer, *voting_address);
        }
        Ok(())
    }

    fn unsubscribe_xgov(&mut self, registry_id: AppId, proposer: &Address) -> ConsensusResult<()> {
        let registry = self
            .registries
            .get_mut(&registry_id)
            .ok_or(ConsensusError::RegistryNotFound { registry_id })?;
        registry.subscriptions.remove(proposer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    #[test]
    fn test_pay_respects_min_balance() {
        let mut ledger = AccountLedger::new();
        ledger.create_account(ALICE, ACCOUNT_MIN_BALANCE + 500);

        assert!(ledger.pay(&ALICE, &BOB, 500).is_ok());
        assert_eq!(ledger.balance(&BOB), 500);
        assert_eq!(
            ledger.pay(&ALICE, &BOB, 1),
            Err(ConsensusError::InsufficientBalance { account: ALICE, available: 0, requested: 1 })
        );
    }

    #[test]
    fn test_zero_payment_is_noop() {
        let mut ledger = AccountLedger::new();
        assert!(ledger.pay(&ALICE, &BOB, 0).is_ok());
        assert!(ledger.account(&BOB).is_none());
    }

    #[test]
    fn test_asset_transfer_requires_opt_in() {
        let mut ledger = AccountLedger::new();
        ledger.create_account(ALICE, 1_000_000);
        ledger.create_asset(&ALICE, 7, 1_000);

        assert_eq!(
            ledger.transfer_asset(7, &ALICE, &BOB, 10),
            Err(ConsensusError::NotOptedIn { account: BOB, asset_id: 7 })
        );

        ledger.opt_in(&BOB, 7);
        assert!(ledger.transfer_asset(7, &ALICE, &BOB, 10).is_ok());
        assert_eq!(ledger.asset_balance(&ALICE, 7), Some(990));
        assert_eq!(ledger.asset_balance(&BOB, 7), Some(10));
        assert!(ledger.transfer_asset(7, &BOB, &ALICE, 11).is_err());
    }

    #[test]
    fn test_storage_reserve_and_release() {
        let mut ledger = AccountLedger::new();
        ledger.create_account(ALICE, ACCOUNT_MIN_BALANCE + 10_000);

        assert!(ledger.reserve_storage(&ALICE, 10_000).is_ok());
        assert_eq!(ledger.min_balance(&ALICE), ACCOUNT_MIN_BALANCE + 10_000);
        assert!(ledger.reserve_storage(&ALICE, 1).is_err());

        assert!(ledger.release_storage(&ALICE, 10_000).is_ok());
        assert_eq!(ledger.min_balance(&ALICE), ACCOUNT_MIN_BALANCE);
    }

    #[test]
    fn test_key_registration() {
        let mut ledger = AccountLedger::new();
        ledger.create_account(ALICE, ACCOUNT_MIN_BALANCE + 2_000_000);
        let keys = KeyRegistration {
            vote_key: [3u8; 32],
            selection_key: [4u8; 32],
            state_proof_key: [5u8; 64],
            vote_first: 1,
            vote_last: 100,
            vote_key_dilution: 10,
        };

        ledger.register_online(&ALICE, &keys, 2_000_000).unwrap();
        assert_eq!(ledger.balance(&ALICE), ACCOUNT_MIN_BALANCE);
        assert!(matches!(ledger.participation(&ALICE), Participation::Online { vote_last: 100, .. }));

        ledger.register_offline(&ALICE).unwrap();
        assert_eq!(ledger.participation(&ALICE), Participation::Offline);
    }

    #[test]
    fn test_xgov_subscription() {
        let mut ledger = AccountLedger::new();
        ledger.create_account(ALICE, ACCOUNT_MIN_BALANCE + 100);
        ledger.add_xgov_registry(9, [9u8; 32], 100);

        ledger.subscribe_xgov(9, &BOB, &[8u8; 32], &ALICE, 100).unwrap();
        assert_eq!(ledger.balance(&[9u8; 32]), 100);
        assert_eq!(ledger.xgov_subscription(9, &BOB), Some([8u8; 32]));

        ledger.unsubscribe_xgov(9, &BOB).unwrap();
        assert_eq!(ledger.xgov_subscription(9, &BOB), None);
        assert_eq!(
            ledger.unsubscribe_xgov(10, &BOB),
            Err(ConsensusError::RegistryNotFound { registry_id: 10 })
        );
    }
}

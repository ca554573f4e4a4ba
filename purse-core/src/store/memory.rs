//! In-process ledger store with the same locking and visibility rules as the
//! Postgres store.
//!
//! Row locks are per-wallet `tokio::sync::Mutex` guards owned by the unit, so a
//! second unit locking the same wallet waits until the first one commits or is
//! dropped. Writes are staged inside the unit and become visible to everyone
//! else only on commit.

use super::{LedgerStore, LedgerUnit, StoreError, WALLET_NUMBER_ATTEMPTS};
use crate::entities::TransactionStatus;
use crate::entities::transactions::{LedgerTransaction, TransactionInsert};
use crate::entities::users::{NewUser, User};
use crate::entities::wallets::{Wallet, generate_wallet_number};
use async_trait::async_trait;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    transactions: Vec<LedgerTransaction>,
}

impl State {
    fn reference_taken(&self, reference: &str, external_reference: Option<&str>) -> bool {
        self.transactions.iter().any(|t| {
            t.reference == reference
                || (external_reference.is_some()
                    && t.external_reference.as_deref() == external_reference)
        })
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    row_locks: Mutex<HashMap<Uuid, Arc<RowLock<()>>>>,
}

impl Shared {
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut state))
    }

    fn row_lock(&self, wallet_id: Uuid) -> Result<Arc<RowLock<()>>, StoreError> {
        if !self.with_state(|s| s.wallets.contains_key(&wallet_id))? {
            return Err(StoreError::WalletMissing(wallet_id));
        }
        let mut locks = self.row_locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks.entry(wallet_id).or_default().clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a wallet's committed balance. Fixture helper; it bypasses
    /// row locks and the transaction log.
    pub fn seed_balance(&self, wallet_id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        self.shared.with_state(|s| match s.wallets.get_mut(&wallet_id) {
            Some(wallet) => {
                wallet.balance = balance;
                Ok(())
            }
            None => Err(StoreError::WalletMissing(wallet_id)),
        })?
    }

    /// Sum of every committed wallet balance.
    pub fn total_balance(&self) -> Result<Decimal, StoreError> {
        self.shared
            .with_state(|s| s.wallets.values().map(|w| w.balance).sum())
    }

    /// Number of committed ledger transactions.
    pub fn transaction_count(&self) -> Result<usize, StoreError> {
        self.shared.with_state(|s| s.transactions.len())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryUnit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        Ok(InMemoryUnit {
            shared: self.shared.clone(),
            guards: HashMap::new(),
            balances: HashMap::new(),
            inserts: Vec::new(),
            transitions: Vec::new(),
        })
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<(User, Wallet), StoreError> {
        self.shared.with_state(|s| {
            if s.users.values().any(|u| u.email == new_user.email) {
                return Err(StoreError::Duplicate("user email"));
            }
            let wallet_number = (0..WALLET_NUMBER_ATTEMPTS)
                .map(|_| generate_wallet_number())
                .find(|n| !s.wallets.values().any(|w| &w.wallet_number == n))
                .ok_or(StoreError::Duplicate("wallet number"))?;

            let now = OffsetDateTime::now_utc();
            let user = User {
                id: Uuid::now_v7(),
                email: new_user.email,
                name: new_user.name,
                created_at: now,
                updated_at: now,
            };
            let wallet = Wallet {
                id: Uuid::now_v7(),
                user_id: user.id,
                wallet_number,
                balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            };
            s.users.insert(user.id, user.clone());
            s.wallets.insert(wallet.id, wallet.clone());
            Ok((user, wallet))
        })?
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        self.shared.with_state(|s| s.users.get(&user_id).cloned())
    }

    async fn find_wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        self.shared
            .with_state(|s| s.wallets.values().find(|w| w.user_id == user_id).cloned())
    }

    async fn find_wallet_by_number(
        &self,
        wallet_number: &str,
    ) -> Result<Option<Wallet>, StoreError> {
        self.shared.with_state(|s| {
            s.wallets
                .values()
                .find(|w| w.wallet_number == wallet_number)
                .cloned()
        })
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        self.shared.with_state(|s| {
            s.transactions
                .iter()
                .find(|t| t.reference == reference)
                .cloned()
        })
    }

    async fn find_transaction_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        self.shared.with_state(|s| {
            s.transactions
                .iter()
                .find(|t| t.external_reference.as_deref() == Some(external_reference))
                .cloned()
        })
    }

    async fn list_transactions_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        self.shared.with_state(|s| {
            s.transactions
                .iter()
                .filter(|t| t.user_id == user_id)
                .sorted_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
                .skip(skip)
                .take(take)
                .cloned()
                .collect()
        })
    }
}

/// Unit of work over [`InMemoryLedgerStore`]. Dropping it discards staged
/// writes and releases its row locks.
pub struct InMemoryUnit {
    shared: Arc<Shared>,
    guards: HashMap<Uuid, OwnedMutexGuard<()>>,
    balances: HashMap<Uuid, Decimal>,
    inserts: Vec<LedgerTransaction>,
    transitions: Vec<(Uuid, TransactionStatus)>,
}

impl InMemoryUnit {
    fn current_status(&self, transaction_id: Uuid) -> Result<Option<TransactionStatus>, StoreError> {
        if let Some((_, status)) = self
            .transitions
            .iter()
            .rev()
            .find(|(id, _)| *id == transaction_id)
        {
            return Ok(Some(*status));
        }
        if let Some(staged) = self.inserts.iter().find(|t| t.id == transaction_id) {
            return Ok(Some(staged.status));
        }
        self.shared.with_state(|s| {
            s.transactions
                .iter()
                .find(|t| t.id == transaction_id)
                .map(|t| t.status)
        })
    }
}

#[async_trait]
impl LedgerUnit for InMemoryUnit {
    async fn lock_wallet_for_update(&mut self, wallet_id: Uuid) -> Result<Decimal, StoreError> {
        if !self.guards.contains_key(&wallet_id) {
            let lock = self.shared.row_lock(wallet_id)?;
            let guard = lock.lock_owned().await;
            self.guards.insert(wallet_id, guard);
        }
        if let Some(balance) = self.balances.get(&wallet_id) {
            return Ok(*balance);
        }
        self.shared
            .with_state(|s| s.wallets.get(&wallet_id).map(|w| w.balance))?
            .ok_or(StoreError::WalletMissing(wallet_id))
    }

    async fn set_balance(&mut self, wallet_id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::NegativeBalance { wallet_id, balance });
        }
        if !self.guards.contains_key(&wallet_id) {
            return Err(StoreError::NotLocked(wallet_id));
        }
        self.balances.insert(wallet_id, balance);
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        insert: TransactionInsert,
    ) -> Result<LedgerTransaction, StoreError> {
        let external = insert.external_reference.as_deref();
        let staged_clash = self.inserts.iter().any(|t| {
            t.reference == insert.reference
                || (external.is_some() && t.external_reference.as_deref() == external)
        });
        if staged_clash
            || self
                .shared
                .with_state(|s| s.reference_taken(&insert.reference, external))?
        {
            return Err(StoreError::Duplicate("transaction reference"));
        }

        let now = OffsetDateTime::now_utc();
        let record = LedgerTransaction {
            id: Uuid::now_v7(),
            user_id: insert.user_id,
            wallet_id: insert.wallet_id,
            kind: insert.kind,
            amount: insert.amount,
            status: insert.status,
            reference: insert.reference,
            external_reference: insert.external_reference,
            counterparty_wallet_id: insert.counterparty_wallet_id,
            counterparty_user_id: insert.counterparty_user_id,
            description: insert.description,
            created_at: now,
            updated_at: now,
        };
        self.inserts.push(record.clone());
        Ok(record)
    }

    async fn update_transaction_status(
        &mut self,
        transaction_id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<bool, StoreError> {
        if self.current_status(transaction_id)? != Some(from) {
            return Ok(false);
        }
        self.transitions.push((transaction_id, to));
        Ok(true)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryUnit {
            shared,
            guards,
            balances,
            inserts,
            transitions,
        } = self;

        shared.with_state(move |s| {
            if inserts
                .iter()
                .any(|t| s.reference_taken(&t.reference, t.external_reference.as_deref()))
            {
                return Err(StoreError::Duplicate("transaction reference"));
            }

            let now = OffsetDateTime::now_utc();
            for (wallet_id, balance) in balances {
                let wallet = s
                    .wallets
                    .get_mut(&wallet_id)
                    .ok_or(StoreError::WalletMissing(wallet_id))?;
                wallet.balance = balance;
                wallet.updated_at = now;
            }
            s.transactions.extend(inserts);
            for (transaction_id, status) in transitions {
                if let Some(t) = s.transactions.iter_mut().find(|t| t.id == transaction_id) {
                    t.status = status;
                    t.updated_at = now;
                }
            }
            Ok(())
        })??;

        // Row locks are released only once the writes are visible.
        drop(guards);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TransactionKind;
    use std::time::Duration;

    async fn store_with_wallet() -> (InMemoryLedgerStore, Wallet) {
        let store = InMemoryLedgerStore::new();
        let (_, wallet) = store
            .provision_user(NewUser {
                email: "ada@example.com".into(),
                name: "Ada".into(),
            })
            .await
            .unwrap();
        (store, wallet)
    }

    fn deposit_insert(wallet: &Wallet, reference: &str) -> TransactionInsert {
        TransactionInsert {
            user_id: wallet.user_id,
            wallet_id: wallet.id,
            kind: TransactionKind::Deposit,
            amount: Decimal::new(5000, 2),
            status: TransactionStatus::Pending,
            reference: reference.into(),
            external_reference: Some(reference.into()),
            counterparty_wallet_id: None,
            counterparty_user_id: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_provision_creates_zero_balance_wallet() {
        let (store, wallet) = store_with_wallet().await;
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.wallet_number.len(), 10);
        let found = store.find_wallet_by_user(wallet.user_id).await.unwrap();
        assert_eq!(found, Some(wallet));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (store, _) = store_with_wallet().await;
        let err = store
            .provision_user(NewUser {
                email: "ada@example.com".into(),
                name: "Other".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("user email")));
    }

    #[tokio::test]
    async fn test_dropped_unit_rolls_back() {
        let (store, wallet) = store_with_wallet().await;
        {
            let mut unit = store.begin().await.unwrap();
            unit.lock_wallet_for_update(wallet.id).await.unwrap();
            unit.set_balance(wallet.id, Decimal::new(100, 0)).await.unwrap();
            unit.insert_transaction(deposit_insert(&wallet, "DEP_1"))
                .await
                .unwrap();
        }
        assert_eq!(store.total_balance().unwrap(), Decimal::ZERO);
        assert_eq!(store.transaction_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let (store, wallet) = store_with_wallet().await;
        let mut unit = store.begin().await.unwrap();
        unit.lock_wallet_for_update(wallet.id).await.unwrap();
        unit.set_balance(wallet.id, Decimal::new(100, 0)).await.unwrap();
        unit.insert_transaction(deposit_insert(&wallet, "DEP_1"))
            .await
            .unwrap();
        assert_eq!(store.transaction_count().unwrap(), 0);
        unit.commit().await.unwrap();
        assert_eq!(store.total_balance().unwrap(), Decimal::new(100, 0));
        assert!(
            store
                .find_transaction_by_external_reference("DEP_1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_negative_balance_is_refused() {
        let (store, wallet) = store_with_wallet().await;
        let mut unit = store.begin().await.unwrap();
        unit.lock_wallet_for_update(wallet.id).await.unwrap();
        let err = unit
            .set_balance(wallet.id, Decimal::new(-1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NegativeBalance { .. }));
    }

    #[tokio::test]
    async fn test_balance_write_requires_lock() {
        let (store, wallet) = store_with_wallet().await;
        let mut unit = store.begin().await.unwrap();
        let err = unit.set_balance(wallet.id, Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, StoreError::NotLocked(_)));
    }

    #[tokio::test]
    async fn test_row_lock_blocks_second_unit() {
        let (store, wallet) = store_with_wallet().await;
        let mut first = store.begin().await.unwrap();
        first.lock_wallet_for_update(wallet.id).await.unwrap();
        first.set_balance(wallet.id, Decimal::TEN).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), second.lock_wallet_for_update(wallet.id))
                .await;
        assert!(blocked.is_err());

        first.commit().await.unwrap();
        let balance = second.lock_wallet_for_update(wallet.id).await.unwrap();
        assert_eq!(balance, Decimal::TEN);
    }

    #[tokio::test]
    async fn test_status_transition_is_conditional() {
        let (store, wallet) = store_with_wallet().await;
        let mut unit = store.begin().await.unwrap();
        let txn = unit
            .insert_transaction(deposit_insert(&wallet, "DEP_1"))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert!(
            unit.update_transaction_status(txn.id, TransactionStatus::Pending, TransactionStatus::Success)
                .await
                .unwrap()
        );
        assert!(
            !unit
                .update_transaction_status(txn.id, TransactionStatus::Pending, TransactionStatus::Success)
                .await
                .unwrap()
        );
        unit.commit().await.unwrap();

        let stored = store.find_transaction_by_reference("DEP_1").await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_rejected() {
        let (store, wallet) = store_with_wallet().await;
        let mut unit = store.begin().await.unwrap();
        unit.insert_transaction(deposit_insert(&wallet, "DEP_1"))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        let err = unit
            .insert_transaction(deposit_insert(&wallet, "DEP_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }
}

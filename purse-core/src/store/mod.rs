//! Ledger Store contract.
//!
//! A [`LedgerStore`] hands out [`LedgerUnit`]s: atomic units of work that
//! either commit every write or none. Row locks taken through a unit are held
//! until the unit is committed or dropped. Dropping a unit without calling
//! [`LedgerUnit::commit`] rolls it back.
//!
//! Two implementations exist: [`PgLedgerStore`] for production and
//! [`InMemoryLedgerStore`], which emulates the same locking and visibility
//! rules for tests.

mod memory;
mod postgres;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

use crate::entities::TransactionStatus;
use crate::entities::transactions::{LedgerTransaction, TransactionInsert};
use crate::entities::users::{NewUser, User};
use crate::entities::wallets::Wallet;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Attempts at drawing an unused wallet number before giving up.
pub const WALLET_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused to persist a negative balance.
    #[error("refusing to write negative balance {balance} to wallet {wallet_id}")]
    NegativeBalance { wallet_id: Uuid, balance: Decimal },

    #[error("wallet {0} does not exist")]
    WalletMissing(Uuid),

    /// A unique constraint was hit.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// A balance write was attempted without holding the wallet's row lock.
    #[error("wallet {0} is not locked by this unit")]
    NotLocked(Uuid),

    #[error("store state poisoned")]
    Poisoned,
}

/// Durable storage for users, wallets and ledger transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Unit: LedgerUnit;

    /// Open a new atomic unit.
    async fn begin(&self) -> Result<Self::Unit, StoreError>;

    /// Create a user and its zero-balance wallet in one atomic unit.
    async fn provision_user(&self, new_user: NewUser) -> Result<(User, Wallet), StoreError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError>;

    async fn find_wallet_by_number(&self, wallet_number: &str)
    -> Result<Option<Wallet>, StoreError>;

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    async fn find_transaction_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    /// Newest-first page of a user's transactions. Callers clamp `limit` and
    /// `offset` before calling.
    async fn list_transactions_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, StoreError>;
}

/// One atomic unit of ledger writes.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Lock the wallet row for the rest of the unit and return its balance.
    ///
    /// Blocks while another unit holds the same row.
    async fn lock_wallet_for_update(&mut self, wallet_id: Uuid) -> Result<Decimal, StoreError>;

    /// Write a wallet balance. Negative balances are refused.
    async fn set_balance(&mut self, wallet_id: Uuid, balance: Decimal) -> Result<(), StoreError>;

    async fn insert_transaction(
        &mut self,
        insert: TransactionInsert,
    ) -> Result<LedgerTransaction, StoreError>;

    /// Conditionally move a transaction from `from` to `to`.
    ///
    /// Returns `false` and writes nothing when the transaction is no longer
    /// in `from`.
    async fn update_transaction_status(
        &mut self,
        transaction_id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<bool, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

/// Map a unique violation onto [`StoreError::Duplicate`], keeping other
/// database errors as they are.
pub(crate) fn classify_insert_error(err: sqlx::Error, what: &'static str) -> StoreError {
    if crate::entities::is_unique_violation(&err) {
        StoreError::Duplicate(what)
    } else {
        StoreError::Database(err)
    }
}

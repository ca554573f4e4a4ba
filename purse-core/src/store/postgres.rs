use super::{LedgerStore, LedgerUnit, StoreError, WALLET_NUMBER_ATTEMPTS, classify_insert_error};
use crate::entities::TransactionStatus;
use crate::entities::transactions::{
    GetTransactionByExternalReference, GetTransactionByReference, LedgerTransaction,
    ListTransactionsByUser, TransactionInsert,
};
use crate::entities::users::{GetUserById, NewUser, User};
use crate::entities::wallets::{GetWalletByNumber, GetWalletByUser, Wallet, generate_wallet_number};
use crate::framework::{DatabaseProcessor, TransactionProcessor};
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// PostgreSQL-backed ledger store.
///
/// Units are plain database transactions; row locks are `SELECT ... FOR UPDATE`.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    processor: DatabaseProcessor,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }

    pub fn processor(&self) -> &DatabaseProcessor {
        &self.processor
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Unit = TransactionProcessor<'static>;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        let tx = self.processor.pool.begin().await?;
        Ok(TransactionProcessor { tx })
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<(User, Wallet), StoreError> {
        let mut tx = self.processor.pool.begin().await?;

        let user = User::insert_tx(&mut tx, &new_user)
            .await
            .map_err(|e| classify_insert_error(e, "user email"))?;

        for attempt in 1..=WALLET_NUMBER_ATTEMPTS {
            let wallet_number = generate_wallet_number();
            if let Some(wallet) = Wallet::try_insert_tx(&mut tx, user.id, &wallet_number).await? {
                tx.commit().await?;
                return Ok((user, wallet));
            }
            warn!(attempt, wallet_number = %wallet_number, "Wallet number collision, retrying");
        }

        Err(StoreError::Duplicate("wallet number"))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.processor.process(GetUserById { user_id }).await?)
    }

    async fn find_wallet_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, StoreError> {
        Ok(self.processor.process(GetWalletByUser { user_id }).await?)
    }

    async fn find_wallet_by_number(
        &self,
        wallet_number: &str,
    ) -> Result<Option<Wallet>, StoreError> {
        Ok(self
            .processor
            .process(GetWalletByNumber {
                wallet_number: wallet_number.to_owned(),
            })
            .await?)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self
            .processor
            .process(GetTransactionByReference {
                reference: reference.to_owned(),
            })
            .await?)
    }

    async fn find_transaction_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self
            .processor
            .process(GetTransactionByExternalReference {
                external_reference: external_reference.to_owned(),
            })
            .await?)
    }

    async fn list_transactions_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        Ok(self
            .processor
            .process(ListTransactionsByUser {
                user_id,
                limit,
                offset,
            })
            .await?)
    }
}

#[async_trait]
impl LedgerUnit for TransactionProcessor<'static> {
    async fn lock_wallet_for_update(&mut self, wallet_id: Uuid) -> Result<Decimal, StoreError> {
        Wallet::lock_balance_tx(&mut self.tx, wallet_id)
            .await?
            .ok_or(StoreError::WalletMissing(wallet_id))
    }

    async fn set_balance(&mut self, wallet_id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::NegativeBalance { wallet_id, balance });
        }
        match Wallet::set_balance_tx(&mut self.tx, wallet_id, balance).await? {
            0 => Err(StoreError::WalletMissing(wallet_id)),
            _ => Ok(()),
        }
    }

    async fn insert_transaction(
        &mut self,
        insert: TransactionInsert,
    ) -> Result<LedgerTransaction, StoreError> {
        LedgerTransaction::insert_tx(&mut self.tx, &insert)
            .await
            .map_err(|e| classify_insert_error(e, "transaction reference"))
    }

    async fn update_transaction_status(
        &mut self,
        transaction_id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<bool, StoreError> {
        Ok(LedgerTransaction::transition_status_tx(&mut self.tx, transaction_id, from, to).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

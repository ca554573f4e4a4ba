use crate::entities::{TransactionKind, TransactionStatus};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// One balance-affecting event. Only `status` ever changes after insert.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub reference: String,
    pub external_reference: Option<String>,
    pub counterparty_wallet_id: Option<Uuid>,
    pub counterparty_user_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// Data for inserting a new ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInsert {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub reference: String,
    pub external_reference: Option<String>,
    pub counterparty_wallet_id: Option<Uuid>,
    pub counterparty_user_id: Option<Uuid>,
    pub description: Option<String>,
}

const COLUMNS: &str = "id, user_id, wallet_id, kind, amount, status, reference, \
    external_reference, counterparty_wallet_id, counterparty_user_id, description, \
    created_at, updated_at";

impl LedgerTransaction {
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: &TransactionInsert,
    ) -> Result<LedgerTransaction, sqlx::Error> {
        let sql = format!(
            "INSERT INTO transactions \
            (id, user_id, wallet_id, kind, amount, status, reference, external_reference, \
            counterparty_wallet_id, counterparty_user_id, description) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
            RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(Uuid::now_v7())
            .bind(insert.user_id)
            .bind(insert.wallet_id)
            .bind(insert.kind)
            .bind(insert.amount)
            .bind(insert.status)
            .bind(&insert.reference)
            .bind(&insert.external_reference)
            .bind(insert.counterparty_wallet_id)
            .bind(insert.counterparty_user_id)
            .bind(&insert.description)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move a transaction from `from` to `to`. Returns false when the row was
    /// not in `from` any more, which is how a concurrent settlement shows up.
    pub async fn transition_status_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
pub struct GetTransactionByReference {
    pub reference: String,
}

impl Processor<GetTransactionByReference> for DatabaseProcessor {
    type Output = Option<LedgerTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionByReference")]
    async fn process(
        &self,
        query: GetTransactionByReference,
    ) -> Result<Option<LedgerTransaction>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM transactions WHERE reference = $1");
        sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(query.reference)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetTransactionByExternalReference {
    pub external_reference: String,
}

impl Processor<GetTransactionByExternalReference> for DatabaseProcessor {
    type Output = Option<LedgerTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionByExternalReference")]
    async fn process(
        &self,
        query: GetTransactionByExternalReference,
    ) -> Result<Option<LedgerTransaction>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM transactions WHERE external_reference = $1");
        sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(query.external_reference)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Newest-first page of a user's transactions. Ids are UUIDv7, so they break
/// ties between rows created in the same database transaction.
pub struct ListTransactionsByUser {
    pub user_id: Uuid,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListTransactionsByUser> for DatabaseProcessor {
    type Output = Vec<LedgerTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTransactionsByUser")]
    async fn process(
        &self,
        query: ListTransactionsByUser,
    ) -> Result<Vec<LedgerTransaction>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM transactions \
            WHERE user_id = $1 \
            ORDER BY created_at DESC, id DESC \
            LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(query.user_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}

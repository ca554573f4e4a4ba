use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_number: String,
    pub balance: Decimal,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// Wallet numbers are 10 decimal digits with no leading zero.
pub fn generate_wallet_number() -> String {
    rand::rng()
        .random_range(1_000_000_000u64..10_000_000_000u64)
        .to_string()
}

impl Wallet {
    /// Insert a zero-balance wallet for `user_id` inside an open transaction.
    ///
    /// Returns `None` if `wallet_number` is already taken so the caller can
    /// retry with a fresh number without aborting the transaction.
    pub async fn try_insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        wallet_number: &str,
    ) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (id, user_id, wallet_number, balance)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (wallet_number) DO NOTHING
            RETURNING id, user_id, wallet_number, balance, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(wallet_number)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Take the row lock on a wallet and return its balance.
    ///
    /// Blocks until any other transaction holding the lock finishes.
    pub async fn lock_balance_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        wallet_id: Uuid,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        sqlx::query_scalar::<_, Decimal>("SELECT balance FROM wallets WHERE id = $1 FOR UPDATE")
            .bind(wallet_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Write a new balance. The `$1 >= 0` guard backs up the table's
    /// `CHECK (balance >= 0)`; zero rows affected means nothing was written.
    pub async fn set_balance_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        wallet_id: Uuid,
        balance: Decimal,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, updated_at = NOW()
            WHERE id = $2 AND $1 >= 0
            "#,
        )
        .bind(balance)
        .bind(wallet_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct GetWalletByUser {
    pub user_id: Uuid,
}

impl Processor<GetWalletByUser> for DatabaseProcessor {
    type Output = Option<Wallet>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWalletByUser")]
    async fn process(&self, query: GetWalletByUser) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, wallet_number, balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetWalletByNumber {
    pub wallet_number: String,
}

impl Processor<GetWalletByNumber> for DatabaseProcessor {
    type Output = Option<Wallet>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWalletByNumber")]
    async fn process(&self, query: GetWalletByNumber) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, wallet_number, balance, created_at, updated_at
            FROM wallets
            WHERE wallet_number = $1
            "#,
        )
        .bind(query.wallet_number)
        .fetch_optional(&self.pool)
        .await
    }
}

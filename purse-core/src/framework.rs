use sqlx::PgPool;

/// Runs standalone queries against the pool.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// Owns one open database transaction. Dropping it without committing rolls
/// every write back.
pub struct TransactionProcessor<'b> {
    pub tx: sqlx::Transaction<'b, sqlx::Postgres>,
}

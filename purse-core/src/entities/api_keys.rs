use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    /// Capability tags, stored as text and parsed by `access`.
    pub permissions: Vec<String>,
    pub expires_at: time::OffsetDateTime,
    pub is_active: bool,
    pub revoked_at: Option<time::OffsetDateTime>,
    pub last_used_at: Option<time::OffsetDateTime>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

const COLUMNS: &str = "id, user_id, name, key_hash, key_prefix, permissions, expires_at, \
    is_active, revoked_at, last_used_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ApiKeyInsert {
    pub user_id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub expires_at: time::OffsetDateTime,
}

impl ApiKeyRecord {
    /// Insert a key inside an open transaction.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: ApiKeyInsert,
    ) -> Result<ApiKeyRecord, sqlx::Error> {
        let sql = format!(
            "INSERT INTO api_keys \
            (id, user_id, name, key_hash, key_prefix, permissions, expires_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) \
            RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKeyRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(insert.user_id)
            .bind(insert.name)
            .bind(insert.key_hash)
            .bind(insert.key_prefix)
            .bind(insert.permissions)
            .bind(insert.expires_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Count keys that can still authenticate: active, unrevoked and
    /// unexpired. Callers hold the owner's row lock so the count stays
    /// accurate until they commit.
    pub async fn count_active_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM api_keys
            WHERE user_id = $1
              AND is_active = TRUE
              AND revoked_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListApiKeysByUser {
    pub user_id: Uuid,
}

impl Processor<ListApiKeysByUser> for DatabaseProcessor {
    type Output = Vec<ApiKeyRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListApiKeysByUser")]
    async fn process(&self, query: ListApiKeysByUser) -> Result<Vec<ApiKeyRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ApiKeyRecord>(&sql)
            .bind(query.user_id)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetApiKeyByHash {
    pub key_hash: String,
}

impl Processor<GetApiKeyByHash> for DatabaseProcessor {
    type Output = Option<ApiKeyRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetApiKeyByHash")]
    async fn process(&self, query: GetApiKeyByHash) -> Result<Option<ApiKeyRecord>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM api_keys WHERE key_hash = $1");
        sqlx::query_as::<_, ApiKeyRecord>(&sql)
            .bind(query.key_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetApiKeyById {
    pub id: Uuid,
}

impl Processor<GetApiKeyById> for DatabaseProcessor {
    type Output = Option<ApiKeyRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetApiKeyById")]
    async fn process(&self, query: GetApiKeyById) -> Result<Option<ApiKeyRecord>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM api_keys WHERE id = $1");
        sqlx::query_as::<_, ApiKeyRecord>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct RevokeApiKey {
    pub id: Uuid,
}

impl Processor<RevokeApiKey> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RevokeApiKey")]
    async fn process(&self, query: RevokeApiKey) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET is_active = FALSE,
                revoked_at = COALESCE(revoked_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(query.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TouchApiKey {
    pub id: Uuid,
}

impl Processor<TouchApiKey> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:TouchApiKey")]
    async fn process(&self, query: TouchApiKey) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(query.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

//! API key issuance and validation.
//!
//! Keys are bearer credentials scoped to one user and a set of
//! [`Capability`] tags. Only the SHA-256 digest of a key is stored; the
//! plaintext is handed out once, at issuance.

mod keys;

pub use keys::{
    InvalidExpiry, KEY_PREFIX, capability_tags, display_prefix, generate_api_key, hash_api_key,
    parse_capabilities, parse_expiry,
};

use crate::entities::api_keys::{
    ApiKeyInsert, ApiKeyRecord, GetApiKeyByHash, GetApiKeyById, ListApiKeysByUser, RevokeApiKey,
    TouchApiKey,
};
use crate::entities::users::User;
use crate::framework::DatabaseProcessor;
use itertools::Itertools;
use kanau::processor::Processor;
use purse_sdk::objects::Capability;
use purse_sdk::objects::admin::ApiKeyResponse;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

/// Keys a user may hold that can still authenticate.
pub const MAX_ACTIVE_KEYS: i64 = 5;

const ROLLOVER_SUFFIX: &str = " (rolled over)";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    InvalidExpiry(#[from] InvalidExpiry),

    #[error("a key needs at least one capability")]
    NoCapabilities,

    #[error("key name must not be empty")]
    EmptyName,

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("user already holds the maximum number of active keys")]
    TooManyActiveKeys,

    #[error("api key not found")]
    KeyNotFound,

    #[error("api key has not expired yet")]
    KeyNotExpired,

    /// The presented key is unknown, revoked, inactive or expired.
    #[error("invalid api key")]
    InvalidKey,

    #[error("api key lacks the {0} capability")]
    MissingCapability(Capability),
}

/// A key that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedKey {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub capabilities: Vec<Capability>,
}

impl AuthenticatedKey {
    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AccessError> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(AccessError::MissingCapability(capability))
        }
    }
}

/// A newly issued key. `plaintext` is not recoverable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub plaintext: String,
    pub record: ApiKeyRecord,
}

impl ApiKeyRecord {
    /// Whether this key may authenticate at `now`.
    pub fn is_usable(&self, now: OffsetDateTime) -> bool {
        self.is_active && self.revoked_at.is_none() && self.expires_at > now
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        parse_capabilities(&self.permissions)
    }

    pub fn to_response(&self) -> ApiKeyResponse {
        ApiKeyResponse {
            id: self.id,
            name: self.name.clone(),
            key_prefix: self.key_prefix.clone(),
            permissions: self.capabilities(),
            expires_at: self.expires_at.unix_timestamp(),
            is_active: self.is_active,
            revoked_at: self.revoked_at.map(|t| t.unix_timestamp()),
            last_used_at: self.last_used_at.map(|t| t.unix_timestamp()),
            created_at: self.created_at.unix_timestamp(),
        }
    }
}

/// Issue a key for `user_id` carrying `permissions`, valid for `expiry`.
#[tracing::instrument(skip(processor, permissions), err)]
pub async fn issue_key(
    processor: &DatabaseProcessor,
    user_id: Uuid,
    name: &str,
    permissions: &[Capability],
    expiry: &str,
) -> Result<IssuedKey, AccessError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::EmptyName);
    }
    let permissions: Vec<Capability> = permissions.iter().copied().sorted().dedup().collect();
    if permissions.is_empty() {
        return Err(AccessError::NoCapabilities);
    }
    let lifetime = parse_expiry(expiry)?;

    // The user row lock makes count-then-insert atomic against concurrent
    // issuance for the same user.
    let mut tx = processor.pool.begin().await?;
    User::lock_tx(&mut tx, user_id)
        .await?
        .ok_or(AccessError::UserNotFound(user_id))?;

    let active = ApiKeyRecord::count_active_tx(&mut tx, user_id).await?;
    if active >= MAX_ACTIVE_KEYS {
        return Err(AccessError::TooManyActiveKeys);
    }

    let plaintext = generate_api_key();
    let record = ApiKeyRecord::insert_tx(
        &mut tx,
        ApiKeyInsert {
            user_id,
            name: name.to_owned(),
            key_hash: hash_api_key(&plaintext),
            key_prefix: display_prefix(&plaintext),
            permissions: capability_tags(&permissions),
            expires_at: OffsetDateTime::now_utc() + lifetime,
        },
    )
    .await?;
    tx.commit().await?;

    info!(key_id = %record.id, user_id = %user_id, "API key issued");
    Ok(IssuedKey { plaintext, record })
}

pub async fn list_keys(
    processor: &DatabaseProcessor,
    user_id: Uuid,
) -> Result<Vec<ApiKeyRecord>, AccessError> {
    Ok(processor.process(ListApiKeysByUser { user_id }).await?)
}

/// Fetch a key, treating another user's key as absent.
async fn owned_key(
    processor: &DatabaseProcessor,
    user_id: Uuid,
    key_id: Uuid,
) -> Result<ApiKeyRecord, AccessError> {
    processor
        .process(GetApiKeyById { id: key_id })
        .await?
        .filter(|k| k.user_id == user_id)
        .ok_or(AccessError::KeyNotFound)
}

#[tracing::instrument(skip(processor), err)]
pub async fn revoke_key(
    processor: &DatabaseProcessor,
    user_id: Uuid,
    key_id: Uuid,
) -> Result<(), AccessError> {
    owned_key(processor, user_id, key_id).await?;
    processor.process(RevokeApiKey { id: key_id }).await?;
    info!(key_id = %key_id, "API key revoked");
    Ok(())
}

/// Replace an expired key with a new one carrying the same capabilities.
#[tracing::instrument(skip(processor), err)]
pub async fn rollover_key(
    processor: &DatabaseProcessor,
    user_id: Uuid,
    expired_key_id: Uuid,
    expiry: &str,
) -> Result<IssuedKey, AccessError> {
    let old = owned_key(processor, user_id, expired_key_id).await?;
    if !old.is_expired(OffsetDateTime::now_utc()) {
        return Err(AccessError::KeyNotExpired);
    }
    let name = format!("{}{ROLLOVER_SUFFIX}", old.name);
    issue_key(processor, user_id, &name, &old.capabilities(), expiry).await
}

/// Resolve a presented plaintext key to its owner and capabilities.
pub async fn validate_key(
    processor: &DatabaseProcessor,
    presented: &str,
) -> Result<AuthenticatedKey, AccessError> {
    if !presented.starts_with(KEY_PREFIX) {
        return Err(AccessError::InvalidKey);
    }
    let record = processor
        .process(GetApiKeyByHash {
            key_hash: hash_api_key(presented),
        })
        .await?
        .ok_or(AccessError::InvalidKey)?;
    if !record.is_usable(OffsetDateTime::now_utc()) {
        debug!(key_id = %record.id, "Rejected unusable API key");
        return Err(AccessError::InvalidKey);
    }

    processor.process(TouchApiKey { id: record.id }).await?;
    Ok(AuthenticatedKey {
        key_id: record.id,
        user_id: record.user_id,
        capabilities: record.capabilities(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(expires_in: Duration) -> ApiKeyRecord {
        let now = OffsetDateTime::now_utc();
        ApiKeyRecord {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            name: "ci".to_string(),
            key_hash: hash_api_key("sk_live_x"),
            key_prefix: "sk_live_x".to_string(),
            permissions: vec!["read".to_string(), "transfer".to_string()],
            expires_at: now + expires_in,
            is_active: true,
            revoked_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_usability() {
        let now = OffsetDateTime::now_utc();
        let live = record(Duration::hours(1));
        assert!(live.is_usable(now));
        assert!(!live.is_expired(now));

        let expired = record(Duration::hours(-1));
        assert!(!expired.is_usable(now));
        assert!(expired.is_expired(now));

        let mut revoked = record(Duration::hours(1));
        revoked.revoked_at = Some(now);
        assert!(!revoked.is_usable(now));

        let mut inactive = record(Duration::hours(1));
        inactive.is_active = false;
        assert!(!inactive.is_usable(now));
    }

    #[test]
    fn test_capability_checks() {
        let key = AuthenticatedKey {
            key_id: Uuid::nil(),
            user_id: Uuid::nil(),
            capabilities: record(Duration::hours(1)).capabilities(),
        };
        assert!(key.allows(Capability::Read));
        assert!(key.require(Capability::Transfer).is_ok());
        assert!(matches!(
            key.require(Capability::Deposit),
            Err(AccessError::MissingCapability(Capability::Deposit))
        ));
    }

    #[test]
    fn test_response_hides_hash() {
        let rec = record(Duration::days(1));
        let response = rec.to_response();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains(&rec.key_hash));
        assert_eq!(
            response.permissions,
            vec![Capability::Read, Capability::Transfer]
        );
        assert_eq!(response.expires_at, rec.expires_at.unix_timestamp());
    }
}

//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Capability;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /admin/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionUserRequest {
    pub email: String,
    pub name: String,
}

/// Body of `POST /admin/users/{user_id}/keys`.
///
/// `expiry` is `<n><unit>` where unit is one of `H`, `D`, `M` or `Y`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permissions: Vec<Capability>,
    pub expiry: String,
}

/// Body of `POST /admin/users/{user_id}/keys/rollover`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverApiKeyRequest {
    pub expired_key_id: Uuid,
    pub expiry: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedUserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub wallet_id: Uuid,
    pub wallet_number: String,
    pub created_at: i64,
}

/// API key metadata. The plaintext key is never part of this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub permissions: Vec<Capability>,
    pub expires_at: i64,
    pub is_active: bool,
    pub revoked_at: Option<i64>,
    pub last_used_at: Option<i64>,
    pub created_at: i64,
}

/// Returned once, at issuance: the only time the plaintext key is visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedApiKeyResponse {
    pub api_key: String,
    pub key: ApiKeyResponse,
}

//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `AdminAuth`: checks the `Purse-Admin-Authorization` header against the
//!   argon2 hash of the admin secret (used by the Admin API).
//! - `ApiKeyAuth`: resolves the `x-api-key` header to a user and capability
//!   set (used by the Wallet API).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use purse_core::access::{self, AccessError, AuthenticatedKey};
use purse_sdk::objects::Capability;
use purse_sdk::signature::{ADMIN_AUTH_HEADER, API_KEY_HEADER};

use super::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// AdminAuth
// ---------------------------------------------------------------------------

/// Proof that the request carried the admin secret.
pub struct AdminAuth;

#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    InvalidSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Purse-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Purse-Admin-Authorization header",
            ),
            AdminAuthError::InvalidSecret => (StatusCode::UNAUTHORIZED, "invalid admin secret"),
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        let admin = state.config.admin.read().await;
        let verified = admin.verify_secret(secret);
        drop(admin);

        if !verified {
            tracing::warn!("Rejected admin request with wrong secret");
            return Err(AdminAuthError::InvalidSecret);
        }
        Ok(AdminAuth)
    }
}

// ---------------------------------------------------------------------------
// ApiKeyAuth
// ---------------------------------------------------------------------------

/// A validated API key. Handlers check the capability they need with
/// [`ApiKeyAuth::require`].
pub struct ApiKeyAuth(pub AuthenticatedKey);

impl ApiKeyAuth {
    /// Return the key's owner if the key carries `capability`.
    pub fn require(&self, capability: Capability) -> Result<uuid::Uuid, ApiError> {
        self.0.require(capability)?;
        Ok(self.0.user_id)
    }
}

#[derive(Debug)]
pub enum ApiKeyAuthError {
    MissingHeader,
    InvalidHeader,
    Rejected(AccessError),
}

impl IntoResponse for ApiKeyAuthError {
    fn into_response(self) -> Response {
        match self {
            ApiKeyAuthError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing x-api-key header").into_response()
            }
            ApiKeyAuthError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid x-api-key header").into_response()
            }
            ApiKeyAuthError::Rejected(e) => ApiError::Access(e).into_response(),
        }
    }
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiKeyAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .ok_or(ApiKeyAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| ApiKeyAuthError::InvalidHeader)?;

        let key = access::validate_key(&state.processor(), presented)
            .await
            .map_err(ApiKeyAuthError::Rejected)?;
        Ok(ApiKeyAuth(key))
    }
}

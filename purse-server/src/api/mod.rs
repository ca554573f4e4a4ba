//! HTTP API.
//!
//! - `/wallet/*`: wallet operations, authenticated by the `x-api-key` header
//! - `/admin/*`: provisioning and key management, authenticated by the
//!   `Purse-Admin-Authorization` header

pub mod admin;
pub mod extractors;
pub mod wallet;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use purse_core::access::AccessError;
use purse_core::settlement::{ErrorKind, SettlementError};

/// Errors shared by the wallet and admin handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    Settlement(SettlementError),
    Access(AccessError),
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        Self::Settlement(err)
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::Access(err)
    }
}

fn settlement_status(err: &SettlementError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamRejected => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Integrity => match err {
            SettlementError::InvalidSignature => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        },
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AccessError::InvalidExpiry(_)
        | AccessError::NoCapabilities
        | AccessError::EmptyName
        | AccessError::KeyNotExpired => StatusCode::BAD_REQUEST,
        AccessError::UserNotFound(_) | AccessError::KeyNotFound => StatusCode::NOT_FOUND,
        AccessError::TooManyActiveKeys => StatusCode::CONFLICT,
        AccessError::InvalidKey => StatusCode::UNAUTHORIZED,
        AccessError::MissingCapability(_) => StatusCode::FORBIDDEN,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Settlement(e) => (settlement_status(e), e.to_string()),
            ApiError::Access(e) => (access_status(e), e.to_string()),
        };
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %message, "API request failed");
            return (status, "internal server error").into_response();
        }
        (status, message).into_response()
    }
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use purse_core::access;
use purse_sdk::objects::admin::{ApiKeyResponse, CreateApiKeyRequest, RolloverApiKeyRequest};
use uuid::Uuid;

use super::issued_to_response;
use crate::api::ApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /users/{user_id}/keys`: key metadata, newest first. Never includes
/// plaintext keys.
pub(super) async fn list_keys(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let records = access::list_keys(&state.processor(), user_id).await?;
    Ok(Json(
        records
            .iter()
            .map(|r| r.to_response())
            .collect::<Vec<ApiKeyResponse>>(),
    ))
}

/// `POST /users/{user_id}/keys`: issue a key. The plaintext is in this
/// response only.
pub(super) async fn create_key(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(user_id): Path<Uuid>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = access::issue_key(
        &state.processor(),
        user_id,
        &request.name,
        &request.permissions,
        &request.expiry,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issued_to_response(issued))))
}

/// `POST /users/{user_id}/keys/rollover`: replace an expired key with one
/// carrying the same capabilities.
pub(super) async fn rollover_key(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RolloverApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = access::rollover_key(
        &state.processor(),
        user_id,
        request.expired_key_id,
        &request.expiry,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issued_to_response(issued))))
}

/// `POST /users/{user_id}/keys/{key_id}/revoke`
pub(super) async fn revoke_key(
    state: State<AppState>,
    _auth: AdminAuth,
    Path((user_id, key_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    access::revoke_key(&state.processor(), user_id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use purse_core::entities::users::NewUser;
use purse_sdk::objects::admin::{ProvisionUserRequest, ProvisionedUserResponse};

use crate::api::ApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `POST /users`: create a user together with a zero-balance wallet.
pub(super) async fn provision_user(
    state: State<AppState>,
    _auth: AdminAuth,
    Json(request): Json<ProvisionUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, wallet) = state
        .engine
        .provision_account(NewUser {
            email: request.email.trim().to_lowercase(),
            name: request.name.trim().to_string(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProvisionedUserResponse {
            user_id: user.id,
            email: user.email,
            name: user.name,
            wallet_id: wallet.id,
            wallet_number: wallet.wallet_number,
            created_at: user.created_at.unix_timestamp(),
        }),
    ))
}

//! Admin API handlers.
//!
//! These endpoints are called by operators and require the
//! `Purse-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `POST /users`                               – provision a user and wallet
//! - `GET  /users/{user_id}/keys`                – list a user's API keys
//! - `POST /users/{user_id}/keys`                – issue an API key
//! - `POST /users/{user_id}/keys/rollover`       – replace an expired key
//! - `POST /users/{user_id}/keys/{key_id}/revoke` – revoke a key

use axum::{
    Router,
    routing::{get, post},
};
use purse_core::access::IssuedKey;
use purse_sdk::objects::admin::IssuedApiKeyResponse;

use crate::state::AppState;

mod keys;
mod users;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::provision_user))
        .route(
            "/users/{user_id}/keys",
            get(keys::list_keys).post(keys::create_key),
        )
        .route("/users/{user_id}/keys/rollover", post(keys::rollover_key))
        .route(
            "/users/{user_id}/keys/{key_id}/revoke",
            post(keys::revoke_key),
        )
}

fn issued_to_response(issued: IssuedKey) -> IssuedApiKeyResponse {
    IssuedApiKeyResponse {
        key: issued.record.to_response(),
        api_key: issued.plaintext,
    }
}

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use purse_sdk::objects::Capability;
use purse_sdk::objects::wallet::{BalanceResponse, HistoryQuery, WalletInfoResponse};

use super::to_response;
use crate::api::ApiError;
use crate::api::extractors::ApiKeyAuth;
use crate::state::AppState;

/// `GET /balance`
pub(super) async fn get_balance(
    state: State<AppState>,
    key: ApiKeyAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Read)?;
    let balance = state.engine.get_balance(user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

/// `GET /info`
pub(super) async fn get_wallet_info(
    state: State<AppState>,
    key: ApiKeyAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Read)?;
    let wallet = state.engine.get_wallet_info(user_id).await?;
    Ok(Json(WalletInfoResponse {
        wallet_number: wallet.wallet_number,
        balance: wallet.balance,
        created_at: wallet.created_at.unix_timestamp(),
    }))
}

/// `GET /transactions?limit=&offset=`: newest first.
pub(super) async fn list_transactions(
    state: State<AppState>,
    key: ApiKeyAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Read)?;
    let records = state
        .engine
        .get_transaction_history(user_id, query.limit, query.offset)
        .await?;
    Ok(Json(records.iter().map(to_response).collect::<Vec<_>>()))
}

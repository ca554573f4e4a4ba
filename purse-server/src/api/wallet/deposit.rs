use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use purse_sdk::objects::Capability;
use purse_sdk::objects::wallet::{DepositRequest, DepositResponse, DepositStatusResponse};

use crate::api::ApiError;
use crate::api::extractors::ApiKeyAuth;
use crate::state::AppState;

/// `POST /deposit`: open a gateway charge for the caller's wallet.
///
/// The wallet is credited later, when the gateway reports the charge settled.
pub(super) async fn initiate_deposit(
    state: State<AppState>,
    key: ApiKeyAuth,
    Json(request): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Deposit)?;
    let initiated = state.engine.initiate_deposit(user_id, request.amount).await?;

    Ok((
        StatusCode::CREATED,
        Json(DepositResponse {
            reference: initiated.reference,
            authorization_url: initiated.authorization_url,
        }),
    ))
}

/// `GET /deposit/{reference}/status`: status of one of the caller's deposits.
pub(super) async fn get_deposit_status(
    state: State<AppState>,
    key: ApiKeyAuth,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Read)?;
    let record = state.engine.get_deposit_status(user_id, &reference).await?;

    Ok(Json(DepositStatusResponse {
        reference: record.reference,
        status: record.status.into(),
        amount: record.amount,
    }))
}

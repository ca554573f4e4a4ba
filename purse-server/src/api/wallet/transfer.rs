use axum::{Json, extract::State, response::IntoResponse};
use purse_sdk::objects::wallet::{TransferRequest, TransferResponse};
use purse_sdk::objects::{Capability, TransactionStatus};

use crate::api::ApiError;
use crate::api::extractors::ApiKeyAuth;
use crate::state::AppState;

/// `POST /transfer`: move funds to the wallet with the given number.
pub(super) async fn transfer(
    state: State<AppState>,
    key: ApiKeyAuth,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = key.require(Capability::Transfer)?;
    let receipt = state
        .engine
        .transfer(user_id, request.wallet_number.trim(), request.amount)
        .await?;

    Ok(Json(TransferResponse {
        status: TransactionStatus::Success,
        message: "Transfer completed successfully".to_string(),
        debit_reference: receipt.debit.reference,
        credit_reference: receipt.credit.reference,
        balance: receipt.sender_balance,
    }))
}

//! Wallet API handlers.
//!
//! Every endpoint except the gateway webhook requires an `x-api-key` header
//! whose key carries the listed capability.
//!
//! # Endpoints
//!
//! - `POST /deposit`                       – open a Paystack deposit (deposit)
//! - `GET  /deposit/{reference}/status`    – deposit status (read)
//! - `GET  /balance`                       – current balance (read)
//! - `GET  /info`                          – wallet number and balance (read)
//! - `POST /transfer`                      – send funds to another wallet (transfer)
//! - `GET  /transactions`                  – paginated history (read)
//! - `POST /paystack/webhook`              – gateway event delivery (signed)

use axum::{
    Router,
    routing::{get, post},
};
use purse_core::entities::transactions::LedgerTransaction;
use purse_sdk::objects::wallet::TransactionResponse;

use crate::state::AppState;

mod account;
mod deposit;
mod transfer;
mod webhook;

/// Build the Wallet API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deposit", post(deposit::initiate_deposit))
        .route(
            "/deposit/{reference}/status",
            get(deposit::get_deposit_status),
        )
        .route("/balance", get(account::get_balance))
        .route("/info", get(account::get_wallet_info))
        .route("/transfer", post(transfer::transfer))
        .route("/transactions", get(account::list_transactions))
        .route("/paystack/webhook", post(webhook::paystack_webhook))
}

/// Convert a `LedgerTransaction` (DB model) into a `TransactionResponse` (API model).
fn to_response(record: &LedgerTransaction) -> TransactionResponse {
    TransactionResponse {
        reference: record.reference.clone(),
        kind: record.kind.into(),
        amount: record.amount,
        status: record.status.into(),
        description: record.description.clone(),
        created_at: record.created_at.unix_timestamp(),
    }
}

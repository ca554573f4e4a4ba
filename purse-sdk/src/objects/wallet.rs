//! Wallet API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TransactionKind, TransactionStatus};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /wallet/deposit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

/// Body of `POST /wallet/transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub wallet_number: String,
    pub amount: Decimal,
}

/// Query parameters for `GET /wallet/transactions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResponse {
    pub reference: String,
    pub authorization_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositStatusResponse {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfoResponse {
    pub wallet_number: String,
    pub balance: Decimal,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub status: TransactionStatus,
    pub message: String,
    pub debit_reference: String,
    pub credit_reference: String,
    pub balance: Decimal,
}

/// One row of the transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: i64,
}

/// Acknowledgement returned to the gateway for every webhook delivery that
/// passed the signature gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

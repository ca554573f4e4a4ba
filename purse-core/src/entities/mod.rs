pub mod api_keys;
pub mod transactions;
pub mod users;
pub mod wallets;

use purse_sdk::objects::{
    TransactionKind as SdkTransactionKind, TransactionStatus as SdkTransactionStatus,
};

/// Transaction kind for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `purse_sdk::objects::TransactionKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "transaction_kind")]
pub enum TransactionKind {
    Deposit,
    TransferDebit,
    TransferCredit,
}

impl From<TransactionKind> for SdkTransactionKind {
    fn from(value: TransactionKind) -> Self {
        match value {
            TransactionKind::Deposit => SdkTransactionKind::Deposit,
            TransactionKind::TransferDebit => SdkTransactionKind::TransferDebit,
            TransactionKind::TransferCredit => SdkTransactionKind::TransferCredit,
        }
    }
}

impl From<SdkTransactionKind> for TransactionKind {
    fn from(value: SdkTransactionKind) -> Self {
        match value {
            SdkTransactionKind::Deposit => TransactionKind::Deposit,
            SdkTransactionKind::TransferDebit => TransactionKind::TransferDebit,
            SdkTransactionKind::TransferCredit => TransactionKind::TransferCredit,
        }
    }
}

/// Transaction status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `purse_sdk::objects::TransactionStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "transaction_status")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl From<TransactionStatus> for SdkTransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => SdkTransactionStatus::Pending,
            TransactionStatus::Success => SdkTransactionStatus::Success,
            TransactionStatus::Failed => SdkTransactionStatus::Failed,
        }
    }
}

impl From<SdkTransactionStatus> for TransactionStatus {
    fn from(value: SdkTransactionStatus) -> Self {
        match value {
            SdkTransactionStatus::Pending => TransactionStatus::Pending,
            SdkTransactionStatus::Success => TransactionStatus::Success,
            SdkTransactionStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// True when a sqlx error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

use crate::gateway::GatewayError;
use crate::store::StoreError;
use purse_sdk::amount::AmountError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    UpstreamUnavailable,
    UpstreamRejected,
    Integrity,
    Persistence,
}

/// How a wallet was looked up, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletLookup {
    User(Uuid),
    Number(String),
}

impl std::fmt::Display for WalletLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletLookup::User(id) => write!(f, "user {id}"),
            WalletLookup::Number(number) => write!(f, "number {number}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("wallet not found for {0}")]
    WalletNotFound(WalletLookup),

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("cannot transfer to own wallet")]
    SelfTransfer,

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error("missing webhook signature")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed event payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// The gateway does not consider the charge settled.
    #[error("charge {external_reference} is not settled at the gateway")]
    VerificationFailed { external_reference: String },

    /// The gateway settled a different amount than the ledger recorded.
    #[error(
        "charge {external_reference} settled for {reported_minor} minor units, ledger expects {expected_minor}"
    )]
    VerificationMismatch {
        external_reference: String,
        expected_minor: i64,
        reported_minor: i64,
    },

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("gateway rejected request: {0}")]
    GatewayRejected(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<GatewayError> for SettlementError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(message) => Self::GatewayUnavailable(message),
            GatewayError::Rejected { message } => Self::GatewayRejected(message),
        }
    }
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::WalletNotFound(_) | Self::TransactionNotFound => {
                ErrorKind::NotFound
            }
            Self::InvalidAmount(_) | Self::SelfTransfer | Self::MalformedEvent(_) => {
                ErrorKind::Validation
            }
            Self::InsufficientBalance { .. } | Self::Persistence(StoreError::Duplicate(_)) => {
                ErrorKind::Conflict
            }
            Self::MissingSignature
            | Self::InvalidSignature
            | Self::VerificationFailed { .. }
            | Self::VerificationMismatch { .. } => ErrorKind::Integrity,
            Self::GatewayUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::GatewayRejected(_) => ErrorKind::UpstreamRejected,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

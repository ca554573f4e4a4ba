pub mod admin;
pub mod paystack;
pub mod wallet;

use serde::{Deserialize, Serialize};

/// Transaction kind for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `purse-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    TransferDebit,
    TransferCredit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::TransferDebit => write!(f, "transfer_debit"),
            TransactionKind::TransferCredit => write!(f, "transfer_credit"),
        }
    }
}

/// Transaction status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `purse-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A capability an API key may be granted.
///
/// The set is closed: keys are stored with these tags only and requests are
/// checked against them, never against free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Deposit,
    Transfer,
    Read,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Deposit, Capability::Transfer, Capability::Read];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Deposit => "deposit",
            Capability::Transfer => "transfer",
            Capability::Read => "read",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl std::str::FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Capability::Deposit),
            "transfer" => Ok(Capability::Transfer),
            "read" => Ok(Capability::Read),
            other => Err(UnknownCapability(other.to_owned())),
        }
    }
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

/// Clamp history pagination: a non-positive limit falls back to the default,
/// large limits are capped and negative offsets become zero.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    let limit = if limit <= 0 { DEFAULT_LIMIT } else { limit.min(MAX_LIMIT) };
    (limit, offset.max(0))
}

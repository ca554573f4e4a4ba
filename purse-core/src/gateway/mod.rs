//! Gateway Client contract.

mod paystack;

pub use paystack::PaystackGateway;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure, timeout or a non-success HTTP status.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway answered with a structured failure.
    #[error("gateway rejected request: {message}")]
    Rejected { message: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A remote charge opened for a deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedCharge {
    pub external_reference: String,
    /// Where the payer completes the charge. Passed through untouched.
    pub authorization_url: String,
}

/// Gateway-side state of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Settled,
    /// The gateway will never settle this charge.
    Failed,
    /// Anything else: still in progress, abandoned, reversed.
    Unsettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeVerification {
    pub state: ChargeState,
    /// Amount the gateway reports, in minor units.
    pub amount_minor: i64,
}

/// Talks to the payment gateway on behalf of the settlement engine.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a remote charge for `amount_minor` minor units.
    async fn open_charge(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
    ) -> Result<OpenedCharge, GatewayError>;

    /// Ask the gateway directly whether a charge settled.
    async fn verify_charge(&self, external_reference: &str)
    -> Result<ChargeVerification, GatewayError>;

    /// Check a webhook signature header against the raw request body.
    fn verify_signature(&self, raw_body: &[u8], signature_header: &str) -> bool;
}

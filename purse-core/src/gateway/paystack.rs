//! Paystack implementation of [`PaymentGateway`].
//!
//! - `POST /transaction/initialize` opens a charge and returns the checkout URL
//! - `GET /transaction/verify/{reference}` reports the charge's settled state
//! - webhook deliveries are signed with HMAC-SHA512 under the secret key

use super::{ChargeState, ChargeVerification, GatewayError, OpenedCharge, PaymentGateway};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use purse_sdk::objects::paystack::{
    CHARGE_STATUS_FAILED, CHARGE_STATUS_SUCCESS, Envelope, InitializeTransactionData,
    InitializeTransactionRequest, VerifyTransactionData,
};
use purse_sdk::signature;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

pub struct PaystackGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl PaystackGateway {
    pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Resolve `path` under the base URL, keeping any path prefix the base
    /// carries (e.g. a proxy mount point).
    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let mut base = self.config.base_url.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::Unavailable(format!("invalid gateway url: {e}")))
    }

    /// Decode a Paystack envelope. Non-2xx statuses are transport failures;
    /// `status: false` inside a 2xx body is a structured rejection.
    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Paystack returned error status");
            return Err(GatewayError::Unavailable(format!(
                "paystack returned HTTP {status}"
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        if !envelope.status {
            return Err(GatewayError::Rejected {
                message: envelope.message,
            });
        }
        envelope.data.ok_or(GatewayError::Rejected {
            message: "response carried no data".to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn open_charge(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
    ) -> Result<OpenedCharge, GatewayError> {
        let request = InitializeTransactionRequest {
            amount: amount_minor,
            email: email.to_owned(),
            reference: reference.to_owned(),
            currency: self.config.currency.clone(),
            callback_url: self.config.callback_url.as_ref().map(Url::to_string),
            metadata: None,
        };

        let response = self
            .http_client
            .post(self.endpoint("transaction/initialize")?)
            .bearer_auth(&self.config.secret_key)
            .json(&request)
            .send()
            .await?;
        let data: InitializeTransactionData = Self::read_envelope(response).await?;

        debug!(reference, external_reference = %data.reference, "Paystack charge opened");
        Ok(OpenedCharge {
            external_reference: data.reference,
            authorization_url: data.authorization_url,
        })
    }

    async fn verify_charge(
        &self,
        external_reference: &str,
    ) -> Result<ChargeVerification, GatewayError> {
        let path = format!(
            "transaction/verify/{}",
            urlencoding::encode(external_reference)
        );
        let response = self
            .http_client
            .get(self.endpoint(&path)?)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        let data: VerifyTransactionData = Self::read_envelope(response).await?;

        let state = match data.status.as_str() {
            CHARGE_STATUS_SUCCESS => ChargeState::Settled,
            CHARGE_STATUS_FAILED => ChargeState::Failed,
            _ => ChargeState::Unsettled,
        };
        debug!(external_reference, status = %data.status, amount = data.amount, "Paystack charge verified");
        Ok(ChargeVerification {
            state,
            amount_minor: data.amount,
        })
    }

    fn verify_signature(&self, raw_body: &[u8], signature_header: &str) -> bool {
        signature::verify_body(raw_body, signature_header, self.config.secret_bytes()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gateway() -> PaystackGateway {
        gateway_at(PaystackGateway::DEFAULT_BASE_URL)
    }

    fn gateway_at(base_url: &str) -> PaystackGateway {
        PaystackGateway::new(GatewayConfig {
            secret_key: "sk_test_abc".into(),
            base_url: Url::parse(base_url).unwrap(),
            currency: "NGN".into(),
            callback_url: None,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_join() {
        let gw = gateway();
        assert_eq!(
            gw.endpoint("transaction/verify/DEP_1").unwrap().as_str(),
            "https://api.paystack.co/transaction/verify/DEP_1"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        for base in ["https://proxy.example/paystack", "https://proxy.example/paystack/"] {
            let gw = gateway_at(base);
            assert_eq!(
                gw.endpoint("transaction/initialize").unwrap().as_str(),
                "https://proxy.example/paystack/transaction/initialize"
            );
        }
    }

    #[test]
    fn test_webhook_signature_uses_secret_key() {
        let gw = gateway();
        let body = br#"{"event":"charge.success","data":{"reference":"x"}}"#;
        let good = signature::sign_body(body, b"sk_test_abc");
        let bad = signature::sign_body(body, b"sk_test_other");
        assert!(gw.verify_signature(body, &good));
        assert!(!gw.verify_signature(body, &bad));
        assert!(!gw.verify_signature(body, ""));
    }
}

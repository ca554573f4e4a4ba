//! Paystack wire shapes.
//!
//! Only the fields the ledger reads are typed strictly; everything else is
//! optional so that additive changes on the gateway side never break
//! deserialisation of a delivery.

use serde::{Deserialize, Serialize};

/// The only webhook event kind that triggers a settlement attempt.
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Gateway-side status string of a settled charge.
pub const CHARGE_STATUS_SUCCESS: &str = "success";

/// Gateway-side status string of a charge that will never settle.
pub const CHARGE_STATUS_FAILED: &str = "failed";

/// Every Paystack API response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTransactionRequest {
    /// Amount in minor units.
    pub amount: i64,
    pub email: String,
    pub reference: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTransactionData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// `data` of `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTransactionData {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub domain: Option<String>,
    pub status: String,
    pub reference: String,
    /// Amount in minor units.
    pub amount: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub authorization: Option<Authorization>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
}

/// Payment instrument details attached to a charge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<String>,
    #[serde(default)]
    pub exp_year: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub reusable: Option<bool>,
}

/// A signed webhook delivery.
///
/// `data` is kept untyped until the event kind is known: each kind carries
/// its own payload shape, and only charge events are decoded further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn is_charge_success(&self) -> bool {
        self.event == CHARGE_SUCCESS_EVENT
    }

    /// Decode `data` as a charge payload.
    pub fn charge_data(&self) -> Result<ChargeData, serde_json::Error> {
        ChargeData::deserialize(&self.data)
    }
}

/// Settlement data carried by a charge event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// External reference, the reconciliation key.
    pub reference: String,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub authorization: Option<Authorization>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_charge_success_delivery() {
        let body = r#"{
            "event": "charge.success",
            "data": {
                "id": 302961,
                "domain": "live",
                "status": "success",
                "reference": "DEP_1a2b3c4d_1700000000",
                "amount": 5000,
                "message": null,
                "gateway_response": "Approved by Financial Institution",
                "paid_at": "2024-01-01T10:00:00.000Z",
                "created_at": "2024-01-01T09:59:00.000Z",
                "channel": "card",
                "currency": "NGN",
                "ip_address": "41.1.25.1",
                "metadata": 0,
                "customer": {
                    "id": 68324,
                    "first_name": null,
                    "email": "ada@example.com",
                    "customer_code": "CUS_qo38as2hpsgk2r0"
                },
                "authorization": {
                    "authorization_code": "AUTH_f5rnfq9p",
                    "bin": "539999",
                    "last4": "8877",
                    "reusable": true
                },
                "fees": 100
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(event.is_charge_success());
        let charge = event.charge_data().unwrap();
        assert_eq!(charge.reference, "DEP_1a2b3c4d_1700000000");
        assert_eq!(charge.amount, Some(5000));
        assert_eq!(
            charge.customer.unwrap().email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn test_other_event_kinds_parse_without_charge_fields() {
        let body = r#"{"event":"customeridentification.success","data":{"customer_id":82796315,"identification":{"country":"NG","type":"bank_account"}}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(!event.is_charge_success());
        assert!(event.charge_data().is_err());

        let body = r#"{"event":"refund.processed","data":{"reference":"r1","status":null}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.event, "refund.processed");
    }

    #[test]
    fn test_charge_data_tolerates_nulls() {
        let body = r#"{"event":"charge.success","data":{"id":null,"status":null,"reference":"ext_1","amount":5000,"customer":{"id":null,"email":null,"customer_code":null}}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        let charge = event.charge_data().unwrap();
        assert_eq!(charge.reference, "ext_1");
        assert!(charge.status.is_none());
        assert!(charge.customer.unwrap().email.is_none());
    }

    #[test]
    fn test_event_without_data_parses() {
        let event: WebhookEvent = serde_json::from_str(r#"{"event":"subscription.create"}"#).unwrap();
        assert!(event.data.is_null());
    }

    #[test]
    fn test_initialize_request_skips_absent_fields() {
        let req = InitializeTransactionRequest {
            amount: 5000,
            email: "ada@example.com".into(),
            reference: "DEP_1".into(),
            currency: "NGN".into(),
            callback_url: None,
            metadata: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("callback_url").is_none());
        assert_eq!(json["amount"], 5000);
    }

    #[test]
    fn test_envelope_without_data() {
        let body = r#"{"status":false,"message":"Invalid key"}"#;
        let env: Envelope<InitializeTransactionData> = serde_json::from_str(body).unwrap();
        assert!(!env.status);
        assert!(env.data.is_none());
    }
}

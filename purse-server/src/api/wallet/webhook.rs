use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use purse_core::settlement::{DepositEventOutcome, SettlementError};
use purse_sdk::objects::wallet::WebhookAck;
use purse_sdk::signature::PAYSTACK_SIGNATURE_HEADER;

use crate::state::AppState;

/// `POST /paystack/webhook`: gateway event delivery.
///
/// Authentication failures and unparseable payloads are rejected with 4xx.
/// Everything past that is acknowledged with 200 so the gateway stops
/// retrying; `status: false` tells an operator reading the delivery log that
/// it was not applied.
pub(super) async fn paystack_webhook(
    state: State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(PAYSTACK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = state.engine.ingest_deposit_event(&body, signature).await;
    let (status, ack) = match result {
        Ok(DepositEventOutcome::Settled { transaction_id, .. }) => {
            tracing::debug!(%transaction_id, "Webhook settled deposit");
            (StatusCode::OK, reply(true, None))
        }
        Ok(DepositEventOutcome::AlreadySettled { .. }) => {
            (StatusCode::OK, reply(true, Some("already processed")))
        }
        Ok(DepositEventOutcome::Ignored) => (StatusCode::OK, reply(true, Some("event ignored"))),
        Err(e @ (SettlementError::MissingSignature | SettlementError::MalformedEvent(_))) => {
            (StatusCode::BAD_REQUEST, reply(false, Some(&e.to_string())))
        }
        Err(e @ SettlementError::InvalidSignature) => {
            (StatusCode::UNAUTHORIZED, reply(false, Some(&e.to_string())))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Webhook not applied");
            (StatusCode::OK, reply(false, Some(&e.to_string())))
        }
    };
    (status, Json(ack)).into_response()
}

fn reply(status: bool, message: Option<&str>) -> WebhookAck {
    WebhookAck {
        status,
        message: message.map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::server::tests::{PAYSTACK_SECRET, body_string, offline_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use purse_sdk::signature::{PAYSTACK_SIGNATURE_HEADER, sign_body};
    use tower::ServiceExt;

    const PATH: &str = "/wallet/paystack/webhook";

    async fn post(body: &'static [u8], signature: Option<String>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post(PATH).header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header(PAYSTACK_SIGNATURE_HEADER, signature);
        }
        let response = build_router(offline_state())
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let json = serde_json::from_str(&body_string(response).await).unwrap();
        (status, json)
    }

    fn signed(body: &[u8]) -> Option<String> {
        Some(sign_body(body, PAYSTACK_SECRET.as_bytes()))
    }

    const CHARGE: &[u8] = br#"{"event":"charge.success","data":{"reference":"ext_1","amount":5000}}"#;

    #[tokio::test]
    async fn test_missing_signature_is_bad_request() {
        let (status, ack) = post(CHARGE, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ack["status"], false);
    }

    #[tokio::test]
    async fn test_wrong_signature_is_unauthorized() {
        let forged = Some(sign_body(CHARGE, b"sk_test_forged"));
        let (status, ack) = post(CHARGE, forged).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(ack["status"], false);
    }

    #[tokio::test]
    async fn test_signed_garbage_is_bad_request() {
        const GARBAGE: &[u8] = b"{\"event\":";
        let (status, _) = post(GARBAGE, signed(GARBAGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged() {
        const TRANSFER: &[u8] = br#"{"event":"transfer.success","data":{"reference":"t_1"}}"#;
        let (status, ack) = post(TRANSFER, signed(TRANSFER)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], true);
        assert_eq!(ack["message"], "event ignored");
    }

    #[tokio::test]
    async fn test_events_without_charge_fields_are_acknowledged() {
        const IDENTIFICATION: &[u8] = br#"{"event":"customeridentification.success","data":{"customer_id":82796315,"identification":{"country":"NG","type":"bank_account"}}}"#;
        let (status, ack) = post(IDENTIFICATION, signed(IDENTIFICATION)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], true);
        assert_eq!(ack["message"], "event ignored");

        const REFUND: &[u8] = br#"{"event":"refund.processed","data":{"reference":"r1","status":null}}"#;
        let (status, ack) = post(REFUND, signed(REFUND)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], true);
    }

    #[tokio::test]
    async fn test_unapplied_events_are_soft_acknowledged() {
        // Signed and well-formed, but the ledger is unreachable.
        let (status, ack) = post(CHARGE, signed(CHARGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], false);
        assert!(ack["message"].is_string());
    }
}

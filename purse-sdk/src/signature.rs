//! Signature helpers for inbound gateway webhooks and the admin API header.
//!
//! The payment gateway signs every webhook delivery with
//!
//! ```text
//! x-paystack-signature: hex(HMAC-SHA512(raw_body, secret_key))
//! ```
//!
//! The signature covers the exact bytes on the wire, so it must be checked
//! before the body is parsed.

/// Header carrying the gateway's hex-encoded HMAC-SHA512 of the raw body.
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Header carrying a wallet API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Purse-Admin-Authorization";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature")]
    SignatureMismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

impl From<hex::FromHexError> for SignatureError {
    fn from(_: hex::FromHexError) -> Self {
        Self::InvalidHex
    }
}

/// Compute the hex header value for `body` under `key`.
pub fn sign_body(body: &[u8], key: &[u8]) -> String {
    let tag = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA512, key),
        body,
    );
    hex::encode(tag.as_ref())
}

/// Verify a hex header value against `body` under `key`.
///
/// Comparison happens inside `ring::hmac::verify` in constant time.
pub fn verify_body(body: &[u8], header_value: &str, key: &[u8]) -> Result<(), SignatureError> {
    let signature = hex::decode(header_value.trim())?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA512, key),
        body,
        &signature,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"sk_test_0123456789";
    const BODY: &[u8] = br#"{"event":"charge.success","data":{"reference":"DEP_abc"}}"#;

    #[test]
    fn test_signature_shape() {
        let sig = sign_body(BODY, KEY);
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_then_verify() {
        let sig = sign_body(BODY, KEY);
        assert!(verify_body(BODY, &sig, KEY).is_ok());
        assert!(verify_body(BODY, &sig.to_uppercase(), KEY).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let sig = sign_body(BODY, KEY);
        let tampered = br#"{"event":"charge.success","data":{"reference":"DEP_abd"}}"#;
        assert!(matches!(
            verify_body(tampered, &sig, KEY),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let sig = sign_body(BODY, KEY);
        assert!(matches!(
            verify_body(BODY, &sig, b"another-key"),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_garbage_header() {
        assert!(matches!(
            verify_body(BODY, "not-hex!", KEY),
            Err(SignatureError::InvalidHex)
        ));
        assert!(matches!(
            verify_body(BODY, "", KEY),
            Err(SignatureError::SignatureMismatch)
        ));
    }
}

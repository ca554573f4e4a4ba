//! Payment gateway configuration.

use std::time::Duration;
use url::Url;

/// Settings for the Paystack client. Changing these requires a restart.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Secret key; used both as the bearer token and as the webhook HMAC key.
    pub secret_key: Box<str>,
    pub base_url: Url,
    /// ISO currency code sent with every charge.
    pub currency: String,
    /// Where the gateway sends the payer after checkout.
    pub callback_url: Option<Url>,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }
}

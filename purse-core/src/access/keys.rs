//! Key material and expiry parsing. Nothing here touches the database.

use purse_sdk::objects::Capability;
use ring::digest;
use thiserror::Error;
use time::Duration;

pub const KEY_PREFIX: &str = "sk_live_";
const KEY_BYTES: usize = 32;
/// Characters of the plaintext key kept for display.
const DISPLAY_PREFIX_LEN: usize = KEY_PREFIX.len() + 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid expiry {0:?}, expected <n><H|D|M|Y>")]
pub struct InvalidExpiry(pub String);

/// Parse `<n><unit>` into a duration. A month is 30 days, a year 365.
pub fn parse_expiry(expiry: &str) -> Result<Duration, InvalidExpiry> {
    let invalid = || InvalidExpiry(expiry.to_owned());

    let unit = expiry.chars().last().ok_or_else(invalid)?;
    let count = &expiry[..expiry.len() - unit.len_utf8()];
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let count: i64 = count.parse().map_err(|_| invalid())?;
    if count <= 0 {
        return Err(invalid());
    }

    let unit_hours: i64 = match unit {
        'H' => 1,
        'D' => 24,
        'M' => 24 * 30,
        'Y' => 24 * 365,
        _ => return Err(invalid()),
    };
    // Bounded so the resulting timestamp stays representable.
    let hours = count
        .checked_mul(unit_hours)
        .filter(|h| *h <= 24 * 365 * 100)
        .ok_or_else(invalid)?;
    Ok(Duration::hours(hours))
}

/// A fresh plaintext key: `sk_live_` followed by 64 hex characters.
pub fn generate_api_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

/// SHA-256 hex digest of the plaintext key. This is what gets stored.
pub fn hash_api_key(key: &str) -> String {
    hex::encode(digest::digest(&digest::SHA256, key.as_bytes()))
}

/// The non-secret head of a key, shown in listings.
pub fn display_prefix(key: &str) -> String {
    key.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Parse stored capability tags, dropping any this build does not know.
pub fn parse_capabilities(tags: &[String]) -> Vec<Capability> {
    tags.iter()
        .filter_map(|tag| match tag.parse::<Capability>() {
            Ok(capability) => Some(capability),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping stored capability tag");
                None
            }
        })
        .collect()
}

pub fn capability_tags(capabilities: &[Capability]) -> Vec<String> {
    capabilities.iter().map(|c| c.as_str().to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_units() {
        assert_eq!(parse_expiry("1H").unwrap(), Duration::hours(1));
        assert_eq!(parse_expiry("2D").unwrap(), Duration::days(2));
        assert_eq!(parse_expiry("1M").unwrap(), Duration::days(30));
        assert_eq!(parse_expiry("1Y").unwrap(), Duration::days(365));
        assert_eq!(parse_expiry("12H").unwrap(), Duration::hours(12));
    }

    #[test]
    fn test_parse_expiry_rejects() {
        for bad in ["", "H", "0D", "-1D", "1W", "1d", "1.5D", " 1D", "1D ", "+1D", "99999999999999Y"] {
            assert!(parse_expiry(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with(KEY_PREFIX));
        let body = &key[KEY_PREFIX.len()..];
        assert_eq!(body.len(), 64);
        assert!(body.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn test_hash_is_stable_and_not_the_key() {
        let key = generate_api_key();
        let hash = hash_api_key(&key);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key(&key));
        assert!(!hash.contains(&key[KEY_PREFIX.len()..]));
        // sha256("abc")
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(
            display_prefix("sk_live_0123456789abcdef"),
            "sk_live_01234567"
        );
        assert_eq!(display_prefix("short"), "short");
    }

    #[test]
    fn test_capability_tags() {
        let tags = vec!["read".to_string(), "bogus".to_string(), "transfer".to_string()];
        assert_eq!(
            parse_capabilities(&tags),
            vec![Capability::Read, Capability::Transfer]
        );
        assert_eq!(
            capability_tags(&[Capability::Deposit, Capability::Read]),
            vec!["deposit".to_string(), "read".to_string()]
        );
    }
}

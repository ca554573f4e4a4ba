//! Operator credential for the Admin API.
//!
//! The secret is only ever held as an argon2 PHC string. It is parsed once
//! when the config is loaded, so a corrupted hash stops startup instead of
//! quietly rejecting every admin request.

use argon2::password_hash::{PasswordHashString, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminSecretError {
    #[error("admin secret is not an argon2 hash: {0}")]
    NotAHash(String),

    #[error("failed to hash admin secret: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret_hash: PasswordHashString,
}

impl AdminConfig {
    /// Build from a stored PHC string such as `$argon2id$v=19$...`.
    pub fn from_hash(phc: &str) -> Result<Self, AdminSecretError> {
        let parsed =
            PasswordHash::new(phc).map_err(|e| AdminSecretError::NotAHash(e.to_string()))?;
        Ok(Self {
            secret_hash: parsed.serialize(),
        })
    }

    /// Hash a plaintext secret with a fresh salt, returning the PHC string.
    pub fn hash_secret(plaintext: &str) -> Result<String, AdminSecretError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AdminSecretError::Hashing(e.to_string()))
    }

    /// Whether `secret` is already a PHC hash rather than plaintext.
    pub fn is_hashed(secret: &str) -> bool {
        PasswordHash::new(secret).is_ok()
    }

    pub fn verify_secret(&self, presented: &str) -> bool {
        Argon2::default()
            .verify_password(presented.as_bytes(), &self.secret_hash.password_hash())
            .is_ok()
    }

    pub fn secret_hash(&self) -> &str {
        self.secret_hash.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let phc = AdminConfig::hash_secret("operator-secret").unwrap();
        assert!(AdminConfig::is_hashed(&phc));

        let admin = AdminConfig::from_hash(&phc).unwrap();
        assert_eq!(admin.secret_hash(), phc);
        assert!(admin.verify_secret("operator-secret"));
        assert!(!admin.verify_secret("operator-secreT"));
        assert!(!admin.verify_secret(""));
    }

    #[test]
    fn test_salts_differ() {
        let a = AdminConfig::hash_secret("same").unwrap();
        let b = AdminConfig::hash_secret("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_is_not_a_hash() {
        assert!(!AdminConfig::is_hashed("operator-secret"));
        assert!(matches!(
            AdminConfig::from_hash("operator-secret"),
            Err(AdminSecretError::NotAHash(_))
        ));
    }
}

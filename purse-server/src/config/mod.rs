//! Configuration module for purse-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, LogFormat};
use crate::config::runtime::{AdminConfig, GatewayConfig, ServerConfig, SharedConfig};
use purse_core::gateway::PaystackGateway;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable that overrides `paystack.secret_key`.
pub const PAYSTACK_SECRET_ENV: &str = "PAYSTACK_SECRET_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub gateway: GatewayConfig,
    pub max_connections: u32,
    pub log_format: LogFormat,
    /// The admin secret was plaintext and the file has been rewritten.
    pub secret_rehashed: bool,
}

impl LoadedConfig {
    /// Split off the reloadable sections.
    pub fn into_shared(self) -> (SharedConfig, GatewayConfig) {
        (SharedConfig::new(self.server, self.admin), self.gateway)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        // The file is rewritten from this copy, so overrides must not leak
        // into it.
        let mut effective = file_config.clone();
        if let Some(listen) = self.listen_override {
            effective.server.listen = listen;
        }
        apply_env_overrides(&mut effective, std::env::var(PAYSTACK_SECRET_ENV).ok());

        validate(&effective)?;

        let secret_rehashed = !file_config.is_admin_secret_hashed();
        let secret_hash = if secret_rehashed {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            hash
        } else {
            file_config.admin.secret.clone()
        };

        build_loaded_config(effective, secret_hash, secret_rehashed)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn apply_env_overrides(config: &mut FileConfig, paystack_secret: Option<String>) {
    if let Some(secret) = paystack_secret.filter(|s| !s.trim().is_empty()) {
        config.paystack.secret_key = secret;
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.admin.secret.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "admin.secret must not be empty".to_string(),
        ));
    }
    if config.paystack.secret_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "paystack.secret_key is empty and {PAYSTACK_SECRET_ENV} is not set"
        )));
    }
    let currency = &config.paystack.currency;
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ConfigError::ValidationError(format!(
            "paystack.currency {currency:?} is not an ISO 4217 code"
        )));
    }
    if config.paystack.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "paystack.request_timeout_secs must be positive".to_string(),
        ));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be positive".to_string(),
        ));
    }
    Ok(())
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    AdminConfig::hash_secret(plaintext).map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(
    file_config: FileConfig,
    secret_hash: String,
    secret_rehashed: bool,
) -> Result<LoadedConfig, ConfigError> {
    let paystack = file_config.paystack;
    let base_url = match paystack.base_url {
        Some(url) => url,
        None => Url::parse(PaystackGateway::DEFAULT_BASE_URL)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
    };

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::from_hash(&secret_hash)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
        gateway: GatewayConfig {
            secret_key: paystack.secret_key.into_boxed_str(),
            base_url,
            currency: paystack.currency,
            callback_url: paystack.callback_url,
            request_timeout: Duration::from_secs(paystack.request_timeout_secs),
        },
        max_connections: file_config.database.max_connections,
        log_format: file_config.log.format,
        secret_rehashed,
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

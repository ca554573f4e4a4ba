//! Configuration types for Purse.
//!
//! These types represent the validated runtime configuration used by the server
//! and can be shared across crates. The actual config loading/parsing is handled
//! by the server crate.

mod admin;
mod gateway;
mod server;

pub use admin::{AdminConfig, AdminSecretError};
pub use gateway::GatewayConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Reloadable configuration sections, each behind its own lock.
///
/// Gateway settings are not here: they are baked into the gateway client at
/// startup.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, etc.).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin configuration (authentication).
    pub admin: Arc<RwLock<AdminConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, admin: AdminConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            admin: Arc::new(RwLock::new(admin)),
        }
    }
}

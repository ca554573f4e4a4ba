//! Runtime configuration re-exports.
//!
//! The validated runtime types live in `purse_core::config` so the core
//! crate can consume them without depending on the file format.

pub use purse_core::config::{AdminConfig, GatewayConfig, ServerConfig, SharedConfig};

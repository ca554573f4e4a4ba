//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use purse_core::framework::DatabaseProcessor;
use purse_core::gateway::PaystackGateway;
use purse_core::settlement::SettlementEngine;
use purse_core::store::PgLedgerStore;
use sqlx::PgPool;
use std::sync::Arc;

pub type Engine = SettlementEngine<PgLedgerStore, PaystackGateway>;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Settlement engine over the same pool.
    pub engine: Arc<Engine>,
    /// Runtime configuration (admin section reloads on SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(db: PgPool, gateway: PaystackGateway, config: SharedConfig) -> Self {
        let store = PgLedgerStore::new(db.clone());
        Self {
            db,
            engine: Arc::new(SettlementEngine::new(store, gateway)),
            config,
        }
    }

    pub fn processor(&self) -> DatabaseProcessor {
        DatabaseProcessor {
            pool: self.db.clone(),
        }
    }
}

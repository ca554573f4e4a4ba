//! Purse Server
//!
//! A custodial wallet ledger: Paystack deposits, wallet-to-wallet transfers
//! and API-key access.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use anyhow::Context;
use clap::Parser;
use config::file::LogFormat;
use config::{ConfigLoader, get_database_url};
use purse_core::gateway::PaystackGateway;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Purse - custodial wallet ledger backed by Paystack
#[derive(Parser, Debug)]
#[command(name = "purse-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "./purse-config.toml")]
    config: PathBuf,

    /// Listen address, overriding `[server].listen`
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Apply pending schema migrations before serving
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The log format lives in the config file, so tracing starts after it.
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = config_loader
        .load()
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_tracing(loaded.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "Starting purse-server"
    );
    if loaded.secret_rehashed {
        tracing::info!("Admin secret was plaintext; stored its argon2 hash instead");
    }

    let listen_addr = loaded.server.listen;
    let max_connections = loaded.max_connections;
    let (shared_config, gateway_config) = loaded.into_shared();

    let db_pool = open_database(max_connections, args.migrate).await?;
    let gateway = PaystackGateway::new(gateway_config).context("building Paystack client")?;

    let state = AppState::new(db_pool.clone(), gateway, shared_config);
    let reload_stop = spawn_config_reload_handler(state.clone(), config_loader);

    tracing::info!(%listen_addr, "Serving HTTP");
    let served = run_server(build_router(state), listen_addr).await;

    reload_stop.notify_one();
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    served.map_err(Into::into)
}

/// Connect to `DATABASE_URL` and optionally bring the schema up to date.
async fn open_database(max_connections: u32, migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url()?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("connecting to database")?;
    tracing::info!(max_connections, "Database pool ready");

    if migrate {
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("Migrations applied");
    }
    Ok(pool)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,purse_core=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

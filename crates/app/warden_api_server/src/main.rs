//! Warden API server binary.
//!
//! Runs admission control, token validation and policy administration over
//! HTTP. With `DATABASE_URL` set, revocations and policy rules are kept in
//! PostgreSQL; otherwise both live in process memory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_api::AppState;
use warden_api::config::ApiConfig;
use warden_core::auth::blacklist::{MemoryRevocationStore, PgRevocationStore, RevocationStore};
use warden_core::authz::{Enforcer, MemoryPolicyStore, PgPolicyStore, PolicyStore};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "warden_api_server", about = "Warden API server")]
struct Args {
    /// Port to listen on. Overrides the port of `BIND_ADDR` when given.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL. Omit to run with in-memory stores.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,warden_api=debug,warden_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        config.bind_addr = match config.bind_addr.rsplit_once(':') {
            Some((host, _)) => format!("{host}:{port}"),
            None => format!("127.0.0.1:{port}"),
        };
    }
    config.database_url = args.database_url.filter(|url| !url.is_empty());

    let (revocations, policies): (Arc<dyn RevocationStore>, Arc<dyn PolicyStore>) =
        match &config.database_url {
            Some(url) => {
                info!(max_connections = args.max_connections, "configuring connection pool");
                let pool = PgPoolOptions::new()
                    .max_connections(args.max_connections)
                    .acquire_timeout(Duration::from_secs(30))
                    .connect(url)
                    .await?;

                info!("running database migrations");
                warden_core::migrate::migrate(&pool).await?;

                (
                    Arc::new(PgRevocationStore::new(pool.clone())),
                    Arc::new(PgPolicyStore::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; revocations and policies are not persisted");
                (
                    Arc::new(MemoryRevocationStore::new()),
                    Arc::new(MemoryPolicyStore::new()),
                )
            }
        };

    // A failed initial load is fatal.
    let enforcer = Enforcer::new(policies).with_store_timeout(config.token.store_timeout);
    let loaded = enforcer.reload().await?;
    info!(loaded, "policy engine ready");

    let purge_interval = config.purge_interval;
    let state = AppState::new(config, revocations, Arc::new(enforcer))?;

    let cancel = CancellationToken::new();
    let sweeper = state.limiter.spawn_sweeper(cancel.clone());
    let purger = state.tokens.spawn_purge_task(purge_interval, cancel.clone());

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    let app = warden_api::router(state);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Stop the background tasks once the listener has drained.
    cancel.cancel();
    let _ = tokio::join!(sweeper, purger);
    info!("shut down");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

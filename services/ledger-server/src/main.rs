//! Ledger Server
//!
//! HTTP edge for the operational event ledger's single-writer append
//! path. Exposes one mutation endpoint and two read-side stubs; RBAC,
//! secret management, and projections live upstream or downstream of
//! this service.

mod config;
mod error;
mod extractors;
mod handlers;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledger_coordinator::Coordinator;
use ledger_registry::Registry;
use ledger_storage::{Database, DatabaseConfig};

use crate::config::ServerConfig;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "ledger-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "LEDGER_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "LEDGER_HOST")]
    host: Option<String>,

    #[arg(short, long, env = "LEDGER_PORT")]
    port: Option<u16>,

    #[arg(long, env = "LEDGER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "LEDGER_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "LEDGER_SIGNING_KEY_B64")]
    signing_key_b64: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    if let Some(key) = args.signing_key_b64 {
        server_config.signing.key_b64 = Some(key);
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ledger-server");

    let signing_key_b64 = server_config
        .signing
        .key_b64
        .clone()
        .ok_or_else(|| anyhow::anyhow!("LEDGER_SIGNING_KEY_B64 must be set"))?;
    let signing_key = Arc::new(ledger_crypto::load_private_key(&signing_key_b64)?);

    let database = init_database(&server_config).await?;
    let storage = Arc::new(database.storage_port());
    let registry = Arc::new(Registry::embedded_default());
    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&storage),
        registry,
        signing_key,
    ));

    let state = Arc::new(AppState { coordinator, storage });

    let app: Router = Router::new()
        .nest("/v1", routes::v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    if server_config.metrics.enabled {
        start_metrics_server(server_config.metrics.port).await?;
    }

    let addr = server_config.server.socket_addr();
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_logging(cfg: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match cfg.format.as_str() {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }

    Ok(())
}

async fn init_database(cfg: &ServerConfig) -> anyhow::Result<Database> {
    let db_config = DatabaseConfig {
        postgres_url: cfg.database.postgres_url.clone(),
        pg_max_connections: cfg.database.max_connections,
        pg_min_connections: cfg.database.min_connections,
        pg_acquire_timeout_secs: 30,
    };

    let database = Database::connect(&db_config).await?;
    database.migrate().await?;

    if !database.health_check().await? {
        anyhow::bail!("database health check failed");
    }

    Ok(database)
}

async fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.with_http_listener(addr).install_recorder()?;

    tracing::info!(port, "metrics server started");

    tokio::spawn(async move {
        let _handle = handle;
        std::future::pending::<()>().await;
    });

    Ok(())
}

async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_port_override() {
        let args = Args::parse_from(["ledger-server", "--port", "9000"]);
        assert_eq!(args.port, Some(9000));
    }
}

//! USEF ingress server binary.
//!
//! Starts an axum HTTP server with structured logging, database initialization,
//! participant discovery and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use usef_crypto::FileKeyStore;
use usef_db::DbPool;
use usef_ingress::IngressVerifier;
use usef_replay::ReplayGuard;
use usef_server::config::{self, Config};
use usef_server::dispatch::LoggingDispatcher;
use usef_server::{app, keys, retention, AppState};
use usef_types::SequenceGenerator;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("USEF_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = usef_db::create_pool(
        &config.database.path,
        usef_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool: check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = usef_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    if let Some(path) = &config.keystore.secret_key_path {
        let public_key = keys::published_public_key(FileKeyStore::new(path))
            .expect("signing key failed its self-check: check keystore.secret_key_path");
        tracing::info!(%public_key, "signing key loaded");
    }

    // Built outside the async runtime: the DNS client owns a runtime of its own.
    let resolver = usef_discovery::resolver_from_settings(&config.discovery.settings())
        .expect("failed to configure participant discovery");

    let state = AppState {
        verifier: IngressVerifier::new(resolver.clone(), ReplayGuard::new(pool.clone())),
        dispatcher: Arc::new(LoggingDispatcher),
        sequence: Arc::new(SequenceGenerator::new()),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start async runtime");
    runtime.block_on(serve(config, pool, state));

    // The last resolver handle must go after the server runtime is gone.
    drop(runtime);
    drop(resolver);

    tracing::info!("usef server shut down");
}

async fn serve(config: Config, pool: DbPool, state: AppState) {
    tokio::spawn(retention::start_retention_task(
        pool,
        config.retention.replay_retention_days,
        config.retention.purge_interval_seconds,
    ));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting usef server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}

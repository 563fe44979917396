//! stereogrid-catalog - Song catalog service
//!
//! Serves CRUD over the song catalog and proxies Spotify search.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stereogrid_catalog::config::{Cli, ServiceConfig};
use stereogrid_catalog::spotify::SpotifyClient;
use stereogrid_catalog::{build_router, AppState};
use stereogrid_common::config::{resolve_config_path, TomlConfig};
use stereogrid_common::db::{init_database, SongStore};
use stereogrid_common::time::{Clock, SystemClock};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Read the file before tracing starts so its log level can apply
    let config_path = resolve_config_path(cli.config.as_deref());
    let file_config = TomlConfig::load_optional(config_path.as_deref())?;
    let config = ServiceConfig::resolve(&cli, file_config.as_ref().unwrap_or(&TomlConfig::default()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting Stereogrid Catalog (stereogrid-catalog) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&file_config, &config_path) {
        (Some(_), Some(path)) => info!("Loaded configuration from {}", path.display()),
        (None, Some(path)) => warn!("Config file {} not found, using defaults", path.display()),
        _ => warn!("No config file location available, using defaults"),
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if config.auth.is_disabled() {
        warn!("API authorization is DISABLED: every request is admitted without credentials");
    } else if config.auth.token_count() == 0 {
        warn!("No API tokens configured: every request except /health will be rejected");
    } else {
        info!("✓ Loaded {} API token(s)", config.auth.token_count());
    }

    if !config.spotify.has_credentials() {
        warn!("Spotify credentials not configured: /search, /validate-url and /token will fail");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let spotify = SpotifyClient::new(config.spotify.clone(), clock.clone())
        .context("Failed to build Spotify client")?;

    let state = AppState::new(
        SongStore::new(pool),
        spotify,
        config.auth.clone(),
        clock,
        config.cache_ttl,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("stereogrid-catalog listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

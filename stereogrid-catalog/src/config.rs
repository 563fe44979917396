//! Service configuration
//!
//! Priority (highest first): command-line flags, environment variables
//! (through clap's `env` fallbacks), `config.toml`, compiled defaults.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use stereogrid_common::api::AuthPolicy;
use stereogrid_common::config::{
    default_database_path, TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_SPOTIFY_TIMEOUT_SECS,
};
use stereogrid_common::{Error, Result};

use crate::spotify::{SpotifyConfig, DEFAULT_ACCOUNTS_URL, DEFAULT_API_BASE_URL};

/// Command-line arguments for stereogrid-catalog
#[derive(Parser, Debug, Default)]
#[command(name = "stereogrid-catalog")]
#[command(about = "Song catalog service for Stereogrid")]
#[command(version)]
pub struct Cli {
    /// Path to config.toml
    #[arg(short, long, env = "STEREOGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(short, long, env = "STEREOGRID_BIND")]
    pub bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "STEREOGRID_DATABASE")]
    pub database: Option<PathBuf>,

    /// Seconds a cached list/detail response stays valid
    #[arg(long, env = "STEREOGRID_CACHE_TTL")]
    pub cache_ttl_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "STEREOGRID_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    /// Admit every request without credentials (debugging only)
    #[arg(long, env = "STEREOGRID_DISABLE_AUTH")]
    pub disable_auth: bool,
}

/// Fully resolved settings the service runs with
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: SocketAddr,
    pub database_path: PathBuf,
    pub cache_ttl: Duration,
    pub log_level: String,
    pub spotify: SpotifyConfig,
    pub auth: AuthPolicy,
}

impl ServiceConfig {
    pub fn resolve(cli: &Cli, file: &TomlConfig) -> Result<Self> {
        let bind = cli
            .bind
            .clone()
            .or_else(|| file.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind, e)))?;

        let database_path = cli
            .database
            .clone()
            .or_else(|| file.database_path.clone())
            .unwrap_or_else(default_database_path);

        let cache_ttl = Duration::from_secs(
            cli.cache_ttl_secs
                .or(file.cache_ttl_secs)
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let log_level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| file.logging.level.clone());

        let spotify = SpotifyConfig {
            client_id: cli
                .spotify_client_id
                .clone()
                .or_else(|| file.spotify.client_id.clone()),
            client_secret: cli
                .spotify_client_secret
                .clone()
                .or_else(|| file.spotify.client_secret.clone()),
            timeout: Duration::from_secs(
                file.spotify
                    .timeout_secs
                    .unwrap_or(DEFAULT_SPOTIFY_TIMEOUT_SECS),
            ),
            accounts_url: file
                .spotify
                .accounts_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            api_base_url: file
                .spotify
                .api_base_url
                .clone()
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        };

        let auth = if cli.disable_auth || file.auth.disabled {
            AuthPolicy::disabled()
        } else {
            AuthPolicy::new(&file.auth.tokens)
        };

        Ok(Self {
            bind_address,
            database_path,
            cache_ttl,
            log_level,
            spotify,
            auth,
        })
    }
}

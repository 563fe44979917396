//! Configuration file loading and default locations
//!
//! The TOML file is the lowest-priority explicit source; the service layers
//! command-line flags and environment variables on top of it. A missing
//! file is not an error: the service starts on compiled defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::auth::TokenEntry;
use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STEREOGRID_CONFIG";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_SPOTIFY_TIMEOUT_SECS: u64 = 10;

/// Contents of `config.toml`
///
/// Every field is optional; unset fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: Option<String>,

    /// Path to SQLite database file
    pub database_path: Option<PathBuf>,

    /// Lifetime of cached list/detail responses
    pub cache_ttl_secs: Option<u64>,

    pub logging: LoggingConfig,

    pub spotify: SpotifyToml,

    pub auth: AuthToml,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[spotify]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifyToml {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Override for the client-credentials token endpoint
    pub accounts_url: Option<String>,
    /// Override for the Web API base URL
    pub api_base_url: Option<String>,
}

/// `[auth]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthToml {
    /// Debug override: every request is let through unauthenticated
    pub disabled: bool,

    /// Accepted API tokens, stored as SHA-256 digests
    pub tokens: Vec<TokenEntry>,
}

impl TomlConfig {
    /// Parse the file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path` if it names an existing file
    ///
    /// `Ok(None)` means there was nothing to load; a file that exists but
    /// does not parse is still an error. Nothing is logged here because the
    /// caller may not have initialised tracing yet.
    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>> {
        match path {
            Some(path) if path.is_file() => Self::load(path).map(Some),
            _ => Ok(None),
        }
    }
}

/// Config file location: explicit argument, then `STEREOGRID_CONFIG`, then
/// `<config_dir>/stereogrid/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stereogrid").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stereogrid"))
        .unwrap_or_else(|| PathBuf::from("./stereogrid_data"))
        .join("stereogrid.db")
}

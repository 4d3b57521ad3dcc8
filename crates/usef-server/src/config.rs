//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use usef_discovery::DiscoverySettings;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Participant discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// This node's own signing key.
    #[serde(default)]
    pub keystore: KeystoreConfig,

    /// Replay-record housekeeping.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file holding the replay records.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "usef_ingress=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Participant discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Resolve participants from the local trust store instead of DNS.
    #[serde(default)]
    pub bypass_dns: bool,

    /// Trust-store file; the default path is used when this one is absent.
    #[serde(default)]
    pub trust_store_path: Option<String>,

    /// Nameserver to query instead of the system configuration.
    #[serde(default)]
    pub nameserver: Option<IpAddr>,

    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,
}

/// Signing key configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeystoreConfig {
    /// File holding the Base64 secret key.
    #[serde(default)]
    pub secret_key_path: Option<String>,
}

/// Replay-record retention.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Replay records older than this are purged.
    #[serde(default = "default_replay_retention_days")]
    pub replay_retention_days: u32,

    #[serde(default = "default_purge_interval_seconds")]
    pub purge_interval_seconds: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "usef.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dns_timeout_ms() -> u64 {
    5_000
}

fn default_replay_retention_days() -> u32 {
    30
}

fn default_purge_interval_seconds() -> u64 {
    3_600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bypass_dns: false,
            trust_store_path: None,
            nameserver: None,
            dns_timeout_ms: default_dns_timeout_ms(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            replay_retention_days: default_replay_retention_days(),
            purge_interval_seconds: default_purge_interval_seconds(),
        }
    }
}

impl DiscoveryConfig {
    /// Converts to the settings the resolver factory takes.
    pub fn settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            bypass_dns: self.bypass_dns,
            trust_store_path: self.trust_store_path.as_ref().map(PathBuf::from),
            nameserver: self.nameserver,
            dns_timeout: Duration::from_millis(self.dns_timeout_ms),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting holds a value the server cannot run with.
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

impl Config {
    /// Rejects settings that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.purge_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "retention.purge_interval_seconds",
                reason: "must be at least 1",
            });
        }
        if self.discovery.dns_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "discovery.dns_timeout_ms",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `USEF_HOST` overrides `server.host`
/// - `USEF_PORT` overrides `server.port`
/// - `USEF_DB_PATH` overrides `database.path`
/// - `USEF_LOG_LEVEL` overrides `logging.level`
/// - `USEF_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `USEF_BYPASS_DNS` overrides `discovery.bypass_dns` (set to "true" to enable)
/// - `USEF_TRUST_STORE_PATH` overrides `discovery.trust_store_path`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if a setting fails [`Config::validate`].
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("USEF_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("USEF_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("USEF_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("USEF_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("USEF_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }
    if let Some(bypass) = var("USEF_BYPASS_DNS") {
        config.discovery.bypass_dns = is_truthy(&bypass);
    }
    if let Some(path) = var("USEF_TRUST_STORE_PATH") {
        config.discovery.trust_store_path = Some(path);
    }
}

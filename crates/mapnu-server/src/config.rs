//! Server configuration
//!
//! Loaded from a TOML, YAML or JSON file with `MAPNU__`-prefixed environment
//! overrides, or from the environment alone when no file is given.

use mapnu_auth::AuthConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment overrides (`MAPNU__BIND`, `MAPNU__AUTH__CLIENT_ID`, ...)
pub const ENV_PREFIX: &str = "MAPNU";

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ServerConfigError {
    /// Configuration file does not exist
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// File extension is not toml, yaml, yml or json
    #[error("unsupported configuration format (use .toml, .yaml or .json)")]
    UnsupportedFormat,

    /// File or environment could not be parsed
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Authentication settings are missing or invalid
    #[error(transparent)]
    Auth(#[from] mapnu_auth::ConfigError),
}

/// Settings for the HTTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,
    /// How long in-flight requests may run after shutdown is requested
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    /// Authentication settings
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Default settings around the given authentication configuration
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            json_logs: false,
            shutdown_timeout_secs: default_shutdown_timeout(),
            auth,
        }
    }

    /// Load configuration from the environment only (`JWT_SECRET`,
    /// `GOOGLE_CLIENT_ID`, ...) with server defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ServerConfigError::Auth`] if required settings are missing.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Ok(Self::new(AuthConfig::from_env()?))
    }

    /// Load configuration from a file; environment variables override file settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist
    /// - The file format is unsupported
    /// - The file contains invalid configuration
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ServerConfigError> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();

        if !path.exists() {
            return Err(ServerConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ServerConfigError::UnsupportedFormat),
        };

        let config = Config::builder()
            .add_source(File::new(
                path.to_str().ok_or(ServerConfigError::UnsupportedFormat)?,
                format,
            ))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.auth.validate()?;
        Ok(config)
    }

    /// Drain limit as a [`Duration`]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> u64 {
    20
}

//! Configuration management for the Dirshare daemon.
//!
//! This module provides TOML-based configuration file loading.
//! The default configuration path is `~/.config/dirshare/config.toml`.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::ConfinedRoot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("bind must be an IP address, got {0}")]
    InvalidBindAddress(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("no directory to share: pass one on the command line or set share.root")]
    MissingRoot,

    #[error("shared directory does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("shared path is not a directory: {0}")]
    RootNotDirectory(PathBuf),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Dirshare daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener configuration.
    pub server: ServerConfig,

    /// What is shared and how it is listed.
    pub share: ShareConfig,

    /// Logging configuration.
    pub log: LogConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,

    /// Port to listen on.
    pub port: u16,
}

/// Shared directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShareConfig {
    /// Directory to share. The command line takes precedence.
    pub root: Option<PathBuf>,

    /// List entries whose name starts with a dot.
    pub include_hidden: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            root: None,
            include_hidden: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One environment variable seen by [`Config::apply_env_overrides`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    /// The value replaced the configured one.
    Applied { var: &'static str, value: String },
    /// The value could not be parsed and was left out.
    Ignored { var: &'static str, value: String },
}

impl EnvOverride {
    /// Log this override.
    pub fn log(&self) {
        match self {
            EnvOverride::Applied { var, value } => {
                tracing::info!("Overriding from environment: {}={}", var, value);
            }
            EnvOverride::Ignored { var, value } => {
                tracing::warn!("Ignoring unparsable {}: {}", var, value);
            }
        }
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.is_empty())
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dirshare")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - DIRSHARE_PORT: Override listen port
    /// - DIRSHARE_BIND: Override listen address
    /// - DIRSHARE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Runs before logging is set up, so what happened is returned for the
    /// caller to log once a subscriber exists.
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut overrides = Vec::new();

        if let Some(port) = env_value("DIRSHARE_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) => {
                    self.server.port = parsed;
                    overrides.push(EnvOverride::Applied {
                        var: "DIRSHARE_PORT",
                        value: port,
                    });
                }
                Err(_) => overrides.push(EnvOverride::Ignored {
                    var: "DIRSHARE_PORT",
                    value: port,
                }),
            }
        }

        if let Some(bind) = env_value("DIRSHARE_BIND") {
            self.server.bind = bind.clone();
            overrides.push(EnvOverride::Applied {
                var: "DIRSHARE_BIND",
                value: bind,
            });
        }

        if let Some(level) = env_value("DIRSHARE_LOG_LEVEL") {
            self.log.level = level.clone();
            overrides.push(EnvOverride::Applied {
                var: "DIRSHARE_LOG_LEVEL",
                value: level,
            });
        }

        overrides
    }

    /// Validate the configuration values.
    ///
    /// The shared root is checked separately by [`Config::confined_root`],
    /// since it needs the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        if self.server.bind.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddress(self.server.bind.clone()));
        }

        let level = self.log.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log.level.clone()));
        }

        Ok(())
    }

    /// Socket address to listen on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .server
            .bind
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Fix the shared root for the lifetime of the process.
    ///
    /// A relative root is taken relative to `cwd`. The directory must exist.
    pub fn confined_root(&self, cwd: &Path) -> Result<ConfinedRoot, ConfigError> {
        let raw = self.share.root.as_ref().ok_or(ConfigError::MissingRoot)?;
        let root = ConfinedRoot::new(raw, cwd);

        match fs::metadata(root.as_path()) {
            Ok(metadata) if metadata.is_dir() => Ok(root),
            Ok(_) => Err(ConfigError::RootNotDirectory(root.as_path().to_path_buf())),
            Err(_) => Err(ConfigError::RootNotFound(root.as_path().to_path_buf())),
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }
}

fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

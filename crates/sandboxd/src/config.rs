//! Daemon configuration.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. TOML file (`configs/config.toml` unless `--config` says otherwise)
//! 3. Environment variables (`SANDBOX_*`)
//!
//! Each layer overrides the previous. The result is validated once and not
//! mutated afterwards.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid environment variable {var}={value:?}: {reason}")]
    InvalidEnvVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub sandbox: SandboxConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on every call except Execute.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    pub workspace_dir: PathBuf,
    /// Bytes.
    pub max_file_size: u64,
    pub shell_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("/tmp/agent-sandbox"),
            max_file_size: 100 * 1024 * 1024,
            shell_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            other => Err(format!("unknown store backend '{other}' (expected memory or file)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Snapshot file for the `file` backend.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{other}' (expected json or text)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl Config {
    /// Load from `path` (or [`DEFAULT_CONFIG_PATH`]), apply `SANDBOX_*`
    /// overrides from the process environment, and validate.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |var| std::env::var(var).ok())
    }

    /// Like [`Config::load`] with a caller-supplied environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    debug!(path = DEFAULT_CONFIG_PATH, "no config file; using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("SANDBOX_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("SANDBOX_SERVER_PORT") {
            self.server.port = parse_env("SANDBOX_SERVER_PORT", v)?;
        }
        if let Some(v) = env("SANDBOX_REQUEST_TIMEOUT") {
            self.server.request_timeout_secs = parse_env("SANDBOX_REQUEST_TIMEOUT", v)?;
        }
        if let Some(v) = env("SANDBOX_WORKSPACE_DIR") {
            self.sandbox.workspace_dir = PathBuf::from(v);
        }
        if let Some(v) = env("SANDBOX_MAX_FILE_SIZE") {
            self.sandbox.max_file_size = parse_env("SANDBOX_MAX_FILE_SIZE", v)?;
        }
        if let Some(v) = env("SANDBOX_SHELL_TIMEOUT") {
            self.sandbox.shell_timeout_secs = parse_env("SANDBOX_SHELL_TIMEOUT", v)?;
        }
        if let Some(v) = env("SANDBOX_STORE_BACKEND") {
            self.store.backend = parse_env("SANDBOX_STORE_BACKEND", v)?;
        }
        if let Some(v) = env("SANDBOX_STORE_PATH") {
            self.store.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env("SANDBOX_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = env("SANDBOX_LOG_FORMAT") {
            self.log.format = parse_env("SANDBOX_LOG_FORMAT", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::invalid("server.host", "must not be empty"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.sandbox.workspace_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("sandbox.workspace_dir", "must not be empty"));
        }
        if self.sandbox.max_file_size == 0 {
            return Err(ConfigError::invalid(
                "sandbox.max_file_size",
                "must be greater than zero",
            ));
        }
        if self.sandbox.shell_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "sandbox.shell_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.store.backend == StoreBackend::File
            && self
                .store
                .path
                .as_ref()
                .map_or(true, |p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::invalid(
                "store.path",
                "required when store.backend = \"file\"",
            ));
        }
        let level = self.log.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                "log.level",
                format!("unknown level '{}' (expected one of {})", self.log.level, LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Parsed bind address, when `host` is an IP literal.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address().parse().ok()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.sandbox.shell_timeout_secs)
    }
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::InvalidEnvVar {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

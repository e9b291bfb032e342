//! Configuration management for ClipShare
//!
//! This module handles loading, validating, and managing configuration
//! for the ClipShare server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Validation error
    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Passcode hashing configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which store implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store implementation
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Path to the SQLite database
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// How long SQLite waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Argon2id cost parameters for new passcode hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_database() -> PathBuf {
    PathBuf::from("~/.local/share/clipshare/clipboards.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_max_body_bytes() -> usize {
    1_048_576 // 1MB
}

fn default_argon2_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_argon2_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_argon2_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database: default_database(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Checks in order:
    /// 1. Path from CLIPSHARE_CONFIG environment variable
    /// 2. ~/.config/clipshare/config.toml
    /// 3. Built-in defaults
    ///
    /// The `PORT` environment variable, when set, replaces the listen port.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => {
                let mut config = Self::default();
                config.expand_paths();
                config
            }
        };

        config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_str)?;

        // Expand paths
        config.expand_paths();

        config.validate_config()?;

        Ok(config)
    }

    /// Load configuration with optional custom path
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => {
                let mut config = Self::load_from_path(&path)?;
                config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
                Ok(config)
            }
            None => Self::load(),
        }
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "listen_addr '{}' is not a valid socket address",
                self.listen_addr
            ))
        })
    }

    /// Replace the port of `listen_addr` with `port`, if given
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<(), ConfigError> {
        let Some(port) = port else {
            return Ok(());
        };

        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("PORT '{}' is not a valid port", port)))?;
        let mut addr = self.socket_addr()?;
        addr.set_port(port);
        self.listen_addr = addr.to_string();
        Ok(())
    }

    /// Find configuration file path
    fn find_config_path() -> Option<PathBuf> {
        // Check environment variable first
        if let Ok(path) = std::env::var("CLIPSHARE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Check default location
        Self::default_config_path().filter(|p| p.exists())
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("clipshare").join("config.toml"))
    }

    /// Expand tilde in paths
    fn expand_paths(&mut self) {
        self.storage.database = expand_path(&self.storage.database);
    }

    /// Validate configuration values
    fn validate_config(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        // Validate max_body_bytes range (1KB to 64MB)
        if self.server.max_body_bytes < 1024 {
            return Err(ConfigError::Validation(
                "max_body_bytes must be at least 1024 bytes (1KB)".to_string(),
            ));
        }
        if self.server.max_body_bytes > 67_108_864 {
            return Err(ConfigError::Validation(
                "max_body_bytes must not exceed 67108864 bytes (64MB)".to_string(),
            ));
        }

        if self.storage.busy_timeout_ms > 60_000 {
            return Err(ConfigError::Validation(
                "busy_timeout_ms must not exceed 60000".to_string(),
            ));
        }

        argon2::Params::new(
            self.security.argon2_memory_kib,
            self.security.argon2_iterations,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| ConfigError::Validation(format!("invalid argon2 parameters: {}", e)))?;

        Ok(())
    }

    /// Validate configuration file at given path
    pub fn validate(path: &Path) -> Result<(), ConfigError> {
        Self::load_from_path(path).map(|_| ())
    }

    /// Write the example configuration to the default location
    pub fn generate_example_config(force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = Self::default_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not find config directory",
            ))
        })?;

        if !force && config_path.exists() {
            return Err(ConfigError::Validation(
                "Config file already exists. Use --force to overwrite.".to_string(),
            ));
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, Self::generate_example())?;
        Ok(config_path)
    }

    /// Render the current configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate example configuration file
    pub fn generate_example() -> String {
        let config = Config::default();
        let origins = config
            .server
            .allowed_origins
            .iter()
            .map(|o| format!("\"{}\"", o))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"# ClipShare Configuration File
# Location: ~/.config/clipshare/config.toml

# Address the HTTP server listens on (PORT env var overrides the port)
listen_addr = "{}"

# Logging level (trace, debug, info, warn, error)
log_level = "{}"

# Storage settings
[storage]
# "sqlite" or "memory"
backend = "sqlite"
# Path to the clipboard database
database = "{}"
# Milliseconds to wait on a locked database
busy_timeout_ms = {}

# HTTP settings
[server]
# Browser origins allowed by CORS
allowed_origins = [{}]
# Largest accepted request body in bytes
max_body_bytes = {}

# Passcode hashing (Argon2id) for newly created private clipboards
[security]
argon2_memory_kib = {}
argon2_iterations = {}
argon2_parallelism = {}
"#,
            config.listen_addr,
            config.log_level,
            config.storage.database.display(),
            config.storage.busy_timeout_ms,
            origins,
            config.server.max_body_bytes,
            config.security.argon2_memory_kib,
            config.security.argon2_iterations,
            config.security.argon2_parallelism,
        )
    }
}

/// Expand tilde in path
fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(path_str.as_ref());
    PathBuf::from(expanded.into_owned())
}

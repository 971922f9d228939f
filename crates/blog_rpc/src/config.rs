//! Server configuration.
//!
//! Values come from defaults, then `BLOG_*` environment variables, then
//! explicit builder calls (the server binary maps its flags onto those).

use blog_core::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_LISTEN_ADDR: &str = "BLOG_LISTEN_ADDR";
pub const ENV_DB_PATH: &str = "BLOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BLOG_LOG_DIR";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_FILE_NAME: &str = "blog.db";
const DEFAULT_LOG_DIR_NAME: &str = "blog-server-logs";

/// Configuration for the blog server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub listen_addr: SocketAddr,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidListenAddr { value: String, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidListenAddr { value, reason } => {
                write!(f, "invalid listen address `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

impl ServerConfig {
    /// Reads `BLOG_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(addr) = non_empty(ENV_LISTEN_ADDR) {
            config = config.with_listen_addr(&addr)?;
        }
        if let Some(path) = non_empty(ENV_DB_PATH) {
            config = config.with_db_path(path);
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config = config.with_log_level(level);
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            config = config.with_log_dir(dir);
        }
        Ok(config)
    }

    pub fn with_listen_addr(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.listen_addr = addr
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidListenAddr {
                value: addr.to_string(),
                reason: err.to_string(),
            })?;
        Ok(self)
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
        }
    }
}

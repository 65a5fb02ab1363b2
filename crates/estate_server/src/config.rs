//! Server configuration from the process environment.
//!
//! # Responsibility
//! - Resolve listen address, database path and logging settings.
//! - Reject malformed values before anything is opened or bound.
//!
//! # Invariants
//! - Every setting has a default; only present-but-invalid values fail.
//! - `log_dir` is always absolute.

use estate_core::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5500;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_DB_PATH: &str = "estate.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "logs";

const ENV_PORT: &str = "PORT";
const ENV_BIND_HOST: &str = "ESTATE_BIND_HOST";
const ENV_DB_PATH: &str = "ESTATE_DB_PATH";
const ENV_LOG_LEVEL: &str = "ESTATE_LOG_LEVEL";
const ENV_LOG_DIR: &str = "ESTATE_LOG_DIR";
const ENV_LOG_STDERR: &str = "ESTATE_LOG_STDERR";

/// Error for invalid server configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// `PORT` is not a valid TCP port.
    InvalidPort(String),
    /// A boolean setting is not one of the accepted spellings.
    InvalidBool { key: &'static str, value: String },
    /// `ESTATE_LOG_LEVEL` is not a known level.
    InvalidLogLevel(String),
    /// A path setting is present but empty.
    EmptyPath(&'static str),
    /// The working directory needed to resolve a relative path is unavailable.
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort(value) => write!(f, "{ENV_PORT} must be a port number, got `{value}`"),
            Self::InvalidBool { key, value } => {
                write!(f, "{key} must be true|false|1|0|yes|no, got `{value}`")
            }
            Self::InvalidLogLevel(value) => write!(
                f,
                "{ENV_LOG_LEVEL} must be trace|debug|info|warn|error, got `{value}`"
            ),
            Self::EmptyPath(key) => write!(f, "{key} cannot be empty"),
            Self::CurrentDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir(err) => Some(err),
            _ => None,
        }
    }
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub log_stderr: bool,
}

impl ServerConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match read(ENV_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let bind_host = read(ENV_BIND_HOST).unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(raw) => parse_log_level(&raw)?,
            None => default_log_level().to_string(),
        };
        let log_dir = match lookup(ENV_LOG_DIR) {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError::EmptyPath(ENV_LOG_DIR));
            }
            Some(raw) => absolutize(PathBuf::from(raw.trim()))?,
            None => absolutize(PathBuf::from(DEFAULT_LOG_DIR_NAME))?,
        };
        let log_stderr = match read(ENV_LOG_STDERR) {
            Some(raw) => parse_bool(ENV_LOG_STDERR, &raw)?,
            None => true,
        };

        Ok(Self {
            bind_host,
            port,
            db_path,
            log_level,
            log_dir,
            log_stderr,
        })
    }

    /// `host:port` string accepted by `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_log_level(raw: &str) -> Result<String, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
        "warning" => Ok("warn".to_string()),
        _ => Err(ConfigError::InvalidLogLevel(raw.to_string())),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: raw.to_string(),
        }),
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ServerConfig, DEFAULT_BIND_HOST, DEFAULT_DB_PATH, DEFAULT_PORT};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_host, DEFAULT_BIND_HOST);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.log_dir.is_absolute());
        assert!(config.log_dir.ends_with("logs"));
        assert!(config.log_stderr);
        assert_eq!(config.listen_addr(), "0.0.0.0:5500");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("ESTATE_BIND_HOST", "127.0.0.1"),
            ("ESTATE_DB_PATH", "/var/lib/estate/db.sqlite3"),
            ("ESTATE_LOG_LEVEL", "WARNING"),
            ("ESTATE_LOG_DIR", "/var/log/estate"),
            ("ESTATE_LOG_STDERR", "no"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/estate/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/estate"));
        assert!(!config.log_stderr);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config_from(&[("PORT", "70000")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config_from(&[("ESTATE_LOG_LEVEL", "loud")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            config_from(&[("ESTATE_LOG_STDERR", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            config_from(&[("ESTATE_LOG_DIR", "  ")]),
            Err(ConfigError::EmptyPath(_))
        ));
    }
}

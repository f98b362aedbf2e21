//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! The TOML file itself is located the same way: `--config`, then
//! `LYRICDESK_CONFIG`, then `<os config dir>/lyricdesk/config.toml`. A missing
//! default file is not an error; a missing explicitly named file is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_CONFIG: &str = "LYRICDESK_CONFIG";
pub const ENV_PORT: &str = "LYRICDESK_PORT";
pub const ENV_ADMIN_KEY: &str = "LYRICDESK_ADMIN_KEY";
pub const ENV_URL: &str = "LYRICDESK_URL";
pub const ENV_SERVICE_KEY: &str = "LYRICDESK_SERVICE_KEY";
pub const ENV_DATABASE: &str = "LYRICDESK_DATABASE";

// ========================================
// TOML file shape
// ========================================

/// Configuration as written in the TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind: String,
    pub port: u16,
    /// Shared secret for the admin API; empty disables authentication
    pub admin_key: Option<String>,
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
    pub import: ImportConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            admin_key: None,
            logging: LoggingConfig::default(),
            backend: BackendConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error); RUST_LOG wins
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where the catalog and identity data live
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// SQLite file on this machine
    Local {
        #[serde(default)]
        database_path: Option<PathBuf>,
    },
    /// Hosted database service with built-in authentication
    Hosted {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        service_key: Option<String>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            database_path: None,
        }
    }
}

/// Bulk import tuning
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Language assigned to every CSV-imported song
    pub csv_language: String,
    /// Also skip records duplicating an earlier record of the same batch
    pub dedupe_within_batch: bool,
    /// Number of errors shown in an import summary
    pub error_preview: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            csv_language: "English".to_string(),
            dedupe_within_batch: false,
            error_preview: 3,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

// ========================================
// Resolved configuration
// ========================================

/// Backend with every required setting present
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Local { database_path: PathBuf },
    Hosted { url: String, service_key: String },
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Empty string disables admin API authentication
    pub admin_key: String,
    pub log_level: String,
    pub backend: Backend,
    pub import: ImportConfig,
}

impl Config {
    /// Load configuration from TOML, environment and CLI overrides
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match locate_config_file(overrides.config_path.as_deref())? {
            Some(path) => {
                let config = read_toml_config(&path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                info!("No configuration file found, using defaults");
                TomlConfig::default()
            }
        };

        Self::resolve(toml_config, overrides)
    }

    /// Apply environment and CLI overrides on top of a parsed TOML file
    pub fn resolve(toml_config: TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let port = match overrides.port {
            Some(port) => port,
            None => match env_value(ENV_PORT) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| Error::Config(format!("{} is not a port: {}", ENV_PORT, raw)))?,
                None => toml_config.port,
            },
        };

        let admin_key = env_value(ENV_ADMIN_KEY)
            .or(toml_config.admin_key)
            .unwrap_or_default();

        let backend = match toml_config.backend {
            BackendConfig::Local { database_path } => Backend::Local {
                database_path: overrides
                    .database_path
                    .clone()
                    .or_else(|| env_value(ENV_DATABASE).map(PathBuf::from))
                    .or(database_path)
                    .unwrap_or_else(default_database_path),
            },
            BackendConfig::Hosted { url, service_key } => {
                let url = env_value(ENV_URL).or(url).ok_or_else(|| {
                    Error::Config(format!("Hosted backend requires url (or {})", ENV_URL))
                })?;
                let service_key = env_value(ENV_SERVICE_KEY).or(service_key).ok_or_else(|| {
                    Error::Config(format!(
                        "Hosted backend requires service_key (or {})",
                        ENV_SERVICE_KEY
                    ))
                })?;
                Backend::Hosted {
                    url: url.trim_end_matches('/').to_string(),
                    service_key,
                }
            }
        };

        Ok(Config {
            bind: toml_config.bind,
            port,
            admin_key,
            log_level: toml_config.logging.level,
            backend,
            import: toml_config.import,
        })
    }
}

/// Parse a TOML configuration file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
}

/// Find the configuration file to read, if any
fn locate_config_file(cli_path: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    // Priority 2: Environment variable
    let explicit = cli_path
        .map(Path::to_path_buf)
        .or_else(|| env_value(ENV_CONFIG).map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    // Priority 3: OS-dependent default location (optional)
    Ok(default_config_path().filter(|p| p.exists()))
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lyricdesk").join("config.toml"))
}

/// OS-dependent default database path for local mode
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lyricdesk"))
        .unwrap_or_else(|| PathBuf::from("./lyricdesk_data"))
        .join("lyricdesk.db")
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(default_port(), 5730);
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path();
        assert!(path.ends_with("lyricdesk.db"));
    }

    #[test]
    fn test_import_defaults() {
        let import = ImportConfig::default();
        assert_eq!(import.csv_language, "English");
        assert!(!import.dedupe_within_batch);
        assert_eq!(import.error_preview, 3);
    }
}

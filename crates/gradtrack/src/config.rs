//! Server configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audit::AuditError;

/// Environment variable naming a JSON configuration file
pub const CONFIG_PATH_ENV: &str = "GRADTRACK_CONFIG";
/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "GRADTRACK_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid program template {code}: {source}")]
    Template {
        code: String,
        #[source]
        source: AuditError,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// SQLite database file
    pub database_path: String,
    /// Directory of public training program templates (`*.json`)
    pub catalog_dir: Option<PathBuf>,
    /// Import every catalog template as a public program on startup
    pub import_catalog_on_start: bool,
    /// Upper bound on `limit` for paged list endpoints
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "gradtrack.db".to_string(),
            catalog_dir: None,
            import_catalog_on_start: true,
            max_page_size: 100,
        }
    }
}

impl ServerConfig {
    /// Reads a configuration file. Missing keys fall back to defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the configuration named by `GRADTRACK_CONFIG` (or defaults), then
    /// applies `GRADTRACK_PORT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            config.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: PORT_ENV,
                value: port,
            })?;
        }

        Ok(config)
    }
}

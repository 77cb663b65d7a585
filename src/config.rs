//! Service configuration (§6, §4.12), grounded on
//! `original_source/internal/pkg/bifrost/init.go`'s `ParserConfigs`/
//! `NGConfig`/`DBConfig`/`LogConfig`, loaded with `serde_yaml` rather than
//! the original's `yaml.Unmarshal`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One hosted configuration instance, mirroring `NGConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct NgConfig {
    pub name: String,
    #[serde(rename = "relativePath")]
    pub relative_path: String,
    pub port: u16,
    #[serde(rename = "confPath")]
    pub conf_path: PathBuf,
    #[serde(rename = "nginxBin")]
    pub nginx_bin: Option<PathBuf>,
    /// Single-user bearer-token credentials for this instance's HTTP front
    /// end (§4.12). Omitting this leaves every route open, as before.
    pub auth: Option<AuthSectionConfig>,
}

/// Credentials from which an `AuthConfig` is built for one hosted instance.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSectionConfig {
    pub secret: String,
    pub username: String,
    pub password: String,
}

/// Credentials for an optional database-backed user store, mirroring
/// `DBConfig`. Not consumed by this crate's auth collaborator yet — see
/// DESIGN.md's Open Question on `UserStore`.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "dbName")]
    pub db_name: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub user: String,
    pub password: String,
}

/// Mirrors `LogConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(rename = "logDir")]
    pub log_dir: PathBuf,
    pub level: String,
}

/// The top-level service configuration, mirroring `ParserConfigs`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(rename = "NGConfigs")]
    pub ng_configs: Vec<NgConfig>,
    #[serde(rename = "dbConfig")]
    pub db_config: Option<DbConfig>,
    #[serde(rename = "logConfig")]
    pub log_config: Option<LogConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database location used by the stock Telebugs docker deployment.
pub const DEFAULT_DATABASE_PATH: &str =
    "/var/lib/docker/volumes/telebugs-data/_data/db/production.sqlite3";

/// Busy timeout applied when the Telebugs app holds a write lock.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "TELEBUGS_DB_PATH";

/// Effective runtime configuration for opening the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// On-disk `config.toml` shape. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

/// Default config file location: `<config_dir>/telebugs-mcp/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("telebugs-mcp/config.toml"))
}

/// Parse a config file. A missing file yields `None`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<FileConfig>(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge the configuration layers.
///
/// Precedence (highest wins): `db_flag` > `env_db_path` > file > defaults.
#[must_use]
pub fn resolve_config(
    db_flag: Option<PathBuf>,
    env_db_path: Option<String>,
    file: Option<FileConfig>,
) -> ServerConfig {
    let file = file.unwrap_or_default();
    let defaults = ServerConfig::default();

    let database_path = db_flag
        .or_else(|| env_db_path.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .or(file.database_path)
        .unwrap_or(defaults.database_path);

    ServerConfig {
        database_path,
        busy_timeout_ms: file.busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
    }
}

/// Load the effective configuration from flags, environment, and file.
///
/// `config_path` overrides the default file location; an explicitly named file
/// must exist.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn load_config(config_path: Option<&Path>, db_flag: Option<PathBuf>) -> Result<ServerConfig> {
    let file = match config_path {
        Some(path) => Some(
            load_file_config(path)?
                .with_context(|| format!("config file {} not found", path.display()))?,
        ),
        None => match default_config_path() {
            Some(path) => load_file_config(&path)?,
            None => None,
        },
    };

    Ok(resolve_config(db_flag, env::var(DB_PATH_ENV).ok(), file))
}

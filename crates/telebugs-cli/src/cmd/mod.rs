pub mod call;
pub mod completions;
pub mod serve;
pub mod tools;

use anyhow::Result;
use std::path::{Path, PathBuf};
use telebugs_core::Store;
use telebugs_core::config::load_config;
use tracing::debug;

/// Resolve configuration layers and open the existing database.
pub fn open_store(config_path: Option<&Path>, db_flag: Option<PathBuf>) -> Result<Store> {
    let config = load_config(config_path, db_flag)?;
    debug!(
        path = %config.database_path.display(),
        busy_timeout_ms = config.busy_timeout_ms,
        "opening store"
    );
    Ok(Store::open(&config)?)
}

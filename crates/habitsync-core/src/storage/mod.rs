mod config;
pub mod cache;
pub mod database;
pub mod state_store;

pub use cache::{CacheSlot, FileSlot, MemorySlot, SqliteSlot, STATE_SLOT_KEY};
pub use config::{AuthConfig, CacheBackend, CloudConfig, Config, StorageConfig, TimingConfig};
pub use database::Database;
pub use state_store::StateStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/habitsync[-dev]/` based on HABITSYNC_ENV.
///
/// Set HABITSYNC_ENV=dev to use the development data directory, or
/// HABITSYNC_DATA_DIR to point somewhere else entirely (tests do this).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HABITSYNC_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HABITSYNC_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitsync-dev")
            } else {
                base_dir.join("habitsync")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

pub mod auth;
pub mod config;
pub mod habit;
pub mod sync;

use std::io::{BufRead, Write};
use std::sync::Arc;

use habitsync_core::storage::{data_dir, CacheBackend};
use habitsync_core::sync::{AutoConfirm, ConfirmOverwrite, LoadingIndicator};
use habitsync_core::{CacheSlot, Config, CoreError, FileSlot, HttpTransport, SqliteSlot, StateStore, SyncController};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load config and the cached document, and wire up a controller.
pub fn open_controller(confirm: Box<dyn ConfirmOverwrite>) -> Result<Arc<SyncController>, CoreError> {
    let config = Config::load()?;
    let slot: Box<dyn CacheSlot> = match config.storage.backend {
        CacheBackend::Sqlite => Box::new(SqliteSlot::open_default()?),
        CacheBackend::File => Box::new(FileSlot::new(data_dir()?.join("state.json"))),
    };
    let store = StateStore::load(slot, config.cloud.clone());
    let transport = Arc::new(HttpTransport::new(config.timing.request_timeout()));
    Ok(SyncController::from_config(&config, store, transport, confirm))
}

/// Controller for commands that never need to ask before overwriting.
pub fn open_default_controller() -> Result<Arc<SyncController>, CoreError> {
    open_controller(Box::new(AutoConfirm(false)))
}

/// Upload anything an edit left pending, reporting on stderr if it fails.
pub async fn flush_or_warn(controller: &SyncController) {
    if !controller.flush().await {
        eprintln!("sync pending: {}", controller.message());
    }
}

/// Asks on stderr and reads the answer from stdin.
pub struct StdinConfirm;

impl ConfirmOverwrite for StdinConfirm {
    fn confirm_replace(&self) -> bool {
        tokio::task::block_in_place(|| {
            eprint!("Replace local data with cloud data? [y/N] ");
            let _ = std::io::stderr().flush();
            let mut answer = String::new();
            if std::io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            is_yes(&answer)
        })
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prints the startup message on stderr.
pub struct StderrIndicator;

impl LoadingIndicator for StderrIndicator {
    fn show(&self, message: &str) {
        eprintln!("{message}");
    }

    fn hide(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }
}

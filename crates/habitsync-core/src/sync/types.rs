//! Core types for the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::transport::TransportError;

/// Connection state shown next to the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Sync disabled or not configured.
    #[default]
    Local,
    Syncing,
    Synced,
    /// Sync usable but the last exchange did not go through.
    Offline,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Offline => "offline",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent pull attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullReason {
    #[default]
    None,
    MissingConfig,
    Busy,
    Dirty,
    Empty,
    NeedsManualPush,
    UpToDate,
    LocalChangesPending,
    Cancelled,
    Pulled,
    Error,
}

impl PullReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullReason::None => "none",
            PullReason::MissingConfig => "missing_config",
            PullReason::Busy => "busy",
            PullReason::Dirty => "dirty",
            PullReason::Empty => "empty",
            PullReason::NeedsManualPush => "needs_manual_push",
            PullReason::UpToDate => "up_to_date",
            PullReason::LocalChangesPending => "local_changes_pending",
            PullReason::Cancelled => "cancelled",
            PullReason::Pulled => "pulled",
            PullReason::Error => "error",
        }
    }
}

impl fmt::Display for PullReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for the pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullMode {
    /// The user asked; overwriting local data needs confirmation.
    Interactive,
    /// Ticker or startup; never prompts.
    #[default]
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PullOptions {
    pub mode: PullMode,
    /// Accept the remote document even when it is not newer.
    pub force: bool,
    /// Skip the pull entirely while local edits are waiting to upload.
    pub skip_if_dirty: bool,
}

impl PullOptions {
    pub fn interactive() -> Self {
        Self {
            mode: PullMode::Interactive,
            ..Self::default()
        }
    }

    pub fn background() -> Self {
        Self::default()
    }

    /// Options used by each ticker firing.
    pub fn tick() -> Self {
        Self {
            skip_if_dirty: true,
            ..Self::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Why a push was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushReason {
    /// Timer-driven upload of pending edits.
    #[default]
    Auto,
    /// Explicit request, or seeding an empty remote.
    Manual,
}

/// Why a push is being scheduled. Each trigger has its own delay and
/// status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTrigger {
    /// Local edit; the coalescing window.
    Edit,
    /// Another network operation was in flight.
    Contention,
    /// The previous push failed.
    Failure,
}

impl PushTrigger {
    pub fn message(&self) -> &'static str {
        match self {
            PushTrigger::Edit => "Sync queued",
            PushTrigger::Contention => "Sync waiting...",
            PushTrigger::Failure => "Retrying sync...",
        }
    }
}

/// Status and message plus the last pull outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub status: SyncStatus,
    pub message: String,
    pub last_pull_reason: PullReason,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            status: SyncStatus::Local,
            message: "Local only".to_string(),
            last_pull_reason: PullReason::None,
        }
    }
}

/// Point-in-time view of the controller, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub message: String,
    pub last_pull_reason: PullReason,
    pub enabled: bool,
    pub endpoint_url: String,
    pub user_id: String,
    pub last_synced_at: String,
    pub identity: String,
    pub signed_in: bool,
    pub in_flight: bool,
    pub has_local_changes: bool,
    pub push_pending: bool,
    pub ticker_running: bool,
}

/// Failure of an orchestrated operation, before it becomes status text.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SyncError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Transport(e) if e.is_unauthorized())
    }
}

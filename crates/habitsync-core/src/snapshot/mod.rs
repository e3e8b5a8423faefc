//! The habit document and its sync configuration.
//!
//! A [`Snapshot`] is the unit of synchronization: the remote store keeps
//! exactly one of them per user and the client replaces its local copy
//! wholesale when it accepts a pull.

mod defaults;
mod normalize;
mod payload;

pub use defaults::{seed_habits, DEFAULT_COLOR, HABIT_COLOR_PALETTE};
pub use normalize::{normalize, normalize_endpoint_url, normalize_user_id};
pub use payload::{CloudPayload, PayloadSyncConfig};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::auth::AuthState;
use crate::storage::CloudConfig;

/// Date key (`YYYY-MM-DD`) → entry.
pub type EntriesByDate = BTreeMap<String, Entry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarMode {
    #[default]
    Daily,
    Analytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Week,
    Month,
}

/// A tracked habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub target_per_week: u8,
    /// Weekdays with Sunday = 0, sorted and unique.
    pub scheduled_days: Vec<u8>,
    pub archived: bool,
}

/// One habit on one day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entry {
    /// True when nothing but the completion flag carries information.
    pub fn is_bare(&self) -> bool {
        self.note.is_empty() && self.duration.is_none() && self.intensity.is_none()
    }
}

/// Sync settings embedded in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub enabled: bool,
    #[serde(alias = "webAppUrl")]
    pub endpoint_url: String,
    pub user_id: String,
    /// ISO-8601 instant of the last successful exchange, empty if never.
    pub last_synced_at: String,
    /// Local edits not yet confirmed by the remote. Device-local; survives
    /// restarts so a later run still uploads them.
    #[serde(default)]
    pub pending_push: bool,
}

impl SyncConfig {
    pub fn from_boot(cloud: &CloudConfig) -> Self {
        Self {
            enabled: cloud.enabled,
            endpoint_url: normalize_endpoint_url(&cloud.endpoint_url),
            user_id: normalize_user_id(&cloud.user_id),
            last_synced_at: String::new(),
            pending_push: false,
        }
    }

    pub fn has_synced(&self) -> bool {
        !self.last_synced_at.is_empty()
    }
}

/// The full application document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub sidebar_mode: SidebarMode,
    pub view_mode: ViewMode,
    pub habits: Vec<Habit>,
    /// Habit id → date key → entry.
    pub entries: BTreeMap<String, EntriesByDate>,
    /// Date key → free text.
    pub day_notes: BTreeMap<String, String>,
    pub cloud: SyncConfig,
    pub auth: AuthState,
}

impl Snapshot {
    /// The built-in document used when nothing usable is cached.
    pub fn seed(boot: &CloudConfig) -> Self {
        let habits = seed_habits();
        let entries = habits
            .iter()
            .map(|habit| (habit.id.clone(), EntriesByDate::new()))
            .collect();

        Self {
            version: 1,
            sidebar_mode: SidebarMode::Daily,
            view_mode: ViewMode::Week,
            habits,
            entries,
            day_notes: BTreeMap::new(),
            cloud: SyncConfig::from_boot(boot),
            auth: AuthState::from_credential(boot.credential.trim()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current instant in the ISO-8601 form used for every document timestamp.
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

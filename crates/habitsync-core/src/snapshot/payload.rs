use serde::Serialize;
use std::collections::BTreeMap;

use super::{EntriesByDate, Habit, SidebarMode, Snapshot, ViewMode};

/// The part of [`super::SyncConfig`] that is shared with the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadSyncConfig {
    pub enabled: bool,
    pub user_id: String,
    pub last_synced_at: String,
}

/// The document as it is sent to the remote store.
///
/// There is no auth field and no endpoint: the credential travels only in
/// the request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudPayload {
    pub version: u32,
    pub sidebar_mode: SidebarMode,
    pub view_mode: ViewMode,
    pub habits: Vec<Habit>,
    pub entries: BTreeMap<String, EntriesByDate>,
    pub day_notes: BTreeMap<String, String>,
    pub cloud: PayloadSyncConfig,
}

impl From<&Snapshot> for CloudPayload {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            version: snapshot.version,
            sidebar_mode: snapshot.sidebar_mode,
            view_mode: snapshot.view_mode,
            habits: snapshot.habits.clone(),
            entries: snapshot.entries.clone(),
            day_notes: snapshot.day_notes.clone(),
            cloud: PayloadSyncConfig {
                enabled: snapshot.cloud.enabled,
                user_id: snapshot.cloud.user_id.clone(),
                last_synced_at: snapshot.cloud.last_synced_at.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::storage::CloudConfig;

    #[test]
    fn payload_never_carries_the_credential() {
        let mut snap = Snapshot::seed(&CloudConfig::default());
        snap.cloud.endpoint_url = "https://example.com/exec".into();
        snap.auth = AuthState::from_credential("header.secret-payload.signature");
        snap.cloud.pending_push = true;

        let json = serde_json::to_string(&CloudPayload::from(&snap)).unwrap();
        assert!(!json.contains("secret-payload"));
        assert!(!json.contains("credential"));
        assert!(!json.contains("endpointUrl"));
        assert!(!json.contains("pendingPush"));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("auth").is_none());
        assert_eq!(value["cloud"]["userId"], "default");
    }

    #[test]
    fn payload_normalizes_back_into_the_same_document() {
        let snap = Snapshot::seed(&CloudConfig::default());
        let value = serde_json::to_value(CloudPayload::from(&snap)).unwrap();
        let back = super::super::normalize(&value, &CloudConfig::default());
        assert_eq!(back.habits, snap.habits);
        assert_eq!(back.entries, snap.entries);
    }
}

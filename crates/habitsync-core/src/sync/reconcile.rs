//! Pull arbitration.
//!
//! [`decide`] is a pure function of what the client knows locally and what
//! the remote returned. Timestamps are ISO-8601 strings in one canonical UTC
//! form, so lexicographic order is chronological order.

use crate::snapshot::{iso_now, Snapshot};

use super::types::{PullMode, PullReason};

/// Local side of the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalView<'a> {
    pub last_synced_at: &'a str,
    pub has_local_changes: bool,
    pub has_meaningful_data: bool,
}

/// Remote side of the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteView<'a> {
    pub updated_at: &'a str,
    pub snapshot_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    NeedsManualPush,
    UpToDate,
    LocalChangesPending,
}

impl From<RejectReason> for PullReason {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::Empty => PullReason::Empty,
            RejectReason::NeedsManualPush => PullReason::NeedsManualPush,
            RejectReason::UpToDate => PullReason::UpToDate,
            RejectReason::LocalChangesPending => PullReason::LocalChangesPending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
    /// Interactive pull; apply only after the user confirms.
    AskUser,
}

/// Whether the remote copy should be considered newer than ours.
pub fn is_remote_newer(local_synced_at: &str, remote_updated_at: &str, force: bool) -> bool {
    force || local_synced_at.is_empty() || remote_updated_at.is_empty() || remote_updated_at > local_synced_at
}

pub fn decide(local: &LocalView<'_>, remote: &RemoteView<'_>, mode: PullMode, force: bool) -> Decision {
    let background = mode == PullMode::Background;

    if !remote.snapshot_present {
        return Decision::Reject(RejectReason::Empty);
    }

    // Never let an unsynced device's first background pull erase its data.
    if background && local.last_synced_at.is_empty() && local.has_meaningful_data && !force {
        return Decision::Reject(RejectReason::NeedsManualPush);
    }

    if !is_remote_newer(local.last_synced_at, remote.updated_at, force) {
        return Decision::Reject(RejectReason::UpToDate);
    }

    if background && local.has_local_changes {
        return Decision::Reject(RejectReason::LocalChangesPending);
    }

    if !background {
        return Decision::AskUser;
    }
    Decision::Accept
}

/// The later of two sync timestamps. Empty means never.
pub fn advance_timestamp(current: &str, candidate: &str) -> String {
    if candidate > current {
        candidate.to_string()
    } else {
        current.to_string()
    }
}

/// Build the document that replaces ours after an accepted pull.
///
/// Device-local settings (sync switch, endpoint, user id, credentials)
/// come from `local`; everything else from `remote`. Nothing is pending
/// afterwards.
pub fn reattach_local(mut remote: Snapshot, local: &Snapshot, remote_updated_at: &str) -> Snapshot {
    let candidate = if remote_updated_at.is_empty() {
        iso_now()
    } else {
        remote_updated_at.to_string()
    };

    remote.cloud.enabled = local.cloud.enabled;
    remote.cloud.endpoint_url = local.cloud.endpoint_url.clone();
    remote.cloud.user_id = local.cloud.user_id.clone();
    remote.cloud.last_synced_at = advance_timestamp(&local.cloud.last_synced_at, &candidate);
    remote.cloud.pending_push = false;
    remote.auth = local.auth.clone();
    remote
}

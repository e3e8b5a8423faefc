//! The sync state machine.
//!
//! [`SyncController`] owns the document store, the credential gate and the
//! runtime flags, and sequences the transport, the reconciliation policy,
//! the push scheduler and the pull ticker into user-facing operations.
//!
//! Every operation reports success as a `bool` and records what happened in
//! the status/message pair; none of them return errors. At most one network
//! call is in flight at any time.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::auth::{AuthError, AuthGate};
use crate::habits;
use crate::snapshot::{iso_now, normalize_endpoint_url, normalize_user_id, CloudPayload, Snapshot};
use crate::storage::{Config, StateStore, TimingConfig};

use super::hooks::{ConfirmOverwrite, LoadingIndicator};
use super::pull_ticker::PullTicker;
use super::push_scheduler::PushScheduler;
use super::reconcile::{advance_timestamp, decide, reattach_local, Decision, LocalView, RejectReason, RemoteView};
use super::single_flight::SingleFlight;
use super::transport::{Action, Envelope, Reply, Transport};
use super::types::{
    PullOptions, PullReason, PushReason, PushTrigger, RuntimeFlags, SyncError, SyncReport, SyncStatus,
};

/// How startup went.
#[derive(Debug)]
pub enum Startup {
    /// Sync is switched off.
    LocalOnly,
    /// Sync is on but the endpoint or credential is missing.
    MissingConfig,
    /// The startup pull finished inside the wait window.
    Settled(bool),
    /// The wait window elapsed; the startup pull keeps running.
    TimedOut(JoinHandle<bool>),
}

pub struct SyncController {
    this: Weak<SyncController>,
    store: StateStore,
    auth: AuthGate,
    transport: Arc<dyn Transport>,
    confirm: Box<dyn ConfirmOverwrite>,
    timing: TimingConfig,
    flight: SingleFlight,
    push: PushScheduler,
    ticker: PullTicker,
    flags: Mutex<RuntimeFlags>,
}

impl SyncController {
    pub fn new(
        store: StateStore,
        auth: AuthGate,
        transport: Arc<dyn Transport>,
        confirm: Box<dyn ConfirmOverwrite>,
        timing: TimingConfig,
    ) -> Arc<Self> {
        let push = PushScheduler::new();
        if store.read(|snapshot| snapshot.cloud.pending_push) {
            tracing::info!("unsynced edits from a previous run");
            push.mark_dirty();
        }
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            store,
            auth,
            transport,
            confirm,
            timing,
            flight: SingleFlight::new(),
            push,
            ticker: PullTicker::new(),
            flags: Mutex::new(RuntimeFlags::default()),
        })
    }

    pub fn from_config(
        config: &Config,
        store: StateStore,
        transport: Arc<dyn Transport>,
        confirm: Box<dyn ConfirmOverwrite>,
    ) -> Arc<Self> {
        Self::new(
            store,
            AuthGate::from_config(&config.auth),
            transport,
            confirm,
            config.timing.clone(),
        )
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn status(&self) -> SyncStatus {
        self.flags.lock().status
    }

    pub fn message(&self) -> String {
        self.flags.lock().message.clone()
    }

    pub fn last_pull_reason(&self) -> PullReason {
        self.flags.lock().last_pull_reason
    }

    pub fn has_local_changes(&self) -> bool {
        self.push.is_dirty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn is_push_pending(&self) -> bool {
        self.push.is_pending()
    }

    pub fn is_ticker_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn report(&self) -> SyncReport {
        let flags = self.flags.lock().clone();
        self.store.read(|snapshot| SyncReport {
            status: flags.status,
            message: flags.message,
            last_pull_reason: flags.last_pull_reason,
            enabled: snapshot.cloud.enabled,
            endpoint_url: snapshot.cloud.endpoint_url.clone(),
            user_id: snapshot.cloud.user_id.clone(),
            last_synced_at: snapshot.cloud.last_synced_at.clone(),
            identity: snapshot.auth.identity.clone(),
            signed_in: self.auth.is_signed_in(&snapshot.auth),
            in_flight: self.flight.is_busy(),
            has_local_changes: self.push.is_dirty(),
            push_pending: self.push.is_pending(),
            ticker_running: self.ticker.is_running(),
        })
    }

    fn set_status(&self, status: SyncStatus, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%status, %message, "sync status");
        let mut flags = self.flags.lock();
        flags.status = status;
        flags.message = message;
    }

    fn set_pull_reason(&self, reason: PullReason) {
        tracing::debug!(%reason, "pull outcome");
        self.flags.lock().last_pull_reason = reason;
    }

    fn is_enabled(&self) -> bool {
        self.store.read(|snapshot| snapshot.cloud.enabled)
    }

    /// Enabled, endpoint present, credential valid and allowed.
    ///
    /// A stored credential that fails the check is purged here, so no
    /// request is ever sent with it.
    pub fn can_use_sync(&self) -> bool {
        let (configured, signed_in, stale) = self.store.read(|snapshot| {
            let signed_in = self.auth.is_signed_in(&snapshot.auth);
            (
                snapshot.cloud.enabled && !snapshot.cloud.endpoint_url.is_empty(),
                signed_in,
                snapshot.auth.has_credential() && !signed_in,
            )
        });
        if stale {
            self.store.mutate_local(|snapshot| self.auth.purge_if_invalid(&mut snapshot.auth));
        }
        configured && signed_in
    }

    fn request_target(&self) -> (String, Envelope) {
        self.store.read(|snapshot| {
            (
                snapshot.cloud.endpoint_url.clone(),
                Envelope::new(snapshot.auth.credential.clone(), snapshot.cloud.user_id.clone()),
            )
        })
    }

    async fn call(&self, action: Action) -> Result<Reply, SyncError> {
        let (endpoint, envelope) = self.request_target();
        if endpoint.is_empty() {
            return Err(SyncError::Config("Missing cloud endpoint".into()));
        }
        let envelope = match action {
            Action::Push => {
                let payload = self.store.read(|snapshot| CloudPayload::from(snapshot));
                envelope.with_state(payload, iso_now())
            }
            Action::Ping | Action::Pull => envelope,
        };
        let reply = self.transport.call(&endpoint, action, &envelope).await?;
        Ok(reply)
    }

    /// A remote rejection of the credential signs the user out.
    fn handle_failure(&self, err: &SyncError) {
        if err.is_unauthorized() {
            tracing::warn!("remote rejected the credential, signing out");
            self.sign_out();
        }
    }

    /// Round-trip a `ping` to check endpoint and credential.
    pub async fn test_connection(&self) -> bool {
        if !self.can_use_sync() {
            self.set_status(SyncStatus::Error, "Missing URL or credential");
            return false;
        }
        let Some(_permit) = self.flight.try_acquire() else {
            return false;
        };

        self.set_status(SyncStatus::Syncing, "Testing...");
        match self.call(Action::Ping).await {
            Ok(_) => {
                tracing::info!("cloud connection verified");
                self.set_status(SyncStatus::Synced, "Cloud connected");
                true
            }
            Err(e) => {
                self.handle_failure(&e);
                self.set_status(SyncStatus::Error, format!("Test failed: {e}"));
                false
            }
        }
    }

    /// Fetch the remote document and replace ours if the policy allows.
    ///
    /// Returns true when the local document is current afterwards (pulled or
    /// already up to date).
    pub async fn pull(&self, options: PullOptions) -> bool {
        if !self.can_use_sync() {
            self.set_pull_reason(PullReason::MissingConfig);
            return false;
        }
        let Some(_permit) = self.flight.try_acquire() else {
            self.set_pull_reason(PullReason::Busy);
            return false;
        };
        if options.skip_if_dirty && self.push.is_dirty() {
            self.set_pull_reason(PullReason::Dirty);
            return false;
        }

        self.set_status(SyncStatus::Syncing, "Pulling...");
        let result = self.call(Action::Pull).await;

        if !self.is_enabled() {
            tracing::debug!("sync disabled during pull, discarding reply");
            self.set_pull_reason(PullReason::Cancelled);
            return false;
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                self.handle_failure(&e);
                self.set_status(SyncStatus::Error, format!("Pull failed: {e}"));
                self.set_pull_reason(PullReason::Error);
                return false;
            }
        };

        let remote_doc = reply.snapshot();
        let decision = self.store.read(|snapshot| {
            let local = LocalView {
                last_synced_at: &snapshot.cloud.last_synced_at,
                has_local_changes: self.push.is_dirty(),
                has_meaningful_data: habits::has_meaningful_data(snapshot),
            };
            let remote = RemoteView {
                updated_at: &reply.updated_at,
                snapshot_present: remote_doc.is_some(),
            };
            decide(&local, &remote, options.mode, options.force)
        });
        tracing::debug!(?decision, mode = ?options.mode, force = options.force, "pull decision");

        match (decision, remote_doc) {
            (Decision::Reject(reason), _) => self.reject_pull(reason),
            (Decision::AskUser, Some(doc)) => {
                if !self.confirm.confirm_replace() {
                    self.set_status(SyncStatus::Local, "Pull cancelled");
                    self.set_pull_reason(PullReason::Cancelled);
                    return false;
                }
                self.apply_remote(doc, &reply.updated_at);
                true
            }
            (Decision::Accept, Some(doc)) => {
                self.apply_remote(doc, &reply.updated_at);
                true
            }
            (Decision::AskUser | Decision::Accept, None) => self.reject_pull(RejectReason::Empty),
        }
    }

    fn reject_pull(&self, reason: RejectReason) -> bool {
        self.set_pull_reason(reason.into());
        match reason {
            RejectReason::Empty => {
                self.set_status(SyncStatus::Local, "Cloud empty");
                false
            }
            RejectReason::NeedsManualPush => {
                self.set_status(SyncStatus::Local, "Cloud connected. Push local data first");
                false
            }
            RejectReason::UpToDate => {
                self.set_status(SyncStatus::Synced, "Already up to date");
                true
            }
            RejectReason::LocalChangesPending => {
                self.schedule_push(PushTrigger::Contention);
                self.set_status(SyncStatus::Offline, "Local changes waiting to upload");
                false
            }
        }
    }

    fn apply_remote(&self, doc: &Value, updated_at: &str) {
        let remote = self.store.normalize_remote(doc);
        let local = self.store.snapshot();
        let next = reattach_local(remote, &local, updated_at);
        let synced_at = next.cloud.last_synced_at.clone();

        self.push.cancel();
        self.push.mark_clean();
        self.store.replace(next);

        tracing::info!(last_synced_at = %synced_at, "pulled from cloud");
        self.set_status(SyncStatus::Synced, "Pulled from cloud");
        self.set_pull_reason(PullReason::Pulled);
    }

    /// Upload the whole document.
    pub async fn push(&self, reason: PushReason) -> bool {
        if !self.can_use_sync() {
            return false;
        }
        let Some(_permit) = self.flight.try_acquire() else {
            self.schedule_push(PushTrigger::Contention);
            return false;
        };

        let message = match reason {
            PushReason::Manual => "Pushing...",
            PushReason::Auto => "Syncing...",
        };
        self.set_status(SyncStatus::Syncing, message);

        let generation = self.push.dirty_generation();
        let result = self.call(Action::Push).await;

        if !self.is_enabled() {
            tracing::debug!("sync disabled during push, discarding reply");
            return false;
        }

        match result {
            Ok(reply) => {
                let candidate = if reply.updated_at.is_empty() {
                    iso_now()
                } else {
                    reply.updated_at
                };
                let (synced_at, clean) = self.store.mutate_local(|snapshot| {
                    snapshot.cloud.last_synced_at = advance_timestamp(&snapshot.cloud.last_synced_at, &candidate);
                    let clean = self.push.mark_clean_if(generation);
                    if clean {
                        snapshot.cloud.pending_push = false;
                    }
                    (snapshot.cloud.last_synced_at.clone(), clean)
                });
                if !clean {
                    tracing::debug!("edits arrived during push, staying dirty");
                }
                tracing::info!(last_synced_at = %synced_at, "pushed to cloud");
                self.set_status(SyncStatus::Synced, "Synced");
                true
            }
            Err(e) if e.is_unauthorized() => {
                self.handle_failure(&e);
                self.set_status(SyncStatus::Error, format!("Push failed: {e}"));
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "push failed, retrying later");
                self.schedule_push(PushTrigger::Failure);
                self.set_status(SyncStatus::Offline, format!("Push pending: {e}"));
                false
            }
        }
    }

    /// Mark the document dirty and (re)arm the push timer.
    ///
    /// No-op while sync is unusable.
    pub fn schedule_push(&self, trigger: PushTrigger) {
        if !self.can_use_sync() {
            return;
        }
        self.push.mark_dirty();
        if !self.store.read(|snapshot| snapshot.cloud.pending_push) {
            self.store.mutate_local(|snapshot| snapshot.cloud.pending_push = true);
        }
        self.set_status(SyncStatus::Syncing, trigger.message());

        let delay = match trigger {
            PushTrigger::Edit => self.timing.debounce(),
            PushTrigger::Contention => self.timing.push_retry(),
            PushTrigger::Failure => self.timing.push_error_retry(),
        };
        let this = self.this.clone();
        self.push.schedule(delay, async move {
            if let Some(controller) = this.upgrade() {
                controller.push(PushReason::Auto).await;
            }
        });
    }

    /// Apply a user edit, persist it and schedule a push.
    pub fn mutate<R>(&self, edit: impl FnOnce(&mut Snapshot) -> R) -> R {
        let result = self.store.mutate(edit);
        self.schedule_push(PushTrigger::Edit);
        result
    }

    /// Like [`Self::mutate`], but only schedules a push when the edit succeeds.
    pub fn try_mutate<T, E>(&self, edit: impl FnOnce(&mut Snapshot) -> Result<T, E>) -> Result<T, E> {
        let result = self.store.mutate(edit)?;
        self.schedule_push(PushTrigger::Edit);
        Ok(result)
    }

    /// Push now if anything is waiting. Returns true when nothing is left
    /// to upload.
    pub async fn flush(&self) -> bool {
        if !self.push.is_dirty() && !self.push.is_pending() {
            return true;
        }
        if !self.can_use_sync() {
            return false;
        }
        self.push.cancel();
        self.push(PushReason::Manual).await
    }

    /// Pull once; seed an empty remote with our document.
    pub async fn bootstrap(&self) -> bool {
        if !self.can_use_sync() {
            return false;
        }
        self.set_status(SyncStatus::Syncing, "Starting cloud sync...");

        let pulled = self.pull(PullOptions::background()).await;
        if !pulled && self.last_pull_reason() == PullReason::Empty {
            self.set_status(SyncStatus::Syncing, "Initializing cloud record...");
            return self.push(PushReason::Manual).await;
        }
        pulled
    }

    /// Startup sequence.
    ///
    /// Starts the pull ticker, then, when sync is usable, shows `indicator`
    /// and runs [`Self::bootstrap`] for at most `boot_max_wait`. The indicator
    /// stays up for at least `boot_min_visible`. A bootstrap that outlives
    /// the wait keeps running and is returned as [`Startup::TimedOut`].
    pub async fn start(self: &Arc<Self>, indicator: &dyn LoadingIndicator) -> Startup {
        self.start_pull_ticker();

        if !self.is_enabled() {
            self.set_status(SyncStatus::Local, "Cloud not configured");
            return Startup::LocalOnly;
        }
        if !self.can_use_sync() {
            self.set_status(SyncStatus::Error, "Missing cloud config");
            return Startup::MissingConfig;
        }

        self.set_status(SyncStatus::Syncing, "Connecting...");
        indicator.show("Loading your latest habits...");
        let shown_at = Instant::now();

        let controller = Arc::clone(self);
        let mut task = tokio::spawn(async move { controller.bootstrap().await });
        let outcome = match tokio::time::timeout(self.timing.boot_max_wait(), &mut task).await {
            Ok(joined) => Startup::Settled(joined.unwrap_or(false)),
            Err(_) => {
                tracing::warn!("startup pull still running, continuing with local data");
                Startup::TimedOut(task)
            }
        };

        tokio::time::sleep_until(shown_at + self.timing.boot_min_visible()).await;
        indicator.hide();
        outcome
    }

    /// (Re)start the background pull ticker.
    pub fn start_pull_ticker(&self) {
        let this = self.this.clone();
        self.ticker.start(self.timing.pull_interval(), move || {
            let this = this.clone();
            async move {
                let Some(controller) = this.upgrade() else {
                    return false;
                };
                if controller.can_use_sync() {
                    controller.pull(PullOptions::tick()).await;
                }
                true
            }
        });
    }

    pub fn stop_pull_ticker(&self) {
        self.ticker.stop();
    }

    fn clear_timers(&self) {
        self.push.cancel();
        self.ticker.stop();
    }

    /// Switch sync on or off.
    ///
    /// Turning it off cancels both timers and forgets pending changes; a
    /// request already in flight completes but its result is discarded.
    pub fn set_enabled(&self, enabled: bool) {
        self.store.mutate_local(|snapshot| {
            snapshot.cloud.enabled = enabled;
            if !enabled {
                snapshot.cloud.pending_push = false;
            }
        });
        if enabled {
            self.start_pull_ticker();
            self.set_status(SyncStatus::Local, "Cloud enabled, save config");
        } else {
            self.clear_timers();
            self.push.mark_clean();
            self.set_status(SyncStatus::Local, "Local only");
        }
        tracing::info!(enabled, "cloud sync toggled");
    }

    /// Store endpoint and user id, then bootstrap right away.
    pub async fn save_config(&self, endpoint_url: &str, user_id: &str) -> bool {
        let endpoint_url = normalize_endpoint_url(endpoint_url);
        let user_id = normalize_user_id(user_id);
        self.store.mutate_local(|snapshot| {
            snapshot.cloud.endpoint_url = endpoint_url;
            snapshot.cloud.user_id = user_id;
        });

        if !self.can_use_sync() {
            self.set_status(SyncStatus::Error, "Missing URL or credential");
            return false;
        }
        self.set_status(SyncStatus::Local, "Config saved");
        self.bootstrap().await
    }

    /// Accept a credential. A rejected one is not stored.
    pub fn sign_in(&self, raw: &str) -> Result<(), AuthError> {
        let state = self.auth.sign_in(raw)?;
        self.store.mutate_local(|snapshot| snapshot.auth = state);
        if self.is_enabled() {
            self.start_pull_ticker();
        }
        Ok(())
    }

    /// Drop the credential and cancel both timers.
    pub fn sign_out(&self) {
        self.store.mutate_local(|snapshot| snapshot.auth = self.auth.sign_out());
        self.clear_timers();
        tracing::info!("signed out");
        self.set_status(SyncStatus::Local, "Signed out");
    }

    pub fn is_signed_in(&self) -> bool {
        self.store.read(|snapshot| self.auth.is_signed_in(&snapshot.auth))
    }
}

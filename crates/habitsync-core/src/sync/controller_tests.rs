//! Tests for the sync controller. Timer behavior runs on paused tokio time.

#[cfg(test)]
mod tests {
    use super::super::controller::*;
    use super::super::hooks::{AutoConfirm, LoadingIndicator, NoopIndicator};
    use super::super::transport::{Action, MockTransport, Reply, TransportError};
    use super::super::types::*;
    use crate::auth::{unsigned_token, AuthGate, AuthState};
    use crate::habits;
    use crate::snapshot::{CloudPayload, Snapshot};
    use crate::storage::{CloudConfig, MemorySlot, StateStore, TimingConfig};
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    const ENDPOINT: &str = "https://sync.example.com/exec";

    fn credential(valid_for: chrono::Duration) -> String {
        unsigned_token(&json!({
            "email": "ada@example.com",
            "exp": (Utc::now() + valid_for).timestamp(),
        }))
    }

    fn configured() -> Snapshot {
        let mut snap = Snapshot::seed(&CloudConfig::default());
        snap.cloud.enabled = true;
        snap.cloud.endpoint_url = ENDPOINT.into();
        snap.cloud.user_id = "ada".into();
        snap.auth = AuthState::from_credential(&credential(chrono::Duration::hours(1)));
        snap
    }

    fn controller_with(snap: &Snapshot, mock: &Arc<MockTransport>, confirm: bool) -> Arc<SyncController> {
        let slot = MemorySlot::with_value(snap.to_json().unwrap());
        let store = StateStore::load(slot, CloudConfig::default());
        SyncController::new(
            store,
            AuthGate::default(),
            mock.clone(),
            Box::new(AutoConfirm(confirm)),
            TimingConfig::default(),
        )
    }

    fn controller(snap: &Snapshot, mock: &Arc<MockTransport>) -> Arc<SyncController> {
        controller_with(snap, mock, true)
    }

    fn remote_doc(habit_count: usize) -> Value {
        let mut snap = Snapshot::seed(&CloudConfig::default());
        snap.habits.truncate(habit_count);
        serde_json::to_value(CloudPayload::from(&snap)).unwrap()
    }

    fn synced_at(snap: &mut Snapshot, stamp: &str) {
        snap.cloud.last_synced_at = stamp.into();
    }

    // =========================================================================
    // push scheduling
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn two_edits_inside_window_produce_one_push_with_both() {
        let mock = Arc::new(MockTransport::new());
        let ctl = controller(&configured(), &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));
        assert_eq!(ctl.message(), "Sync queued");
        sleep(Duration::from_millis(100)).await;
        ctl.mutate(|s| habits::set_day_note(s, "2024-03-01", "slept well"));

        sleep(Duration::from_millis(449)).await;
        assert_eq!(mock.call_count(), 0);
        assert!(ctl.has_local_changes());

        sleep(Duration::from_millis(2)).await;
        let pushes = mock.calls_for(Action::Push);
        assert_eq!(pushes.len(), 1);

        let payload = pushes[0].envelope.state.as_ref().unwrap();
        assert!(payload.entries["habit_sleep"]["2024-03-01"].completed);
        assert_eq!(payload.day_notes["2024-03-01"], "slept well");
        assert!(pushes[0].envelope.client_updated_at.is_some());

        assert!(!ctl.has_local_changes());
        assert_eq!(ctl.status(), SyncStatus::Synced);
        assert!(ctl.snapshot().cloud.has_synced());
    }

    #[tokio::test(start_paused = true)]
    async fn edits_while_disabled_stay_local() {
        let mock = Arc::new(MockTransport::new());
        let mut snap = configured();
        snap.cloud.enabled = false;
        let ctl = controller(&snap, &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));
        sleep(Duration::from_secs(2)).await;
        assert_eq!(mock.call_count(), 0);
        assert!(!ctl.has_local_changes());
        assert!(habits::is_completed(&ctl.snapshot(), "habit_sleep", "2024-03-01"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_retries_after_error_delay() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Network("connection reset".into())));
        let ctl = controller(&configured(), &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_plan", "2024-03-01"));
        sleep(Duration::from_millis(451)).await;
        assert_eq!(mock.call_count(), 1);
        assert_eq!(ctl.status(), SyncStatus::Offline);
        assert!(ctl.message().starts_with("Push pending:"));
        assert!(ctl.has_local_changes());
        assert!(ctl.is_push_pending());

        sleep(Duration::from_millis(14_900)).await;
        assert_eq!(mock.call_count(), 1);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(mock.call_count(), 2);
        assert_eq!(ctl.status(), SyncStatus::Synced);
        assert!(!ctl.has_local_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn push_during_flight_waits_for_contention_delay() {
        let mock = Arc::new(MockTransport::new());
        mock.set_latency(Duration::from_secs(5));
        let ctl = controller(&configured(), &mock);

        let tester = Arc::clone(&ctl);
        let ping = tokio::spawn(async move { tester.test_connection().await });
        sleep(Duration::from_millis(10)).await;
        assert!(ctl.is_in_flight());

        assert!(!ctl.push(PushReason::Manual).await);
        assert_eq!(ctl.message(), "Sync waiting...");
        assert!(ctl.is_push_pending());

        assert!(ping.await.unwrap());
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(mock.calls_for(Action::Push).len(), 1);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(ctl.status(), SyncStatus::Synced);
        assert!(!ctl.has_local_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_push_signs_out_without_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Unauthorized("Unauthorized".into())));
        let ctl = controller(&configured(), &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_plan", "2024-03-01"));
        sleep(Duration::from_millis(500)).await;
        assert_eq!(mock.call_count(), 1);
        assert!(!ctl.is_signed_in());
        assert!(!ctl.snapshot().auth.has_credential());
        assert_eq!(ctl.status(), SyncStatus::Error);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(mock.call_count(), 1);
        assert!(!ctl.is_push_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_pull_signs_out_and_stops_ticker() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Unauthorized("Unauthorized".into())));
        let ctl = controller(&configured(), &mock);
        ctl.start_pull_ticker();
        assert!(ctl.is_ticker_running());

        assert!(!ctl.pull(PullOptions::interactive()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::Error);
        assert_eq!(ctl.status(), SyncStatus::Error);
        assert!(!ctl.is_signed_in());
        assert!(!ctl.snapshot().auth.has_credential());
        assert!(!ctl.is_ticker_running());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_test_connection_signs_out_and_stops_ticker() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Unauthorized("HTTP 401".into())));
        let ctl = controller(&configured(), &mock);
        ctl.start_pull_ticker();

        assert!(!ctl.test_connection().await);
        assert!(ctl.message().starts_with("Test failed:"));
        assert!(!ctl.is_signed_in());
        assert!(!ctl.snapshot().auth.has_credential());
        assert!(!ctl.is_ticker_running());

        sleep(Duration::from_secs(120)).await;
        assert_eq!(mock.call_count(), 1);
    }

    // =========================================================================
    // pending edits across restarts
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn failed_push_keeps_pending_marker_for_next_run() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Network("offline".into())));
        let ctl = controller(&configured(), &mock);

        ctl.mutate(|s| habits::set_day_note(s, "2024-03-01", "rainy"));
        assert!(ctl.snapshot().cloud.pending_push);
        assert!(!ctl.flush().await);
        let persisted = ctl.snapshot();
        assert!(persisted.cloud.pending_push);

        let next_run = controller(&persisted, &mock);
        assert!(next_run.has_local_changes());
        assert!(next_run.flush().await);
        let pushes = mock.calls_for(Action::Push);
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].envelope.state.as_ref().unwrap().day_notes["2024-03-01"], "rainy");
        assert!(!next_run.has_local_changes());
        assert!(!next_run.snapshot().cloud.pending_push);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_marker_blocks_background_pull_from_newer_remote() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(3), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        habits::set_day_note(&mut snap, "2024-03-01", "rainy");
        snap.cloud.pending_push = true;
        let ctl = controller(&snap, &mock);

        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::LocalChangesPending);
        assert_eq!(ctl.snapshot().day_notes["2024-03-01"], "rainy");
        assert_eq!(ctl.snapshot().habits.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_pull_and_disable_clear_pending_marker() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(3), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        snap.cloud.pending_push = true;

        let ctl = controller(&snap, &mock);
        assert!(ctl.pull(PullOptions::interactive().forced()).await);
        assert!(!ctl.snapshot().cloud.pending_push);

        let ctl = controller(&snap, &mock);
        ctl.set_enabled(false);
        assert!(!ctl.has_local_changes());
        assert!(!ctl.snapshot().cloud.pending_push);
    }

    #[tokio::test(start_paused = true)]
    async fn push_never_moves_last_synced_at_backward() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_updated_at("2024-01-01T00:00:00.000Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-05-01T00:00:00.000Z");
        let ctl = controller(&snap, &mock);

        assert!(ctl.push(PushReason::Manual).await);
        assert_eq!(ctl.snapshot().cloud.last_synced_at, "2024-05-01T00:00:00.000Z");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_pushes_pending_edits_now() {
        let mock = Arc::new(MockTransport::new());
        let ctl = controller(&configured(), &mock);

        assert!(ctl.flush().await);
        assert_eq!(mock.call_count(), 0);

        ctl.mutate(|s| habits::set_day_note(s, "2024-03-02", "rest day"));
        assert!(ctl.flush().await);
        assert_eq!(mock.calls_for(Action::Push).len(), 1);
        assert!(!ctl.is_push_pending());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(mock.call_count(), 1);
    }

    // =========================================================================
    // pull arbitration
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn background_pull_accepts_newer_remote() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(3), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        let ctl = controller(&snap, &mock);

        assert!(ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::Pulled);
        assert_eq!(ctl.message(), "Pulled from cloud");

        let after = ctl.snapshot();
        assert_eq!(after.habits.len(), 3);
        assert_eq!(after.cloud.last_synced_at, "2024-01-02T00:00:00Z");
        assert_eq!(after.cloud.endpoint_url, ENDPOINT);
        assert_eq!(after.cloud.user_id, "ada");
        assert_eq!(after.auth, snap.auth);
        assert_eq!(mock.calls()[0].envelope.user_id, "ada");
    }

    #[tokio::test(start_paused = true)]
    async fn pull_not_newer_is_up_to_date() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(3), "2024-01-01T00:00:00Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        let ctl = controller(&snap, &mock);

        assert!(ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::UpToDate);
        assert_eq!(ctl.message(), "Already up to date");
        assert_eq!(ctl.snapshot().habits.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn background_pull_with_local_changes_schedules_retry_push() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(3), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        let ctl = controller(&snap, &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));
        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::LocalChangesPending);
        assert_eq!(ctl.status(), SyncStatus::Offline);
        assert_eq!(ctl.snapshot().habits.len(), 10);
        assert!(ctl.is_push_pending());

        sleep(Duration::from_millis(1_000)).await;
        assert!(mock.calls_for(Action::Push).is_empty());
        sleep(Duration::from_millis(500)).await;
        assert_eq!(mock.calls_for(Action::Push).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_pull_skips_while_dirty() {
        let mock = Arc::new(MockTransport::new());
        let ctl = controller(&configured(), &mock);

        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));
        assert!(!ctl.pull(PullOptions::tick()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::Dirty);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_while_busy_is_skipped() {
        let mock = Arc::new(MockTransport::new());
        mock.set_latency(Duration::from_secs(3));
        let ctl = controller(&configured(), &mock);

        let tester = Arc::clone(&ctl);
        let ping = tokio::spawn(async move { tester.test_connection().await });
        sleep(Duration::from_millis(10)).await;

        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::Busy);
        assert!(!ctl.test_connection().await);
        assert!(ping.await.unwrap());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interactive_pull_respects_the_answer() {
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");

        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(2), "2024-01-02T00:00:00Z")));
        let declined = controller_with(&snap, &mock, false);
        assert!(!declined.pull(PullOptions::interactive()).await);
        assert_eq!(declined.last_pull_reason(), PullReason::Cancelled);
        assert_eq!(declined.message(), "Pull cancelled");
        assert_eq!(declined.snapshot().habits.len(), 10);

        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(2), "2024-01-02T00:00:00Z")));
        let accepted = controller_with(&snap, &mock, true);
        assert!(accepted.pull(PullOptions::interactive()).await);
        assert_eq!(accepted.snapshot().habits.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unsynced_device_with_data_is_not_overwritten() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(2), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        habits::set_day_note(&mut snap, "2024-03-01", "keep me");
        let ctl = controller(&snap, &mock);

        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::NeedsManualPush);
        assert_eq!(ctl.message(), "Cloud connected. Push local data first");
        assert_eq!(ctl.snapshot().day_notes["2024-03-01"], "keep me");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pull_reports_error() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Err(TransportError::Protocol("not json".into())));
        let ctl = controller(&configured(), &mock);

        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::Error);
        assert_eq!(ctl.status(), SyncStatus::Error);
        assert!(ctl.message().starts_with("Pull failed:"));
        assert!(ctl.is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_credential_is_purged_before_any_request() {
        let mock = Arc::new(MockTransport::new());
        let mut snap = configured();
        snap.auth = AuthState::from_credential(&credential(chrono::Duration::seconds(-1)));
        let ctl = controller(&snap, &mock);

        assert!(!ctl.pull(PullOptions::background()).await);
        assert_eq!(ctl.last_pull_reason(), PullReason::MissingConfig);
        assert!(!ctl.snapshot().auth.has_credential());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_discards_in_flight_pull() {
        let mock = Arc::new(MockTransport::new());
        mock.set_latency(Duration::from_secs(1));
        mock.enqueue(Ok(Reply::with_state(remote_doc(2), "2024-01-02T00:00:00Z")));
        let ctl = controller(&configured(), &mock);

        let puller = Arc::clone(&ctl);
        let pull = tokio::spawn(async move { puller.pull(PullOptions::background().forced()).await });
        sleep(Duration::from_millis(10)).await;
        ctl.set_enabled(false);

        assert!(!pull.await.unwrap());
        assert_eq!(ctl.last_pull_reason(), PullReason::Cancelled);
        assert_eq!(ctl.snapshot().habits.len(), 10);
        assert_eq!(ctl.status(), SyncStatus::Local);
        assert_eq!(ctl.message(), "Local only");
    }

    // =========================================================================
    // startup and lifecycle
    // =========================================================================

    #[derive(Default)]
    struct RecordingIndicator {
        events: Mutex<Vec<(&'static str, Instant)>>,
    }

    impl LoadingIndicator for RecordingIndicator {
        fn show(&self, _message: &str) {
            self.events.lock().push(("show", Instant::now()));
        }

        fn hide(&self) {
            self.events.lock().push(("hide", Instant::now()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_seeds_empty_remote() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::ok()));
        mock.enqueue(Ok(Reply::with_updated_at("2024-03-01T00:00:00.000Z")));
        let ctl = controller(&configured(), &mock);

        assert!(ctl.bootstrap().await);
        let actions: Vec<Action> = mock.calls().iter().map(|call| call.action).collect();
        assert_eq!(actions, vec![Action::Pull, Action::Push]);
        assert_eq!(ctl.snapshot().cloud.last_synced_at, "2024-03-01T00:00:00.000Z");
        assert_eq!(ctl.status(), SyncStatus::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn start_keeps_indicator_up_for_min_visible() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::ok()));
        let ctl = controller(&configured(), &mock);
        let indicator = RecordingIndicator::default();

        let began = Instant::now();
        let outcome = ctl.start(&indicator).await;
        assert!(matches!(outcome, Startup::Settled(true)));

        let events = indicator.events.lock().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0, "hide");
        assert!(events[1].1 - began >= Duration::from_millis(450));
        assert!(ctl.is_ticker_running());
    }

    #[tokio::test(start_paused = true)]
    async fn start_gives_up_waiting_after_boot_max_wait() {
        let mock = Arc::new(MockTransport::new());
        mock.set_latency(Duration::from_secs(20));
        mock.enqueue(Ok(Reply::with_state(remote_doc(2), "2024-01-02T00:00:00Z")));
        let ctl = controller(&configured(), &mock);
        let indicator = RecordingIndicator::default();

        let began = Instant::now();
        let Startup::TimedOut(task) = ctl.start(&indicator).await else {
            panic!("expected the startup pull to outlive the wait window");
        };
        let hidden_at = indicator.events.lock()[1].1;
        assert_eq!(hidden_at - began, Duration::from_secs(8));

        assert!(task.await.unwrap());
        assert_eq!(ctl.snapshot().habits.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_when_disabled_is_local_only() {
        let mock = Arc::new(MockTransport::new());
        let mut snap = configured();
        snap.cloud.enabled = false;
        let ctl = controller(&snap, &mock);

        assert!(matches!(ctl.start(&NoopIndicator).await, Startup::LocalOnly));
        assert_eq!(ctl.message(), "Cloud not configured");
        assert!(ctl.is_ticker_running());
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_endpoint_reports_missing_config() {
        let mock = Arc::new(MockTransport::new());
        let mut snap = configured();
        snap.cloud.endpoint_url.clear();
        let ctl = controller(&snap, &mock);

        assert!(matches!(ctl.start(&NoopIndicator).await, Startup::MissingConfig));
        assert_eq!(ctl.status(), SyncStatus::Error);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_pulls_every_interval() {
        let mock = Arc::new(MockTransport::new());
        let mut snap = configured();
        synced_at(&mut snap, "2024-01-01T00:00:00Z");
        let ctl = controller(&snap, &mock);

        ctl.start_pull_ticker();
        sleep(Duration::from_secs(44)).await;
        assert_eq!(mock.call_count(), 0);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(mock.calls_for(Action::Pull).len(), 1);
        sleep(Duration::from_secs(45)).await;
        assert_eq!(mock.calls_for(Action::Pull).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_cancels_timers() {
        let mock = Arc::new(MockTransport::new());
        let ctl = controller(&configured(), &mock);
        ctl.start_pull_ticker();
        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));
        assert!(ctl.is_push_pending());

        ctl.sign_out();
        assert!(!ctl.is_push_pending());
        assert!(!ctl.is_ticker_running());
        sleep(Duration::from_secs(120)).await;
        assert_eq!(mock.call_count(), 0);

        assert!(ctl.sign_in(&credential(chrono::Duration::hours(2))).is_ok());
        assert!(ctl.is_signed_in());
        assert!(ctl.is_ticker_running());
    }

    #[tokio::test(start_paused = true)]
    async fn save_config_bootstraps_immediately() {
        let mock = Arc::new(MockTransport::new());
        mock.enqueue(Ok(Reply::with_state(remote_doc(4), "2024-01-02T00:00:00Z")));
        let mut snap = configured();
        snap.cloud.endpoint_url.clear();
        let ctl = controller(&snap, &mock);

        assert!(ctl.save_config(" https://other.example.com/exec ", "ada lovelace").await);
        let after = ctl.snapshot();
        assert_eq!(after.cloud.endpoint_url, "https://other.example.com/exec");
        assert_eq!(after.cloud.user_id, "adalovelace");
        assert_eq!(after.habits.len(), 4);
        assert_eq!(mock.calls()[0].endpoint, "https://other.example.com/exec");
    }

    #[tokio::test(start_paused = true)]
    async fn report_reflects_runtime_state() {
        let mock = Arc::new(MockTransport::new());
        let ctl = controller(&configured(), &mock);
        ctl.mutate(|s| habits::toggle_completion(s, "habit_sleep", "2024-03-01"));

        let report = ctl.report();
        assert!(report.enabled);
        assert!(report.signed_in);
        assert_eq!(report.identity, "ada@example.com");
        assert!(report.has_local_changes);
        assert!(report.push_pending);
        assert_eq!(report.status, SyncStatus::Syncing);
        assert_eq!(report.message, "Sync queued");
    }
}

//! Cloud synchronization layer.
//!
//! Keeps the local snapshot in step with one remote record: a debounced
//! push after local edits, a periodic background pull, and a bounded-wait
//! pull at startup. The whole document is replaced on an accepted pull;
//! there is no field-level merge.

pub mod controller;
pub mod hooks;
pub mod pull_ticker;
pub mod push_scheduler;
pub mod reconcile;
pub mod scheduler;
pub mod single_flight;
pub mod transport;
pub mod types;

#[cfg(test)]
mod controller_tests;

pub use controller::{Startup, SyncController};
pub use hooks::{AutoConfirm, ConfirmOverwrite, LoadingIndicator, NoopIndicator};
pub use pull_ticker::PullTicker;
pub use push_scheduler::{PushScheduler, MIN_PUSH_DELAY};
pub use reconcile::{decide, Decision, LocalView, RejectReason, RemoteView};
pub use scheduler::TaskSlot;
pub use single_flight::{FlightPermit, SingleFlight};
pub use transport::{Action, Envelope, HttpTransport, MockTransport, RecordedCall, Reply, Transport, TransportError};
pub use types::{
    PullMode, PullOptions, PullReason, PushReason, PushTrigger, RuntimeFlags, SyncError, SyncReport, SyncStatus,
};

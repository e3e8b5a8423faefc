//! # Habitsync Core Library
//!
//! This library provides the synchronization engine for the habit tracker.
//! A local habit document is edited freely and kept in step with a single
//! remote record over an unreliable network. The CLI binary is a thin layer
//! over the same library.
//!
//! ## Architecture
//!
//! - **Snapshot**: The habit document, its total normalizer and the payload
//!   projection sent to the remote store
//! - **Storage**: Durable cache slots (SQLite `kv` table or JSON file) and
//!   TOML-based configuration
//! - **Auth**: Credential validity, expiry and identity allowlist
//! - **Sync**: Transport, reconciliation policy, debounced push scheduler,
//!   pull ticker and the controller that sequences them
//!
//! ## Key Components
//!
//! - [`SyncController`]: The orchestrating state machine
//! - [`StateStore`]: The authoritative snapshot and its durable copy
//! - [`AuthGate`]: Sign-in / sign-out transitions
//! - [`Transport`]: Trait for the remote store wire contract
//! - [`Config`]: Application configuration management

pub mod auth;
pub mod error;
pub mod habits;
pub mod snapshot;
pub mod storage;
pub mod sync;

pub use auth::{AuthError, AuthGate, AuthState};
pub use error::{CacheError, ConfigError, CoreError, Result, ValidationError};
pub use snapshot::{CloudPayload, Entry, Habit, Snapshot, SyncConfig};
pub use storage::{CacheBackend, CacheSlot, Config, Database, FileSlot, MemorySlot, SqliteSlot, StateStore};
pub use sync::{
    HttpTransport, MockTransport, PullOptions, PullReason, PushReason, Startup, SyncController, SyncReport,
    SyncStatus, Transport, TransportError,
};

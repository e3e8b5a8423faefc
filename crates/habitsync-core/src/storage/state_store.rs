//! The authoritative in-memory snapshot and its durable copy.

use parking_lot::Mutex;
use serde_json::Value;

use super::cache::CacheSlot;
use super::config::CloudConfig;
use crate::snapshot::{normalize, Snapshot};

/// Owns the live [`Snapshot`].
///
/// The lock is held only for the duration of a closure and never across an
/// `.await`. Every change is written through to the cache slot; a failed
/// write is logged and the in-memory state stays authoritative.
pub struct StateStore {
    snapshot: Mutex<Snapshot>,
    slot: Box<dyn CacheSlot>,
    boot: CloudConfig,
}

impl StateStore {
    /// Read the slot and normalize whatever it holds.
    ///
    /// An empty, unreadable or unparseable slot yields the seed document.
    pub fn load(slot: impl CacheSlot + 'static, boot: CloudConfig) -> Self {
        let snapshot = Self::load_snapshot(&slot, &boot);
        Self {
            snapshot: Mutex::new(snapshot),
            slot: Box::new(slot),
            boot,
        }
    }

    pub fn load_snapshot(slot: &dyn CacheSlot, boot: &CloudConfig) -> Snapshot {
        let raw = match slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Snapshot::seed(boot),
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed, starting from seed");
                return Snapshot::seed(boot);
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => normalize(&value, boot),
            Err(e) => {
                tracing::warn!(error = %e, "cached snapshot is not JSON, starting from seed");
                Snapshot::seed(boot)
            }
        }
    }

    /// Owned copy of the current document.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.snapshot.lock())
    }

    /// Swap in a whole new document and persist it.
    pub fn replace(&self, next: Snapshot) {
        *self.snapshot.lock() = next;
        self.persist_locally();
    }

    /// Apply a user edit and persist. The caller schedules the push.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let result = f(&mut self.snapshot.lock());
        self.persist_locally();
        result
    }

    /// Apply a local-only edit (sync settings, credentials) and persist.
    pub fn mutate_local<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        self.mutate(f)
    }

    /// Write the current document to the slot. Failures are swallowed.
    pub fn persist_locally(&self) -> bool {
        let json = match self.snapshot.lock().to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot serialization failed");
                return false;
            }
        };
        match self.slot.write(&json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "cache write failed, keeping in-memory state");
                false
            }
        }
    }

    /// Normalize a document received from the remote store.
    pub fn normalize_remote(&self, raw: &Value) -> Snapshot {
        normalize(raw, &self.boot)
    }

    pub fn boot_config(&self) -> &CloudConfig {
        &self.boot
    }
}

//! Durable cache slots.
//!
//! A slot holds one serialized snapshot. Reads and writes are synchronous
//! and may fail, but a failed write never leaves a half-written value that a
//! later read would accept.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::database::Database;
use crate::error::CacheError;

/// Key of the snapshot row in the `kv` table.
pub const STATE_SLOT_KEY: &str = "habitsync.state";

/// A single named value that survives restarts.
pub trait CacheSlot: Send + Sync {
    /// Current value, `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, CacheError>;

    /// Replace the value.
    fn write(&self, value: &str) -> Result<(), CacheError>;
}

/// Slot stored as one row of the SQLite `kv` table.
pub struct SqliteSlot {
    db: Mutex<Database>,
    key: String,
}

impl SqliteSlot {
    pub fn new(db: Database, key: impl Into<String>) -> Self {
        Self {
            db: Mutex::new(db),
            key: key.into(),
        }
    }

    /// The snapshot slot in the default database file.
    pub fn open_default() -> Result<Self, crate::error::CoreError> {
        Ok(Self::new(Database::open()?, STATE_SLOT_KEY))
    }
}

impl CacheSlot for SqliteSlot {
    fn read(&self) -> Result<Option<String>, CacheError> {
        self.db.lock().kv_get(&self.key)
    }

    fn write(&self, value: &str) -> Result<(), CacheError> {
        self.db.lock().kv_set(&self.key, value)
    }
}

/// Slot stored as a JSON file, written through a temp file and renamed.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheSlot for FileSlot {
    fn read(&self) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process slot. Writes can be made to fail to exercise the
/// best-effort persistence path.
#[derive(Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
    fail_writes: AtomicBool,
    writes: std::sync::atomic::AtomicUsize,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let slot = Self::new();
        *slot.value.lock() = Some(value.into());
        slot
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn value(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

impl CacheSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, CacheError> {
        Ok(self.value.lock().clone())
    }

    fn write(&self, value: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        *self.value.lock() = Some(value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: CacheSlot + ?Sized> CacheSlot for std::sync::Arc<T> {
    fn read(&self) -> Result<Option<String>, CacheError> {
        (**self).read()
    }

    fn write(&self, value: &str) -> Result<(), CacheError> {
        (**self).write(value)
    }
}

impl<T: CacheSlot + ?Sized> CacheSlot for Box<T> {
    fn read(&self) -> Result<Option<String>, CacheError> {
        (**self).read()
    }

    fn write(&self, value: &str) -> Result<(), CacheError> {
        (**self).write(value)
    }
}

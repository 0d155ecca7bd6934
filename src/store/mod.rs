//! Persistence Gateway: whole-document storage of the layout [`Configuration`].
//!
//! The engine reads the full document at the start of an operation and writes
//! it back in full at the end. Backends:
//!
//! - [`MemoryStore`]: in-process, for tests and embedding.
//! - [`FileStore`]: pretty-printed JSON, written atomically via temp file + rename.
//! - [`SqliteStore`]: one document row plus an audit trail, WAL journal.

pub mod file_store;
pub mod sqlite;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::model::Configuration;
use crate::settings::{Settings, StoreBackend};

pub use file_store::FileStore;
pub use sqlite::SqliteStore;

/// Full-document read/write store. `write` must be atomic from the caller's
/// point of view: readers see either the old or the new document.
pub trait ConfigStore: Send + Sync {
    /// Load the whole configuration. A store with no document yet returns
    /// the default (empty) configuration.
    fn read(&self) -> Result<Configuration>;

    fn write(&self, config: &Configuration) -> Result<()>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for Box<S> {
    fn read(&self) -> Result<Configuration> {
        (**self).read()
    }

    fn write(&self, config: &Configuration) -> Result<()> {
        (**self).write(config)
    }
}

/// Keeps the document in memory and counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<Configuration>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            config: Mutex::new(config),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Configuration {
        self.config
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> Result<Configuration> {
        let config = self
            .config
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(config.clone())
    }

    fn write(&self, config: &Configuration) -> Result<()> {
        let mut current = self
            .config
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *current = config.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Open the backend selected in `settings`, with the document at `path`.
pub fn open(settings: &Settings, path: &Path) -> Result<Box<dyn ConfigStore>> {
    Ok(match settings.store {
        StoreBackend::Json => Box::new(FileStore::new(path)),
        StoreBackend::Sqlite => Box::new(SqliteStore::open(path)?),
    })
}

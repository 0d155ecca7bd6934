//! SQLite-backed Persistence Gateway.
//!
//! The layout configuration is stored as a single JSON document row; every
//! write happens in one transaction together with the audit entries that
//! describe what changed.
//!
//! # Usage
//!
//! ```ignore
//! let store = SqliteStore::open(path)?;
//! let mut config = store.read()?;
//! store.write(&config)?;
//! ```

pub mod audit;
mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::ConfigStore;
use crate::model::{current_time_millis, Configuration};

pub use audit::{AuditAction, AuditEntry, EntityType};

/// Row name of the layout document in the `documents` table.
const DOCUMENT_NAME: &str = "configuration";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Unique ID for this process (used in audit trail).
    instance_id: String,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    /// Newest-first audit entries, optionally filtered.
    pub fn audit_log(
        &self,
        entity_type: Option<EntityType>,
        entity_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>> {
        let conn = self.lock()?;
        Ok(audit::get_audit_log(&conn, entity_type, entity_id, limit)?)
    }
}

fn read_document(conn: &Connection) -> Result<Option<Configuration>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE name = ?1",
            params![DOCUMENT_NAME],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|b| {
        serde_json::from_str::<Configuration>(&b).context("Failed to parse stored layout document")
    })
    .transpose()
}

impl ConfigStore for SqliteStore {
    fn read(&self) -> Result<Configuration> {
        let conn = self.lock()?;
        Ok(read_document(&conn)?.unwrap_or_default())
    }

    fn write(&self, config: &Configuration) -> Result<()> {
        let body = serde_json::to_string(config).context("Failed to serialize layout document")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let previous = read_document(&tx)?.unwrap_or_default();
        tx.execute(
            "INSERT INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![DOCUMENT_NAME, body, current_time_millis() as i64],
        )?;
        audit::record_changes(&tx, &self.instance_id, &previous, config)?;

        tx.commit()?;
        debug!("Stored layout document ({} bytes)", body.len());
        Ok(())
    }
}

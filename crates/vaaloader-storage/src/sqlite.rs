//! SQLite storage backend.
//!
//! Persists VAAs into a local SQLite file. Suitable for offline backfills
//! that should not need a database server.
//!
//! ## Feature flag
//! This module is only compiled when the `sqlite` feature is enabled:
//! ```toml
//! vaaloader-storage = { version = "...", features = ["sqlite"] }
//! ```
//!
//! ## Schema
//! ```sql
//! CREATE TABLE vaas (
//!     id                 TEXT    PRIMARY KEY,   -- chain/emitter/sequence
//!     version            INTEGER NOT NULL,
//!     emitter_chain      INTEGER NOT NULL,
//!     emitter_addr       TEXT    NOT NULL,
//!     sequence           TEXT    NOT NULL,
//!     guardian_set_index INTEGER NOT NULL,
//!     timestamp          INTEGER NOT NULL,
//!     digest             TEXT    NOT NULL,
//!     vaas               BLOB    NOT NULL,
//!     indexed_at         INTEGER NOT NULL,
//!     updated_at         INTEGER NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use vaaloader_core::error::StorageError;
use vaaloader_core::repository::{VaaDocument, VaaRepository};
use vaaloader_core::vaa::Vaa;

/// SQLite-backed VAA repository.
///
/// Thread-safe via an internal `Arc<Mutex<Connection>>`; writes run on the
/// blocking thread pool so workers never stall the async runtime.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StorageError::Connection(format!("sqlite open: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(sqlite_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vaas (
                id                 TEXT    PRIMARY KEY,
                version            INTEGER NOT NULL,
                emitter_chain      INTEGER NOT NULL,
                emitter_addr       TEXT    NOT NULL,
                sequence           TEXT    NOT NULL,
                guardian_set_index INTEGER NOT NULL,
                timestamp          INTEGER NOT NULL,
                digest             TEXT    NOT NULL,
                vaas               BLOB    NOT NULL,
                indexed_at         INTEGER NOT NULL,
                updated_at         INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS vaas_emitter
                ON vaas (emitter_chain, emitter_addr);",
        )
        .map_err(sqlite_err)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (useful for tests).
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM vaas", [], |row| row.get(0))
            .map_err(sqlite_err)?;
        Ok(n as u64)
    }

    /// Fetch a record by message id.
    pub fn get(&self, id: &str) -> Result<Option<VaaDocument>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, version, emitter_chain, emitter_addr, sequence,
                    guardian_set_index, timestamp, digest, vaas
             FROM vaas WHERE id = ?1",
            params![id],
            |row| {
                let timestamp: i64 = row.get(6)?;
                Ok(VaaDocument {
                    id: row.get(0)?,
                    version: row.get(1)?,
                    emitter_chain: row.get(2)?,
                    emitter_addr: row.get(3)?,
                    sequence: row.get(4)?,
                    guardian_set_index: row.get(5)?,
                    timestamp: DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default(),
                    digest: row.get(7)?,
                    vaas: row.get(8)?,
                })
            },
        )
        .optional()
        .map_err(sqlite_err)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Other(format!("sqlite connection poisoned: {e}")))
    }
}

fn write(conn: &Connection, doc: &VaaDocument, now: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO vaas (id, version, emitter_chain, emitter_addr, sequence,
                           guardian_set_index, timestamp, digest, vaas,
                           indexed_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
         ON CONFLICT(id) DO UPDATE SET
             version            = excluded.version,
             emitter_chain      = excluded.emitter_chain,
             emitter_addr       = excluded.emitter_addr,
             sequence           = excluded.sequence,
             guardian_set_index = excluded.guardian_set_index,
             timestamp          = excluded.timestamp,
             digest             = excluded.digest,
             vaas               = excluded.vaas,
             updated_at         = excluded.updated_at",
        params![
            &doc.id,
            doc.version,
            doc.emitter_chain,
            &doc.emitter_addr,
            &doc.sequence,
            doc.guardian_set_index,
            doc.timestamp.timestamp(),
            &doc.digest,
            &doc.vaas,
            now,
        ],
    )
}

#[async_trait]
impl VaaRepository for SqliteRepository {
    async fn upsert(&self, vaa: &Vaa, raw: &[u8]) -> Result<(), StorageError> {
        let doc = VaaDocument::from_vaa(vaa, raw);
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StorageError::Other(format!("sqlite connection poisoned: {e}")))?;
            write(&conn, &doc, Utc::now().timestamp())
                .map(|_| ())
                .map_err(|e| StorageError::Write {
                    id: doc.id.clone(),
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| StorageError::Other(format!("sqlite writer task: {e}")))?
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::Other(format!("sqlite: {e}"))
}

//! vaaloader-storage: pluggable `VaaRepository` backends.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, dry runs, no persistence)
//! - `mongo`: MongoDB document store (feature `mongodb`)
//! - `sqlite`: single-file SQLite via `rusqlite` (feature `sqlite`)

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryRepository;

#[cfg(feature = "mongodb")]
pub use mongo::{get_database_handle, MongoRepository};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

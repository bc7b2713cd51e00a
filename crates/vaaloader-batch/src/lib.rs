//! # vaaloader-batch
//!
//! Concurrent ingestion pipeline for VAA backfill files.
//!
//! ```text
//! file ─▶ LineSource ─▶ WorkQueue (bounded) ─▶ Worker × N ─▶ VaaRepository
//!                                                  │
//!                                                  └─▶ Progress (tick)
//! ```
//!
//! A single producer streams lines into the bounded queue, then pushes one
//! `WorkItem::Stop` per worker. Workers drain every line queued ahead of the
//! stops, return their `WorkerReport`, and the `CompletionBarrier` joins them
//! before the run reports its `RunStats`.
//!
//! Per-line failures (bad fields, bad hex, undecodable VAA, failed upsert) are
//! logged and counted, never fatal. Only file-level errors end a run early.
//!
//! ## Usage
//! ```no_run
//! use std::sync::Arc;
//! use vaaloader_batch::{BackfillConfig, Backfiller};
//! use vaaloader_core::VaaDecoder;
//! use vaaloader_storage::InMemoryRepository;
//!
//! # async fn example() -> Result<(), vaaloader_batch::BackfillError> {
//! let backfiller = Backfiller::new(
//!     BackfillConfig::default(),
//!     Arc::new(VaaDecoder),
//!     Arc::new(InMemoryRepository::new()),
//! );
//! let stats = backfiller.run("signed-vaas.csv").await?;
//! println!("processed {} lines", stats.lines_read);
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod queue;
pub mod source;
pub mod stats;
pub mod worker;

pub use barrier::CompletionBarrier;
pub use config::BackfillConfig;
pub use engine::Backfiller;
pub use error::{BackfillError, FailureKind, LineError};
pub use progress::Progress;
pub use queue::{work_queue, WorkItem, WorkReceiver, WorkSender};
pub use source::{count_lines, LineSource};
pub use stats::RunStats;
pub use worker::{Worker, WorkerReport};

//! Error types for the backfill pipeline.
//!
//! [`LineError`] is contained inside a worker: it is logged, counted and the
//! line is dropped. [`BackfillError`] ends the run.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use vaaloader_core::error::{DecodeError, StorageError};

/// Why a single line was discarded.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("line has no payload field")]
    FieldParse,

    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("VAA decode failed: {0}")]
    MessageDecode(#[from] DecodeError),

    #[error("upsert failed: {0}")]
    Upsert(#[from] StorageError),
}

impl LineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::FieldParse => FailureKind::FieldParse,
            Self::HexDecode(_) => FailureKind::HexDecode,
            Self::MessageDecode(_) => FailureKind::MessageDecode,
            Self::Upsert(_) => FailureKind::Upsert,
        }
    }
}

/// Per-line failure category, used for counters and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FieldParse,
    HexDecode,
    MessageDecode,
    Upsert,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldParse => "field_parse",
            Self::HexDecode => "hex_decode",
            Self::MessageDecode => "message_decode",
            Self::Upsert => "upsert",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a backfill run.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("cannot open '{}': {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot count lines of '{}': {source}", path.display())]
    LineCount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error after line {line}: {source}")]
    LineRead {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("work queue closed before all work was delivered")]
    QueueClosed,

    #[error("worker {worker} failed: {reason}")]
    Worker { worker: usize, reason: String },
}

impl BackfillError {
    /// Returns `true` for errors raised while reading the input file.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FileOpen { .. } | Self::LineCount { .. } | Self::LineRead { .. }
        )
    }
}

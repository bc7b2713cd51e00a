//! A single pool worker: split, hex-decode, decode, upsert, tick.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use vaaloader_core::decoder::MessageDecoder;
use vaaloader_core::repository::VaaRepository;

use crate::error::{FailureKind, LineError};
use crate::progress::Progress;
use crate::queue::{WorkItem, WorkReceiver};

/// Longest prefix of field 0 echoed into logs.
const MAX_LABEL_LEN: usize = 96;

/// What one worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    /// Lines popped from the queue (stop items excluded)
    pub lines: u64,
    pub persisted: u64,
    pub field_parse_errors: u64,
    pub hex_decode_errors: u64,
    pub message_decode_errors: u64,
    pub upsert_errors: u64,
}

impl WorkerReport {
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            ..Self::default()
        }
    }

    /// Count the outcome of one line.
    pub fn record(&mut self, outcome: Result<(), FailureKind>) {
        self.lines += 1;
        match outcome {
            Ok(()) => self.persisted += 1,
            Err(FailureKind::FieldParse) => self.field_parse_errors += 1,
            Err(FailureKind::HexDecode) => self.hex_decode_errors += 1,
            Err(FailureKind::MessageDecode) => self.message_decode_errors += 1,
            Err(FailureKind::Upsert) => self.upsert_errors += 1,
        }
    }

    pub fn failures(&self) -> u64 {
        self.field_parse_errors + self.hex_decode_errors + self.message_decode_errors + self.upsert_errors
    }
}

/// Pool worker.
///
/// Every collaborator is injected, so a worker can be driven line by line in
/// isolation with [`Worker::process_line`].
pub struct Worker {
    id: usize,
    delimiter: char,
    decoder: Arc<dyn MessageDecoder>,
    repository: Arc<dyn VaaRepository>,
    progress: Progress,
}

impl Worker {
    pub fn new(
        id: usize,
        decoder: Arc<dyn MessageDecoder>,
        repository: Arc<dyn VaaRepository>,
        progress: Progress,
    ) -> Self {
        Self {
            id,
            delimiter: ',',
            decoder,
            repository,
            progress,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Process one line end to end. No retries.
    pub async fn process_line(&self, line: &str) -> Result<(), LineError> {
        let mut fields = line.split(self.delimiter);
        let _label = fields.next();
        let payload = fields.next().ok_or(LineError::FieldParse)?;

        let raw = hex::decode(payload)?;
        let vaa = self.decoder.decode(&raw)?;
        self.repository.upsert(&vaa, &raw).await?;

        self.progress.tick();
        Ok(())
    }

    /// Pull work until a `Stop` arrives, then hand back the report.
    pub async fn run(self, queue: WorkReceiver) -> WorkerReport {
        let mut report = WorkerReport::new(self.id);
        debug!(worker = self.id, backend = self.repository.backend(), "worker started");

        loop {
            match queue.pop().await {
                Some(WorkItem::Line(line)) => {
                    let outcome = self.process_line(&line).await;
                    if let Err(e) = &outcome {
                        warn!(
                            worker = self.id,
                            line_id = line_label(&line, self.delimiter),
                            kind = %e.kind(),
                            error = %e,
                            "line discarded"
                        );
                    }
                    report.record(outcome.map_err(|e| e.kind()));
                }
                Some(WorkItem::Stop) => break,
                None => {
                    debug!(worker = self.id, "queue closed without a stop item");
                    break;
                }
            }
        }

        debug!(
            worker = self.id,
            lines = report.lines,
            failures = report.failures(),
            "worker stopped"
        );
        report
    }
}

/// Field 0 of a line, truncated for logging.
fn line_label(line: &str, delimiter: char) -> &str {
    let first = line.split(delimiter).next().unwrap_or_default();
    match first.char_indices().nth(MAX_LABEL_LEN) {
        Some((idx, _)) => &first[..idx],
        None => first,
    }
}

//! `Backfiller`: drives one file through the queue and worker pool.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use vaaloader_core::decoder::MessageDecoder;
use vaaloader_core::repository::VaaRepository;

use crate::barrier::CompletionBarrier;
use crate::config::BackfillConfig;
use crate::error::BackfillError;
use crate::progress::{counting_spinner, Progress};
use crate::queue::{work_queue, WorkSender};
use crate::source::{count_lines, LineSource};
use crate::stats::RunStats;
use crate::worker::Worker;

/// Backfill pipeline.
///
/// The decoder and repository are shared by every worker of every run.
pub struct Backfiller {
    config: BackfillConfig,
    decoder: Arc<dyn MessageDecoder>,
    repository: Arc<dyn VaaRepository>,
}

impl Backfiller {
    pub fn new(
        config: BackfillConfig,
        decoder: Arc<dyn MessageDecoder>,
        repository: Arc<dyn VaaRepository>,
    ) -> Self {
        Self {
            config,
            decoder,
            repository,
        }
    }

    pub fn config(&self) -> &BackfillConfig {
        &self.config
    }

    /// Load every line of `path` and wait for the pool to drain.
    ///
    /// Returns once every worker has consumed its stop item. Per-line
    /// failures are counted in the returned [`RunStats`]; only file,
    /// configuration and worker failures come back as `Err`.
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<RunStats, BackfillError> {
        let path = path.as_ref();
        let started = Instant::now();
        let capacity = self.config.queue_capacity()?;
        let workers = self.config.worker_count;

        let mut source = LineSource::open(path).await?;
        let progress = self.progress_for(path).await?;

        info!(
            path = %path.display(),
            workers,
            capacity,
            backend = self.repository.backend(),
            "backfill started"
        );

        let (mut tx, rx) = work_queue(capacity);
        let mut barrier = CompletionBarrier::with_capacity(workers);
        for id in 0..workers {
            let worker = Worker::new(
                id,
                Arc::clone(&self.decoder),
                Arc::clone(&self.repository),
                progress.clone(),
            )
            .with_delimiter(self.config.delimiter);
            barrier.register(id, tokio::spawn(worker.run(rx.clone())));
        }
        drop(rx);

        if let Err(e) = produce(&mut source, &mut tx, workers).await {
            progress.finish();
            barrier.abort();
            return Err(e);
        }
        debug!(lines = tx.pushed(), "producer done, waiting on workers");
        drop(tx);

        let reports = barrier.wait().await;
        progress.finish();
        let reports = reports?;

        let mut stats = RunStats::from_reports(source.lines_read(), &reports);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            lines = stats.lines_read,
            persisted = stats.persisted,
            failures = stats.failures(),
            elapsed_ms = stats.elapsed_ms,
            "backfill complete"
        );
        Ok(stats)
    }

    async fn progress_for(&self, path: &Path) -> Result<Progress, BackfillError> {
        if !self.config.show_progress {
            return Ok(Progress::hidden());
        }
        if !self.config.count_lines {
            return Ok(Progress::spinner());
        }

        let spinner = counting_spinner();
        let total = count_lines(path).await;
        spinner.finish_and_clear();
        let total = total?;
        debug!(total, "input pre-counted");
        Ok(Progress::bar(total))
    }
}

/// Push every line, then one stop per worker.
async fn produce(source: &mut LineSource, tx: &mut WorkSender, workers: usize) -> Result<(), BackfillError> {
    while let Some(line) = source.next_line().await? {
        tx.push(line).await?;
    }
    tx.stop_all(workers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vaaloader_core::vaa::Vaa;
    use vaaloader_core::VaaDecoder;
    use vaaloader_storage::InMemoryRepository;

    fn vaa_hex(sequence: u64) -> String {
        let vaa = Vaa {
            version: 1,
            guardian_set_index: 0,
            signatures: vec![],
            timestamp: 1_600_000_000,
            nonce: 0,
            emitter_chain: 1,
            emitter_address: [0xaa; 32],
            sequence,
            consistency_level: 32,
            payload: b"hello".to_vec(),
        };
        hex::encode(vaa.to_bytes())
    }

    #[tokio::test]
    async fn small_run_counts_everything() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for seq in 0..10 {
            writeln!(file, "1:aa:{seq},{}", vaa_hex(seq)).unwrap();
        }
        writeln!(file, "garbage").unwrap();
        file.flush().unwrap();

        let repo = Arc::new(InMemoryRepository::new());
        let backfiller = Backfiller::new(
            BackfillConfig::default().worker_count(3).queue_factor(2).quiet(),
            Arc::new(VaaDecoder),
            repo.clone(),
        );
        let stats = backfiller.run(file.path()).await.unwrap();

        assert_eq!(stats.lines_read, 11);
        assert_eq!(stats.lines_processed, 11);
        assert_eq!(stats.persisted, 10);
        assert_eq!(stats.field_parse_errors, 1);
        assert_eq!(stats.workers, 3);
        assert_eq!(repo.len(), 10);
    }

    #[tokio::test]
    async fn zero_queue_factor_is_rejected_before_opening() {
        let backfiller = Backfiller::new(
            BackfillConfig::default().queue_factor(0).quiet(),
            Arc::new(VaaDecoder),
            Arc::new(InMemoryRepository::new()),
        );
        let err = backfiller.run("/nonexistent").await.unwrap_err();
        assert!(matches!(err, BackfillError::Config(_)));
    }
}

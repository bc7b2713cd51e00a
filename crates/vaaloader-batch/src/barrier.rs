//! Completion barrier over the worker pool.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::error;

use crate::error::BackfillError;
use crate::worker::WorkerReport;

/// Tracks every spawned worker and waits for all of them.
///
/// Each worker is registered before it can pop anything, so `wait` can only
/// return once every registered worker has consumed its `Stop` and finished.
#[derive(Default)]
pub struct CompletionBarrier {
    handles: Vec<(usize, JoinHandle<WorkerReport>)>,
}

impl CompletionBarrier {
    pub fn with_capacity(workers: usize) -> Self {
        Self {
            handles: Vec::with_capacity(workers),
        }
    }

    pub fn register(&mut self, worker: usize, handle: JoinHandle<WorkerReport>) {
        self.handles.push((worker, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker and collect their reports in registration order.
    ///
    /// A worker that panicked or was cancelled fails the whole wait, after all
    /// other workers have been joined.
    pub async fn wait(self) -> Result<Vec<WorkerReport>, BackfillError> {
        let (ids, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut reports = Vec::with_capacity(results.len());
        let mut first_failure = None;
        for (worker, result) in ids.into_iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(worker, error = %e, "worker did not finish");
                    first_failure.get_or_insert(BackfillError::Worker {
                        worker,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }

    /// Cancel every worker. Used when the producer fails mid-run.
    pub fn abort(self) {
        for (_, handle) in self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_barrier_returns_immediately() {
        let barrier = CompletionBarrier::default();
        assert!(barrier.is_empty());
        assert!(barrier.wait().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reports_come_back_in_registration_order() {
        let mut barrier = CompletionBarrier::with_capacity(3);
        for id in 0..3 {
            barrier.register(
                id,
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(10 * (3 - id as u64))).await;
                    WorkerReport::new(id)
                }),
            );
        }
        assert_eq!(barrier.len(), 3);
        let reports = barrier.wait().await.unwrap();
        let ids: Vec<_> = reports.iter().map(|r| r.worker).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn panicking_worker_fails_the_wait() {
        let mut barrier = CompletionBarrier::default();
        barrier.register(0, tokio::spawn(async { WorkerReport::new(0) }));
        barrier.register(
            1,
            tokio::spawn(async {
                if true {
                    panic!("boom");
                }
                WorkerReport::new(1)
            }),
        );
        let err = barrier.wait().await.unwrap_err();
        assert!(matches!(err, BackfillError::Worker { worker: 1, .. }));
    }
}

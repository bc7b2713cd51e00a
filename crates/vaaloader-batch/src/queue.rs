//! Bounded work queue between the line producer and the worker pool.
//!
//! Single producer, many consumers. Consumers share one `mpsc::Receiver`
//! behind an async mutex, so items leave the queue in the order the producer
//! pushed them. That ordering is what makes the shutdown protocol sound: the
//! `Stop` items are pushed after every line, so no worker can see a `Stop`
//! while lines remain ahead of it.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::BackfillError;

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A raw input line.
    Line(String),
    /// Terminate the worker that receives this.
    Stop,
}

/// Create a queue holding at most `capacity` items.
///
/// Take `capacity` from [`BackfillConfig::queue_capacity`], which rejects
/// values the channel cannot hold.
///
/// [`BackfillConfig::queue_capacity`]: crate::config::BackfillConfig::queue_capacity
pub fn work_queue(capacity: usize) -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        WorkSender { tx, pushed: 0 },
        WorkReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half. Not cloneable: there is exactly one producer.
pub struct WorkSender {
    tx: mpsc::Sender<WorkItem>,
    pushed: u64,
}

impl WorkSender {
    /// Enqueue a line, waiting while the queue is full.
    ///
    /// Fails with `QueueClosed` once every receiver has been dropped.
    pub async fn push(&mut self, line: String) -> Result<(), BackfillError> {
        self.tx
            .send(WorkItem::Line(line))
            .await
            .map_err(|_| BackfillError::QueueClosed)?;
        self.pushed += 1;
        Ok(())
    }

    /// Enqueue one `Stop` per worker. Call after the last line.
    pub async fn stop_all(&self, workers: usize) -> Result<(), BackfillError> {
        for _ in 0..workers {
            self.tx
                .send(WorkItem::Stop)
                .await
                .map_err(|_| BackfillError::QueueClosed)?;
        }
        Ok(())
    }

    /// Lines enqueued so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half, cloned once per worker.
#[derive(Clone)]
pub struct WorkReceiver {
    inner: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl WorkReceiver {
    /// Next item, or `None` if the producer is gone and the queue is empty.
    pub async fn pop(&self) -> Option<WorkItem> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_follow_lines() {
        let (mut tx, rx) = work_queue(16);
        tx.push("a".into()).await.unwrap();
        tx.push("b".into()).await.unwrap();
        tx.stop_all(2).await.unwrap();

        assert_eq!(rx.pop().await, Some(WorkItem::Line("a".into())));
        assert_eq!(rx.pop().await, Some(WorkItem::Line("b".into())));
        assert_eq!(rx.pop().await, Some(WorkItem::Stop));
        assert_eq!(rx.pop().await, Some(WorkItem::Stop));
        assert_eq!(tx.pushed(), 2);
    }

    #[tokio::test]
    async fn a_stop_shaped_line_is_still_a_line() {
        let (mut tx, rx) = work_queue(1);
        tx.push("exit".into()).await.unwrap();
        assert_eq!(rx.pop().await, Some(WorkItem::Line("exit".into())));
    }

    #[tokio::test]
    async fn push_fails_without_receivers() {
        let (mut tx, rx) = work_queue(1);
        drop(rx);
        assert!(matches!(
            tx.push("x".into()).await,
            Err(BackfillError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn pop_returns_none_after_producer_drops() {
        let (tx, rx) = work_queue(4);
        assert_eq!(tx.capacity(), 4);
        drop(tx);
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        let (mut tx, rx) = work_queue(1);
        tx.push("first".into()).await.unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            tx.push("second".into()),
        )
        .await;
        assert!(blocked.is_err(), "push should wait while the queue is full");

        assert_eq!(rx.pop().await, Some(WorkItem::Line("first".into())));
        tx.push("third".into()).await.unwrap();
        assert_eq!(rx.pop().await, Some(WorkItem::Line("third".into())));
    }
}

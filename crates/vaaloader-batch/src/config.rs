//! Backfill pipeline configuration.

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::BackfillError;

/// Configuration for one backfill run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Number of concurrent workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Queue slots per worker; capacity = `worker_count * queue_factor`
    #[serde(default = "default_queue_factor")]
    pub queue_factor: usize,
    /// Pre-count lines so the progress bar has a length
    #[serde(default = "bool_true")]
    pub count_lines: bool,
    /// Render progress on stderr (only when stderr is a terminal)
    #[serde(default = "bool_true")]
    pub show_progress: bool,
    /// Field separator within a line
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_worker_count() -> usize { 100 }
fn default_queue_factor() -> usize { 1_000 }
fn default_delimiter() -> char { ',' }
fn bool_true() -> bool { true }

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_factor: default_queue_factor(),
            count_lines: true,
            show_progress: true,
            delimiter: default_delimiter(),
        }
    }
}

impl BackfillConfig {
    pub fn worker_count(mut self, n: usize) -> Self {
        self.worker_count = n;
        self
    }

    pub fn queue_factor(mut self, k: usize) -> Self {
        self.queue_factor = k;
        self
    }

    pub fn count_lines(mut self, enabled: bool) -> Self {
        self.count_lines = enabled;
        self
    }

    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// A quiet config for tests and embedding: no pre-count, no rendering.
    pub fn quiet(self) -> Self {
        self.count_lines(false).show_progress(false)
    }

    /// Bounded queue capacity, validated.
    ///
    /// Capped at `Semaphore::MAX_PERMITS`, the largest bound a tokio channel
    /// accepts.
    pub fn queue_capacity(&self) -> Result<usize, BackfillError> {
        self.validate()?;
        self.worker_count
            .checked_mul(self.queue_factor)
            .filter(|capacity| *capacity <= Semaphore::MAX_PERMITS)
            .ok_or_else(|| {
                BackfillError::Config(format!(
                    "queue capacity too large: {} workers × {} exceeds {}",
                    self.worker_count,
                    self.queue_factor,
                    Semaphore::MAX_PERMITS
                ))
            })
    }

    /// Reject configurations that could never drain.
    pub fn validate(&self) -> Result<(), BackfillError> {
        if self.worker_count == 0 {
            return Err(BackfillError::Config("worker_count must be at least 1".into()));
        }
        if self.queue_factor == 0 {
            return Err(BackfillError::Config("queue_factor must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BackfillConfig::default();
        assert_eq!(config.worker_count, 100);
        assert_eq!(config.queue_capacity().unwrap(), 100_000);
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn zero_workers_rejected() {
        let err = BackfillConfig::default().worker_count(0).validate().unwrap_err();
        assert!(matches!(err, BackfillError::Config(_)));
    }

    #[test]
    fn overflowing_capacity_rejected() {
        let config = BackfillConfig::default().worker_count(usize::MAX).queue_factor(2);
        assert!(config.queue_capacity().is_err());
    }

    #[test]
    fn capacity_above_channel_limit_rejected() {
        let config = BackfillConfig::default().worker_count(1).queue_factor(usize::MAX >> 2);
        assert!(config.validate().is_ok());
        let err = config.queue_capacity().unwrap_err();
        assert!(matches!(err, BackfillError::Config(_)));

        let at_limit = BackfillConfig::default().worker_count(1).queue_factor(Semaphore::MAX_PERMITS);
        assert_eq!(at_limit.queue_capacity().unwrap(), Semaphore::MAX_PERMITS);
    }
}

//! Progress reporting.
//!
//! The counter is the source of truth; the `indicatif` bar only mirrors it and
//! is drawn to stderr when stderr is a terminal.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Shared count of successfully persisted lines.
///
/// Cloning is cheap; every worker holds a clone and ticks it concurrently.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

struct Inner {
    persisted: AtomicU64,
    bar: ProgressBar,
}

impl Progress {
    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            inner: Arc::new(Inner {
                persisted: AtomicU64::new(0),
                bar,
            }),
        }
    }

    /// Counter with nothing drawn.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    /// Bar sized by a pre-counted number of lines.
    pub fn bar(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), draw_target());
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>9}/{len:9} vaas ({per_sec}, eta {eta}) {msg}",
        ) {
            bar.set_style(style.progress_chars("##-"));
        }
        Self::with_bar(bar)
    }

    /// Spinner for runs without a pre-count.
    pub fn spinner() -> Self {
        let bar = ProgressBar::with_draw_target(None, draw_target());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.red} {pos} vaas ({per_sec}) {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar)
    }

    /// Record one persisted line.
    pub fn tick(&self) {
        self.inner.persisted.fetch_add(1, Ordering::Relaxed);
        self.inner.bar.inc(1);
    }

    /// Lines persisted so far.
    pub fn count(&self) -> u64 {
        self.inner.persisted.load(Ordering::Relaxed)
    }

    /// Stop drawing and clear the bar.
    pub fn finish(&self) {
        self.inner.bar.finish_and_clear();
    }
}

/// Spinner shown while the input is pre-counted.
pub fn counting_spinner() -> ProgressBar {
    let spinner = ProgressBar::with_draw_target(None, draw_target());
    if let Ok(style) = ProgressStyle::with_template("{spinner:.red} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("counting lines");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn draw_target() -> ProgressDrawTarget {
    if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(10)
    } else {
        ProgressDrawTarget::hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ticks_are_all_counted() {
        let progress = Progress::hidden();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let p = progress.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..1_000 {
                    p.tick();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(progress.count(), 8_000);
    }

    #[test]
    fn bar_counts_like_hidden() {
        let progress = Progress::bar(3);
        progress.tick();
        progress.tick();
        progress.finish();
        assert_eq!(progress.count(), 2);
    }
}

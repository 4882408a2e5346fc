//! Polling loop.
//!
//! Runs one reconciliation cycle, sleeps, checks the shutdown flag,
//! repeats. Nothing that goes wrong inside a cycle stops the loop; only
//! the shutdown flag does.

use crate::watchlist::{ReconcileReport, WatchEvent, WatchList};
use magicwatch_core::{ErrorKind, Result, WatchError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::watch;
use tracing::{error, info};

/// Extra wait after the watched directory goes missing.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Everything the loop needs to know. Fixed once the loop starts.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory to watch (not recursive).
    pub path: PathBuf,

    /// Filename suffix a file needs to be tracked, e.g. `.txt`.
    pub extension: String,

    /// Text to look for.
    pub magic: String,

    /// Sleep between cycles.
    pub interval: Duration,

    /// Added to `interval` after a directory-not-found cycle.
    pub grace_period: Duration,
}

impl WatchOptions {
    pub fn new(path: impl Into<PathBuf>, magic: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extension: ".txt".to_string(),
            magic: magic.into(),
            interval: Duration::from_secs(1),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Turns a user-supplied interval in seconds into the sleep duration.
    ///
    /// Fractions are dropped, so `1.9` sleeps one second and anything
    /// below one second doesn't sleep at all.
    pub fn interval_from_secs(secs: f64) -> Duration {
        Duration::from_secs(secs.trunc().max(0.0) as u64)
    }
}

/// What the loop did, reported once it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Wall-clock time the loop started.
    pub started: SystemTime,
    pub uptime: Duration,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub tracked_files: usize,
}

/// Owns the watch-list and drives reconciliation cycles.
pub struct DirectoryPoller {
    options: Arc<WatchOptions>,
    watch_list: WatchList,
}

impl DirectoryPoller {
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options: Arc::new(options),
            watch_list: WatchList::new(),
        }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    pub fn watch_list(&self) -> &WatchList {
        &self.watch_list
    }

    /// Runs exactly one reconciliation cycle and logs its events.
    ///
    /// The cycle runs on the blocking pool and is awaited to completion,
    /// so cycles never overlap. A panic inside the cycle is reported as
    /// [`WatchError::Unexpected`]; the watch-list keeps whatever offsets
    /// were already updated.
    pub async fn poll(&mut self) -> Result<ReconcileReport> {
        let options = Arc::clone(&self.options);
        let mut list = std::mem::take(&mut self.watch_list);

        let (list, result) = tokio::task::spawn_blocking(move || {
            let result = catch_cycle_panic(|| {
                list.reconcile(&options.path, &options.extension, &options.magic)
            });
            (list, result)
        })
        .await
        .map_err(|e| WatchError::Unexpected(format!("scan cycle aborted: {}", e)))?;

        self.watch_list = list;
        let report = result?;
        for event in &report.events {
            log_event(event);
        }
        Ok(report)
    }

    /// Polls until `shutdown` turns true.
    ///
    /// The flag is only looked at between cycles. A cycle that's already
    /// running always finishes; the sleep after it is cut short.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let started = SystemTime::now();
        let start = Instant::now();
        let mut cycles = 0;
        let mut failed_cycles = 0;

        info!(
            "Watching directory: {}, File Extension: {}, Polling Interval: {}s, Magic Text: {}",
            self.options.path.display(),
            self.options.extension,
            self.options.interval.as_secs(),
            self.options.magic
        );

        while !*shutdown.borrow() {
            let mut wait = self.options.interval;

            if let Err(e) = self.poll().await {
                failed_cycles += 1;
                match e.kind() {
                    ErrorKind::DirectoryNotFound => {
                        error!("{} directory not found", self.options.path.display());
                        wait += self.options.grace_period;
                    }
                    ErrorKind::Unexpected => error!("Unhandled error: {}", e),
                    _ => error!("{}", e),
                }
            }
            cycles += 1;

            sleep_unless_stopped(wait, &mut shutdown).await;
        }

        RunSummary {
            started,
            uptime: start.elapsed(),
            cycles,
            failed_cycles,
            tracked_files: self.watch_list.len(),
        }
    }
}

/// Runs `cycle`, turning a panic into [`WatchError::Unexpected`].
fn catch_cycle_panic<T>(cycle: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(cycle)).unwrap_or_else(|payload| {
        Err(WatchError::Unexpected(format!(
            "scan cycle panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

async fn sleep_unless_stopped(wait: Duration, shutdown: &mut watch::Receiver<bool>) {
    let stopped = async {
        // With the sender gone nobody can stop us, so just sleep.
        let closed = shutdown.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = stopped => {}
    }
}

fn log_event(event: &WatchEvent) {
    match event {
        WatchEvent::Added(name) => info!("{} added to watchlist", name),
        WatchEvent::Removed(name) => info!("{} removed from watchlist", name),
        WatchEvent::Matched { file, magic, line } => {
            info!("Found '{}' in {} on line {}", magic, file, line)
        }
        WatchEvent::Truncated {
            file,
            previous,
            current,
        } => info!(
            "{} shrank from {} to {} lines, rescanned from the start",
            file, previous, current
        ),
    }
}

//! Magicwatch Watcher - directory polling and watch-list reconciliation
//!
//! This crate handles the directory side of things:
//! - Listing the watched directory every cycle
//! - Tracking which files match the extension filter
//! - Scanning each tracked file from where the last cycle stopped
//! - Driving cycles on an interval until told to stop
//!
//! Nothing here is recursive and nothing survives a restart.

mod poller;
mod watchlist;

pub use poller::{DirectoryPoller, RunSummary, WatchOptions, DEFAULT_GRACE_PERIOD};
pub use watchlist::{ReconcileReport, WatchEvent, WatchList};

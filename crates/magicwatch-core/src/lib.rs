//! Magicwatch Core - incremental magic-text scanning
//!
//! This crate provides the file-level half of Magicwatch: scanning one
//! file from a stored line offset and reporting every new line that
//! contains the magic text, plus the error taxonomy shared by the
//! watcher and the CLI.
//!
//! # Example
//!
//! ```no_run
//! use magicwatch_core::scan_file;
//! use std::path::Path;
//!
//! let first = scan_file(Path::new("notes.txt"), 0, "TODO").unwrap();
//! // Later, only lines appended since the first scan are checked.
//! let next = scan_file(Path::new("notes.txt"), first.line_count, "TODO").unwrap();
//! println!("{} new matches", next.matches.len());
//! ```

pub mod error;
pub mod scanner;

pub use error::{ErrorKind, Result, WatchError};
pub use scanner::{scan_file, scan_reader, ScanOutcome};

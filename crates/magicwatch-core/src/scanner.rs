//! Scanner module - finds magic text in a file, incrementally.
//!
//! A scan always re-reads the file from the first line and skips
//! everything before the stored line offset. No file handle or byte
//! position survives between calls, so rotated or replaced files need
//! no special casing beyond the truncation check.

use crate::error::{Result, WatchError};
use memchr::memmem;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// What a single scan found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Total number of lines in the file. The next scan starts here.
    ///
    /// A trailing fragment without a newline is counted as a full line.
    /// If a writer later finishes that line, the text appended to it is
    /// never scanned, so a match there goes unreported.
    pub line_count: usize,

    /// 1-based line numbers containing the magic text, in file order.
    pub matches: Vec<usize>,

    /// The file had fewer lines than the starting offset, so it was
    /// treated as rewritten and every line was reported.
    pub truncated: bool,
}

/// Scans `path` for `magic`, starting at the zero-based `start_line`.
///
/// The file is opened, read to the end and closed before this returns,
/// on every path. Open and read failures both map to
/// [`WatchError::FileAccess`]; the caller keeps its old offset.
///
/// # Example
///
/// ```no_run
/// use magicwatch_core::scan_file;
/// use std::path::Path;
///
/// let outcome = scan_file(Path::new("logs/app.txt"), 0, "ERROR").unwrap();
/// for line in &outcome.matches {
///     println!("found on line {}", line);
/// }
/// ```
pub fn scan_file(path: &Path, start_line: usize, magic: &str) -> Result<ScanOutcome> {
    let file = File::open(path).map_err(|e| WatchError::file_access(path, e))?;

    let outcome = scan_reader(BufReader::new(file), start_line, magic)
        .map_err(|e| WatchError::file_access(path, e))?;

    debug!(
        "Scanned {} from line {}: {} lines, {} matches",
        path.display(),
        start_line,
        outcome.line_count,
        outcome.matches.len()
    );

    Ok(outcome)
}

/// Scans any buffered reader (useful for testing or in-memory content).
///
/// Lines are compared as raw bytes, so content that isn't valid UTF-8
/// never aborts a scan. A trailing fragment without a newline still
/// counts as a line.
pub fn scan_reader<R: BufRead>(
    mut reader: R,
    start_line: usize,
    magic: &str,
) -> io::Result<ScanOutcome> {
    let needle = magic.as_bytes();
    let mut buf = Vec::new();
    let mut line_count = 0;
    let mut matches = Vec::new();
    // Matches before the offset only matter if the file turns out shorter.
    let mut skipped = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        if contains(strip_line_ending(&buf), needle) {
            if line_count >= start_line {
                matches.push(line_count + 1);
            } else {
                skipped.push(line_count + 1);
            }
        }
        line_count += 1;
    }

    let truncated = line_count < start_line;
    if truncated {
        matches = skipped;
    }

    Ok(ScanOutcome {
        line_count,
        matches,
        truncated,
    })
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}

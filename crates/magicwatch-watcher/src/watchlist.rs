//! Watch-list reconciliation.
//!
//! Lists the watched directory, diffs it against the tracked files and
//! scans whatever is still tracked. Filenames are the only identity: a
//! file that disappears and comes back starts over at line 0.

use magicwatch_core::{scan_file, Result, WatchError};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Something worth telling the user about after a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A matching file started being tracked.
    Added(String),

    /// A tracked file is gone from the directory listing.
    Removed(String),

    /// A newly scanned line contains the magic text.
    Matched {
        file: String,
        magic: String,
        /// 1-based.
        line: usize,
    },

    /// A file shrank below its stored offset and was rescanned from
    /// the first line.
    Truncated {
        file: String,
        previous: usize,
        current: usize,
    },
}

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Events in the order they happened: adds, removals, then scan results.
    pub events: Vec<WatchEvent>,

    /// Tracked files that couldn't be scanned this cycle. Their offsets
    /// were left alone.
    pub skipped: Vec<WatchError>,
}

/// Tracked files and the number of lines already scanned in each.
///
/// Kept in filename order so cycles are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    entries: BTreeMap<String, usize>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Lines already scanned in `name`, if it's tracked.
    pub fn offset(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    /// Tracked filenames with their offsets, in filename order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Runs one reconciliation pass against `dir`.
    ///
    /// Fails with [`WatchError::DirectoryNotFound`] or
    /// [`WatchError::DirectoryAccess`] when the directory can't be
    /// listed; the watch-list is untouched in that case. Per-file scan
    /// failures don't fail the pass, they end up in
    /// [`ReconcileReport::skipped`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use magicwatch_watcher::WatchList;
    /// use std::path::Path;
    ///
    /// let mut list = WatchList::new();
    /// let report = list.reconcile(Path::new("./logs"), ".txt", "ERROR").unwrap();
    /// println!("{} events, {} files tracked", report.events.len(), list.len());
    /// ```
    pub fn reconcile(
        &mut self,
        dir: &Path,
        extension: &str,
        magic: &str,
    ) -> Result<ReconcileReport> {
        let listing = list_directory(dir)?;
        let mut report = ReconcileReport::default();

        for name in listing.iter().filter(|name| name.ends_with(extension)) {
            if !self.entries.contains_key(name) {
                self.entries.insert(name.clone(), 0);
                report.events.push(WatchEvent::Added(name.clone()));
            }
        }

        // Membership in the full listing decides removal, not the filtered one.
        let gone: Vec<String> = self
            .entries
            .keys()
            .filter(|name| !listing.contains(*name))
            .cloned()
            .collect();
        for name in gone {
            self.entries.remove(&name);
            report.events.push(WatchEvent::Removed(name));
        }

        for (name, offset) in self.entries.iter_mut() {
            let outcome = match scan_file(&dir.join(name), *offset, magic) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("Skipping {} this cycle: {}", name, e);
                    report.skipped.push(e);
                    continue;
                }
            };

            if outcome.truncated {
                report.events.push(WatchEvent::Truncated {
                    file: name.clone(),
                    previous: *offset,
                    current: outcome.line_count,
                });
            }
            report
                .events
                .extend(outcome.matches.into_iter().map(|line| WatchEvent::Matched {
                    file: name.clone(),
                    magic: magic.to_string(),
                    line,
                }));
            *offset = outcome.line_count;
        }

        Ok(report)
    }
}

/// Non-recursive listing of `dir`, by filename.
fn list_directory(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();

    for entry in fs::read_dir(dir).map_err(|e| WatchError::directory(dir, e))? {
        let entry = entry.map_err(|e| WatchError::directory(dir, e))?;
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => debug!("Ignoring non UTF-8 filename {:?}", raw),
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn matched(file: &str, magic: &str, line: usize) -> WatchEvent {
        WatchEvent::Matched {
            file: file.to_string(),
            magic: magic.to_string(),
            line,
        }
    }

    #[test]
    fn test_new_file_is_added_and_scanned() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\nsay hello\n").unwrap();

        let mut list = WatchList::new();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(
            report.events,
            vec![WatchEvent::Added("a.txt".into()), matched("a.txt", "hello", 3)]
        );
        assert_eq!(list.offset("a.txt"), Some(3));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_non_matching_files_are_never_tracked() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "hello\n").unwrap();
        fs::write(dir.path().join("txt"), "hello\n").unwrap();

        let mut list = WatchList::new();
        for _ in 0..3 {
            let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();
            assert!(report.events.is_empty());
        }
        assert!(list.is_empty());
    }

    #[test]
    fn test_second_pass_on_unchanged_directory_is_quiet() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        fs::write(dir.path().join("b.txt"), "nothing\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        let before = list.clone();

        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();
        assert!(report.events.is_empty());
        assert_eq!(list, before);
    }

    #[test]
    fn test_appended_lines_are_scanned_from_previous_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "l1\nl2\nhello l3\nl4\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        assert_eq!(list.offset("a.txt"), Some(4));

        append(&path, "l5\nl6 hello\nl7\n");
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(report.events, vec![matched("a.txt", "hello", 6)]);
        assert_eq!(list.offset("a.txt"), Some(7));
    }

    #[test]
    fn test_deleted_file_is_removed_without_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.txt");
        fs::write(&path, "1\n2\n3\n4\n5\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        assert_eq!(list.offset("b.txt"), Some(5));

        fs::remove_file(&path).unwrap();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(report.events, vec![WatchEvent::Removed("b.txt".into())]);
        assert!(report.skipped.is_empty());
        assert!(!list.contains("b.txt"));
    }

    #[test]
    fn test_recreated_file_starts_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello\nx\nx\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        fs::remove_file(&path).unwrap();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();

        fs::write(&path, "hello\n").unwrap();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(
            report.events,
            vec![WatchEvent::Added("a.txt".into()), matched("a.txt", "hello", 1)]
        );
        assert_eq!(list.offset("a.txt"), Some(1));
    }

    #[test]
    fn test_rename_is_one_add_and_one_remove() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        fs::rename(dir.path().join("a.txt"), dir.path().join("c.txt")).unwrap();

        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();
        assert_eq!(
            report.events,
            vec![
                WatchEvent::Added("c.txt".into()),
                WatchEvent::Removed("a.txt".into()),
                matched("c.txt", "hello", 1),
            ]
        );
    }

    #[test]
    fn test_rename_out_of_filter_is_removed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        fs::rename(dir.path().join("a.txt"), dir.path().join("a.log")).unwrap();

        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();
        assert_eq!(report.events, vec![WatchEvent::Removed("a.txt".into())]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_empty_file_has_zero_offset() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();

        let mut list = WatchList::new();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(report.events, vec![WatchEvent::Added("empty.txt".into())]);
        assert_eq!(list.offset("empty.txt"), Some(0));
    }

    #[test]
    fn test_offset_is_stable_without_new_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a\nb\n").unwrap();

        let mut list = WatchList::new();
        let mut last = 0;
        for _ in 0..4 {
            list.reconcile(dir.path(), ".txt", "hello").unwrap();
            let offset = list.offset("a.txt").unwrap();
            assert!(offset >= last);
            last = offset;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_truncated_file_is_rescanned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "1\n2\n3\n4\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();

        fs::write(&path, "hello again\n").unwrap();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(
            report.events,
            vec![
                WatchEvent::Truncated {
                    file: "a.txt".into(),
                    previous: 4,
                    current: 1,
                },
                matched("a.txt", "hello", 1),
            ]
        );
        assert_eq!(list.offset("a.txt"), Some(1));
    }

    #[test]
    fn test_unreadable_entry_keeps_offset() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.txt")).unwrap();

        let mut list = WatchList::new();
        let report = list.reconcile(dir.path(), ".txt", "hello").unwrap();

        assert_eq!(report.events, vec![WatchEvent::Added("folder.txt".into())]);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0], WatchError::FileAccess { .. }));
        assert_eq!(list.offset("folder.txt"), Some(0));
    }

    #[test]
    fn test_missing_directory_leaves_list_alone() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x\n").unwrap();

        let mut list = WatchList::new();
        list.reconcile(dir.path(), ".txt", "hello").unwrap();
        let before = list.clone();

        let err = list
            .reconcile(&dir.path().join("missing"), ".txt", "hello")
            .unwrap_err();
        assert!(err.is_directory_not_found());
        assert_eq!(list, before);
    }

    #[test]
    fn test_listing_a_file_is_access_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x\n").unwrap();

        let err = WatchList::new().reconcile(&file, ".txt", "hello").unwrap_err();
        assert!(matches!(err, WatchError::DirectoryAccess { .. }));
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Directory snapshots for replaying missed filesystem events.
//!
//! A snapshot records size and modification time of every file below a
//! directory. Comparing a stored snapshot with the directory as it is now
//! yields the create, update and delete events that happened in between.
//!
//! The file format is private to this module:
//!
//! ```text
//! routegen-snapshot 1
//! <mtime nanos>\t<size>\t<path relative to the directory, `/`-separated>
//! ```

use crate::error::{WatchError, WatchResult};
use crate::routes::path_to_slash;
use glob::{glob, Pattern};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const HEADER: &str = "routegen-snapshot 1";

/// Kind of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    /// A file appeared.
    Create,
    /// A file's content or metadata changed.
    Update,
    /// A file disappeared.
    Delete,
}

/// A filesystem change on an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// What happened.
    pub kind: FsEventKind,
    /// Absolute path of the affected file.
    pub path: PathBuf,
}

impl FsEvent {
    /// Creates an event.
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    mtime_nanos: u128,
    size: u64,
}

/// Point-in-time state of a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, FileStamp>,
}

impl Snapshot {
    /// Captures the files below `dir`. A missing directory yields an empty snapshot.
    pub fn capture(dir: &Path) -> WatchResult<Self> {
        let mut files = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(Self { files });
        }

        let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
        let paths = glob(&pattern).map_err(|e| {
            WatchError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        for path in paths.flatten() {
            let Ok(metadata) = fs::metadata(&path) else {
                // Vanished between listing and stat
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let relative = path_to_slash(relative);
            if relative.contains('\n') {
                tracing::debug!("Not recording unrepresentable path {:?}", relative);
                continue;
            }

            let mtime_nanos = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            files.insert(
                relative,
                FileStamp {
                    mtime_nanos,
                    size: metadata.len(),
                },
            );
        }

        Ok(Self { files })
    }

    /// Number of recorded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no file is recorded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn parse(path: &Path, content: &str) -> WatchResult<Self> {
        let corrupt = |line| WatchError::CorruptSnapshot {
            path: path.to_path_buf(),
            line,
        };

        let mut lines = content.lines();
        if lines.next() != Some(HEADER) {
            return Err(corrupt(1));
        }

        let mut files = BTreeMap::new();
        for (i, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, '\t');
            let (Some(mtime), Some(size), Some(relative)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(corrupt(i + 2));
            };
            let stamp = FileStamp {
                mtime_nanos: mtime.parse().map_err(|_| corrupt(i + 2))?,
                size: size.parse().map_err(|_| corrupt(i + 2))?,
            };
            files.insert(relative.to_string(), stamp);
        }

        Ok(Self { files })
    }

    fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for (relative, stamp) in &self.files {
            out.push_str(&format!("{}\t{}\t{}\n", stamp.mtime_nanos, stamp.size, relative));
        }
        out
    }

    /// Reads a stored snapshot.
    pub fn read(path: &Path) -> WatchResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Stores the snapshot, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> WatchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a half-written snapshot
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, self.render())?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Events that turn `self` into `current`, as absolute paths under `dir`.
    pub fn diff(&self, current: &Snapshot, dir: &Path) -> Vec<FsEvent> {
        let mut events = Vec::new();

        for (relative, stamp) in &current.files {
            match self.files.get(relative) {
                None => events.push(FsEvent::new(FsEventKind::Create, dir.join(relative))),
                Some(old) if old != stamp => {
                    events.push(FsEvent::new(FsEventKind::Update, dir.join(relative)))
                }
                Some(_) => {}
            }
        }
        for relative in self.files.keys() {
            if !current.files.contains_key(relative) {
                events.push(FsEvent::new(FsEventKind::Delete, dir.join(relative)));
            }
        }

        events
    }
}

/// Captures `dir` and stores the snapshot at `snapshot_path`.
pub fn write_snapshot(dir: &Path, snapshot_path: &Path) -> WatchResult<()> {
    Snapshot::capture(dir)?.write(snapshot_path)
}

/// Events on `dir` since the snapshot at `snapshot_path` was written.
///
/// # Errors
///
/// Fails when the snapshot is missing or corrupt.
pub fn events_since(dir: &Path, snapshot_path: &Path) -> WatchResult<Vec<FsEvent>> {
    let previous = Snapshot::read(snapshot_path)?;
    let current = Snapshot::capture(dir)?;
    Ok(previous.diff(&current, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_capture_records_nested_files_only() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.tsx"), "a");
        touch(&dir.path().join("nested/route.tsx"), "bb");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let snapshot = Snapshot::capture(dir.path()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.files["nested/route.tsx"].size, 2);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        assert!(Snapshot::capture(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_events_since_reports_create_update_delete() {
        let dir = tempdir().unwrap();
        let routes = dir.path().join("routes");
        let snapshot_path = dir.path().join("cache/pkg/snapshot.txt");
        touch(&routes.join("kept.tsx"), "same");
        touch(&routes.join("changed.tsx"), "old");
        touch(&routes.join("removed.tsx"), "gone");

        write_snapshot(&routes, &snapshot_path).unwrap();

        touch(&routes.join("changed.tsx"), "new content");
        fs::remove_file(routes.join("removed.tsx")).unwrap();
        touch(&routes.join("added.ts"), "");

        let mut events = events_since(&routes, &snapshot_path).unwrap();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            events,
            vec![
                FsEvent::new(FsEventKind::Create, routes.join("added.ts")),
                FsEvent::new(FsEventKind::Update, routes.join("changed.tsx")),
                FsEvent::new(FsEventKind::Delete, routes.join("removed.tsx")),
            ]
        );
    }

    #[test]
    fn test_unchanged_directory_has_no_events() {
        let dir = tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.txt");
        let routes = dir.path().join("routes");
        touch(&routes.join("a.tsx"), "a");

        write_snapshot(&routes, &snapshot_path).unwrap();
        assert!(events_since(&routes, &snapshot_path).unwrap().is_empty());
    }

    #[test]
    fn test_round_trips_through_file() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("routes/a b.tsx"), "x");
        let snapshot = Snapshot::capture(&dir.path().join("routes")).unwrap();
        let path = dir.path().join("snap/snapshot.txt");

        snapshot.write(&path).unwrap();
        assert_eq!(Snapshot::read(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_corrupt_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.txt");

        fs::write(&path, "something else\n").unwrap();
        assert!(matches!(
            Snapshot::read(&path),
            Err(WatchError::CorruptSnapshot { line: 1, .. })
        ));

        fs::write(&path, format!("{}\n12\tnot-a-size\ta.tsx\n", HEADER)).unwrap();
        assert!(matches!(
            Snapshot::read(&path),
            Err(WatchError::CorruptSnapshot { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(events_since(dir.path(), &dir.path().join("absent.txt")).is_err());
    }
}

//! Recently closed list.
//!
//! Closed anonymous files are moved into the archive directory and their
//! names appended here. When the archive holds more files than it should, the
//! oldest names are popped and their files deleted. The list is stored as
//! plain text, one name per line, and rewritten in full after each change.

use crate::error::{AnonError, Result};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// What one eviction pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eviction {
    /// Names whose files were deleted
    pub removed: Vec<String>,
    /// Names whose files were already gone
    pub missing: Vec<String>,
    /// Names whose files could not be deleted
    pub failed: Vec<String>,
    /// Files left in the archive beyond capacity after the list ran out
    pub excess: usize,
}

impl Eviction {
    /// Names dropped from the list, whatever happened to their files
    pub fn dropped(&self) -> usize {
        self.removed.len() + self.missing.len() + self.failed.len()
    }
}

/// Ordered names of archived files, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    names: VecDeque<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            names: VecDeque::new(),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the list from `path`. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| AnonError::StorageRead {
            path: path.to_path_buf(),
            source,
        })?;

        let names = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        Ok(Self { names })
    }

    /// Append a newly archived name.
    ///
    /// An earlier entry with the same name is dropped: archiving under that
    /// name has already replaced its file, so only the newest position counts.
    pub fn record(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.names.retain(|existing| *existing != name);
        self.names.push_back(name);
    }

    /// Delete the oldest archived files until the archive directory and this
    /// list both fit in `capacity`, or the list is empty.
    ///
    /// Files that are already gone are skipped. Other deletion errors are
    /// logged and reported, never returned.
    pub fn evict_if_over_capacity(&mut self, archive_dir: &Path, capacity: usize) -> Eviction {
        let mut eviction = Eviction::default();

        loop {
            let count = match count_files(archive_dir) {
                Ok(count) => count,
                Err(e) => {
                    log::error!("Cannot list {}: {}", archive_dir.display(), e);
                    break;
                }
            };

            match count > capacity || self.names.len() > capacity {
                true => {}
                false => break,
            }

            let oldest = match self.names.pop_front() {
                Some(name) => name,
                None => {
                    eviction.excess = count - capacity;
                    log::warn!(
                        "{} holds {} files but only {} are kept; none of the extra files are in the recently closed list",
                        archive_dir.display(),
                        count,
                        capacity
                    );
                    break;
                }
            };

            match fs::remove_file(archive_dir.join(&oldest)) {
                Ok(()) => {
                    log::info!("Deleted {}", oldest);
                    eviction.removed.push(oldest);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("{} was already gone", oldest);
                    eviction.missing.push(oldest);
                }
                Err(e) => {
                    log::error!("Failed to delete {}: {}", oldest, e);
                    eviction.failed.push(oldest);
                }
            }
        }

        eviction
    }

    /// Overwrite `path` with one name per line.
    ///
    /// The list goes to a sibling temporary file first and is renamed into
    /// place, so an interrupted write leaves the old list intact.
    pub fn persist(&self, path: &Path) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no file name"))?;
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let written = self
            .write_lines(&tmp_path)
            .and_then(|()| fs::rename(&tmp_path, path));
        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    fn write_lines(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        for name in &self.names {
            writeln!(file, "{}", name)?;
        }
        file.sync_all()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Number of regular files directly inside `dir`
fn count_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        match entry?.file_type()?.is_file() {
            true => count += 1,
            false => {}
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn archive(ledger: &mut Ledger, dir: &Path, name: &str, capacity: usize) -> Eviction {
        fs::write(dir.join(name), name).unwrap();
        ledger.record(name);
        ledger.evict_if_over_capacity(dir, capacity)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_capacity_two_keeps_newest() {
        let root = TempDir::new().unwrap();
        let archive_dir = root.path().join("recent");
        fs::create_dir(&archive_dir).unwrap();
        let store = root.path().join("recent_files.txt");

        let mut ledger = Ledger::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            archive(&mut ledger, &archive_dir, name, 2);
            ledger.persist(&store).unwrap();
        }

        assert_eq!(files_in(&archive_dir), vec!["b.txt", "c.txt"]);
        assert_eq!(ledger.to_vec(), vec!["b.txt", "c.txt"]);
        assert_eq!(fs::read_to_string(&store).unwrap(), "b.txt\nc.txt\n");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let root = TempDir::new().unwrap();
        let dir = root.path();

        let mut ledger = Ledger::new();
        archive(&mut ledger, dir, "x.txt", 1);
        fs::remove_file(dir.join("x.txt")).unwrap();

        let eviction = archive(&mut ledger, dir, "y.txt", 1);
        assert_eq!(eviction.missing, vec!["x.txt"]);
        assert!(eviction.removed.is_empty());
        assert_eq!(ledger.to_vec(), vec!["y.txt"]);
        assert_eq!(files_in(dir), vec!["y.txt"]);
    }

    #[test]
    fn test_eviction_is_fifo_and_bounded() {
        for capacity in 1..=4 {
            let root = TempDir::new().unwrap();
            let dir = root.path();
            let mut ledger = Ledger::new();
            let mut evicted = Vec::new();

            for i in 0..10 {
                let eviction = archive(&mut ledger, dir, &format!("f{}.txt", i), capacity);
                evicted.extend(eviction.removed);
                assert!(files_in(dir).len() <= capacity);
                assert!(ledger.len() <= capacity);
            }

            let expected: Vec<String> =
                (0..10 - capacity).map(|i| format!("f{}.txt", i)).collect();
            assert_eq!(evicted, expected);
        }
    }

    #[test]
    fn test_empty_ledger_leaves_excess() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        for name in ["stray1", "stray2", "stray3"] {
            fs::write(dir.join(name), "").unwrap();
        }

        let mut ledger = Ledger::new();
        let eviction = ledger.evict_if_over_capacity(dir, 1);
        assert_eq!(eviction.excess, 2);
        assert_eq!(eviction.dropped(), 0);
        assert_eq!(files_in(dir).len(), 3);
    }

    #[test]
    fn test_subdirectories_not_counted() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        fs::create_dir(dir.join("nested")).unwrap();

        let mut ledger = Ledger::new();
        let eviction = archive(&mut ledger, dir, "only.txt", 1);
        assert_eq!(eviction, Eviction::default());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_rearchived_name_survives() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        let mut ledger = Ledger::new();

        fs::write(dir.join("a.txt"), "old a").unwrap();
        ledger.record("a.txt");
        ledger.evict_if_over_capacity(dir, 2);
        archive(&mut ledger, dir, "b.txt", 2);

        // the same name closed again replaces the archived copy
        fs::write(dir.join("a.txt"), "new a").unwrap();
        ledger.record("a.txt");
        let eviction = ledger.evict_if_over_capacity(dir, 2);

        assert_eq!(eviction, Eviction::default());
        assert_eq!(ledger.to_vec(), vec!["b.txt", "a.txt"]);
        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "new a");
    }

    #[test]
    fn test_undeletable_entry_is_reported() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        fs::create_dir(dir.join("sub")).unwrap();
        fs::write(dir.join("f1"), "").unwrap();
        fs::write(dir.join("f2"), "").unwrap();

        let mut ledger = Ledger::from_names(["sub", "f1", "f2"]);
        let eviction = ledger.evict_if_over_capacity(dir, 1);

        assert_eq!(eviction.failed, vec!["sub"]);
        assert_eq!(eviction.removed, vec!["f1"]);
        assert_eq!(ledger.to_vec(), vec!["f2"]);
        assert!(dir.join("sub").is_dir());
    }

    #[test]
    fn test_failed_persist_cleans_up() {
        let root = TempDir::new().unwrap();
        let store = root.path().join("recent_files.txt");
        // a non-empty directory where the list should go makes the rename fail
        fs::create_dir(&store).unwrap();
        fs::write(store.join("inside"), "").unwrap();

        assert!(Ledger::from_names(["a.txt"]).persist(&store).is_err());
        assert!(!root.path().join(".recent_files.txt.tmp").exists());
        assert!(store.is_dir());
    }

    #[test]
    fn test_persist_then_load() {
        let root = TempDir::new().unwrap();
        let store = root.path().join("recent_files.txt");
        let ledger = Ledger::from_names(["af_abc.txt", "with space.md", "af_xyz.txt"]);

        ledger.persist(&store).unwrap();
        assert_eq!(Ledger::load(&store).unwrap(), ledger);
        assert!(!root.path().join(".recent_files.txt.tmp").exists());
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let root = TempDir::new().unwrap();
        let store = root.path().join("recent_files.txt");
        fs::write(&store, "one\n\n  two  \n").unwrap();

        assert_eq!(Ledger::load(&store).unwrap().to_vec(), vec!["one", "two"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let root = TempDir::new().unwrap();
        let err = Ledger::load(&root.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, AnonError::StorageRead { .. }));
    }
}

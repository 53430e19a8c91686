//! Anonymous file lifecycle.
//!
//! A `Session` creates anonymous files in the scratch directory and remembers
//! which ones it owns. Closing an owned file moves it into the recently closed
//! directory, records it in the ledger, evicts the oldest archived files and
//! writes the ledger back to disk. Saving or keeping a file releases it so it
//! is never archived.

use crate::error::{AnonError, Result};
use crate::ledger::{Eviction, Ledger};
use crate::paths;
use crate::settings::Settings;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Every anonymous file name starts with this
pub const NAME_PREFIX: &str = "af_";

const TOKEN_LEN: usize = 3;
const TOKEN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Result of closing a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Not an anonymous file from the scratch directory; left untouched
    Ignored,
    /// Moved into the recently closed directory
    Archived { name: String, eviction: Eviction },
}

/// A recently closed file with the time it was archived, if still on disk
#[derive(Debug, Clone)]
pub struct RecentEntry {
    pub name: String,
    pub closed: Option<DateTime<Local>>,
}

pub struct Session {
    settings: Settings,
    ledger: Ledger,
    tracked: HashSet<String>,
}

impl Session {
    /// Create the scratch and recently closed directories and an empty
    /// ledger file if they are missing.
    pub fn init(settings: &Settings) -> Result<()> {
        fs::create_dir_all(&settings.dir)?;
        fs::create_dir_all(&settings.recently_closed)?;

        let ledger_path = settings.ledger_path();
        match ledger_path.exists() {
            true => {}
            false => {
                Ledger::new().persist(&ledger_path)?;
                log::info!("Created {}", ledger_path.display());
            }
        }
        Ok(())
    }

    /// Start a session. Fails if the ledger file can't be read.
    pub fn open(settings: Settings) -> Result<Self> {
        let ledger = Ledger::load(&settings.ledger_path())?;
        log::debug!("Loaded {} recently closed names", ledger.len());
        Ok(Self {
            settings,
            ledger,
            tracked: HashSet::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Swap in new settings. The ledger is kept and written to the new
    /// scratch directory on the next close.
    pub fn apply_settings(&mut self, settings: Settings) {
        match settings.dir == self.settings.dir {
            true => {}
            false => log::info!(
                "Scratch directory changed to {}; files created earlier are no longer archived",
                settings.dir.display()
            ),
        }
        self.settings = settings;
    }

    /// A fresh `af_XXX<ext>` name
    pub fn generate_name(&self) -> String {
        let token: String = (0..TOKEN_LEN)
            .map(|_| {
                let idx = rand::random::<usize>() % TOKEN_CHARS.len();
                TOKEN_CHARS[idx] as char
            })
            .collect();
        format!("{}{}{}", NAME_PREFIX, token, self.settings.file_extension)
    }

    /// Create a new empty anonymous file and start tracking it.
    /// An existing file with the same name is never overwritten.
    pub fn create(&mut self) -> Result<PathBuf> {
        let name = self.generate_name();
        let path = self.settings.dir.join(&name);

        OpenOptions::new().write(true).create_new(true).open(&path)?;
        self.track(name.clone());

        log::info!("Created {}", name);
        self.log_recent();
        Ok(path)
    }

    /// Take ownership of a file in the scratch directory
    pub fn track(&mut self, name: impl Into<String>) {
        self.tracked.insert(name.into());
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked_name(path).is_some()
    }

    /// Track every anonymous file already sitting in the scratch directory.
    /// Returns how many were picked up.
    pub fn adopt_existing(&mut self) -> Result<usize> {
        let mut adopted = 0;
        for entry in fs::read_dir(&self.settings.dir)? {
            let entry = entry?;
            match entry.file_type()?.is_file() {
                true => {}
                false => continue,
            }
            match entry.file_name().to_str() {
                Some(name) if self.is_anonymous_name(name) => {
                    match self.tracked.insert(name.to_string()) {
                        true => adopted += 1,
                        false => {}
                    }
                }
                _ => {}
            }
        }
        log::debug!("Adopted {} existing anonymous files", adopted);
        Ok(adopted)
    }

    /// Whether `name` has the shape of a generated name
    pub fn is_anonymous_name(&self, name: &str) -> bool {
        match name
            .strip_prefix(NAME_PREFIX)
            .and_then(|rest| rest.strip_suffix(self.settings.file_extension.as_str()))
        {
            Some(token) => {
                token.len() == TOKEN_LEN && token.bytes().all(|b| TOKEN_CHARS.contains(&b))
            }
            None => false,
        }
    }

    /// Handle a file being closed.
    ///
    /// Owned files are moved to the recently closed directory. A failed move
    /// is returned and the file stays tracked. Failures while evicting old
    /// files or writing the ledger are logged and do not fail the close.
    pub fn close(&mut self, path: &Path) -> Result<CloseOutcome> {
        let name = match self.tracked_name(path) {
            Some(name) => name,
            None => {
                log::debug!("Ignoring close of {}", path.display());
                return Ok(CloseOutcome::Ignored);
            }
        };

        move_file(path, &self.settings.recently_closed.join(&name))?;
        self.tracked.remove(&name);

        self.ledger.record(name.clone());
        let eviction = self
            .ledger
            .evict_if_over_capacity(&self.settings.recently_closed, self.settings.keep);

        let ledger_path = self.settings.ledger_path();
        match self.ledger.persist(&ledger_path) {
            Ok(()) => {}
            Err(e) => log::error!("Failed to write {}: {}", ledger_path.display(), e),
        }

        log::info!("Closed {}", name);
        self.log_recent();
        Ok(CloseOutcome::Archived { name, eviction })
    }

    /// Move an owned file to `dest` and stop tracking it.
    /// When `dest` is a directory the file keeps its name.
    pub fn save_as(&mut self, path: &Path, dest: &Path) -> Result<PathBuf> {
        let name = self
            .tracked_name(path)
            .ok_or_else(|| AnonError::NotTracked(path.to_path_buf()))?;

        let target = match dest.is_dir() {
            true => dest.join(&name),
            false => dest.to_path_buf(),
        };
        match target.exists() {
            true => {
                return Err(AnonError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", target.display()),
                )))
            }
            false => {}
        }

        move_file(path, &target)?;
        self.tracked.remove(&name);
        log::info!("Saved {} as {}", name, target.display());
        Ok(target)
    }

    /// Stop tracking an owned file and leave it where it is
    pub fn keep(&mut self, path: &Path) -> Result<()> {
        let name = self
            .tracked_name(path)
            .ok_or_else(|| AnonError::NotTracked(path.to_path_buf()))?;
        self.tracked.remove(&name);
        log::info!("Keeping {}", name);
        Ok(())
    }

    /// Recently closed files, oldest first
    pub fn recent_entries(&self) -> Vec<RecentEntry> {
        self.ledger
            .names()
            .map(|name| RecentEntry {
                name: name.to_string(),
                closed: fs::metadata(self.settings.recently_closed.join(name))
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Local>::from),
            })
            .collect()
    }

    /// File name of `path` if this session owns it and it lives in the
    /// scratch directory
    fn tracked_name(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let parent = path.parent()?;
        match parent.as_os_str().is_empty() {
            true => return None,
            false => {}
        }
        let parent = paths::absolute(parent);
        match self.tracked.contains(name) && parent == paths::absolute(&self.settings.dir) {
            true => Some(name.to_string()),
            false => None,
        }
    }

    fn log_recent(&self) {
        log::info!("Recently closed files:");
        for name in self.ledger.names() {
            log::info!("  {}", name);
        }
    }
}

/// Rename, falling back to copy and delete when a plain rename fails
/// (e.g. across filesystems)
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            log::debug!("Rename {} failed ({}), copying", from.display(), e);
            copy_then_remove(from, to)
        }
    }
}

/// Copy `from` to `to` and delete `from`. If `from` can't be deleted the copy
/// is removed again, so the file only ever ends up in one place.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    match fs::remove_file(from) {
        Ok(()) => Ok(()),
        Err(e) => {
            match fs::remove_file(to) {
                Ok(()) => {}
                Err(cleanup) => log::error!("Failed to remove copy {}: {}", to.display(), cleanup),
            }
            Err(e)
        }
    }
}

//! Settings for anonymous files.
//!
//! `RawSettings` is what lives in `settings.toml`, before any expansion.
//! `Settings` is the resolved and validated form the session works with.
//! Changes go through `Settings::update`, which returns a new validated value
//! and leaves the current one alone when the change is rejected.

use crate::error::{AnonError, Result};
use crate::paths::{self, Variables};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest allowed `keep`
pub const MIN_KEEP: i64 = 1;
/// Largest allowed `keep`
pub const MAX_KEEP: i64 = 100;

/// Name of the recently closed list inside the scratch directory
pub const LEDGER_FILE: &str = "recent_files.txt";

/// Settings as written in the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSettings {
    /// Directory new anonymous files are created in
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Directory closed anonymous files are moved to
    #[serde(default = "default_recently_closed")]
    pub recently_closed: String,
    /// How many closed files to retain
    #[serde(default = "default_keep")]
    pub keep: i64,
    /// Appended to every generated name, e.g. ".txt"
    #[serde(default = "default_extension")]
    pub file_extension: String,
}

fn default_dir() -> String {
    "${data}/anonfile/files".to_string()
}

fn default_recently_closed() -> String {
    "${data}/anonfile/recent".to_string()
}

fn default_keep() -> i64 {
    10
}

fn default_extension() -> String {
    ".txt".to_string()
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            recently_closed: default_recently_closed(),
            keep: default_keep(),
            file_extension: default_extension(),
        }
    }
}

impl RawSettings {
    /// `<config dir>/anonfile/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AnonError::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("anonfile").join("settings.toml"))
    }

    /// Read settings from `path`, falling back to defaults when it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        match path.exists() {
            true => {
                let contents = fs::read_to_string(path)?;
                Ok(toml::from_str(&contents)?)
            }
            false => {
                log::debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) => fs::create_dir_all(parent)?,
            None => {}
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)
            .map_err(|e| AnonError::Configuration(format!("Failed to write settings: {}", e)))?;
        Ok(())
    }

    /// Copy of these settings with one value replaced
    pub fn with_change(&self, change: &SettingChange) -> Self {
        let mut raw = self.clone();
        match change {
            SettingChange::Dir(v) => raw.dir = v.clone(),
            SettingChange::RecentlyClosed(v) => raw.recently_closed = v.clone(),
            SettingChange::Keep(v) => raw.keep = *v,
            SettingChange::FileExtension(v) => raw.file_extension = v.clone(),
        }
        raw
    }
}

/// A single settings change, as delivered by a change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Dir(String),
    RecentlyClosed(String),
    Keep(i64),
    FileExtension(String),
}

impl SettingChange {
    /// Build a change from a key name and its textual value
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        match key {
            "dir" => Ok(SettingChange::Dir(value.to_string())),
            "recently_closed" => Ok(SettingChange::RecentlyClosed(value.to_string())),
            "keep" => value.trim().parse::<i64>().map(SettingChange::Keep).map_err(|_| {
                AnonError::Configuration(format!("\"keep\" must be an integer, got {:?}", value))
            }),
            "file_extension" => Ok(SettingChange::FileExtension(value.to_string())),
            other => Err(AnonError::Configuration(format!("Unknown setting {:?}", other))),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SettingChange::Dir(_) => "dir",
            SettingChange::RecentlyClosed(_) => "recently_closed",
            SettingChange::Keep(_) => "keep",
            SettingChange::FileExtension(_) => "file_extension",
        }
    }
}

/// Resolved, validated settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dir: PathBuf,
    pub recently_closed: PathBuf,
    pub keep: usize,
    pub file_extension: String,
}

impl Settings {
    /// Expand and fully validate raw settings
    pub fn resolve(raw: &RawSettings, vars: &Variables) -> Result<Self> {
        let settings = Self::expand(raw, vars)?;
        settings.check_directories()?;
        Ok(settings)
    }

    /// Expand paths and validate `keep` and `file_extension` only.
    /// The directories may not exist yet.
    pub fn expand(raw: &RawSettings, vars: &Variables) -> Result<Self> {
        Ok(Self {
            dir: paths::resolve(&raw.dir, vars),
            recently_closed: paths::resolve(&raw.recently_closed, vars),
            keep: check_keep(raw.keep)?,
            file_extension: check_extension(&raw.file_extension)?,
        })
    }

    /// Both directories must exist
    pub fn check_directories(&self) -> Result<()> {
        check_dir("dir", &self.dir)?;
        check_dir("recently_closed", &self.recently_closed)
    }

    /// Apply one change, returning the new settings or why it was rejected
    pub fn update(&self, change: &SettingChange, vars: &Variables) -> Result<Settings> {
        let mut next = self.clone();
        match change {
            SettingChange::Dir(raw) => {
                let dir = paths::resolve(raw, vars);
                check_dir("dir", &dir)?;
                next.dir = dir;
            }
            SettingChange::RecentlyClosed(raw) => {
                let dir = paths::resolve(raw, vars);
                check_dir("recently_closed", &dir)?;
                next.recently_closed = dir;
            }
            SettingChange::Keep(keep) => next.keep = check_keep(*keep)?,
            SettingChange::FileExtension(ext) => next.file_extension = check_extension(ext)?,
        }
        log::info!("Setting {:?} updated", change.key());
        Ok(next)
    }

    /// Where the recently closed list is stored
    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }
}

fn check_dir(key: &str, dir: &Path) -> Result<()> {
    match dir.is_dir() {
        true => Ok(()),
        false => Err(AnonError::Configuration(format!(
            "\"{}\" must be an existing directory: {}",
            key,
            dir.display()
        ))),
    }
}

fn check_keep(keep: i64) -> Result<usize> {
    match keep {
        k if k < MIN_KEEP => Err(AnonError::Configuration(format!(
            "\"keep\" must be greater than or equal to {}",
            MIN_KEEP
        ))),
        k if k > MAX_KEEP => Err(AnonError::Configuration(format!(
            "\"keep\" cannot be more than {}",
            MAX_KEEP
        ))),
        k => Ok(k as usize),
    }
}

fn check_extension(ext: &str) -> Result<String> {
    match ext.is_empty() {
        true => Err(AnonError::Configuration("must give a file extension".to_string())),
        false => Ok(ext.to_string()),
    }
}

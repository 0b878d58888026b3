/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule persistence.
//!
//! The controller loads its [`Schedules`] once at startup and saves the
//! whole set after every accepted mutation.  Pool and hot tub keep separate
//! files so one host can run either installation:
//!
//! | Mode | File |
//! |---|---|
//! | pool | `<data_dir>/PoolData.json` |
//! | hot tub | `<data_dir>/HotTubData.json` |
//!
//! A file that exists but does not parse is renamed to `<file>.bad` on load,
//! so the defaults the controller falls back to never overwrite it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::device::Mode;
use crate::schedule::Schedules;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schedule data in {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("refusing to overwrite unreadable schedule file {path}")]
    Protected { path: String },
}

/// Where schedules live between runs.
pub trait ScheduleStore: Send {
    /// Stored schedules, or defaults when nothing was saved yet.
    fn load(&mut self) -> Result<Schedules, PersistError>;

    fn save(&mut self, schedules: &Schedules) -> Result<(), PersistError>;
}

// ── JSON file ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Set when an unreadable file could not be moved aside.
    protected: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            protected: false,
        }
    }

    /// Store for `mode` inside `data_dir`.
    pub fn for_mode(data_dir: &Path, mode: Mode) -> Self {
        let file = match mode {
            Mode::Pool => "PoolData.json",
            Mode::HotTub => "HotTubData.json",
        };
        Self::new(data_dir.join(file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable schedule file is moved to.
    pub fn quarantine_path(&self) -> PathBuf {
        self.path.with_extension("json.bad")
    }

    fn quarantine(&mut self) {
        let aside = self.quarantine_path();
        match fs::rename(&self.path, &aside) {
            Ok(()) => warn!(
                "Unreadable schedule file moved to {}",
                aside.display()
            ),
            Err(e) => {
                error!(
                    "Cannot move unreadable {} aside ({e}); saving disabled",
                    self.path.display()
                );
                self.protected = true;
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ScheduleStore for JsonFileStore {
    fn load(&mut self) -> Result<Schedules, PersistError> {
        if !self.path.exists() {
            info!("No schedule file at {}, starting empty", self.path.display());
            return Ok(Schedules::default());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let schedules: Schedules = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(source) => {
                let err = PersistError::Format {
                    path: self.path.display().to_string(),
                    source,
                };
                self.quarantine();
                return Err(err);
            }
        };

        info!(
            intervals = schedules.interval_count(),
            "Loaded schedules from {}",
            self.path.display()
        );
        Ok(schedules)
    }

    /// Writes to a sibling temp file first and renames it into place, so a
    /// crash mid-write leaves the previous file intact.
    fn save(&mut self, schedules: &Schedules) -> Result<(), PersistError> {
        if self.protected {
            return Err(PersistError::Protected {
                path: self.path.display().to_string(),
            });
        }

        let json = serde_json::to_string_pretty(schedules).map_err(|source| PersistError::Format {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "schedules saved");
        Ok(())
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

/// Store that keeps the last saved value in memory.
///
/// Clones share the same slot, so a test can hand one clone to the
/// controller and inspect what was saved through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    saved: Option<Schedules>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store as if `schedules` had been saved earlier.
    pub fn with(schedules: Schedules) -> Self {
        let store = Self::default();
        store.lock().saved = Some(schedules);
        store
    }

    pub fn saved(&self) -> Option<Schedules> {
        self.lock().saved.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ScheduleStore for MemoryStore {
    fn load(&mut self) -> Result<Schedules, PersistError> {
        Ok(self.lock().saved.clone().unwrap_or_default())
    }

    fn save(&mut self, schedules: &Schedules) -> Result<(), PersistError> {
        let mut inner = self.lock();
        inner.saved = Some(schedules.clone());
        inner.saves += 1;
        Ok(())
    }
}

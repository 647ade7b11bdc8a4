//! Durable state shared between worker invocations.
//!
//! The state directory holds everything a memoryless worker needs to resume:
//!
//! - [`backlog`] - `prd.json`, the items for this run
//! - [`progress`] - `progress.txt`, patterns plus append-only history
//! - [`handoff`] - `handoff.json`, present only while an item is mid-flight
//! - `.last-branch` - run identity most recently processed
//!
//! Every write is a whole-file replace through [`atomic::write_atomic`], so a
//! crash never leaves a half-written file for the next reader.

pub mod atomic;
pub mod backlog;
pub mod handoff;
pub mod lock;
pub mod progress;

pub use backlog::{Backlog, Item};
pub use handoff::{CurrentStory, HandoffReason, HandoffRecord, StoryStatus, WorkInProgress};
pub use lock::RunLock;
pub use progress::{HistoryEntry, ProgressLog};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::StateFiles;
use crate::error::{BatonError, Result};

/// Absolute locations of every state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub root: PathBuf,
    pub backlog: PathBuf,
    pub progress: PathBuf,
    pub handoff: PathBuf,
    pub marker: PathBuf,
    pub archive_dir: PathBuf,
    pub instructions: PathBuf,
    pub lock: PathBuf,
}

impl StatePaths {
    /// Resolve file names against `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, files: &StateFiles) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            backlog: root.join(&files.backlog),
            progress: root.join(&files.progress),
            handoff: root.join(&files.handoff),
            marker: root.join(&files.marker),
            archive_dir: root.join(&files.archive_dir),
            instructions: root.join(&files.instructions),
            lock: root.join(&files.lock),
            root,
        }
    }
}

/// Typed read/write access to the state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    paths: StatePaths,
}

impl StateStore {
    /// Create a store over the given paths.
    #[must_use]
    pub fn new(paths: StatePaths) -> Self {
        Self { paths }
    }

    /// Create a store with default file names under `root`.
    #[must_use]
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::new(StatePaths::new(root, &StateFiles::default()))
    }

    /// File locations.
    #[must_use]
    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    /// Take the run lock for this directory.
    pub fn lock(&self) -> Result<RunLock> {
        RunLock::acquire(&self.paths.lock)
    }

    // =========================================================================
    // Backlog
    // =========================================================================

    /// Load and validate the backlog.
    ///
    /// # Errors
    ///
    /// [`BatonError::MissingFile`] if absent, [`BatonError::MalformedBacklog`]
    /// if unparseable or invalid.
    pub fn load_backlog(&self) -> Result<Backlog> {
        let path = &self.paths.backlog;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BatonError::MissingFile { path: path.clone() })
            }
            Err(e) => return Err(e.into()),
        };
        Backlog::from_json(&content, path)
    }

    // =========================================================================
    // Run identity
    // =========================================================================

    /// Identity recorded by the previous run, `None` if never recorded.
    pub fn load_run_identity(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.paths.marker) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record the identity being processed.
    pub fn store_run_identity(&self, token: &str) -> Result<()> {
        debug!("Recording run identity '{}'", token);
        atomic::write_atomic(&self.paths.marker, format!("{token}\n").as_bytes())
    }

    // =========================================================================
    // Progress log
    // =========================================================================

    /// Create the progress log skeleton if absent. Returns true if created.
    pub fn ensure_progress_log(&self) -> Result<bool> {
        if self.paths.progress.exists() {
            return Ok(false);
        }
        debug!("Creating {}", self.paths.progress.display());
        self.write_progress_skeleton()?;
        Ok(true)
    }

    /// Overwrite the progress log with a fresh skeleton.
    pub fn reset_progress_log(&self) -> Result<()> {
        debug!("Resetting {}", self.paths.progress.display());
        self.write_progress_skeleton()
    }

    fn write_progress_skeleton(&self) -> Result<()> {
        atomic::write_atomic(
            &self.paths.progress,
            ProgressLog::skeleton(Utc::now()).as_bytes(),
        )
    }

    /// Parsed progress log, `None` if absent.
    pub fn load_progress_log(&self) -> Result<Option<ProgressLog>> {
        match fs::read_to_string(&self.paths.progress) {
            Ok(content) => Ok(Some(ProgressLog::parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Handoff record
    // =========================================================================

    /// Whether a handoff file is on disk, valid or not.
    #[must_use]
    pub fn handoff_exists(&self) -> bool {
        self.paths.handoff.exists()
    }

    /// Load the handoff record.
    ///
    /// A record that cannot be read or parsed is reported and treated as
    /// absent; the file itself is left for the worker to reconcile.
    pub fn load_handoff(&self) -> Option<HandoffRecord> {
        let content = match fs::read_to_string(&self.paths.handoff) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "Cannot read handoff record {}: {}",
                    self.paths.handoff.display(),
                    e
                );
                return None;
            }
        };

        match HandoffRecord::from_json(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "Ignoring unreadable handoff record {}: {}",
                    self.paths.handoff.display(),
                    e
                );
                None
            }
        }
    }

    /// Delete the handoff record. Returns true if one was removed.
    pub fn clear_handoff(&self) -> Result<bool> {
        match fs::remove_file(&self.paths.handoff) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

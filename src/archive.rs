//! Run-boundary detection and archive snapshots.
//!
//! When the backlog's run identity differs from the one recorded by the
//! previous run, the old backlog, progress log and handoff record are copied
//! into `archive/<date>-<previous identity>/` before the live progress log is
//! reset and the handoff record removed. State from one backlog never leaks
//! into the next, and the trail of earlier runs is kept.

use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{IntoBatonError, Result};
use crate::state::{Backlog, StateStore};

/// Identity prefixes dropped from snapshot names.
const IDENTITY_PREFIXES: &[&str] = &["ralph/", "baton/"];

/// What startup reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Backlog carries no run identity; nothing recorded.
    Unidentified,
    /// No previous identity on record.
    FirstRun { identity: String },
    /// Same identity as the previous run.
    SameRun { identity: String },
    /// Run boundary crossed and prior state snapshotted.
    Archived {
        previous: String,
        current: String,
        snapshot: PathBuf,
        files: Vec<PathBuf>,
    },
}

impl std::fmt::Display for ArchiveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveOutcome::Unidentified => write!(f, "backlog has no run identity"),
            ArchiveOutcome::FirstRun { identity } => write!(f, "first run of '{identity}'"),
            ArchiveOutcome::SameRun { identity } => write!(f, "continuing '{identity}'"),
            ArchiveOutcome::Archived {
                previous,
                current,
                snapshot,
                ..
            } => write!(
                f,
                "'{previous}' -> '{current}', archived to {}",
                snapshot.display()
            ),
        }
    }
}

/// Manager for archive snapshots
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    store: StateStore,
}

impl ArchiveManager {
    /// Create a new archive manager
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Get archive directory
    fn archive_dir(&self) -> &Path {
        &self.store.paths().archive_dir
    }

    /// Compare the backlog identity with `previous` and archive on change.
    ///
    /// `previous` is the marker value read once at startup.
    pub fn reconcile(&self, backlog: &Backlog, previous: Option<&str>) -> Result<ArchiveOutcome> {
        self.reconcile_on(backlog, previous, Local::now().date_naive())
    }

    /// [`reconcile`](Self::reconcile) with an explicit archive date.
    pub fn reconcile_on(
        &self,
        backlog: &Backlog,
        previous: Option<&str>,
        date: NaiveDate,
    ) -> Result<ArchiveOutcome> {
        let Some(current) = backlog.run_identity() else {
            debug!("Backlog has no run identity, leaving marker untouched");
            return Ok(ArchiveOutcome::Unidentified);
        };

        let outcome = match previous {
            None => ArchiveOutcome::FirstRun {
                identity: current.to_string(),
            },
            Some(previous) if previous == current => ArchiveOutcome::SameRun {
                identity: current.to_string(),
            },
            Some(previous) => {
                let (snapshot, files) = self.snapshot(previous, date)?;
                self.store.reset_progress_log()?;
                if self.store.clear_handoff()? {
                    debug!("Removed handoff record left by '{}'", previous);
                }
                info!(
                    "Run identity changed '{}' -> '{}', archived {} file(s) to {}",
                    previous,
                    current,
                    files.len(),
                    snapshot.display()
                );
                ArchiveOutcome::Archived {
                    previous: previous.to_string(),
                    current: current.to_string(),
                    snapshot,
                    files,
                }
            }
        };

        // Marker last, so a failed snapshot is retried on the next start.
        if !matches!(outcome, ArchiveOutcome::SameRun { .. }) {
            self.store.store_run_identity(current)?;
        }
        Ok(outcome)
    }

    /// Copy live state into a fresh snapshot directory.
    fn snapshot(&self, previous: &str, date: NaiveDate) -> Result<(PathBuf, Vec<PathBuf>)> {
        let dir = self.create_snapshot_dir(&snapshot_name(previous, date))?;
        let paths = self.store.paths();

        let mut files = Vec::new();
        for source in [&paths.backlog, &paths.progress, &paths.handoff] {
            if !source.exists() {
                continue;
            }
            let Some(name) = source.file_name() else {
                continue;
            };
            let dest = dir.join(name);
            fs::copy(source, &dest).into_baton_archive()?;
            files.push(dest);
        }

        Ok((dir, files))
    }

    /// Create a uniquely named directory, appending `-2`, `-3`, ... on collision.
    fn create_snapshot_dir(&self, base: &str) -> Result<PathBuf> {
        fs::create_dir_all(self.archive_dir())?;

        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                base.to_string()
            } else {
                format!("{base}-{attempt}")
            };
            let candidate = self.archive_dir().join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Existing snapshot directories, sorted by name.
    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>> {
        let dir = self.archive_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                snapshots.push(entry.path());
            }
        }
        snapshots.sort();
        Ok(snapshots)
    }
}

/// `<YYYY-MM-DD>-<identity>` with known prefixes stripped and unsafe
/// characters replaced by `-`.
#[must_use]
pub fn snapshot_name(identity: &str, date: NaiveDate) -> String {
    let stripped = IDENTITY_PREFIXES
        .iter()
        .find_map(|prefix| identity.strip_prefix(prefix))
        .unwrap_or(identity);

    let sanitized: String = stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '-' || c == '.');
    let sanitized = if sanitized.is_empty() { "run" } else { sanitized };

    format!("{}-{}", date.format("%Y-%m-%d"), sanitized)
}

//! Temporary state directories for tests.

use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use crate::state::StateStore;

/// Instructions written by [`TestFixture::new`].
pub const INSTRUCTIONS: &str = "# Agent Instructions\n\nWork one item, then stop.\n";

/// Backlog JSON with items `(id, passes)`, prioritised in the given order.
#[must_use]
pub fn backlog_json(identity: &str, items: &[(&str, bool)]) -> String {
    let stories: Vec<_> = items
        .iter()
        .enumerate()
        .map(|(index, (id, passes))| {
            json!({
                "id": id,
                "title": format!("Story {id}"),
                "description": "",
                "acceptanceCriteria": ["Typecheck passes"],
                "priority": index + 1,
                "passes": passes,
                "notes": ""
            })
        })
        .collect();

    let doc = json!({
        "project": "Fixture",
        "branchName": identity,
        "description": "Fixture backlog",
        "userStories": stories,
    });
    serde_json::to_string_pretty(&doc).expect("Failed to serialize backlog")
}

/// Handoff JSON pointing at `story_id`.
#[must_use]
pub fn handoff_json(story_id: &str) -> String {
    json!({
        "timestamp": "2026-01-15T10:30:00Z",
        "reason": "context_threshold",
        "current_story": {
            "id": story_id,
            "title": format!("Story {story_id}"),
            "progress_percent": 60,
            "status": "implementing"
        },
        "work_in_progress": {
            "files_modified": ["src/lib.rs"],
            "uncommitted_changes": "",
            "last_completed_step": "Added the migration",
            "next_steps": ["Wire the handler"]
        },
        "context_learned": [],
        "blockers": [],
        "handoff_instruction": "Finish wiring the handler"
    })
    .to_string()
}

/// A temporary state directory with `prompt.md` in place.
///
/// Cleaned up when dropped.
pub struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create a directory holding only the instructions file.
    ///
    /// # Panics
    ///
    /// Panics if the directory or file cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("prompt.md"), INSTRUCTIONS)
            .expect("Failed to write prompt.md");
        Self { temp_dir }
    }

    /// Create a directory with a backlog.
    #[must_use]
    pub fn with_backlog(identity: &str, items: &[(&str, bool)]) -> Self {
        let fixture = Self::new();
        fixture.write_backlog(identity, items);
        fixture
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of `name` inside the directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Store with default file names over this directory.
    #[must_use]
    pub fn store(&self) -> StateStore {
        StateStore::open(self.path())
    }

    pub fn write(&self, name: &str, content: &str) {
        std::fs::write(self.file(name), content)
            .unwrap_or_else(|e| panic!("Failed to write {name}: {e}"));
    }

    /// Read `name`, panicking if absent.
    #[must_use]
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.file(name))
            .unwrap_or_else(|e| panic!("Failed to read {name}: {e}"))
    }

    pub fn write_backlog(&self, identity: &str, items: &[(&str, bool)]) {
        self.write("prd.json", &backlog_json(identity, items));
    }

    pub fn write_handoff(&self, story_id: &str) {
        self.write("handoff.json", &handoff_json(story_id));
    }

    pub fn write_marker(&self, identity: &str) {
        self.write(".last-branch", &format!("{identity}\n"));
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

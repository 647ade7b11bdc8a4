//! Handoff record (`handoff.json`).
//!
//! Written by a worker that stops mid-item, read and deleted by whichever
//! later invocation finishes that item. The orchestrator never inspects the
//! contents to make decisions; it parses them for validation and display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BatonError, Result};

/// Why the worker handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffReason {
    ContextThreshold,
    Error,
    UserRequest,
}

impl std::fmt::Display for HandoffReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffReason::ContextThreshold => write!(f, "context_threshold"),
            HandoffReason::Error => write!(f, "error"),
            HandoffReason::UserRequest => write!(f, "user_request"),
        }
    }
}

/// Coarse state of the active item at handoff time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    Planning,
    Implementing,
    Testing,
    Blocked,
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryStatus::Planning => write!(f, "planning"),
            StoryStatus::Implementing => write!(f, "implementing"),
            StoryStatus::Testing => write!(f, "testing"),
            StoryStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Reference to the item being worked when the handoff was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStory {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Completion estimate, 0-100.
    #[serde(default)]
    pub progress_percent: u8,
    pub status: StoryStatus,
}

/// Half-finished work the next invocation has to pick up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkInProgress {
    pub files_modified: Vec<String>,
    pub uncommitted_changes: String,
    /// Last safe checkpoint.
    pub last_completed_step: String,
    pub next_steps: Vec<String>,
}

/// Mid-flight state persisted across an iteration boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    /// ISO-8601 creation time as written by the worker.
    pub timestamp: String,
    pub reason: HandoffReason,
    pub current_story: CurrentStory,
    #[serde(default)]
    pub work_in_progress: WorkInProgress,
    #[serde(default)]
    pub context_learned: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    /// Single imperative resume instruction.
    #[serde(default)]
    pub handoff_instruction: String,
}

impl HandoffRecord {
    /// Parse and validate a handoff document.
    ///
    /// # Errors
    ///
    /// Returns [`BatonError::Json`] for undecodable content and
    /// [`BatonError::InvalidHandoff`] when a field is out of range.
    pub fn from_json(content: &str) -> Result<Self> {
        let record: HandoffRecord = serde_json::from_str(content)?;
        record.validate()?;
        Ok(record)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.current_story.progress_percent > 100 {
            return Err(BatonError::InvalidHandoff {
                reason: format!(
                    "progress_percent {} exceeds 100",
                    self.current_story.progress_percent
                ),
            });
        }
        if self.current_story.id.trim().is_empty() {
            return Err(BatonError::InvalidHandoff {
                reason: "current_story.id is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Creation time, if the worker wrote a parseable RFC 3339 timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// One-line summary for operator output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} at {}% ({}, reason: {})",
            self.current_story.id,
            self.current_story.progress_percent,
            self.current_story.status,
            self.reason
        )
    }
}

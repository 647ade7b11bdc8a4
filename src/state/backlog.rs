//! Backlog (`prd.json`) types.
//!
//! The backlog is authored by a human before the run starts. Workers flip
//! `passes` and amend `notes`; the orchestrator only reads it.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BatonError, Result};

/// The full set of work items for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backlog {
    /// Display name.
    #[serde(default)]
    pub project: String,
    /// Run identity, usually the feature branch.
    #[serde(default)]
    pub branch_name: String,
    #[serde(default)]
    pub description: String,
    /// Items in declaration order.
    pub user_stories: Vec<Item>,
}

/// One independently completable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Lower value is worked first.
    #[serde(default)]
    pub priority: i64,
    /// Set by the worker once every acceptance criterion is met.
    #[serde(default)]
    pub passes: bool,
    #[serde(default)]
    pub notes: String,
}

impl Backlog {
    /// Parse and validate backlog JSON read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BatonError::MalformedBacklog`] for invalid JSON, empty item
    /// ids, or duplicate item ids.
    pub fn from_json(content: &str, path: &Path) -> Result<Self> {
        let backlog: Backlog = serde_json::from_str(content)
            .map_err(|e| BatonError::malformed_backlog(path.to_path_buf(), e.to_string()))?;
        backlog
            .validate()
            .map_err(|reason| BatonError::malformed_backlog(path.to_path_buf(), reason))?;
        Ok(backlog)
    }

    /// Check structural invariants. Returns the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for (index, item) in self.user_stories.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(format!("item at position {index} has an empty id"));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(format!("duplicate item id '{}'", item.id));
            }
        }
        Ok(())
    }

    /// True iff every item passes. An empty backlog is satisfied.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.user_stories.iter().all(|item| item.passes)
    }

    /// The run identity, or `None` when blank.
    #[must_use]
    pub fn run_identity(&self) -> Option<&str> {
        let identity = self.branch_name.trim();
        (!identity.is_empty()).then_some(identity)
    }

    /// Items not yet passing, in declaration order.
    pub fn pending(&self) -> impl Iterator<Item = &Item> {
        self.user_stories.iter().filter(|item| !item.passes)
    }

    /// Number of passing items.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.user_stories.iter().filter(|item| item.passes).count()
    }

    /// Highest-priority pending item; ties go to the earlier declaration.
    #[must_use]
    pub fn next_item(&self) -> Option<&Item> {
        // min_by_key keeps the first of equal elements
        self.pending().min_by_key(|item| item.priority)
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.user_stories.iter().find(|item| item.id == id)
    }
}

//! Configuration management for baton.
//!
//! Configurations are loaded from three levels with increasing priority:
//!
//! 1. **Defaults** - built into the binary
//! 2. **User** - `~/.config/baton/config.json` (platform config dir)
//! 3. **Project** - `baton.json` in the state directory
//!
//! Command-line flags are applied on top by the binary. Higher levels are
//! deep-merged over lower ones, so a project file only needs the keys it
//! changes:
//!
//! ```json
//! {
//!   "worker": { "command": "amp", "args": ["--dangerously-allow-all"] },
//!   "pauseMs": 500
//! }
//! ```

use crate::error::{BatonError, IntoBatonError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Project-level config file name, looked up in the state directory.
pub const PROJECT_CONFIG_FILE: &str = "baton.json";

/// Default iteration budget when none is given on the command line.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatonConfig {
    /// How to launch the worker.
    pub worker: WorkerConfig,
    /// Pause between iterations in milliseconds.
    pub pause_ms: u64,
    /// File names inside the state directory.
    pub files: StateFiles,
}

impl Default for BatonConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            pause_ms: 2000,
            files: StateFiles::default(),
        }
    }
}

impl BatonConfig {
    /// Load configuration for a state directory using the default locations.
    pub fn load(state_dir: &Path) -> Result<Self> {
        ConfigLoader::new().load(state_dir)
    }

    /// Pause between iterations.
    #[must_use]
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// Worker launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    /// Program to execute (resolved on `PATH`).
    pub command: String,
    /// Arguments passed before the payload is written to stdin.
    pub args: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec![
                "--dangerously-skip-permissions".to_string(),
                "--print".to_string(),
            ],
        }
    }
}

/// Names of the durable state files, relative to the state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateFiles {
    pub backlog: String,
    pub progress: String,
    pub handoff: String,
    pub marker: String,
    pub archive_dir: String,
    pub instructions: String,
    pub lock: String,
}

impl Default for StateFiles {
    fn default() -> Self {
        Self {
            backlog: "prd.json".to_string(),
            progress: "progress.txt".to_string(),
            handoff: "handoff.json".to_string(),
            marker: ".last-branch".to_string(),
            archive_dir: "archive".to_string(),
            instructions: "prompt.md".to_string(),
            lock: ".baton.lock".to_string(),
        }
    }
}

/// Loads and merges configuration levels.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader that reads the platform user config location.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_config_path: dirs::config_dir().map(|p| p.join("baton").join("config.json")),
        }
    }

    /// Override the user config path (`None` skips the user level).
    #[must_use]
    pub fn with_user_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    /// Load defaults, then user, then project config from `state_dir`.
    pub fn load(&self, state_dir: &Path) -> Result<BatonConfig> {
        let mut merged = serde_json::to_value(BatonConfig::default())?;

        if let Some(ref user_path) = self.user_config_path {
            Self::load_and_merge(&mut merged, user_path)?;
        }
        Self::load_and_merge(&mut merged, &state_dir.join(PROJECT_CONFIG_FILE))?;

        serde_json::from_value(merged).into_baton_config()
    }

    /// Merge a config file into the accumulated value. Missing files are skipped.
    fn load_and_merge(accumulated: &mut serde_json::Value, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            BatonError::config_with_path(format!("invalid JSON: {e}"), path.to_path_buf())
        })?;

        debug!("Merging config from {}", path.display());
        deep_merge(accumulated, value);
        Ok(true)
    }
}

/// Deep merge two JSON values, with child overriding parent. Arrays are replaced.
fn deep_merge(parent: &mut serde_json::Value, child: serde_json::Value) {
    match (parent, child) {
        (serde_json::Value::Object(parent_map), serde_json::Value::Object(child_map)) => {
            for (key, child_value) in child_map {
                match parent_map.get_mut(&key) {
                    Some(parent_value) => deep_merge(parent_value, child_value),
                    None => {
                        parent_map.insert(key, child_value);
                    }
                }
            }
        }
        (parent, child) => *parent = child,
    }
}

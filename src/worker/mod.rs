//! Worker invocation.
//!
//! The worker is an opaque external agent with no memory between runs. The
//! orchestrator only needs one thing from it: run once with a payload and
//! hand back everything it printed.
//!
//! - [`process`] - spawns a real program and tees its output
//! - [`prompt`] - composes the payload from static instructions and run context

pub mod process;
pub mod prompt;

pub use process::{anchor_program, ProcessWorker};
pub use prompt::{compose, load_instructions, RunContext};

use async_trait::async_trait;

use crate::error::Result;

/// Captured result of one worker run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerOutput {
    /// Combined stdout and stderr.
    pub text: String,
    /// Exit status; `None` if terminated by a signal.
    pub exit_code: Option<i32>,
}

impl WorkerOutput {
    /// Create an output with the given text and a zero exit code.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: Some(0),
        }
    }

    /// Set the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Whether the worker exited cleanly.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Abstraction over the external worker.
///
/// Enables testing the orchestration loop with scripted output instead of
/// spawning real processes.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Short name for logs and the banner.
    fn name(&self) -> &str;

    /// Verify the worker can be launched at all.
    ///
    /// # Errors
    ///
    /// Returns [`BatonError::MissingTool`](crate::BatonError::MissingTool)
    /// when the program cannot be found.
    fn check_available(&self) -> Result<()>;

    /// Run the worker once to completion with `prompt` as its payload.
    ///
    /// A non-zero exit is reported through [`WorkerOutput::exit_code`], not
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker could not be run.
    async fn invoke(&self, prompt: &str) -> Result<WorkerOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_success() {
        assert!(WorkerOutput::new("ok").success());
        assert!(!WorkerOutput::new("boom").with_exit_code(Some(2)).success());
        assert!(!WorkerOutput::new("killed").with_exit_code(None).success());
    }
}

//! Scripted worker for driving the orchestration loop in tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{BatonError, Result};
use crate::worker::{Worker, WorkerOutput};

/// Callback run at the start of each invocation with the 1-based call number.
///
/// Stands in for the side effects a real worker has on the state directory.
pub type InvokeHook = Arc<dyn Fn(u32) + Send + Sync>;

/// Worker that replays canned output.
///
/// Invocation `n` returns the `n`th scripted output; once the script runs out
/// the last entry repeats. An empty script yields empty output.
///
/// # Example
///
/// ```rust,ignore
/// let worker = ScriptedWorker::new()
///     .with_output("working...")
///     .with_output("<promise>COMPLETE</promise>");
///
/// assert_eq!(worker.call_count(), 0);
/// ```
pub struct ScriptedWorker {
    name: String,
    outputs: Vec<WorkerOutput>,
    error: Option<String>,
    available: bool,
    on_invoke: Option<InvokeHook>,
    call_count: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptedWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedWorker")
            .field("name", &self.name)
            .field("outputs", &self.outputs.len())
            .field("error", &self.error)
            .field("available", &self.available)
            .field("call_count", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedWorker {
    fn default() -> Self {
        Self {
            name: "scripted".to_string(),
            outputs: Vec::new(),
            error: None,
            available: true,
            on_invoke: None,
            call_count: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedWorker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clean-exit output to the script.
    #[must_use]
    pub fn with_output(mut self, text: &str) -> Self {
        self.outputs.push(WorkerOutput::new(text));
        self
    }

    /// Append an output with an explicit exit code.
    #[must_use]
    pub fn with_exit(mut self, text: &str, code: i32) -> Self {
        self.outputs
            .push(WorkerOutput::new(text).with_exit_code(Some(code)));
        self
    }

    /// Fail every invocation as if the program could not be started.
    #[must_use]
    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Report the worker as not installed.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Run `hook` at the start of every invocation.
    #[must_use]
    pub fn on_invoke(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_invoke = Some(Arc::new(hook));
        self
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Payloads received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(BatonError::MissingTool {
                tool: self.name.clone(),
            })
        }
    }

    async fn invoke(&self, prompt: &str) -> Result<WorkerOutput> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(hook) = &self.on_invoke {
            hook(call);
        }
        if let Some(message) = &self.error {
            return Err(BatonError::worker_spawn(&self.name, message.as_str()));
        }

        let index = (call as usize).saturating_sub(1);
        Ok(self
            .outputs
            .get(index)
            .or_else(|| self.outputs.last())
            .cloned()
            .unwrap_or_else(|| WorkerOutput::new("")))
    }
}

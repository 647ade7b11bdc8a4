//! Payload composition.
//!
//! The worker gets the static agent instructions verbatim, followed by a
//! `## Run Context` section telling it where the state files live. The
//! section only points at files; the worker reads the handoff record itself.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{BatonError, Result};
use crate::signal::{COMPLETE_MARKER, HANDOFF_MARKER};
use crate::state::{Item, StatePaths};

/// Per-iteration facts appended to the instructions.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub paths: &'a StatePaths,
    pub iteration: u32,
    pub max_iterations: u32,
    /// Highest-priority pending item, for orientation only.
    pub next_item: Option<&'a Item>,
    pub handoff_present: bool,
}

/// Read the static instructions file.
///
/// # Errors
///
/// [`BatonError::MissingFile`] if the file does not exist.
pub fn load_instructions(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BatonError::MissingFile {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Build the payload for one worker run.
#[must_use]
pub fn compose(instructions: &str, context: &RunContext<'_>) -> String {
    let mut payload = String::with_capacity(instructions.len() + 1024);
    payload.push_str(instructions.trim_end());
    payload.push_str("\n\n## Run Context\n\n");

    let paths = context.paths;
    // Writing to a String cannot fail.
    let _ = writeln!(payload, "- Backlog: {}", paths.backlog.display());
    let _ = writeln!(payload, "- Progress log: {}", paths.progress.display());
    let _ = writeln!(payload, "- Handoff record: {}", paths.handoff.display());
    let _ = writeln!(
        payload,
        "- Iteration: {} of {}",
        context.iteration, context.max_iterations
    );

    if context.handoff_present {
        payload.push_str(
            "- A handoff record is present. Resume exactly the work it describes \
             and delete it once that item passes.\n",
        );
    } else {
        payload.push_str(
            "- No handoff record is present. Pick the highest-priority item \
             whose `passes` is false.\n",
        );
    }

    if let Some(item) = context.next_item {
        let _ = writeln!(
            payload,
            "- Next item by priority: {} - {}",
            item.id, item.title
        );
    }

    let _ = writeln!(
        payload,
        "- When every item passes, print {COMPLETE_MARKER}. If you must stop mid-item, \
         write the handoff record first, then print {HANDOFF_MARKER}."
    );

    payload
}

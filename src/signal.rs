//! Sentinel detection in worker output.
//!
//! Workers report their verdict by printing a fixed marker anywhere in their
//! output. Detection is a plain case-sensitive substring search.

/// Printed by a worker once every item passes.
pub const COMPLETE_MARKER: &str = "<promise>COMPLETE</promise>";

/// Printed by a worker that persisted a handoff record and stopped mid-item.
pub const HANDOFF_MARKER: &str = "<promise>HANDOFF</promise>";

/// What a worker run reported.
///
/// # Example
///
/// ```
/// use baton::signal::{Signal, COMPLETE_MARKER};
///
/// let output = format!("all stories pass\n{COMPLETE_MARKER}\n");
/// assert_eq!(Signal::parse(&output), Signal::Complete);
/// assert_eq!(Signal::parse("made some progress"), Signal::None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The backlog is done.
    Complete,
    /// Work stopped mid-item; the next run resumes from the handoff record.
    Handoff,
    /// Ordinary iteration.
    None,
}

impl Signal {
    /// Scan `output` for sentinels.
    ///
    /// Completion takes precedence: a worker that wrote a handoff and then
    /// finished the backlog in the same run is done.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        if output.contains(COMPLETE_MARKER) {
            Signal::Complete
        } else if output.contains(HANDOFF_MARKER) {
            Signal::Handoff
        } else {
            Signal::None
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Complete => write!(f, "complete"),
            Signal::Handoff => write!(f, "handoff"),
            Signal::None => write!(f, "none"),
        }
    }
}

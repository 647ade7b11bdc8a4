//! Orchestration state machine types.
//!
//! ```text
//! Init ─► Checking ─► Invoking ─► Deciding ─┬─► Completed
//!   │        ▲  │                           ├─► HandingOff ─┐
//!   │        │  ├─► Completed               └─► Continuing ─┤
//!   │        │  └─► Exhausted                               │
//!   │        └──────────────────────────────────────────────┘
//!   └─► Fatal (reachable from every non-terminal phase)
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::signal::Signal;

/// Phase of the orchestration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    /// Preconditions, lock, archive reconciliation.
    Init,
    /// Deciding whether another iteration is needed.
    Checking,
    /// Worker running.
    Invoking,
    /// Parsing the worker's output.
    Deciding,
    /// Ordinary iteration finished; pause then check again.
    Continuing,
    /// Worker handed off mid-item; pause then check again.
    HandingOff,
    /// Every item passes or the worker reported completion.
    Completed,
    /// Iteration budget spent with items pending.
    Exhausted,
    /// Unrecoverable configuration or state error.
    Fatal,
}

impl LoopPhase {
    /// Check if a transition from this phase to `target` is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: LoopPhase) -> bool {
        use LoopPhase::*;
        if target == Fatal {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Init, Checking)
                | (Checking, Invoking)
                | (Checking, Completed)
                | (Checking, Exhausted)
                | (Invoking, Deciding)
                | (Deciding, Completed)
                | (Deciding, HandingOff)
                | (Deciding, Continuing)
                | (HandingOff, Checking)
                | (Continuing, Checking)
        )
    }

    /// Check if the loop stops in this phase.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopPhase::Completed | LoopPhase::Exhausted | LoopPhase::Fatal
        )
    }

    /// Process exit status for a terminal phase.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            LoopPhase::Completed => 0,
            _ => 1,
        }
    }
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopPhase::Init => "init",
            LoopPhase::Checking => "checking",
            LoopPhase::Invoking => "invoking",
            LoopPhase::Deciding => "deciding",
            LoopPhase::Continuing => "continuing",
            LoopPhase::HandingOff => "handing-off",
            LoopPhase::Completed => "completed",
            LoopPhase::Exhausted => "exhausted",
            LoopPhase::Fatal => "fatal",
        };
        write!(f, "{name}")
    }
}

/// A recorded phase change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: LoopPhase,
    pub to: LoopPhase,
    pub timestamp: DateTime<Utc>,
    /// Iteration counter when the transition happened.
    pub iteration: u32,
}

/// Mutable state of one orchestrator run.
///
/// # Example
///
/// ```
/// use baton::orchestrator::state::{LoopPhase, LoopState};
///
/// let mut state = LoopState::new(5);
/// state.transition(LoopPhase::Checking);
/// assert!(!state.budget_spent());
/// ```
#[derive(Debug, Clone)]
pub struct LoopState {
    pub phase: LoopPhase,
    /// Worker invocations so far.
    pub iteration: u32,
    pub max_iterations: u32,
    /// Signal parsed from each invocation, in order.
    pub signals: Vec<Signal>,
    pub transitions: Vec<PhaseTransition>,
}

impl LoopState {
    /// Create a state in `Init` with the given budget.
    #[must_use]
    pub fn new(max_iterations: u32) -> Self {
        Self {
            phase: LoopPhase::Init,
            iteration: 0,
            max_iterations,
            signals: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Move to `to`, recording the transition.
    pub fn transition(&mut self, to: LoopPhase) {
        if !self.phase.can_transition_to(to) {
            warn!("Unexpected loop transition {} -> {}", self.phase, to);
        }
        debug!("Loop phase {} -> {} (iteration {})", self.phase, to, self.iteration);
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            iteration: self.iteration,
        });
        self.phase = to;
    }

    /// Increment the iteration counter.
    pub fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Record the signal of the current iteration.
    pub fn record_signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Check if no further invocation is allowed.
    #[must_use]
    pub fn budget_spent(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Whether the loop ever entered `phase`.
    #[must_use]
    pub fn visited(&self, phase: LoopPhase) -> bool {
        self.transitions.iter().any(|t| t.to == phase)
    }
}

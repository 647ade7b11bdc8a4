//! Operator-facing output: banner, iteration headers, final report.

use colored::Colorize;

use super::state::{LoopPhase, PhaseTransition};
use crate::archive::ArchiveOutcome;
use crate::signal::Signal;
use crate::state::{Backlog, Item};

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal phase reached.
    pub outcome: LoopPhase,
    pub iterations: u32,
    pub max_iterations: u32,
    /// Backlog as last read from disk.
    pub backlog: Backlog,
    pub archive: Option<ArchiveOutcome>,
    pub signals: Vec<Signal>,
    pub transitions: Vec<PhaseTransition>,
    /// History entries in the progress log at the end of the run.
    pub history_entries: usize,
    /// Item named by the newest progress log entry.
    pub last_logged_item: Option<String>,
}

impl RunReport {
    /// Whether the run ended in success.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome == LoopPhase::Completed
    }

    /// Process exit status.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Items still pending at the end of the run.
    #[must_use]
    pub fn pending(&self) -> Vec<&Item> {
        self.backlog.pending().collect()
    }
}

/// Print the startup banner.
pub fn print_banner(
    backlog: &Backlog,
    worker: &str,
    max_iterations: u32,
    archive: &ArchiveOutcome,
    snapshot_count: usize,
) {
    println!("{}", "=".repeat(60).bright_blue());
    println!("{}", "     BATON - Backlog Relay".bright_blue().bold());
    println!("{}", "=".repeat(60).bright_blue());
    println!();
    if !backlog.project.is_empty() {
        println!("   Project: {}", backlog.project);
    }
    println!(
        "   Run: {}",
        backlog.run_identity().unwrap_or("(no run identity)")
    );
    println!("   Worker: {}", worker);
    println!("   Max iterations: {}", max_iterations);
    println!(
        "   Items: {} total, {} complete, {} pending",
        backlog.user_stories.len(),
        backlog.completed_count(),
        backlog.pending().count()
    );
    match archive {
        ArchiveOutcome::Archived { snapshot, .. } => println!(
            "   {} Previous run archived to {}",
            "Archive:".yellow().bold(),
            snapshot.display()
        ),
        _ if snapshot_count > 0 => println!("   Archive: {} snapshot(s)", snapshot_count),
        _ => {}
    }
}

/// Print the header shown before each worker run.
pub fn print_iteration_header(
    iteration: u32,
    max_iterations: u32,
    next: Option<&Item>,
    resuming: bool,
) {
    println!(
        "\n{} Iteration {}/{}",
        "===".bright_blue(),
        iteration,
        max_iterations
    );
    if resuming {
        println!("   {} resuming from handoff record", "Handoff:".cyan().bold());
    } else if let Some(item) = next {
        println!("   {} {} - {}", "Next:".cyan().bold(), item.id, item.title);
    }
}

/// Render the item completion table.
#[must_use]
pub fn format_item_table(backlog: &Backlog) -> String {
    let width = backlog
        .user_stories
        .iter()
        .map(|item| item.id.len())
        .max()
        .unwrap_or(0);

    backlog
        .user_stories
        .iter()
        .map(|item| {
            let mark = if item.passes { "[x]" } else { "[ ]" };
            format!("   {mark} {:<width$}  {}", item.id, item.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the final report.
pub fn print_report(report: &RunReport) {
    println!();
    match report.outcome {
        LoopPhase::Completed => println!(
            "{} All items complete at iteration {} of {}",
            "Success:".green().bold(),
            report.iterations,
            report.max_iterations
        ),
        LoopPhase::Exhausted => println!(
            "{} Reached max iterations ({}) with {} item(s) pending. Check the progress log for status.",
            "Warning:".yellow().bold(),
            report.max_iterations,
            report.pending().len()
        ),
        phase => println!("{} Stopped in phase {}", "Error:".red().bold(), phase),
    }

    if !report.backlog.user_stories.is_empty() {
        println!("{}", format_item_table(&report.backlog));
    }
    println!("{}", format_final_state(report));
}

/// Closing summary line.
#[must_use]
pub fn format_final_state(report: &RunReport) -> String {
    let mut line = format!(
        "   Final state: {} ({} history entr{}",
        report.outcome,
        report.history_entries,
        if report.history_entries == 1 { "y" } else { "ies" }
    );
    if let Some(item) = &report.last_logged_item {
        line.push_str(&format!(", last logged {item}"));
    }
    line.push(')');
    line
}

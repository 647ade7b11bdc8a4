//! The orchestration loop.
//!
//! One run takes the directory lock, reconciles the archive, then repeatedly
//! checks the backlog, invokes the worker once and interprets its completion
//! signal until every item passes, the worker reports completion, or the
//! iteration budget is spent. Nothing is carried in memory between iterations
//! except the counter; every decision re-reads the state files.
//!
//! - [`state`] - loop phases and transition bookkeeping
//! - [`report`] - banner, per-iteration header, final report

pub mod report;
pub mod state;

pub use report::RunReport;
pub use state::{LoopPhase, LoopState, PhaseTransition};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::archive::{ArchiveManager, ArchiveOutcome};
use crate::config::{BatonConfig, DEFAULT_MAX_ITERATIONS};
use crate::error::Result;
use crate::signal::Signal;
use crate::state::{Backlog, StateStore};
use crate::worker::{compose, load_instructions, RunContext, Worker};

/// Loop tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Worker invocations allowed in this run.
    pub max_iterations: u32,
    /// Delay between a non-terminal iteration and the next check.
    pub pause: Duration,
    /// Print the banner, iteration headers and outcome lines.
    pub show_banner: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            pause: BatonConfig::default().pause(),
            show_banner: true,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the inter-iteration pause.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Enable or disable operator output.
    #[must_use]
    pub fn with_banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }
}

/// Drives a worker through the backlog.
pub struct Orchestrator {
    store: StateStore,
    worker: Arc<dyn Worker>,
    config: OrchestratorConfig,
    state: LoopState,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("worker", &self.worker.name())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: StateStore, worker: Arc<dyn Worker>, config: OrchestratorConfig) -> Self {
        let state = LoopState::new(config.max_iterations);
        Self {
            store,
            worker,
            config,
            state,
        }
    }

    /// Loop state so far.
    #[must_use]
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Run the loop to a terminal phase.
    ///
    /// `Completed` and `Exhausted` are reported through the returned
    /// [`RunReport`]. An `Err` means the loop reached `Fatal`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another run holds the directory lock
    /// - The worker program, instructions file or backlog is missing
    /// - The backlog cannot be parsed at any check
    /// - The worker cannot be started
    /// - Archiving fails
    pub async fn run(&mut self) -> Result<RunReport> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.state.transition(LoopPhase::Fatal);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<RunReport> {
        let _lock = self.store.lock()?;

        // Preflight: nothing is invoked unless everything needed is present.
        self.worker.check_available()?;
        let paths = self.store.paths().clone();
        let instructions = load_instructions(&paths.instructions)?;
        let backlog = self.store.load_backlog()?;

        let previous = self.store.load_run_identity()?;
        let archiver = ArchiveManager::new(self.store.clone());
        let archive = archiver.reconcile(&backlog, previous.as_deref())?;
        debug!("Archive reconciliation: {}", archive);
        if self.store.ensure_progress_log()? {
            info!("Created progress log {}", paths.progress.display());
        }

        if self.config.show_banner {
            let snapshots = archiver.list_snapshots()?.len();
            report::print_banner(
                &backlog,
                self.worker.name(),
                self.config.max_iterations,
                &archive,
                snapshots,
            );
        }

        loop {
            self.state.transition(LoopPhase::Checking);
            let backlog = self.store.load_backlog()?;

            if backlog.is_satisfied() {
                info!("All {} item(s) pass", backlog.user_stories.len());
                self.state.transition(LoopPhase::Completed);
                return self.finish(backlog, archive);
            }
            if self.state.budget_spent() {
                warn!(
                    "Iteration budget of {} spent with {} item(s) pending",
                    self.config.max_iterations,
                    backlog.pending().count()
                );
                self.state.transition(LoopPhase::Exhausted);
                return self.finish(backlog, archive);
            }

            self.state.transition(LoopPhase::Invoking);
            self.state.next_iteration();
            let iteration = self.state.iteration;
            let handoff_present = self.store.handoff_exists();
            let next = backlog.next_item();

            if self.config.show_banner {
                report::print_iteration_header(
                    iteration,
                    self.config.max_iterations,
                    next,
                    handoff_present,
                );
            }

            let payload = compose(
                &instructions,
                &RunContext {
                    paths: &paths,
                    iteration,
                    max_iterations: self.config.max_iterations,
                    next_item: next,
                    handoff_present,
                },
            );

            let output = self.worker.invoke(&payload).await?;
            if !output.success() {
                warn!(
                    "Worker exited with status {:?} on iteration {}",
                    output.exit_code, iteration
                );
            }

            self.state.transition(LoopPhase::Deciding);
            let signal = Signal::parse(&output.text);
            debug!("Iteration {} signalled {}", iteration, signal);
            self.state.record_signal(signal);

            match signal {
                Signal::Complete => {
                    info!("Worker reported completion on iteration {}", iteration);
                    self.state.transition(LoopPhase::Completed);
                    let backlog = self.reload_or(backlog);
                    if !backlog.is_satisfied() {
                        warn!(
                            "Completion reported with {} item(s) still pending",
                            backlog.pending().count()
                        );
                    }
                    return self.finish(backlog, archive);
                }
                Signal::Handoff => {
                    self.state.transition(LoopPhase::HandingOff);
                    match self.store.load_handoff() {
                        Some(record) => {
                            match record.created_at() {
                                Some(at) => info!(
                                    "Handoff written {}: {}",
                                    at.format("%Y-%m-%d %H:%M:%S UTC"),
                                    record.summary()
                                ),
                                None => info!("Handoff: {}", record.summary()),
                            }
                            if backlog.get(&record.current_story.id).is_none() {
                                warn!(
                                    "Handoff names {} which is not in the backlog",
                                    record.current_story.id
                                );
                            }
                        }
                        None if self.store.handoff_exists() => {
                            warn!("Handoff signalled but the record is unreadable")
                        }
                        None => warn!(
                            "Handoff signalled without a record at {}, continuing by priority",
                            paths.handoff.display()
                        ),
                    }
                }
                Signal::None => {
                    self.state.transition(LoopPhase::Continuing);
                    info!("Iteration {} finished", iteration);
                }
            }

            if !self.state.budget_spent() && !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }
        }
    }

    /// Backlog from disk, or `fallback` if it can no longer be read.
    fn reload_or(&self, fallback: Backlog) -> Backlog {
        match self.store.load_backlog() {
            Ok(backlog) => backlog,
            Err(e) => {
                warn!("Could not re-read backlog after completion: {}", e);
                fallback
            }
        }
    }

    fn finish(&self, backlog: Backlog, archive: ArchiveOutcome) -> Result<RunReport> {
        let log = self.store.load_progress_log()?;
        let history_entries = log.as_ref().map_or(0, |log| log.entries.len());
        let last_logged_item = log
            .as_ref()
            .and_then(|log| log.entries.last())
            .and_then(|entry| entry.item_id())
            .map(str::to_string);

        Ok(RunReport {
            outcome: self.state.phase,
            iterations: self.state.iteration,
            max_iterations: self.state.max_iterations,
            backlog,
            archive: Some(archive),
            signals: self.state.signals.clone(),
            transitions: self.state.transitions.clone(),
            history_entries,
            last_logged_item,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatonError;
    use crate::testing::{backlog_json, ScriptedWorker, TestFixture};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    const COMPLETE: &str = "done\n<promise>COMPLETE</promise>\n";
    const HANDOFF: &str = "context is full\n<promise>HANDOFF</promise>\n";

    fn config(max: u32) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_max_iterations(max)
            .with_pause(Duration::ZERO)
            .with_banner(false)
    }

    fn orchestrator(fixture: &TestFixture, worker: &Arc<ScriptedWorker>, max: u32) -> Orchestrator {
        let worker: Arc<dyn Worker> = Arc::clone(worker) as Arc<dyn Worker>;
        Orchestrator::new(fixture.store(), worker, config(max))
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_config_builder() {
        let config = OrchestratorConfig::new()
            .with_max_iterations(7)
            .with_pause(Duration::from_millis(5))
            .with_banner(false);
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.pause, Duration::from_millis(5));
        assert!(!config.show_banner);
        assert_eq!(OrchestratorConfig::default().max_iterations, 20);
        assert_eq!(OrchestratorConfig::default().pause, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_satisfied_backlog_never_invokes() {
        let fixture = TestFixture::with_backlog("ralph/done", &[("US-001", true), ("US-002", true)]);
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(report.iterations, 0);
        assert_eq!(worker.call_count(), 0);
        assert!(!orch.state().visited(LoopPhase::Invoking));
    }

    #[tokio::test]
    async fn test_silent_worker_exhausts_budget() {
        let fixture = TestFixture::with_backlog(
            "ralph/feature",
            &[("US-001", false), ("US-002", false), ("US-003", false)],
        );
        let before = fixture.read("prd.json");

        // state as it stands once startup reconciliation is done
        let dir = fixture.path().to_path_buf();
        let at_first_call: Arc<Mutex<Option<(String, String, bool)>>> = Arc::new(Mutex::new(None));
        let snapshot = Arc::clone(&at_first_call);
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output("made some progress")
                .on_invoke(move |call| {
                    if call == 1 {
                        let read = |name: &str| std::fs::read_to_string(dir.join(name)).unwrap();
                        *snapshot.lock().unwrap() = Some((
                            read("progress.txt"),
                            read(".last-branch"),
                            dir.join("handoff.json").exists(),
                        ));
                    }
                }),
        );
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Exhausted);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(worker.call_count(), 5);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.pending().len(), 3);
        assert_eq!(report.signals, vec![Signal::None; 5]);

        assert_eq!(fixture.read("prd.json"), before);
        let (progress, marker, handoff) = at_first_call.lock().unwrap().clone().unwrap();
        assert_eq!(fixture.read("progress.txt"), progress);
        assert_eq!(fixture.read(".last-branch"), marker);
        assert!(!handoff);
        assert!(!fixture.file("handoff.json").exists());
        assert!(!fixture.file("archive").exists());
    }

    #[tokio::test]
    async fn test_complete_signal_stops_loop() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", true), ("US-002", false)]);
        let dir = fixture.path().to_path_buf();
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output(COMPLETE)
                .on_invoke(move |_| {
                    write_file(
                        &dir,
                        "prd.json",
                        &backlog_json("ralph/feature", &[("US-001", true), ("US-002", true)]),
                    );
                }),
        );
        let mut orch = orchestrator(&fixture, &worker, 10);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(worker.call_count(), 1);
        assert!(report.backlog.is_satisfied());
        assert!(!orch.state().visited(LoopPhase::Continuing));
    }

    #[tokio::test]
    async fn test_payload_carries_instructions_and_next_item() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", true), ("US-002", false)]);
        let worker = Arc::new(ScriptedWorker::new().with_output(COMPLETE));
        let mut orch = orchestrator(&fixture, &worker, 3);

        orch.run().await.unwrap();

        let prompts = worker.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("# Agent Instructions"));
        assert!(prompts[0].contains("## Run Context"));
        assert!(prompts[0].contains("US-002 - Story US-002"));
        assert!(prompts[0].contains("- Iteration: 1 of 3"));
    }

    #[tokio::test]
    async fn test_identity_change_archives_before_first_invocation() {
        let fixture = TestFixture::with_backlog("ralph/new-feature", &[("US-001", false)]);
        fixture.write_marker("ralph/old-feature");
        fixture.write("progress.txt", "## Codebase Patterns\n- old pattern\n\n---\n## old entry\n");
        fixture.write_handoff("OLD-1");

        let dir = fixture.path().to_path_buf();
        let clean_at_invoke = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&clean_at_invoke);
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output(COMPLETE)
                .on_invoke(move |_| {
                    let progress = std::fs::read_to_string(dir.join("progress.txt")).unwrap();
                    let clean = !dir.join("handoff.json").exists() && !progress.contains("old entry");
                    observed.store(clean, Ordering::SeqCst);
                }),
        );
        let mut orch = orchestrator(&fixture, &worker, 3);

        let report = orch.run().await.unwrap();

        assert!(clean_at_invoke.load(Ordering::SeqCst));
        let Some(ArchiveOutcome::Archived { snapshot, .. }) = report.archive else {
            panic!("expected an archive snapshot");
        };
        assert!(snapshot.ends_with(format!(
            "{}-old-feature",
            chrono::Local::now().date_naive().format("%Y-%m-%d")
        )));
        assert!(snapshot.join("handoff.json").exists());
        assert!(std::fs::read_to_string(snapshot.join("progress.txt"))
            .unwrap()
            .contains("old entry"));
        assert_eq!(fixture.read(".last-branch").trim(), "ralph/new-feature");
    }

    #[tokio::test]
    async fn test_same_identity_keeps_handoff() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        fixture.write_marker("ralph/feature");
        fixture.write_handoff("US-001");
        let worker = Arc::new(ScriptedWorker::new().with_output(COMPLETE));
        let mut orch = orchestrator(&fixture, &worker, 1);

        let report = orch.run().await.unwrap();

        assert!(matches!(report.archive, Some(ArchiveOutcome::SameRun { .. })));
        assert!(fixture.file("handoff.json").exists());
        assert!(worker.prompts()[0].contains("A handoff record is present"));
        assert!(!fixture.file("archive").exists());
    }

    #[tokio::test]
    async fn test_both_markers_count_as_complete() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output("<promise>HANDOFF</promise>\n<promise>COMPLETE</promise>\n"),
        );
        let mut orch = orchestrator(&fixture, &worker, 4);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(report.signals, vec![Signal::Complete]);
        assert!(!orch.state().visited(LoopPhase::HandingOff));
    }

    #[tokio::test]
    async fn test_handoff_then_completion_through_check() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let dir = fixture.path().to_path_buf();
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output(HANDOFF)
                .with_output("finished the item, no marker")
                .on_invoke(move |call| match call {
                    1 => write_file(&dir, "handoff.json", &crate::testing::handoff_json("US-001")),
                    _ => {
                        std::fs::remove_file(dir.join("handoff.json")).unwrap();
                        write_file(
                            &dir,
                            "prd.json",
                            &backlog_json("ralph/feature", &[("US-001", true)]),
                        );
                    }
                }),
        );
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(worker.call_count(), 2);
        assert_eq!(report.signals, vec![Signal::Handoff, Signal::None]);
        assert!(orch.state().visited(LoopPhase::HandingOff));
        assert!(worker.prompts()[1].contains("A handoff record is present"));
        let last = orch.state().transitions.last().unwrap();
        assert_eq!((last.from, last.to), (LoopPhase::Checking, LoopPhase::Completed));
    }

    #[tokio::test]
    async fn test_handoff_without_record_continues() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(ScriptedWorker::new().with_output(HANDOFF).with_output(COMPLETE));
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(worker.call_count(), 2);
        assert!(worker.prompts()[1].contains("No handoff record is present"));
    }

    #[tokio::test]
    async fn test_handoff_that_cannot_be_read_continues() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        std::fs::create_dir(fixture.file("handoff.json")).unwrap();
        let worker = Arc::new(ScriptedWorker::new().with_output(HANDOFF).with_output(COMPLETE));
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(worker.call_count(), 2);
        assert_eq!(report.signals, vec![Signal::Handoff, Signal::Complete]);
    }

    #[tokio::test]
    async fn test_report_names_last_logged_item() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let dir = fixture.path().to_path_buf();
        let worker = Arc::new(
            ScriptedWorker::new()
                .with_output(COMPLETE)
                .on_invoke(move |_| {
                    let path = dir.join("progress.txt");
                    let mut log = std::fs::read_to_string(&path).unwrap();
                    log.push_str("## 2026-01-15T10:30:00Z - US-001\n- Added the badge\n---\n");
                    std::fs::write(&path, log).unwrap();
                }),
        );
        let mut orch = orchestrator(&fixture, &worker, 3);

        let report = orch.run().await.unwrap();

        assert_eq!(report.history_entries, 1);
        assert_eq!(report.last_logged_item.as_deref(), Some("US-001"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(ScriptedWorker::new().with_error("No such file or directory"));
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, BatonError::WorkerSpawn { .. }));
        assert_eq!(orch.state().phase, LoopPhase::Fatal);
        assert_eq!(worker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_instructions_is_fatal_before_invoking() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        std::fs::remove_file(fixture.file("prompt.md")).unwrap();
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, BatonError::MissingFile { .. }));
        assert_eq!(worker.call_count(), 0);
        assert!(!fixture.file(".last-branch").exists());
        assert!(!fixture.file("progress.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_backlog_is_fatal() {
        let fixture = TestFixture::new();
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, BatonError::MissingFile { .. }));
        assert_eq!(worker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backlog_corrupted_mid_run_is_fatal() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let dir = fixture.path().to_path_buf();
        let worker = Arc::new(ScriptedWorker::new().on_invoke(move |_| {
            write_file(&dir, "prd.json", "{ this is not json");
        }));
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(err.is_malformed_state());
        assert_eq!(worker.call_count(), 1);
        assert_eq!(orch.state().phase, LoopPhase::Fatal);
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_honours_signal() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(ScriptedWorker::new().with_exit(COMPLETE, 2));
        let mut orch = orchestrator(&fixture, &worker, 5);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Completed);
        assert_eq!(worker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_worker_is_fatal() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(ScriptedWorker::new().unavailable());
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, BatonError::MissingTool { .. }));
        assert_eq!(worker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_refused() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let _held = fixture.store().lock().unwrap();
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 5);

        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, BatonError::Locked { .. }));
        assert_eq!(worker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_budget_exhausts_without_invoking() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", false)]);
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 0);

        let report = orch.run().await.unwrap();

        assert_eq!(report.outcome, LoopPhase::Exhausted);
        assert_eq!(worker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_log_created_on_first_run() {
        let fixture = TestFixture::with_backlog("ralph/feature", &[("US-001", true)]);
        let worker = Arc::new(ScriptedWorker::new());
        let mut orch = orchestrator(&fixture, &worker, 1);

        let report = orch.run().await.unwrap();

        assert!(fixture.read("progress.txt").starts_with("## Codebase Patterns"));
        assert_eq!(report.history_entries, 0);
        assert!(matches!(report.archive, Some(ArchiveOutcome::FirstRun { .. })));
        assert_eq!(fixture.read(".last-branch").trim(), "ralph/feature");
    }
}

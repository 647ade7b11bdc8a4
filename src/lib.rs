//! Baton - backlog relay for memoryless coding agents
//!
//! Runs an external worker program over and over against a backlog of work
//! items until every item passes. The worker keeps no memory between runs;
//! continuity lives entirely in files in the state directory.
//!
//! # Architecture
//!
//! - [`state`] - typed access to backlog, progress log, handoff record, run marker
//! - [`archive`] - run-boundary detection and snapshots of prior runs
//! - [`signal`] - completion sentinels in worker output
//! - [`worker`] - the worker abstraction, process runner and payload composition
//! - [`orchestrator`] - the loop state machine and operator output
//! - [`config`] - layered configuration
//! - [`error`] - error types
//! - [`testing`] - scripted worker and fixtures
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use baton::config::BatonConfig;
//! use baton::orchestrator::{Orchestrator, OrchestratorConfig};
//! use baton::state::StateStore;
//! use baton::worker::ProcessWorker;
//!
//! let config = BatonConfig::load(dir)?;
//! let store = StateStore::new(StatePaths::new(dir, &config.files));
//! let worker = Arc::new(ProcessWorker::from_config(&config.worker, dir));
//! let report = Orchestrator::new(store, worker, OrchestratorConfig::new())
//!     .run()
//!     .await?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod signal;
pub mod state;
pub mod testing;
pub mod worker;

pub use error::{BatonError, IntoBatonError, Result};

pub use archive::{ArchiveManager, ArchiveOutcome};
pub use config::{BatonConfig, ConfigLoader};
pub use orchestrator::{LoopPhase, Orchestrator, OrchestratorConfig, RunReport};
pub use signal::Signal;
pub use state::{Backlog, HandoffRecord, Item, ProgressLog, StatePaths, StateStore};
pub use worker::{ProcessWorker, Worker, WorkerOutput};

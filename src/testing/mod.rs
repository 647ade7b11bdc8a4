//! Testing infrastructure for baton.
//!
//! - **Mocks**: [`ScriptedWorker`] replays canned output and counts calls
//! - **Fixtures**: temporary state directories (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use baton::testing::{ScriptedWorker, TestFixture};
//!
//! let fixture = TestFixture::with_backlog("ralph/demo", &[("US-001", false)]);
//! let worker = ScriptedWorker::new().with_output("<promise>COMPLETE</promise>");
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;

//! dsync engine
//!
//! Drives a sync session: enumerate items, transfer each one with bounded
//! fixed-delay retry, record the outcome, and report progress to the console
//! and the session log.

pub mod batch;
pub mod executor;
pub mod logging;
pub mod reporter;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{BatchRunner, DirTreeReport};
pub use executor::TransferExecutor;
pub use reporter::{ReporterOptions, SessionReporter, SessionSummary};
pub use session::{run_session, SessionReport};

//! Bootstrap state machine and orchestrator.
//!
//! Phases run strictly in order:
//! rc loaded, container ready, helpers bound, providers booted, autoloads
//! registered, preloads run, HTTP created, listening. A failure in any phase
//! abandons the run.

pub mod ignitor;
pub mod state;

pub use ignitor::*;
pub use state::*;

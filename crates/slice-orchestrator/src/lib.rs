//! slice-orchestrator: drives a slice through its lifecycle.
//!
//! Each operation is one synchronous run over the hosts of the slice:
//!
//! ```text
//! stop    : dynamic slots → static process
//! start   : static process → placement → placed slots
//! install : base dir → stop → clear registrations/logs → wipe drives
//!           → binary/config/secrets → static start → bootstrap scripts
//!           → placement → slot configs → placed slots
//! update  : logs → binary → stop → config/secrets → placement
//!           → slot configs → start
//! clear   : stop → slot directories → wipe drives
//! format  : stop → wipe drives → start
//! update-raw-cfg : stop → static config tree → start
//! ```
//!
//! # Components
//!
//! - **`commands`**: shell command templates
//! - **`bootstrap`**: first-stage retry budget and init script runner
//! - **`numa`**: NUMA topology probe over the remote executor
//! - **`lifecycle`**: the operations above

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod lifecycle;
pub mod numa;

pub use bootstrap::{RetryBudget, run_bootstrap};
pub use error::{OrchestratorError, OrchestratorResult};
pub use lifecycle::{Collaborators, LifecycleOptions, OperationReport, Orchestrator};
pub use numa::ExecutorNumaProbe;

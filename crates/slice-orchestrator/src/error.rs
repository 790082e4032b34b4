//! Orchestrator error types.

use slice_exec::ExecError;
use thiserror::Error;

/// Errors that abort a lifecycle operation.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The first-stage init script kept failing until the retry budget ran out.
    #[error("bootstrap did not succeed after waiting {waited} time units: {source}")]
    BootstrapTimeout { waited: u32, source: ExecError },

    #[error("no {0} configured in [artifacts]")]
    MissingArtifact(&'static str),

    #[error("installed binary on {host} has digest {actual}, expected {expected}")]
    DigestMismatch {
        host: String,
        expected: String,
        actual: String,
    },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

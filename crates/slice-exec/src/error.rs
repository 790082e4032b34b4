//! Collaborator error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for collaborator operations.
pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Non-zero exit from a command whose exit code is checked.
    #[error(
        "command '{command}' returned non-zero exit status {exit_code} on {host} and output was '{output}'"
    )]
    RemoteCommandFailed {
        command: String,
        host: String,
        exit_code: i32,
        output: String,
    },

    #[error("failed to launch {program} for {host}: {source}")]
    Spawn {
        program: String,
        host: String,
        source: std::io::Error,
    },

    #[error("script {} returned non-zero exit status {exit_code} and output was '{output}'", .script.display())]
    ScriptFailed {
        script: PathBuf,
        exit_code: i32,
        output: String,
    },

    #[error("failed to run script {}: {source}", .script.display())]
    ScriptSpawn {
        script: PathBuf,
        source: std::io::Error,
    },

    /// `mktemp -d` on a host did not print a usable staging directory.
    #[error("could not create staging directory on {host}: got '{output}'")]
    Staging { host: String, output: String },

    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("unsupported compression format: {}", .0.display())]
    UnsupportedCompression(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("async runtime error: {0}")]
    Runtime(String),
}

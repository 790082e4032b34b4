//! Remote command execution contract.

use std::collections::BTreeMap;

use crate::error::{ExecError, ExecResult};

/// Exit code recorded for a host that did not answer within the timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// What one host returned for a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self::failure(TIMEOUT_EXIT_CODE, "timed out")
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Host → output, ordered by host name.
pub type HostOutputs = BTreeMap<String, CommandOutput>;

/// Runs a shell command on a set of hosts in parallel and waits for all.
pub trait RemoteExecutor {
    /// Run `command` on every host in `hosts`.
    ///
    /// With `check_exit_code`, any non-zero exit turns into
    /// [`ExecError::RemoteCommandFailed`]; without it the caller gets every
    /// host's output and decides.
    fn run(&self, command: &str, hosts: &[String], check_exit_code: bool) -> ExecResult<HostOutputs>;
}

/// Fail on the first host (by name) that exited non-zero.
pub fn check_outputs(command: &str, outputs: &HostOutputs) -> ExecResult<()> {
    match outputs.iter().find(|(_, out)| !out.is_success()) {
        Some((host, out)) => Err(ExecError::RemoteCommandFailed {
            command: command.to_string(),
            host: host.clone(),
            exit_code: out.exit_code,
            output: format!("{}{}", out.stdout, out.stderr),
        }),
        None => Ok(()),
    }
}

//! Local execution of generated init scripts.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{ExecError, ExecResult};

/// Runs one script on the operator's machine.
pub trait ScriptRunner {
    fn run_script(&self, script: &Path) -> ExecResult<()>;
}

/// Runs scripts with `bash`, capturing stdout and stderr together.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScriptRunner;

impl ScriptRunner for LocalScriptRunner {
    fn run_script(&self, script: &Path) -> ExecResult<()> {
        info!("run cmd 'bash {}'", script.display());
        let output = Command::new("bash")
            .arg(script)
            .output()
            .map_err(|source| ExecError::ScriptSpawn {
                script: script.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ExecError::ScriptFailed {
                script: script.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
                output: combined,
            });
        }
        Ok(())
    }
}

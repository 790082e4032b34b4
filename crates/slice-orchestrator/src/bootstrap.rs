//! Bootstrap of a freshly started static cluster.
//!
//! The first-stage script (`init_storage.bash`) fails until blob storage
//! has come up, so it is retried on a fixed step against a shrinking time
//! budget: 60 units in total, at most 5 per wait. Only a non-zero exit is
//! retried; a script that cannot be launched at all fails at once. The
//! remaining scripts run once each and any failure is fatal.

use std::path::Path;
use std::time::Duration;

use slice_exec::{ExecError, ExecResult, ScriptRunner};
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Total wait allowed for the first stage, in time units.
pub const BOOTSTRAP_BUDGET: u32 = 60;
/// Longest single wait between first-stage attempts, in time units.
pub const BOOTSTRAP_STEP: u32 = 5;

pub const FIRST_STAGE_SCRIPT: &str = "init_storage.bash";
pub const FOLLOW_UP_SCRIPTS: [&str; 4] = [
    "init_cms.bash",
    "init_compute.bash",
    "init_root_storage.bash",
    "init_databases.bash",
];

/// Fixed-step retry budget.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: u32,
    step: u32,
    waited: u32,
}

impl RetryBudget {
    pub fn new(total: u32, step: u32) -> Self {
        Self {
            remaining: total,
            step,
            waited: 0,
        }
    }

    /// Units to wait before the next attempt, or `None` once spent.
    pub fn next_wait(&mut self) -> Option<u32> {
        let wait = self.remaining.min(self.step);
        if wait == 0 {
            return None;
        }
        self.remaining -= wait;
        self.waited += wait;
        Some(wait)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn waited(&self) -> u32 {
        self.waited
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(BOOTSTRAP_BUDGET, BOOTSTRAP_STEP)
    }
}

/// Run the named scripts from `dir` in order. Missing scripts are skipped.
pub fn invoke_scripts(runner: &dyn ScriptRunner, dir: &Path, scripts: &[&str]) -> ExecResult<()> {
    for name in scripts {
        let path = dir.join(name);
        if path.is_file() {
            runner.run_script(&path)?;
        } else {
            debug!(script = %path.display(), "script not generated, skipping");
        }
    }
    Ok(())
}

/// Run the bootstrap scripts from the dynamic config directory.
///
/// `unit` is the length of one budget time unit.
pub fn run_bootstrap(runner: &dyn ScriptRunner, dir: &Path, unit: Duration) -> OrchestratorResult<()> {
    let mut budget = RetryBudget::default();
    loop {
        match invoke_scripts(runner, dir, &[FIRST_STAGE_SCRIPT]) {
            Ok(()) => break,
            Err(err @ ExecError::ScriptFailed { .. }) => match budget.next_wait() {
                Some(wait) => {
                    warn!(
                        wait,
                        remaining = budget.remaining(),
                        error = %err,
                        "storage not ready, retrying"
                    );
                    std::thread::sleep(unit * wait);
                }
                None => {
                    return Err(OrchestratorError::BootstrapTimeout {
                        waited: budget.waited(),
                        source: err,
                    });
                }
            },
            Err(err) => return Err(err.into()),
        }
    }

    invoke_scripts(runner, dir, &FOLLOW_UP_SCRIPTS)?;
    info!("bootstrap complete");
    Ok(())
}

//! slice-exec: the I/O side of slice provisioning.
//!
//! Everything here is a collaborator of the orchestrator, reached through a
//! trait so the lifecycle logic can be driven by in-memory fakes:
//!
//! - **`executor`**: [`RemoteExecutor`], run one shell command on many hosts
//! - **`deployer`**: [`FileDeployer`], ship files and directories to hosts
//! - **`ssh`**: [`SshTransport`], both of the above over `ssh` / `scp`
//! - **`script`**: [`ScriptRunner`], run generated init scripts locally
//! - **`configgen`**: [`ConfigGenerator`], locate generated config trees
//! - **`digest`**: SHA-256 of local artifacts

pub mod configgen;
pub mod deployer;
pub mod digest;
pub mod error;
pub mod executor;
pub mod script;
pub mod ssh;

pub use configgen::{ConfigGenerator, PrebuiltConfig};
pub use deployer::{CopyOptions, FileDeployer};
pub use digest::sha256_file;
pub use error::{ExecError, ExecResult};
pub use executor::{CommandOutput, HostOutputs, RemoteExecutor, TIMEOUT_EXIT_CODE, check_outputs};
pub use script::{LocalScriptRunner, ScriptRunner};
pub use ssh::SshTransport;

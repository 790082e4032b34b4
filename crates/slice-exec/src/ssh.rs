//! `ssh` / `scp` transport.
//!
//! Each call fans out one child process per host on a private tokio
//! runtime and blocks until every host answered or hit the per-host
//! timeout. Timed-out hosts report [`TIMEOUT_EXIT_CODE`].
//!
//! Uploads land in a fresh `mktemp -d` directory on each host and are moved
//! into place from there, so a leftover from an interrupted run is never
//! reused.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use slice_core::SshConfig;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::deployer::{CopyOptions, FileDeployer};
use crate::error::{ExecError, ExecResult};
use crate::executor::{CommandOutput, HostOutputs, RemoteExecutor, TIMEOUT_EXIT_CODE, check_outputs};

/// Creates a fresh staging directory and prints its path.
const MAKE_STAGING_DIR: &str = "mktemp -d /tmp/slice-staging.XXXXXXXX";
const STAGING_PREFIX: &str = "/tmp/slice-staging.";
/// Name of the upload inside its staging directory.
const STAGED_NAME: &str = "payload";

/// Remote executor and file deployer for a fixed set of hosts.
pub struct SshTransport {
    runtime: Runtime,
    hosts: Vec<String>,
    user: Option<String>,
    options: Vec<String>,
    timeout: Duration,
}

impl SshTransport {
    pub fn new(config: &SshConfig, hosts: Vec<String>) -> ExecResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ExecError::Runtime(e.to_string()))?;
        Ok(Self {
            runtime,
            hosts,
            user: config.user.clone(),
            options: config.options.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn target(&self, host: &str) -> String {
        destination(self.user.as_deref(), host)
    }

    fn base_command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-o").arg("BatchMode=yes");
        for option in &self.options {
            cmd.arg("-o").arg(option);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn ssh_command(&self, host: &str, command: &str) -> Command {
        let mut cmd = self.base_command("ssh");
        cmd.arg(self.target(host)).arg(command);
        cmd
    }

    fn scp_command(&self, host: &str, local: &Path, remote: &str, recursive: bool) -> Command {
        let mut cmd = self.base_command("scp");
        if recursive {
            cmd.arg("-r");
        }
        cmd.arg(local)
            .arg(format!("{}:{remote}", self.target(host)));
        cmd
    }

    fn fan_out(&self, program: &str, jobs: Vec<(String, Command)>) -> ExecResult<HostOutputs> {
        let timeout = self.timeout;
        self.runtime.block_on(async move {
            let mut tasks = JoinSet::new();
            for (host, mut cmd) in jobs {
                tasks.spawn(async move {
                    let result = tokio::time::timeout(timeout, cmd.output()).await;
                    (host, result)
                });
            }

            let mut outputs = HostOutputs::new();
            while let Some(joined) = tasks.join_next().await {
                let (host, result) = joined.map_err(|e| ExecError::Runtime(e.to_string()))?;
                let output = match result {
                    Ok(Ok(out)) => CommandOutput {
                        exit_code: out.status.code().unwrap_or(-1),
                        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                    },
                    Ok(Err(source)) => {
                        return Err(ExecError::Spawn {
                            program: program.to_string(),
                            host,
                            source,
                        });
                    }
                    Err(_) => {
                        warn!(host = %host, timeout_secs = timeout.as_secs(), exit_code = TIMEOUT_EXIT_CODE, "{program} timed out");
                        CommandOutput::timed_out()
                    }
                };
                outputs.insert(host, output);
            }
            Ok(outputs)
        })
    }
}

impl RemoteExecutor for SshTransport {
    fn run(&self, command: &str, hosts: &[String], check_exit_code: bool) -> ExecResult<HostOutputs> {
        debug!(hosts = hosts.len(), check_exit_code, "run: {command}");
        let jobs = hosts
            .iter()
            .map(|h| (h.clone(), self.ssh_command(h, command)))
            .collect();
        let outputs = self.fan_out("ssh", jobs)?;
        if check_exit_code {
            check_outputs(command, &outputs)?;
        }
        Ok(outputs)
    }
}

impl FileDeployer for SshTransport {
    fn copy(&self, local: &Path, remote: &str, options: &CopyOptions) -> ExecResult<()> {
        let source = options.compressed.as_deref().unwrap_or(local);
        if !source.exists() {
            return Err(ExecError::MissingArtifact(source.to_path_buf()));
        }
        debug!(source = %source.display(), remote, "copying to {} hosts", self.hosts.len());

        let created = self.run(MAKE_STAGING_DIR, &self.hosts, true)?;
        let mut staging = Vec::with_capacity(created.len());
        for (host, out) in &created {
            staging.push((host.clone(), staging_dir(host, out)?));
        }

        let jobs = staging
            .iter()
            .map(|(h, dir)| (h.clone(), self.scp_command(h, source, &staged_path(dir), options.recursive)))
            .collect();
        let outputs = self.fan_out("scp", jobs)?;
        check_outputs(&format!("scp {} {remote}", source.display()), &outputs)?;

        let mut jobs = Vec::with_capacity(staging.len());
        for (host, dir) in &staging {
            let install = install_command(dir, remote, options)?;
            jobs.push((host.clone(), self.ssh_command(host, &install)));
        }
        let outputs = self.fan_out("ssh", jobs)?;
        check_outputs(&format!("install {remote}"), &outputs)?;
        Ok(())
    }
}

fn destination(user: Option<&str>, host: &str) -> String {
    match user {
        Some(user) => format!("{user}@{host}"),
        None => host.to_string(),
    }
}

/// Validate the directory `mktemp -d` printed on `host`.
fn staging_dir(host: &str, out: &CommandOutput) -> ExecResult<String> {
    let dir = out.stdout.trim();
    let valid = dir
        .strip_prefix(STAGING_PREFIX)
        .is_some_and(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return Err(ExecError::Staging {
            host: host.to_string(),
            output: dir.to_string(),
        });
    }
    Ok(dir.to_string())
}

fn staged_path(dir: &str) -> String {
    format!("{dir}/{STAGED_NAME}")
}

fn decompressor(path: &Path) -> ExecResult<&'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("zst") => Ok("zstd -dc"),
        Some("gz") => Ok("gzip -dc"),
        Some("xz") => Ok("xz -dc"),
        _ => Err(ExecError::UnsupportedCompression(path.to_path_buf())),
    }
}

/// Shell command moving a staged upload to its final location and
/// removing the staging directory.
fn install_command(dir: &str, remote: &str, options: &CopyOptions) -> ExecResult<String> {
    let staged = staged_path(dir);
    let parent = Path::new(remote)
        .parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string());

    let mut cmd = format!("sudo mkdir -p {parent} && ");
    if options.recursive {
        cmd.push_str(&format!("sudo rm -rf {remote} && sudo mv {staged} {remote}"));
    } else if let Some(compressed) = &options.compressed {
        let unpack = decompressor(compressed)?;
        cmd.push_str(&format!(
            "{unpack} {staged} > {staged}.out && sudo mv -f {staged}.out {remote}"
        ));
    } else {
        cmd.push_str(&format!("sudo mv -f {staged} {remote}"));
    }

    if let Some(mode) = options.mode {
        cmd.push_str(&format!(" && sudo chmod {mode:o} {remote}"));
    }
    cmd.push_str(&format!(" && rm -rf {dir}"));
    Ok(cmd)
}

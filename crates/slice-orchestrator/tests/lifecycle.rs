//! Lifecycle integration tests.
//!
//! Drives every operation against in-memory collaborators and checks the
//! commands that reach the hosts: their order, which hosts they target and
//! whether failures are allowed to abort the run.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use slice_core::{ClusterConfig, Components};
use slice_exec::{
    CommandOutput, ConfigGenerator, CopyOptions, ExecError, ExecResult, FileDeployer, HostOutputs,
    PrebuiltConfig, RemoteExecutor, ScriptRunner, check_outputs, sha256_file,
};
use slice_orchestrator::commands::{KIKIMR_BIN_PATH, KIKIMR_CFG_PATH};
use slice_orchestrator::{Collaborators, LifecycleOptions, Orchestrator, OrchestratorError};
use slice_placement::StaticZones;

const CLUSTER: &str = r#"
hosts = ["h1", "h2"]

[zones]
h1 = "IVA"
h2 = "MYT"

[[domains]]
name = "Root"
bind_slots_to_numa_nodes = true
tenants = [{ name = "db1", compute_units = [{ zone = "iva", count = 1 }, { count = 1 }] }]

[[dynamic_slots]]
name = "31000"
domain = "Root"
grpc = 31001
mbus = 31002
ic = 31003
mon = 31004

[[dynamic_slots]]
name = "31010"
domain = "Root"
grpc = 31011
mbus = 31012
ic = 31013
mon = 31014
"#;

#[derive(Debug, Clone)]
struct Call {
    command: String,
    hosts: Vec<String>,
    check: bool,
}

/// Records every command. Commands matching `failing` exit non-zero, those
/// matching `unreachable` fail in transport.
struct RecordingExecutor {
    calls: RefCell<Vec<Call>>,
    failing: Vec<&'static str>,
    unreachable: Vec<&'static str>,
    digest: String,
}

impl RecordingExecutor {
    fn new(digest: impl Into<String>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            failing: Vec::new(),
            unreachable: Vec::new(),
            digest: digest.into(),
        }
    }

    fn failing(mut self, pattern: &'static str) -> Self {
        self.failing.push(pattern);
        self
    }

    fn unreachable(mut self, pattern: &'static str) -> Self {
        self.unreachable.push(pattern);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Index of the first command containing `pattern`.
    fn position(&self, pattern: &str) -> usize {
        self.commands()
            .iter()
            .position(|c| c.contains(pattern))
            .unwrap_or_else(|| panic!("no command containing {pattern:?}"))
    }

    fn count(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl RemoteExecutor for RecordingExecutor {
    fn run(&self, command: &str, hosts: &[String], check_exit_code: bool) -> ExecResult<HostOutputs> {
        self.calls.borrow_mut().push(Call {
            command: command.to_string(),
            hosts: hosts.to_vec(),
            check: check_exit_code,
        });

        if self.unreachable.iter().any(|p| command.contains(p)) {
            return Err(ExecError::Runtime(format!("connection lost: {command}")));
        }

        let output = if self.failing.iter().any(|p| command.contains(p)) {
            CommandOutput::failure(1, "failed")
        } else if command.contains("sha256sum") {
            CommandOutput::success(format!("{}\n", self.digest))
        } else if command.contains("numactl") {
            CommandOutput::success("2\n")
        } else {
            CommandOutput::success("")
        };
        let outputs: HostOutputs = hosts.iter().map(|h| (h.clone(), output.clone())).collect();

        if check_exit_code {
            check_outputs(command, &outputs)?;
        }
        Ok(outputs)
    }
}

#[derive(Default)]
struct RecordingDeployer {
    copies: RefCell<Vec<(PathBuf, String, CopyOptions)>>,
}

impl RecordingDeployer {
    fn remotes(&self) -> Vec<String> {
        self.copies.borrow().iter().map(|(_, r, _)| r.clone()).collect()
    }
}

impl FileDeployer for RecordingDeployer {
    fn copy(&self, local: &Path, remote: &str, options: &CopyOptions) -> ExecResult<()> {
        self.copies
            .borrow_mut()
            .push((local.to_path_buf(), remote.to_string(), options.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingScripts {
    scripts: RefCell<Vec<String>>,
}

impl ScriptRunner for RecordingScripts {
    fn run_script(&self, script: &Path) -> ExecResult<()> {
        let name = script.file_name().unwrap().to_string_lossy().into_owned();
        self.scripts.borrow_mut().push(name);
        Ok(())
    }
}

/// Binary, bundled lib and generated config trees on disk.
struct Fixture {
    _dir: tempfile::TempDir,
    cluster: ClusterConfig,
    configs: PrebuiltConfig,
    zones: StaticZones,
    digest: String,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("kikimr");
        fs::write(&binary, b"kikimr-binary").unwrap();
        fs::write(dir.path().join("libiconv.so"), b"lib").unwrap();

        let config_root = dir.path().join("cfg");
        fs::create_dir_all(config_root.join("kikimr-static")).unwrap();
        fs::create_dir_all(config_root.join("kikimr-dynamic")).unwrap();
        for script in ["init_storage.bash", "init_cms.bash"] {
            fs::write(config_root.join("kikimr-dynamic").join(script), "exit 0\n").unwrap();
        }

        let mut cluster = ClusterConfig::from_toml_str(CLUSTER).unwrap();
        cluster.artifacts.binary = Some(binary.clone());
        cluster.artifacts.config_root = Some(config_root.clone());

        Self {
            zones: StaticZones::new(cluster.zones.clone()),
            configs: PrebuiltConfig::new(config_root),
            digest: sha256_file(&binary).unwrap(),
            cluster,
            _dir: dir,
        }
    }
}

fn options() -> LifecycleOptions {
    LifecycleOptions {
        bootstrap_unit: Duration::ZERO,
        ..LifecycleOptions::default()
    }
}

fn orchestrator<'a>(
    fixture: &'a Fixture,
    components: Components,
    options: LifecycleOptions,
    executor: &'a RecordingExecutor,
    deployer: &'a RecordingDeployer,
    scripts: &'a RecordingScripts,
) -> Orchestrator<'a> {
    Orchestrator::new(
        &fixture.cluster,
        components,
        options,
        Collaborators {
            executor,
            deployer,
            scripts,
            configs: &fixture.configs,
            zones: &fixture.zones,
        },
    )
}

#[test]
fn install_runs_every_step_in_order() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let opts = LifecycleOptions {
        clear_logs: true,
        secret_version: Some("ver-1".to_string()),
        ..options()
    };

    let report = orchestrator(&fixture, Components::all(), opts, &executor, &deployer, &scripts)
        .install()
        .unwrap();

    let order = [
        "sudo mkdir -p /Berkanavt",
        "stop kikimr-multi slot=31000",
        "service kikimr stop",
        "while read x",
        "-name 'kikimr_*' -exec  rm -rf",
        "service rsyslog stop",
        "by-partlabel/kikimr_*",
        "sha256sum",
        "-o auth_file",
        "ln -f",
        "-o tvm_secret",
        "service kikimr start",
        "slot_cfg",
        "start kikimr-multi slot=31000",
    ];
    let positions: Vec<usize> = order.iter().map(|p| executor.position(p)).collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "out of order: {:?}",
        order.iter().zip(&positions).collect::<Vec<_>>()
    );

    assert_eq!(
        deployer.remotes(),
        vec![KIKIMR_BIN_PATH.to_string(), "/lib/libiconv.so".to_string(), KIKIMR_CFG_PATH.to_string()]
    );
    let copies = deployer.copies.borrow();
    assert_eq!(copies[0].2.mode, Some(0o755));
    assert!(copies[2].2.recursive);
    assert!(copies[2].0.ends_with("kikimr-static"));

    assert_eq!(*scripts.scripts.borrow(), vec!["init_storage.bash", "init_cms.bash"]);

    let plan = report.placement.unwrap();
    assert!(plan.is_complete());
    assert_eq!(plan.assignments().count(), 2);
}

#[test]
fn best_effort_commands_never_abort() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest)
        .failing("kikimr-multi")
        .failing("service kikimr stop")
        .failing("slot_cfg");
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let orch = orchestrator(&fixture, Components::all(), options(), &executor, &deployer, &scripts);

    orch.stop().unwrap();
    orch.update().unwrap();

    assert!(executor.calls().iter().filter(|c| c.command.contains("kikimr-multi")).all(|c| !c.check));
    assert_eq!(executor.count("service kikimr start"), 1);
}

#[test]
fn checked_failure_aborts_install() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest).failing("by-partlabel");
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();

    let err = orchestrator(&fixture, Components::all(), options(), &executor, &deployer, &scripts)
        .install()
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Exec(ExecError::RemoteCommandFailed { ref host, .. }) if host == "h1"
    ));
    assert_eq!(executor.count("service kikimr start"), 0);
    assert!(deployer.remotes().is_empty());
    assert!(scripts.scripts.borrow().is_empty());
}

#[test]
fn start_places_slots_on_their_hosts() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let components: Components = "dynamic_slots".parse().unwrap();

    let report = orchestrator(&fixture, components, options(), &executor, &deployer, &scripts)
        .start()
        .unwrap();

    // No static start when only dynamic slots are selected.
    assert_eq!(executor.count("service kikimr start"), 0);

    let probes: Vec<Call> = executor.calls().into_iter().filter(|c| c.command.contains("numactl")).collect();
    assert_eq!(probes.len(), 1);
    assert!(!probes[0].check);

    let starts: Vec<Call> = executor
        .calls()
        .into_iter()
        .filter(|c| c.command.contains("start kikimr-multi"))
        .collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0].hosts, vec!["h1"]);
    assert_eq!(starts[1].hosts, vec!["h2"]);
    assert!(starts.iter().all(|c| c.command.contains("slot=31000")));
    assert!(starts.iter().all(|c| c.command.contains("tenant=/Root/db1")));
    assert!(starts.iter().all(|c| c.command.contains("bindnumanode=0")));

    let plan = report.placement.unwrap();
    assert_eq!(plan.domains[0].unused_candidates, Some(2));
}

#[test]
fn kikimr_only_start_skips_placement() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let components: Components = "kikimr".parse().unwrap();

    let report = orchestrator(&fixture, components, options(), &executor, &deployer, &scripts)
        .start()
        .unwrap();

    assert!(report.placement.is_none());
    assert_eq!(executor.commands(), vec!["sudo service kikimr start"]);
    assert!(executor.calls()[0].check);
}

#[test]
fn digest_mismatch_is_reported() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new("deadbeef");
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let components: Components = "kikimr:bin".parse().unwrap();

    let err = orchestrator(&fixture, components, options(), &executor, &deployer, &scripts)
        .update()
        .unwrap_err();

    match err {
        OrchestratorError::DigestMismatch { host, expected, actual } => {
            assert_eq!(host, "h1");
            assert_eq!(expected, fixture.digest);
            assert_eq!(actual, "deadbeef");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing stopped before the binary was verified.
    assert_eq!(executor.count("service kikimr stop"), 0);
}

#[test]
fn missing_binary_artifact_is_an_error() {
    let mut fixture = Fixture::new();
    fixture.cluster.artifacts.binary = None;
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let components: Components = "kikimr:bin".parse().unwrap();

    let err = orchestrator(&fixture, components, options(), &executor, &deployer, &scripts)
        .update()
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::MissingArtifact("binary")));
}

#[test]
fn secrets_are_skipped_without_version() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let components: Components = "kikimr:cfg".parse().unwrap();

    orchestrator(&fixture, components, options(), &executor, &deployer, &scripts)
        .update()
        .unwrap();

    assert_eq!(executor.count("yav"), 0);
    assert_eq!(deployer.remotes(), vec![KIKIMR_CFG_PATH.to_string()]);
}

#[test]
fn raw_config_update_never_fetches_secrets() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let opts = LifecycleOptions {
        secret_version: Some("ver-1".to_string()),
        ..options()
    };

    orchestrator(&fixture, Components::all(), opts, &executor, &deployer, &scripts)
        .update_raw_configs()
        .unwrap();

    assert_eq!(executor.count("yav"), 0);
    assert_eq!(deployer.remotes(), vec![KIKIMR_CFG_PATH.to_string()]);
    assert!(executor.position("service kikimr stop") < executor.position("service kikimr start"));
}

#[test]
fn clear_removes_slot_directories_then_formats() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();

    orchestrator(&fixture, Components::all(), options(), &executor, &deployer, &scripts)
        .clear()
        .unwrap();

    assert!(executor.position("-name kikimr_31000 -exec") < executor.position("by-partlabel"));
    assert!(executor.position("-name kikimr_31010 -exec") < executor.position("by-partlabel"));
    assert_eq!(executor.count("kikimr start"), 0);
    let format = &executor.calls()[executor.position("by-partlabel")];
    assert!(format.check);
    assert_eq!(format.hosts, vec!["h1", "h2"]);
}

#[test]
fn format_restarts_after_wiping() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();

    orchestrator(&fixture, Components::all(), options(), &executor, &deployer, &scripts)
        .format()
        .unwrap();

    let stop = executor.position("service kikimr stop");
    let wipe = executor.position("by-partlabel");
    let start = executor.position("service kikimr start");
    assert!(stop < wipe && wipe < start);
    assert_eq!(executor.count("start kikimr-multi"), 2);
}

#[test]
fn update_without_config_generator_output_fails() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest);
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let empty = tempfile::tempdir().unwrap();
    let configs = PrebuiltConfig::new(empty.path());
    assert!(configs.static_config().is_err());

    let orch = Orchestrator::new(
        &fixture.cluster,
        "kikimr:cfg".parse().unwrap(),
        options(),
        Collaborators {
            executor: &executor,
            deployer: &deployer,
            scripts: &scripts,
            configs: &configs,
            zones: &fixture.zones,
        },
    );

    let err = orch.update().unwrap_err();
    assert!(matches!(err, OrchestratorError::Exec(ExecError::MissingArtifact(_))));
}

#[test]
fn transport_errors_in_best_effort_steps_are_swallowed() {
    let fixture = Fixture::new();
    let executor = RecordingExecutor::new(&fixture.digest)
        .unreachable("kikimr-multi")
        .unreachable("service kikimr stop")
        .unreachable("rm -rf --");
    let deployer = RecordingDeployer::default();
    let scripts = RecordingScripts::default();
    let orch = orchestrator(&fixture, Components::all(), options(), &executor, &deployer, &scripts);

    orch.stop().unwrap();
    orch.clear().unwrap();

    // Two stops of both slots, then both slot directories, then the wipe.
    assert_eq!(executor.count("stop kikimr-multi slot=3"), 4);
    assert_eq!(executor.count("rm -rf --"), 2);
    let wipe = &executor.calls()[executor.position("by-partlabel")];
    assert!(wipe.check);
}

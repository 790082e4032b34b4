//! Lifecycle operations over a slice.
//!
//! Commands whose failure leaves an acceptable state (stopping, removing,
//! per-slot starts and config writes) are best effort: non-zero exits and
//! transport errors are logged and the operation moves on. Everything else
//! fails fast; nothing is rolled back, a rerun recomputes from scratch.

use std::path::Path;
use std::time::Duration;

use slice_core::{ClusterConfig, Components};
use slice_exec::{
    ConfigGenerator, CopyOptions, FileDeployer, RemoteExecutor, ScriptRunner, sha256_file,
};
use slice_placement::{PlacementPlan, ZoneProvider, compute_placement};
use tracing::{debug, info, warn};

use crate::bootstrap::run_bootstrap;
use crate::commands;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::numa::ExecutorNumaProbe;

/// Operator switches for one invocation.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub clear_logs: bool,
    /// Secret version to fetch auth token and TVM secret from.
    pub secret_version: Option<String>,
    /// Length of one bootstrap budget unit.
    pub bootstrap_unit: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            clear_logs: false,
            secret_version: None,
            bootstrap_unit: Duration::from_secs(1),
        }
    }
}

/// External services an operation calls out to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub executor: &'a dyn RemoteExecutor,
    pub deployer: &'a dyn FileDeployer,
    pub scripts: &'a dyn ScriptRunner,
    pub configs: &'a dyn ConfigGenerator,
    pub zones: &'a dyn ZoneProvider,
}

/// What an operation did beyond succeeding.
#[derive(Debug, Default)]
pub struct OperationReport {
    /// Placement used to start dynamic slots, if they were selected.
    pub placement: Option<PlacementPlan>,
}

pub struct Orchestrator<'a> {
    cluster: &'a ClusterConfig,
    components: Components,
    options: LifecycleOptions,
    env: Collaborators<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        cluster: &'a ClusterConfig,
        components: Components,
        options: LifecycleOptions,
        env: Collaborators<'a>,
    ) -> Self {
        Self {
            cluster,
            components,
            options,
            env,
        }
    }

    fn hosts(&self) -> &'a [String] {
        &self.cluster.hosts
    }

    // ── Operations ─────────────────────────────────────────────

    /// Stop every known slot, then the static process.
    pub fn stop(&self) -> OrchestratorResult<()> {
        info!(hosts = self.hosts().len(), "stopping slice");
        self.stop_dynamic();
        if self.components.has_kikimr() {
            self.best_effort(&commands::stop_static());
        }
        Ok(())
    }

    /// Start the static process, then place and start dynamic slots.
    pub fn start(&self) -> OrchestratorResult<OperationReport> {
        info!(hosts = self.hosts().len(), "starting slice");
        if self.components.has_kikimr() {
            self.checked(&commands::start_static())?;
        }
        let placement = self.components.has_dynamic_slots().then(|| {
            let plan = self.plan();
            self.start_placed(&plan);
            plan
        });
        Ok(OperationReport { placement })
    }

    /// Full install from bare hosts.
    pub fn install(&self) -> OrchestratorResult<OperationReport> {
        info!(hosts = self.hosts().len(), "installing slice");
        self.checked(&commands::ensure_base_dir())?;
        self.stop()?;

        if self.components.has_dynamic_slots() || self.components.has_kikimr() {
            self.best_effort(&commands::stop_all_slots());
            self.best_effort(&commands::clear_registered_slots());
        }

        if self.options.clear_logs {
            self.clear_logs();
        }

        if self.components.has_kikimr() {
            self.checked(&commands::format_drives())?;
            if self.components.has_kikimr_bin() {
                self.install_binary()?;
            }
            if self.components.has_kikimr_cfg() {
                self.install_static_config()?;
                self.deploy_secrets()?;
            }
            self.checked(&commands::start_static())?;

            let dynamic_dir = self.env.configs.dynamic_config()?;
            run_bootstrap(self.env.scripts, &dynamic_dir, self.options.bootstrap_unit)?;
        }

        let placement = self.components.has_dynamic_slots().then(|| {
            let plan = self.plan();
            self.deploy_slot_configs(&plan);
            self.start_placed(&plan);
            plan
        });
        Ok(OperationReport { placement })
    }

    /// Roll new binary and config onto a running slice.
    pub fn update(&self) -> OrchestratorResult<OperationReport> {
        info!(hosts = self.hosts().len(), "updating slice");
        if self.options.clear_logs {
            self.clear_logs();
        }
        if self.components.has_kikimr_bin() {
            self.install_binary()?;
        }

        self.stop()?;

        if self.components.has_kikimr_cfg() {
            self.install_static_config()?;
            self.deploy_secrets()?;
        }

        let placement = self.components.has_dynamic_slots().then(|| {
            let plan = self.plan();
            self.deploy_slot_configs(&plan);
            plan
        });

        if self.components.has_kikimr() {
            self.checked(&commands::start_static())?;
        }
        if let Some(plan) = &placement {
            self.start_placed(plan);
        }
        Ok(OperationReport { placement })
    }

    /// Stop, remove slot directories, wipe drives.
    pub fn clear(&self) -> OrchestratorResult<()> {
        info!(hosts = self.hosts().len(), "clearing slice");
        self.stop()?;
        if self.components.has_dynamic_slots() {
            for slot in &self.cluster.dynamic_slots {
                self.best_effort(&commands::clear_slot(slot));
            }
        }
        if self.components.has_kikimr() {
            self.checked(&commands::format_drives())?;
        }
        Ok(())
    }

    /// Stop, wipe drives, start again.
    pub fn format(&self) -> OrchestratorResult<OperationReport> {
        info!(hosts = self.hosts().len(), "formatting slice");
        self.stop()?;
        self.checked(&commands::format_drives())?;
        self.start()
    }

    /// Restart with the static config tree as-is, without secrets.
    pub fn update_raw_configs(&self) -> OrchestratorResult<OperationReport> {
        info!(hosts = self.hosts().len(), "updating raw configs");
        self.stop()?;
        if self.components.has_kikimr_cfg() {
            self.install_static_config()?;
        }
        self.start()
    }

    /// Compute placement without touching hosts beyond the NUMA probe.
    pub fn plan(&self) -> PlacementPlan {
        let probe = ExecutorNumaProbe::new(self.env.executor, self.hosts());
        compute_placement(self.cluster, self.env.zones, &probe)
    }

    // ── Steps ──────────────────────────────────────────────────

    fn stop_dynamic(&self) {
        if !self.components.has_dynamic_slots() {
            return;
        }
        for slot in &self.cluster.dynamic_slots {
            self.best_effort(&commands::stop_slot(slot));
        }
    }

    fn clear_logs(&self) {
        self.best_effort(&commands::clear_logs());
    }

    fn deploy_slot_configs(&self, plan: &PlacementPlan) {
        for assignment in plan.assignments() {
            self.best_effort_on(&commands::deploy_slot_config(assignment), &assignment.host);
        }
    }

    fn start_placed(&self, plan: &PlacementPlan) {
        for assignment in plan.assignments() {
            self.best_effort_on(&commands::start_slot_for_tenant(assignment), &assignment.host);
        }
        info!(slots = plan.assignments().count(), "placed slots started");
    }

    fn install_binary(&self) -> OrchestratorResult<()> {
        let artifacts = &self.cluster.artifacts;
        let binary = artifacts
            .binary
            .as_deref()
            .ok_or(OrchestratorError::MissingArtifact("binary"))?;

        let options = CopyOptions {
            compressed: artifacts.compressed_binary.clone(),
            recursive: false,
            mode: Some(0o755),
        };
        self.env.deployer.copy(binary, commands::KIKIMR_BIN_PATH, &options)?;

        if let Some(dir) = binary.parent() {
            for lib in commands::BUNDLED_LIBS {
                let path = dir.join(lib);
                if path.exists() {
                    self.env
                        .deployer
                        .copy(&path, &format!("/lib/{lib}"), &CopyOptions::default())?;
                }
            }
        }

        self.verify_binary(binary)
    }

    /// Compare the installed binary on every host with the local one.
    fn verify_binary(&self, binary: &Path) -> OrchestratorResult<()> {
        let expected = sha256_file(binary)?;
        let outputs = self
            .env
            .executor
            .run(&commands::installed_binary_digest(), self.hosts(), true)?;
        for (host, out) in outputs {
            let actual = out.stdout.trim();
            if actual != expected {
                return Err(OrchestratorError::DigestMismatch {
                    host,
                    expected,
                    actual: actual.to_string(),
                });
            }
        }
        info!(digest = %expected, "binary installed");
        Ok(())
    }

    fn install_static_config(&self) -> OrchestratorResult<()> {
        let dir = self.env.configs.static_config()?;
        self.env
            .deployer
            .copy(&dir, commands::KIKIMR_CFG_PATH, &CopyOptions::directory())?;
        Ok(())
    }

    fn deploy_secrets(&self) -> OrchestratorResult<()> {
        let Some(version) = self.options.secret_version.as_deref() else {
            return Ok(());
        };
        self.checked(&commands::fetch_auth_token(version))?;
        self.checked(&commands::link_auth_token())?;
        self.checked(&commands::fetch_tvm_secret(version))?;
        Ok(())
    }

    // ── Execution helpers ──────────────────────────────────────

    fn checked(&self, command: &str) -> OrchestratorResult<()> {
        self.env.executor.run(command, self.hosts(), true)?;
        Ok(())
    }

    fn best_effort(&self, command: &str) {
        self.best_effort_hosts(command, self.hosts());
    }

    fn best_effort_on(&self, command: &str, host: &str) {
        self.best_effort_hosts(command, std::slice::from_ref(&host.to_string()));
    }

    fn best_effort_hosts(&self, command: &str, hosts: &[String]) {
        match self.env.executor.run(command, hosts, false) {
            Ok(outputs) => {
                let failed = outputs.values().filter(|o| !o.is_success()).count();
                if failed > 0 {
                    debug!(failed, "ignoring non-zero exit: {command}");
                }
            }
            Err(err) => warn!(error = %err, "ignoring failure: {command}"),
        }
    }
}

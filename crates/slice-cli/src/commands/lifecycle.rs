use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::bail;
use slice_core::{ClusterConfig, Components};
use slice_exec::{LocalScriptRunner, PrebuiltConfig, SshTransport};
use slice_orchestrator::{Collaborators, LifecycleOptions, OperationReport, Orchestrator};
use slice_placement::{PlacementPlan, StaticZones};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Start,
    Stop,
    Update,
    Clear,
    Format,
    UpdateRawCfg,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Update => "update",
            Self::Clear => "clear",
            Self::Format => "format",
            Self::UpdateRawCfg => "update-raw-cfg",
        };
        f.write_str(name)
    }
}

pub fn run(
    cluster_path: &Path,
    operation: Operation,
    selectors: &[String],
    options: LifecycleOptions,
) -> anyhow::Result<()> {
    let cluster = ClusterConfig::from_file(cluster_path)?;
    let components = Components::from_selectors(selectors)?;

    let transport = SshTransport::new(&cluster.ssh, cluster.hosts.clone())?;
    let configs = PrebuiltConfig::new(config_root(&cluster, cluster_path));
    let zones = StaticZones::new(cluster.zones.clone());
    let scripts = LocalScriptRunner;

    let orchestrator = Orchestrator::new(
        &cluster,
        components,
        options,
        Collaborators {
            executor: &transport,
            deployer: &transport,
            scripts: &scripts,
            configs: &configs,
            zones: &zones,
        },
    );

    info!(%operation, hosts = cluster.hosts.len(), "running");
    let report = match operation {
        Operation::Install => orchestrator.install()?,
        Operation::Start => orchestrator.start()?,
        Operation::Stop => {
            orchestrator.stop()?;
            OperationReport::default()
        }
        Operation::Update => orchestrator.update()?,
        Operation::Clear => {
            orchestrator.clear()?;
            OperationReport::default()
        }
        Operation::Format => orchestrator.format()?,
        Operation::UpdateRawCfg => orchestrator.update_raw_configs()?,
    };

    if let Some(plan) = &report.placement {
        check_complete(plan)?;
    }
    println!("✓ {operation} finished on {} hosts", cluster.hosts.len());
    Ok(())
}

/// Generated config root, defaulting to the cluster file's directory.
fn config_root(cluster: &ClusterConfig, cluster_path: &Path) -> PathBuf {
    cluster.artifacts.config_root.clone().unwrap_or_else(|| {
        cluster_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    })
}

/// Fail the run if any domain could not be fully placed.
fn check_complete(plan: &PlacementPlan) -> anyhow::Result<()> {
    let shortfalls: Vec<String> = plan.shortfalls().map(ToString::to_string).collect();
    if !shortfalls.is_empty() {
        bail!("placement incomplete:\n  {}", shortfalls.join("\n  "));
    }
    Ok(())
}

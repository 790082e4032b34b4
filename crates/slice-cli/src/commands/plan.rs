use std::fmt::Write as _;
use std::path::Path;

use serde_json::json;
use slice_core::ClusterConfig;
use slice_exec::SshTransport;
use slice_orchestrator::ExecutorNumaProbe;
use slice_placement::{NoNumaProbe, PlacementPlan, StaticZones, compute_placement};

pub fn plan(cluster_path: &Path, format: &str, numa_probe: bool) -> anyhow::Result<()> {
    let cluster = ClusterConfig::from_file(cluster_path)?;
    let zones = StaticZones::new(cluster.zones.clone());

    let plan = if numa_probe && cluster.wants_numa_binding() {
        let transport = SshTransport::new(&cluster.ssh, cluster.hosts.clone())?;
        let probe = ExecutorNumaProbe::new(&transport, &cluster.hosts);
        compute_placement(&cluster, &zones, &probe)
    } else {
        compute_placement(&cluster, &zones, &NoNumaProbe)
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        }
        _ => {
            print!("{}", format_plan(&plan));
        }
    }

    Ok(())
}

fn plan_json(plan: &PlacementPlan) -> serde_json::Value {
    let domains: Vec<serde_json::Value> = plan
        .domains
        .iter()
        .map(|d| {
            json!({
                "domain": d.domain,
                "assignments": d.assignments,
                "unused_candidates": d.unused_candidates,
                "shortfall": d.shortfall.as_ref().map(ToString::to_string),
            })
        })
        .collect();
    json!({ "complete": plan.is_complete(), "domains": domains })
}

fn format_plan(plan: &PlacementPlan) -> String {
    let mut out = String::new();
    for domain in &plan.domains {
        let _ = write!(out, "domain {}: {} placed", domain.domain, domain.placed());
        if let Some(unused) = domain.unused_candidates {
            let _ = write!(out, ", {unused} unused");
        }
        out.push('\n');

        for a in &domain.assignments {
            let numa = a.numa_node.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:<24} slot {:<8} {:<32} numa {numa}",
                a.tenant_path(),
                a.slot.name,
                a.host
            );
        }
        if let Some(err) = &domain.shortfall {
            let _ = writeln!(out, "  ✗ {err}");
        }
    }
    out
}

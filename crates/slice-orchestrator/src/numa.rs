//! NUMA topology probe over the remote executor.

use std::collections::HashMap;

use slice_exec::RemoteExecutor;
use slice_placement::NumaProbe;
use tracing::warn;

use crate::commands;

/// Asks every host for its NUMA node count via `numactl`.
///
/// Hosts where the probe fails or prints garbage count as having no NUMA
/// nodes, so their slots start unbound.
pub struct ExecutorNumaProbe<'a> {
    executor: &'a dyn RemoteExecutor,
    hosts: &'a [String],
}

impl<'a> ExecutorNumaProbe<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, hosts: &'a [String]) -> Self {
        Self { executor, hosts }
    }
}

impl NumaProbe for ExecutorNumaProbe<'_> {
    fn numa_nodes(&self) -> HashMap<String, u32> {
        let outputs = match self.executor.run(&commands::numa_node_count(), self.hosts, false) {
            Ok(outputs) => outputs,
            Err(err) => {
                warn!(error = %err, "NUMA probe failed, slots will not be bound");
                return HashMap::new();
            }
        };

        outputs
            .into_iter()
            .map(|(host, out)| {
                let nodes = if out.is_success() {
                    out.stdout.trim().parse().unwrap_or(0)
                } else {
                    0
                };
                (host, nodes)
            })
            .collect()
    }
}

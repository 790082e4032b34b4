//! Placement engine - assigns (slot, host) pairs to compute units.
//!
//! Per domain, tenants are walked in declaration order and each compute
//! unit takes `count` candidates from the front of its zone's pool,
//! skipping pairs the domain already took. When a pool runs dry the whole
//! domain stops there; assignments made so far are kept.
//!
//! NUMA round-robin counters live on the [`Placer`] and are keyed by host,
//! so a host shared by several domains keeps cycling through its nodes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use slice_core::{Domain, Slot};
use tracing::{debug, error, info, warn};

use crate::error::PlacementError;
use crate::index::CandidatePools;

/// Reports how many NUMA nodes each host has.
///
/// Only consulted once per run, and only if a domain asks for NUMA
/// binding. Hosts missing from the map count as having none.
pub trait NumaProbe {
    fn numa_nodes(&self) -> HashMap<String, u32>;
}

/// Probe for runs that never bind to NUMA nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNumaProbe;

impl NumaProbe for NoNumaProbe {
    fn numa_nodes(&self) -> HashMap<String, u32> {
        HashMap::new()
    }
}

/// One placed compute-unit instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub domain: String,
    pub tenant: String,
    pub slot: Slot,
    pub host: String,
    /// NUMA node to bind to, if the domain binds and the host has nodes.
    pub numa_node: Option<u32>,
}

impl Assignment {
    /// Tenant path as the server expects it: `/<domain>/<tenant>`.
    pub fn tenant_path(&self) -> String {
        format!("/{}/{}", self.domain, self.tenant)
    }
}

/// Placement outcome for one domain.
#[derive(Debug, Clone)]
pub struct DomainPlacement {
    pub domain: String,
    pub assignments: Vec<Assignment>,
    /// Candidate pairs left untaken. Diagnostic only: the pools are a
    /// cross-product, so this overstates real spare capacity. `None` when
    /// the domain ran out of candidates.
    pub unused_candidates: Option<usize>,
    /// Set when a compute unit could not be satisfied.
    pub shortfall: Option<PlacementError>,
}

impl DomainPlacement {
    pub fn placed(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall.is_none()
    }
}

/// Greedy slot placer. One instance per placement run.
pub struct Placer<'p> {
    probe: &'p dyn NumaProbe,
    numa_nodes: Option<HashMap<String, u32>>,
    numa_counters: HashMap<String, u32>,
}

impl<'p> Placer<'p> {
    pub fn new(probe: &'p dyn NumaProbe) -> Self {
        Self {
            probe,
            numa_nodes: None,
            numa_counters: HashMap::new(),
        }
    }

    /// Place every compute unit of `domain` from `pools`.
    pub fn place(&mut self, domain: &Domain, mut pools: CandidatePools<'_>) -> DomainPlacement {
        if domain.bind_slots_to_numa_nodes && self.numa_nodes.is_none() {
            let nodes = self.probe.numa_nodes();
            debug!(hosts = nodes.len(), "probed NUMA topology");
            self.numa_nodes = Some(nodes);
        }

        let mut taken: HashSet<(&str, &str)> = HashSet::new();
        let mut assignments = Vec::new();

        for tenant in &domain.tenants {
            for unit in &tenant.compute_units {
                let zone = unit.zone_key();
                for placed in 0..unit.count {
                    let next = std::iter::from_fn(|| pools.pop(&zone))
                        .find(|c| !taken.contains(&(c.slot.name.as_str(), c.host)));

                    let Some(candidate) = next else {
                        let err = PlacementError::InsufficientCapacity {
                            domain: domain.name.clone(),
                            tenant: tenant.name.clone(),
                            zone: zone.clone(),
                            requested: unit.count,
                            placed,
                        };
                        error!(
                            domain = %domain.name,
                            tenant = %tenant.name,
                            zone = %zone,
                            placed = assignments.len(),
                            "insufficient slots allocated"
                        );
                        return DomainPlacement {
                            domain: domain.name.clone(),
                            assignments,
                            unused_candidates: None,
                            shortfall: Some(err),
                        };
                    };

                    taken.insert((candidate.slot.name.as_str(), candidate.host));
                    let numa_node = if domain.bind_slots_to_numa_nodes {
                        self.next_numa_node(candidate.host)
                    } else {
                        None
                    };

                    debug!(
                        domain = %domain.name,
                        tenant = %tenant.name,
                        slot = %candidate.slot.name,
                        host = candidate.host,
                        numa_node,
                        "placed slot"
                    );
                    assignments.push(Assignment {
                        domain: domain.name.clone(),
                        tenant: tenant.name.clone(),
                        slot: candidate.slot.clone(),
                        host: candidate.host.to_string(),
                        numa_node,
                    });
                }
            }
        }

        let unused = pools.total_candidates().saturating_sub(taken.len());
        info!(
            domain = %domain.name,
            placed = assignments.len(),
            "domain placement complete"
        );
        warn!(domain = %domain.name, count = unused, "unused slots");

        DomainPlacement {
            domain: domain.name.clone(),
            assignments,
            unused_candidates: Some(unused),
            shortfall: None,
        }
    }

    /// Next round-robin NUMA node for `host`, or `None` if it has none.
    fn next_numa_node(&mut self, host: &str) -> Option<u32> {
        let nodes = self
            .numa_nodes
            .as_ref()
            .and_then(|m| m.get(host))
            .copied()
            .unwrap_or(0);
        if nodes == 0 {
            return None;
        }
        let counter = self.numa_counters.entry(host.to_string()).or_insert(0);
        let current = *counter;
        *counter = (current + 1) % nodes;
        Some(current)
    }
}

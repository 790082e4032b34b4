//! Whole-cluster placement: every domain, in declaration order.

use slice_core::ClusterConfig;
use tracing::warn;

use crate::error::PlacementError;
use crate::index::{ZoneProvider, build_index};
use crate::placer::{Assignment, DomainPlacement, NumaProbe, Placer};

/// Placement for every domain of a cluster.
#[derive(Debug, Clone, Default)]
pub struct PlacementPlan {
    pub domains: Vec<DomainPlacement>,
}

impl PlacementPlan {
    /// All assignments, domain by domain, in placement order.
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.domains.iter().flat_map(|d| d.assignments.iter())
    }

    /// Domains that ran out of candidates.
    pub fn shortfalls(&self) -> impl Iterator<Item = &PlacementError> {
        self.domains.iter().filter_map(|d| d.shortfall.as_ref())
    }

    pub fn is_complete(&self) -> bool {
        self.domains.iter().all(DomainPlacement::is_complete)
    }
}

/// Compute placement for all domains of `cluster`.
///
/// A domain that runs out of candidates is reported in its
/// [`DomainPlacement`]; later domains are still placed. NUMA counters are
/// shared across domains for the duration of this call.
pub fn compute_placement(
    cluster: &ClusterConfig,
    zones: &dyn ZoneProvider,
    numa: &dyn NumaProbe,
) -> PlacementPlan {
    let mut placer = Placer::new(numa);
    let mut domains = Vec::with_capacity(cluster.domains.len());

    for domain in &cluster.domains {
        let pools = build_index(domain, &cluster.dynamic_slots, &cluster.hosts, zones);
        let placement = placer.place(domain, pools);
        if let Some(err) = &placement.shortfall {
            warn!(domain = %domain.name, error = %err, "domain placement abandoned");
        }
        domains.push(placement);
    }

    PlacementPlan { domains }
}

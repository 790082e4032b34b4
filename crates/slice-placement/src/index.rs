//! Zone index builder.
//!
//! For a domain, every slot is paired with every host in the fleet. Each
//! pair lands in the pool of the host's zone and in the `any` pool. Pool
//! order is slots (declaration order) then hosts (fleet order); the placer
//! consumes pools front to back, so this order decides which host wins.

use std::collections::{BTreeMap, HashMap, VecDeque};

use slice_core::{ANY_ZONE, Domain, Slot};
use tracing::debug;

/// Resolves a host to its datacenter label.
pub trait ZoneProvider {
    fn zone_of(&self, host: &str) -> String;
}

/// Zone lookup backed by the `[zones]` table of the cluster description.
///
/// Hosts missing from the table resolve to the empty label, which no
/// compute unit can name, so they are only reachable through `any`.
#[derive(Debug, Clone, Default)]
pub struct StaticZones {
    zones: BTreeMap<String, String>,
}

impl StaticZones {
    pub fn new(zones: BTreeMap<String, String>) -> Self {
        Self { zones }
    }
}

impl ZoneProvider for StaticZones {
    fn zone_of(&self, host: &str) -> String {
        self.zones.get(host).cloned().unwrap_or_default()
    }
}

/// A (slot, host) pair that could carry one compute-unit instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate<'a> {
    pub slot: &'a Slot,
    pub host: &'a str,
}

/// Per-zone FIFO pools of candidates for one domain.
#[derive(Debug, Clone)]
pub struct CandidatePools<'a> {
    pools: HashMap<String, VecDeque<Candidate<'a>>>,
    total: usize,
}

impl<'a> CandidatePools<'a> {
    fn new() -> Self {
        let mut pools = HashMap::new();
        pools.insert(ANY_ZONE.to_string(), VecDeque::new());
        Self { pools, total: 0 }
    }

    /// Number of distinct (slot, host) pairs in the domain.
    ///
    /// Pairs in `any` are not counted twice.
    pub fn total_candidates(&self) -> usize {
        self.total
    }

    /// Take the next candidate from `zone`. A zone without a pool is empty.
    pub fn pop(&mut self, zone: &str) -> Option<Candidate<'a>> {
        self.pools.get_mut(zone).and_then(VecDeque::pop_front)
    }

    fn push(&mut self, zone: String, candidate: Candidate<'a>) {
        self.pools.entry(zone).or_default().push_back(candidate);
        self.pools
            .entry(ANY_ZONE.to_string())
            .or_default()
            .push_back(candidate);
        self.total += 1;
    }
}

/// Build the candidate pools for `domain`.
///
/// Empty slot lists or an empty fleet produce empty pools; exhaustion is
/// detected by the placer, not here.
pub fn build_index<'a>(
    domain: &Domain,
    slots: &'a [Slot],
    hosts: &'a [String],
    zones: &dyn ZoneProvider,
) -> CandidatePools<'a> {
    let host_zones: Vec<(&'a str, String)> = hosts
        .iter()
        .map(|h| (h.as_str(), zones.zone_of(h).to_lowercase()))
        .collect();

    let mut pools = CandidatePools::new();
    for slot in slots.iter().filter(|s| s.domain == domain.name) {
        for (host, zone) in &host_zones {
            pools.push(zone.clone(), Candidate { slot, host });
        }
    }

    debug!(
        domain = %domain.name,
        candidates = pools.total,
        zones = pools.pools.len(),
        "built candidate pools"
    );
    pools
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remaining(pools: &CandidatePools<'_>, zone: &str) -> usize {
        pools.pools.get(zone).map_or(0, VecDeque::len)
    }

    fn zone_labels(pools: &CandidatePools<'_>) -> Vec<String> {
        let mut zones: Vec<String> = pools.pools.keys().cloned().collect();
        zones.sort_unstable();
        zones
    }

    fn make_slot(name: &str, domain: &str) -> Slot {
        Slot {
            name: name.to_string(),
            domain: domain.to_string(),
            grpc: 1,
            mbus: 2,
            ic: 3,
            mon: 4,
        }
    }

    fn make_domain(name: &str) -> Domain {
        Domain {
            name: name.to_string(),
            tenants: Vec::new(),
            bind_slots_to_numa_nodes: false,
        }
    }

    fn zones(pairs: &[(&str, &str)]) -> StaticZones {
        StaticZones::new(
            pairs
                .iter()
                .map(|(h, z)| (h.to_string(), z.to_string()))
                .collect(),
        )
    }

    #[test]
    fn cross_product_lands_in_zone_and_any() {
        let slots = vec![make_slot("s1", "prod"), make_slot("s2", "prod")];
        let hosts = vec!["h1".to_string(), "h2".to_string()];
        let zones = zones(&[("h1", "IVA"), ("h2", "MYT")]);

        let pools = build_index(&make_domain("prod"), &slots, &hosts, &zones);

        assert_eq!(pools.total_candidates(), 4);
        assert_eq!(remaining(&pools, "any"), 4);
        assert_eq!(remaining(&pools, "iva"), 2);
        assert_eq!(remaining(&pools, "myt"), 2);
        assert_eq!(zone_labels(&pools), vec!["any", "iva", "myt"]);
    }

    #[test]
    fn pool_order_is_slots_then_hosts() {
        let slots = vec![make_slot("s1", "prod"), make_slot("s2", "prod")];
        let hosts = vec!["h1".to_string(), "h2".to_string()];
        let zones = zones(&[("h1", "iva"), ("h2", "iva")]);

        let mut pools = build_index(&make_domain("prod"), &slots, &hosts, &zones);

        let order: Vec<(String, String)> = std::iter::from_fn(|| pools.pop("iva"))
            .map(|c| (c.slot.name.clone(), c.host.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("s1".to_string(), "h1".to_string()),
                ("s1".to_string(), "h2".to_string()),
                ("s2".to_string(), "h1".to_string()),
                ("s2".to_string(), "h2".to_string()),
            ]
        );
    }

    #[test]
    fn ignores_slots_of_other_domains() {
        let slots = vec![make_slot("s1", "prod"), make_slot("s2", "test")];
        let hosts = vec!["h1".to_string()];
        let zones = zones(&[("h1", "iva")]);

        let pools = build_index(&make_domain("test"), &slots, &hosts, &zones);

        assert_eq!(pools.total_candidates(), 1);
        assert_eq!(remaining(&pools, "iva"), 1);
    }

    #[test]
    fn empty_fleet_yields_empty_any_pool() {
        let slots = vec![make_slot("s1", "prod")];
        let hosts: Vec<String> = Vec::new();

        let mut pools = build_index(&make_domain("prod"), &slots, &hosts, &StaticZones::default());

        assert_eq!(pools.total_candidates(), 0);
        assert_eq!(zone_labels(&pools), vec!["any"]);
        assert!(pools.pop("any").is_none());
        assert!(pools.pop("iva").is_none());
    }

    #[test]
    fn unknown_host_zone_is_empty_label() {
        let zones = StaticZones::default();
        assert_eq!(zones.zone_of("h1"), "");
    }
}

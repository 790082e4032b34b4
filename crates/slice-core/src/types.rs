//! Inventory types shared across slice crates.

use serde::{Deserialize, Serialize};

/// Wildcard zone label. Every host belongs to it.
pub const ANY_ZONE: &str = "any";

/// An administrative grouping of tenants and slots, placed independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    /// Pin placed slots to NUMA nodes round-robin per host.
    #[serde(default)]
    pub bind_slots_to_numa_nodes: bool,
}

/// A database inside a domain, with its compute demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    #[serde(default)]
    pub compute_units: Vec<ComputeUnit>,
}

/// Demand for `count` slot instances in `zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnit {
    #[serde(default = "default_zone")]
    pub zone: String,
    pub count: u32,
}

impl ComputeUnit {
    /// Zone label as used for pool lookup.
    pub fn zone_key(&self) -> String {
        self.zone.to_lowercase()
    }
}

fn default_zone() -> String {
    ANY_ZONE.to_string()
}

/// A pre-provisioned dynamic slot. Not bound to any host until placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub domain: String,
    pub grpc: u16,
    pub mbus: u16,
    pub ic: u16,
    pub mon: u16,
}

impl Slot {
    /// On-host directory holding the slot's registration and logs.
    pub fn directory(&self) -> String {
        format!("{}/kikimr_{}", crate::config::BASE_DIR, self.name)
    }
}

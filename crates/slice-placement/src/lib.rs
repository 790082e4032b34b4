//! Slice placement - binds host-less dynamic slots to hosts.
//!
//! A slot is a logical unit with fixed ports; any host in the fleet can
//! carry it. Placement decides, per domain, which (slot, host) pair serves
//! each compute unit a tenant asks for. It does NOT touch hosts (that's
//! `slice-orchestrator`); it only produces the assignment list.
//!
//! # Components
//!
//! - **`index`**: Per-zone candidate pools (slot × host cross-product)
//! - **`placer`**: Greedy FIFO consumption, NUMA round-robin, exhaustion
//! - **`plan`**: Whole-cluster placement over all domains

pub mod error;
pub mod index;
pub mod placer;
pub mod plan;

pub use error::PlacementError;
pub use index::{Candidate, CandidatePools, StaticZones, ZoneProvider, build_index};
pub use placer::{Assignment, DomainPlacement, NoNumaProbe, NumaProbe, Placer};
pub use plan::{PlacementPlan, compute_placement};

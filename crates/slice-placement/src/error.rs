//! Placement error types.

use thiserror::Error;

/// Errors reported by the placement engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// A compute unit could not be satisfied from its zone's pool. The rest
    /// of the domain is abandoned.
    #[error(
        "insufficient slots in domain {domain}: tenant {tenant} requested {requested} in zone {zone}, placed {placed}"
    )]
    InsufficientCapacity {
        domain: String,
        tenant: String,
        zone: String,
        requested: u32,
        placed: u32,
    },
}

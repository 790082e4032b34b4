//! slice-core: shared inventory types for slice provisioning.
//!
//! - **`types`**: domains, tenants, compute units, slots
//! - **`components`**: which parts of the slice an operation touches
//! - **`config`**: the cluster description file (`cluster.toml`)

pub mod components;
pub mod config;
pub mod error;
pub mod types;

pub use components::{Components, KikimrParts};
pub use config::{ArtifactsConfig, ClusterConfig, SshConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;

//! Error types for loading a cluster description.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating a cluster description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse cluster config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate domain: {0}")]
    DuplicateDomain(String),

    #[error("duplicate tenant {tenant} in domain {domain}")]
    DuplicateTenant { domain: String, tenant: String },

    #[error("duplicate slot: {0}")]
    DuplicateSlot(String),

    #[error("duplicate host: {0}")]
    DuplicateHost(String),

    #[error("slot {slot} references unknown domain {domain}")]
    UnknownDomain { slot: String, domain: String },

    #[error("invalid component selector: {0}")]
    InvalidComponent(String),
}

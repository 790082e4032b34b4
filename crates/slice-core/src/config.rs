//! cluster.toml parser.
//!
//! ```toml
//! hosts = ["host-1.example.net", "host-2.example.net"]
//!
//! [zones]
//! "host-1.example.net" = "IVA"
//!
//! [[domains]]
//! name = "Root"
//! bind_slots_to_numa_nodes = true
//!
//! [[domains.tenants]]
//! name = "db1"
//! compute_units = [{ zone = "iva", count = 2 }]
//!
//! [[dynamic_slots]]
//! name = "31000"
//! domain = "Root"
//! grpc = 31001
//! mbus = 31002
//! ic = 31003
//! mon = 31004
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Domain, Slot};

/// Base directory for everything the slice installs on a host.
pub const BASE_DIR: &str = "/Berkanavt";

/// Default per-host timeout for a remote command, in seconds.
const DEFAULT_SSH_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Host → datacenter label.
    #[serde(default)]
    pub zones: BTreeMap<String, String>,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub dynamic_slots: Vec<Slot>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Local build outputs deployed to the slice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Server binary.
    pub binary: Option<PathBuf>,
    /// Compressed copy of `binary`, shipped instead of it when present.
    pub compressed_binary: Option<PathBuf>,
    /// Generated config root holding `kikimr-static/` and `kikimr-dynamic/`.
    pub config_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    pub user: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Extra `-o` options passed to ssh and scp.
    #[serde(default)]
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            timeout_secs: DEFAULT_SSH_TIMEOUT_SECS,
            options: Vec::new(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_SSH_TIMEOUT_SECS
}

impl ClusterConfig {
    /// Load and validate a cluster description.
    ///
    /// Relative artifact paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.artifacts.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ClusterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check uniqueness and cross-references.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut hosts = HashSet::new();
        for host in &self.hosts {
            if !hosts.insert(host.as_str()) {
                return Err(ConfigError::DuplicateHost(host.clone()));
            }
        }

        let mut domains = HashSet::new();
        for domain in &self.domains {
            if !domains.insert(domain.name.as_str()) {
                return Err(ConfigError::DuplicateDomain(domain.name.clone()));
            }
            let mut tenants = HashSet::new();
            for tenant in &domain.tenants {
                if !tenants.insert(tenant.name.as_str()) {
                    return Err(ConfigError::DuplicateTenant {
                        domain: domain.name.clone(),
                        tenant: tenant.name.clone(),
                    });
                }
            }
        }

        let mut slots = HashSet::new();
        for slot in &self.dynamic_slots {
            if !slots.insert(slot.name.as_str()) {
                return Err(ConfigError::DuplicateSlot(slot.name.clone()));
            }
            if !domains.contains(slot.domain.as_str()) {
                return Err(ConfigError::UnknownDomain {
                    slot: slot.name.clone(),
                    domain: slot.domain.clone(),
                });
            }
        }

        Ok(())
    }

    /// True if any domain asks for NUMA binding.
    pub fn wants_numa_binding(&self) -> bool {
        self.domains.iter().any(|d| d.bind_slots_to_numa_nodes)
    }
}

impl ArtifactsConfig {
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.binary,
            &mut self.compressed_binary,
            &mut self.config_root,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

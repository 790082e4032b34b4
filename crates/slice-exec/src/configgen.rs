//! Generated configuration trees.
//!
//! The static tree is copied verbatim to every host. The dynamic tree holds
//! the init scripts the orchestrator runs locally once the static process is
//! up (`init_storage.bash`, `init_cms.bash`, ...).

use std::path::PathBuf;

use crate::error::{ExecError, ExecResult};

/// Directory name of the static config under the config root.
pub const STATIC_DIR: &str = "kikimr-static";
/// Directory name of the dynamic config under the config root.
pub const DYNAMIC_DIR: &str = "kikimr-dynamic";

/// Produces the static and dynamic configuration directories.
pub trait ConfigGenerator {
    fn static_config(&self) -> ExecResult<PathBuf>;
    fn dynamic_config(&self) -> ExecResult<PathBuf>;
}

/// Config trees generated ahead of time under one root directory.
#[derive(Debug, Clone)]
pub struct PrebuiltConfig {
    root: PathBuf,
}

impl PrebuiltConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn existing_dir(&self, name: &str) -> ExecResult<PathBuf> {
        let dir = self.root.join(name);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ExecError::MissingArtifact(dir))
        }
    }
}

impl ConfigGenerator for PrebuiltConfig {
    fn static_config(&self) -> ExecResult<PathBuf> {
        self.existing_dir(STATIC_DIR)
    }

    fn dynamic_config(&self) -> ExecResult<PathBuf> {
        self.existing_dir(DYNAMIC_DIR)
    }
}

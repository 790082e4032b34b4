//! File distribution contract.

use std::path::{Path, PathBuf};

/// How a local artifact is shipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Ship this compressed file instead and unpack it on the host.
    pub compressed: Option<PathBuf>,
    /// Copy a whole directory tree, replacing the remote one.
    pub recursive: bool,
    /// File mode to set on the remote path.
    pub mode: Option<u32>,
}

impl CopyOptions {
    pub fn directory() -> Self {
        Self {
            recursive: true,
            ..Self::default()
        }
    }
}

/// Copies local files to the same path on every host of the slice.
pub trait FileDeployer {
    fn copy(&self, local: &Path, remote: &str, options: &CopyOptions) -> crate::ExecResult<()>;
}

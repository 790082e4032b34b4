//! Artifact digests.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ExecError, ExecResult};

/// Compute SHA-256 of a file and return the hex digest.
pub fn sha256_file(path: &Path) -> ExecResult<String> {
    let bytes = std::fs::read(path).map_err(|source| ExecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

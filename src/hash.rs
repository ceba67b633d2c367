// src/hash.rs

//! Content digests for copy-mode identity checks
//!
//! A digest is the lowercase hex SHA-256 of either a file's bytes or, for a
//! directory, of each child's name followed by that child's own digest.
//!
//! Two directory orderings exist:
//! - **Sorted**: children are visited by name, so a tree hashes the same on
//!   every platform. Used for all current install records.
//! - **Legacy**: children are visited in whatever order the OS returns them.
//!   Records up to version 3 were written this way, so their directory
//!   checksums cannot be reproduced reliably.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files are streamed through the hasher in blocks of this size
const BLOCK_SIZE: usize = 128 * 1024;

/// Order in which directory children are fed into a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestMode {
    /// Children sorted by name
    #[default]
    Sorted,
    /// Children in native `read_dir` order
    Legacy,
}

impl DigestMode {
    /// The mode checksums of a record at `version` were computed with
    pub fn for_record_version(version: u32) -> Self {
        if version <= 3 {
            Self::Legacy
        } else {
            Self::Sorted
        }
    }
}

/// Digest a file or directory tree
///
/// Returns `None` (after logging a warning) if the path vanished, cannot be
/// read or is neither a file nor a directory.
pub fn digest(path: &Path, mode: DigestMode) -> Option<String> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Not hashing {} ({})", path.display(), e);
            return None;
        }
    };

    let result = if metadata.is_file() {
        file_digest(path)
    } else if metadata.is_dir() {
        dir_digest(path, mode)
    } else {
        warn!("Not hashing strange path {}", path.display());
        return None;
    };

    match result {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!("Could not hash {}: {}", path.display(), e);
            None
        }
    }
}

/// SHA-256 over a file's contents
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn dir_digest(path: &Path, mode: DigestMode) -> std::io::Result<String> {
    let mut children: Vec<PathBuf> = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;

    if mode == DigestMode::Sorted {
        children.sort();
    }

    let mut hasher = Sha256::new();
    for child in &children {
        if let Some(name) = child.file_name() {
            hasher.update(name.as_encoded_bytes());
        }
        if let Some(child_hash) = digest(child, mode) {
            hasher.update(child_hash.as_bytes());
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

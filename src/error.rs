// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for dotpkg
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Package directory does not exist
    #[error("Dotpkg '{0}' does not exist")]
    PackageNotFound(PathBuf),

    /// Package directory has no dotpkg.json
    #[error("Missing dotpkg.json manifest for '{0}'")]
    MissingManifest(String),

    /// Manifest exists but could not be parsed
    #[error("Invalid manifest {path}: {source}")]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// None of the configured target directories exist
    #[error("No suitable targetDir found in {0:?}")]
    NoTargetDir(Vec<String>),

    /// Install record carries a version we cannot read
    #[error("Unsupported install manifest version {0}")]
    UnsupportedRecordVersion(u64),

    /// Install record is not valid JSON or does not match its version's shape
    #[error("Invalid install manifest {path}: {reason}")]
    InvalidRecord { path: PathBuf, reason: String },

    /// An old install record must be migrated before it can be used
    #[error(
        "Install manifest is at version {found} (current is {current}), run 'dotpkg upgrade-install-manifest' first"
    )]
    RecordUpgradeRequired { found: u32, current: u32 },

    /// A lifecycle hook exited unsuccessfully
    #[error("Script '{hook}' ('{command}') failed with {status}")]
    HookFailed {
        hook: String,
        command: String,
        status: String,
    },

    /// Glob pattern from a manifest is malformed
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    /// One or more packages of a batch failed
    #[error("Failed to process {}", .0.join(", "))]
    BatchFailed(Vec<String>),
}

/// Result type alias using dotpkg's Error type
pub type Result<T> = std::result::Result<T, Error>;

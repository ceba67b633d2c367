// src/reconcile.rs

//! Per-placement reconciliation
//!
//! For each planned placement the reconciler decides whether the target is
//! already in the desired state, can be installed fresh, or conflicts with
//! something the package does not own. Conflicts are resolved by one of four
//! strategies, chosen up front via `Options::on_conflict` or interactively.
//!
//! The reconciler never touches the install record; callers collect the
//! realized placements from the returned outcomes.

use crate::error::Result;
use crate::filesystem;
use crate::hash::{self, DigestMode};
use crate::options::Options;
use crate::planner::Placement;
use crate::prompt::prompt;
use crate::resolve::IgnoreSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// How a conflicting target is dealt with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictResolution {
    /// Rename the target to `<name>.backup`, then install
    #[default]
    Backup,
    /// Remove the target, then install
    Overwrite,
    /// Leave the target alone and do not record it
    Skip,
    /// Adopt the target as the package's new source, then install
    Theirs,
}

impl ConflictResolution {
    pub const ALL: [ConflictResolution; 4] = [
        ConflictResolution::Backup,
        ConflictResolution::Overwrite,
        ConflictResolution::Skip,
        ConflictResolution::Theirs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::Backup => "backup",
            ConflictResolution::Overwrite => "overwrite",
            ConflictResolution::Skip => "skip",
            ConflictResolution::Theirs => "theirs",
        }
    }

    /// Interpret a prompt answer; anything unrecognized means skip
    pub fn from_response(response: &str) -> Self {
        response.parse().unwrap_or(ConflictResolution::Skip)
    }
}

impl FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown conflict resolution '{}'", s))
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a package's files appear in the target directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Symlinks pointing into the package
    Link,
    /// Independent copies
    Copy,
}

impl InstallMode {
    pub fn from_copy_flag(copy: bool) -> Self {
        if copy { InstallMode::Copy } else { InstallMode::Link }
    }
}

/// Result of reconciling a single placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The source is in the package's ignore set
    Ignored,
    /// The target already matches the source
    AlreadySatisfied,
    /// The target was installed (possibly after resolving a conflict)
    Installed,
    /// A conflict was resolved by leaving the target alone
    Skipped,
}

impl Outcome {
    /// Whether the placement belongs in the install record
    pub fn is_realized(&self) -> bool {
        matches!(self, Outcome::AlreadySatisfied | Outcome::Installed)
    }
}

/// Result of resolving a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Installed,
    Skipped,
}

/// Reconciles placements of one package
pub struct Reconciler<'a> {
    opts: &'a Options,
    ignores: &'a IgnoreSet,
    mode: InstallMode,
    digest_mode: DigestMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        opts: &'a Options,
        ignores: &'a IgnoreSet,
        mode: InstallMode,
        digest_mode: DigestMode,
    ) -> Self {
        Self {
            opts,
            ignores,
            mode,
            digest_mode,
        }
    }

    pub fn reconcile(&self, placement: &Placement) -> Result<Outcome> {
        let Placement { source, target } = placement;

        if self.ignores.contains(source) {
            info!("Ignoring {}", source.display());
            return Ok(Outcome::Ignored);
        }

        if !target.exists() && !target.is_symlink() {
            self.install_fresh(source, target)?;
            return Ok(Outcome::Installed);
        }

        if self.is_satisfied(source, target) {
            match self.mode {
                InstallMode::Copy => {
                    info!("Skipping {} (target and source hashes match)", target.display())
                }
                InstallMode::Link => info!("Skipping {} (already linked)", target.display()),
            }
            return Ok(Outcome::AlreadySatisfied);
        }

        match self.resolve_conflict(source, target)? {
            Resolution::Installed => Ok(Outcome::Installed),
            Resolution::Skipped => Ok(Outcome::Skipped),
        }
    }

    fn is_satisfied(&self, source: &Path, target: &Path) -> bool {
        match self.mode {
            InstallMode::Copy => {
                if target.is_symlink() {
                    return false;
                }
                let target_digest = hash::digest(target, self.digest_mode);
                target_digest.is_some() && target_digest == hash::digest(source, self.digest_mode)
            }
            InstallMode::Link => target.is_symlink() && same_destination(source, target),
        }
    }

    fn resolve_conflict(&self, source: &Path, target: &Path) -> Result<Resolution> {
        let resolution = match self.opts.on_conflict {
            Some(resolution) => resolution,
            None => {
                let msg = match self.mode {
                    InstallMode::Copy => format!(
                        "{} exists and is not a copy of the dotpkg's file.",
                        target.display()
                    ),
                    InstallMode::Link => format!(
                        "{} exists and is not a link into the dotpkg.",
                        target.display()
                    ),
                };
                let choices = ConflictResolution::ALL.map(|r| r.as_str());
                let response = prompt(
                    &msg,
                    &choices,
                    ConflictResolution::default().as_str(),
                    self.opts,
                )?;
                ConflictResolution::from_response(&response)
            }
        };
        debug!("Resolving conflict at {} with {}", target.display(), resolution);

        match resolution {
            ConflictResolution::Backup => {
                filesystem::move_path(target, &backup_path(target), self.opts)?;
            }
            ConflictResolution::Overwrite => {
                filesystem::remove(target, self.opts)?;
            }
            ConflictResolution::Skip => {
                info!("Skipping {}", target.display());
                return Ok(Resolution::Skipped);
            }
            ConflictResolution::Theirs => {
                filesystem::remove(source, self.opts)?;
                filesystem::move_path(target, source, self.opts)?;
            }
        }

        self.install_fresh(source, target)?;
        Ok(Resolution::Installed)
    }

    fn install_fresh(&self, source: &Path, target: &Path) -> Result<()> {
        match self.mode {
            InstallMode::Copy => filesystem::copy(source, target, self.opts),
            InstallMode::Link => {
                // A dangling source, as left by `theirs`, is linked unresolved
                let resolved = fs::canonicalize(source).or_else(|_| std::path::absolute(source))?;
                filesystem::link(&resolved, target, self.opts)
            }
        }
    }
}

/// Whether both paths resolve to the same file
pub fn same_destination(source: &Path, target: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".backup");
    target.with_file_name(name)
}

// src/install.rs

//! Install, uninstall and record upgrade orchestration
//!
//! Each operation reads the install record once, runs the package's hooks
//! around the file work and writes the record back at the end. Placements are
//! processed one at a time; an interrupted run leaves whatever was already
//! placed, and re-running the install converges because satisfied targets are
//! recognized and skipped.

use crate::error::Result;
use crate::filesystem;
use crate::hash::{self, DigestMode};
use crate::hooks::run_hook;
use crate::options::Options;
use crate::package::{Hook, Manifest, Package, PackageRef, Requires};
use crate::planner::{self, Placement};
use crate::prompt::confirm;
use crate::reconcile::{InstallMode, Outcome, Reconciler, same_destination};
use crate::record::{self, CURRENT_VERSION, InstallRecord, InstalledEntry};
use crate::resolve::{IgnoreSet, Renamer, find_target_dir};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// What an install did
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub target_dir: PathBuf,
    /// Placements that are now in the desired state, in planning order
    pub placements: Vec<Placement>,
    /// Conflicts left untouched
    pub skipped: usize,
    pub ignored: usize,
}

/// What an uninstall did
#[derive(Debug, Clone, Default)]
pub struct UninstallReport {
    pub removed: Vec<PathBuf>,
    /// Targets left in place because they could not be verified
    pub kept: Vec<PathBuf>,
}

/// What a record upgrade did
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub from_version: u32,
    pub backup: Option<PathBuf>,
    /// Packages that were reinstalled, by name
    pub packages: Vec<String>,
}

/// Install `pkg` into its target directory
pub fn install(pkg: &Package, opts: &Options) -> Result<InstallReport> {
    let mut record = load_record(opts)?;
    install_with_record(pkg, &mut record, opts)
}

/// Install `pkg`, reading and updating the given record
pub fn install_with_record(
    pkg: &Package,
    record: &mut InstallRecord,
    opts: &Options,
) -> Result<InstallReport> {
    let target_dir = find_target_dir(&pkg.manifest, &opts.vars)?;
    let key = pkg.key();

    let existing = record.entry(&key).map(|entry| {
        let dir = entry
            .target_dir
            .map(|dir| stored_dir(dir, opts))
            .unwrap_or_else(|| target_dir.clone());
        let paths = entry
            .placements
            .map(|(_, targets)| targets.to_vec())
            .unwrap_or_default();
        (dir, paths)
    });

    if let Some((existing_dir, existing_paths)) = existing {
        let question = format!(
            "The dotpkg {} is already installed to {} and currently targets {}. Should it be uninstalled first?",
            pkg.name(),
            existing_dir.display(),
            target_dir.display()
        );
        if confirm(&question, true, opts)? {
            uninstall_with_record(pkg, record, opts)?;
        } else if !same_dir(&existing_dir, &target_dir) {
            warn!(
                "This will leave the installed files at the old target dir {} orphaned, since the install for {} in {} will be repointed to {}. These files are affected:",
                existing_dir.display(),
                key,
                record::path(&opts.state_dir).display(),
                target_dir.display()
            );
            for path in &existing_paths {
                warn!("  {}", path);
            }
        }
    }

    run_hook(Hook::Preinstall, pkg, opts)?;

    let mode = InstallMode::from_copy_flag(pkg.manifest.copy);
    let digest_mode = DigestMode::for_record_version(record.version());
    let mut report = InstallReport {
        target_dir: target_dir.clone(),
        ..InstallReport::default()
    };

    if pkg.manifest.is_scripts_only {
        debug!("{} is scripts-only, not placing files", pkg.name());
    } else {
        filesystem::create_dir(&target_dir, opts)?;
        for rel_path in &pkg.manifest.touch_files {
            filesystem::touch(&target_dir.join(opts.vars.resolve(rel_path)), opts)?;
        }

        let ignores = IgnoreSet::for_package(pkg, &opts.vars)?;
        let renamer = Renamer::new(&pkg.manifest, &opts.vars);
        let reconciler = Reconciler::new(opts, &ignores, mode, digest_mode);

        for placement in planner::plan(&pkg.path, &target_dir, |name| renamer.apply(name)) {
            let placement = placement?;
            match reconciler.reconcile(&placement)? {
                Outcome::AlreadySatisfied | Outcome::Installed => report.placements.push(placement),
                Outcome::Skipped => report.skipped += 1,
                Outcome::Ignored => report.ignored += 1,
            }
        }
    }

    run_hook(Hook::Install, pkg, opts)?;
    run_hook(Hook::Postinstall, pkg, opts)?;

    if opts.update_install_manifest {
        let checksums: Vec<Option<String>> = match mode {
            InstallMode::Copy => report
                .placements
                .iter()
                .map(|p| hash::digest(&p.source, digest_mode))
                .collect(),
            InstallMode::Link => Vec::new(),
        };
        let entry = InstalledEntry {
            target_dir: record_dir(&target_dir, opts),
            src_paths: report.placements.iter().map(|p| path_string(&p.source)).collect(),
            paths: report.placements.iter().map(|p| path_string(&p.target)).collect(),
            checksums,
        };
        record.insert(key, entry);
        record::write(&opts.state_dir, record, opts)?;
    }

    display_caveats(pkg);
    Ok(report)
}

/// Remove what was installed for `pkg`
pub fn uninstall(pkg: &Package, opts: &Options) -> Result<UninstallReport> {
    let mut record = load_record(opts)?;
    uninstall_with_record(pkg, &mut record, opts)
}

/// Remove what `record` lists for `pkg` and drop its entry
///
/// Targets are only removed when they can be shown to belong to the package:
/// copies must still match their recorded checksum and links must still point
/// into the package. Anything else is kept and reported.
pub fn uninstall_with_record(
    pkg: &Package,
    record: &mut InstallRecord,
    opts: &Options,
) -> Result<UninstallReport> {
    let key = pkg.key();
    let version = record.version();

    run_hook(Hook::Preuninstall, pkg, opts)?;
    run_hook(Hook::Uninstall, pkg, opts)?;

    let mut report = UninstallReport::default();

    if !pkg.manifest.is_scripts_only {
        let entry = record.entry(&key);
        let target_dir = match entry.and_then(|e| e.target_dir) {
            Some(dir) => stored_dir(dir, opts),
            None => find_target_dir(&pkg.manifest, &opts.vars)?,
        };

        let placements: Vec<(Option<PathBuf>, Option<PathBuf>)> =
            match entry.and_then(|e| e.placements) {
                Some((sources, targets)) => zip_longest(sources, targets),
                None => replan(pkg, &target_dir, opts)?,
            };

        let checksums: Vec<Option<String>> = match entry.and_then(|e| e.checksums) {
            Some(checksums) => checksums.to_vec(),
            None => {
                let digest_mode = DigestMode::for_record_version(version);
                placements
                    .iter()
                    .map(|(source, _)| source.as_ref().and_then(|s| hash::digest(s, digest_mode)))
                    .collect()
            }
        };

        let mode = InstallMode::from_copy_flag(pkg.manifest.copy);
        for (i, (source, target)) in placements.iter().enumerate() {
            let Some(target) = target else {
                if let Some(source) = source {
                    info!("Skipping src path {} (no target path)", source.display());
                }
                continue;
            };
            let checksum = checksums.get(i).cloned().flatten();

            if is_removable(mode, source.as_deref(), target, checksum.as_deref(), version) {
                filesystem::remove(target, opts)?;
                report.removed.push(target.clone());
            } else {
                report.kept.push(target.clone());
            }
        }
    }

    run_hook(Hook::Postuninstall, pkg, opts)?;

    if opts.update_install_manifest && record.remove(&key) {
        record::write(&opts.state_dir, record, opts)?;
    }

    display_caveats(pkg);
    Ok(report)
}

/// Whether `target` can be shown to belong to the package
fn is_removable(
    mode: InstallMode,
    source: Option<&Path>,
    target: &Path,
    checksum: Option<&str>,
    version: u32,
) -> bool {
    match mode {
        InstallMode::Copy => {
            if source.is_none() {
                info!("Skipping {} (no src path in a copy-package)", target.display());
                return false;
            }
            if target.is_symlink() {
                info!("Skipping {} (is a symlink while the package is copy)", target.display());
                return false;
            }
            let Some(checksum) = checksum else {
                warn!("Skipping {} (missing checksum)", target.display());
                return false;
            };
            if !target.exists() {
                warn!("Skipping {} (file does not exist)", target.display());
                return false;
            }

            if version >= CURRENT_VERSION || !target.is_dir() {
                let live = hash::digest(target, DigestMode::Sorted);
                if live.as_deref() != Some(checksum) {
                    info!(
                        "Skipping {} (target checksum {} != {})",
                        target.display(),
                        live.as_deref().unwrap_or("none"),
                        checksum
                    );
                    return false;
                }
            } else {
                warn!(
                    "Ignoring checksum for {} since legacy directory checksums were computed in non-deterministic order",
                    target.display()
                );
            }
            true
        }
        InstallMode::Link => {
            if !target.is_symlink() {
                info!("Skipping {} (not a symlink)", target.display());
                return false;
            }
            if let Some(source) = source {
                if !same_destination(source, target) {
                    info!(
                        "Skipping {} (does not point to {}, probably not a link into the package)",
                        target.display(),
                        source.display()
                    );
                    return false;
                }
            }
            true
        }
    }
}

/// Migrate the install record to the current version
///
/// Every listed package is resolved before anything changes. Each one is then
/// uninstalled against the old record, the old file is backed up and the
/// packages are installed again into a fresh record. Returns `None` if the
/// record is already current.
pub fn upgrade_install_record(opts: &Options) -> Result<Option<UpgradeReport>> {
    let mut old = record::read(&opts.state_dir)?;
    let from_version = old.version();
    if old.is_current() {
        info!("Install manifest is already at version {}", CURRENT_VERSION);
        return Ok(None);
    }

    let mut opts = opts.clone();
    opts.update_install_manifest = true;

    let mut packages = Vec::new();
    for key in old.keys() {
        let pkg = PackageRef::new(opts.state_dir.join(&key)).read()?;
        if pkg.key() != key {
            debug!("Rekeying {} as {}", key, pkg.key());
            old.rekey(&key, pkg.key());
        }
        packages.push(pkg);
    }

    info!(
        "Upgrading install manifest from version {} to {} ({} packages)",
        from_version,
        CURRENT_VERSION,
        packages.len()
    );

    for pkg in &packages {
        info!("Uninstalling {} (version {} install)", pkg.name(), from_version);
        uninstall_with_record(pkg, &mut old, &opts)?;
    }

    let backup = record::backup(&opts.state_dir, from_version, &opts)?;

    let mut fresh = InstallRecord::default();
    for pkg in &packages {
        info!("Reinstalling {}", pkg.name());
        install_with_record(pkg, &mut fresh, &opts)?;
    }
    if packages.is_empty() {
        record::write(&opts.state_dir, &fresh, &opts)?;
    }

    Ok(Some(UpgradeReport {
        from_version,
        backup,
        packages: packages.iter().map(Package::name).collect(),
    }))
}

/// Warn about restarts the package needs to take effect
pub fn display_caveats(pkg: &Package) {
    if let Some(message) = caveat(&pkg.manifest, &pkg.name()) {
        warn!("{}", message);
    }
}

fn caveat(manifest: &Manifest, name: &str) -> Option<String> {
    match manifest.requires? {
        Requires::None => None,
        Requires::Logout => Some(format!("{} requires logging out and back in to apply!", name)),
        Requires::Reboot => Some(format!("{} requires rebooting the computer to apply!", name)),
    }
}

fn load_record(opts: &Options) -> Result<InstallRecord> {
    if !opts.update_install_manifest {
        debug!("Install manifest disabled, starting from an empty record");
        return Ok(InstallRecord::default());
    }
    record::load(&opts.state_dir, opts)
}

/// Placements of a package that has no usable record entry
fn replan(
    pkg: &Package,
    target_dir: &Path,
    opts: &Options,
) -> Result<Vec<(Option<PathBuf>, Option<PathBuf>)>> {
    let ignores = IgnoreSet::for_package(pkg, &opts.vars)?;
    let renamer = Renamer::new(&pkg.manifest, &opts.vars);

    let mut placements = Vec::new();
    for placement in planner::plan(&pkg.path, target_dir, |name| renamer.apply(name)) {
        let Placement { source, target } = placement?;
        if !ignores.contains(&source) {
            placements.push((Some(source), Some(target)));
        }
    }
    Ok(placements)
}

fn zip_longest(sources: &[String], targets: &[String]) -> Vec<(Option<PathBuf>, Option<PathBuf>)> {
    let len = sources.len().max(targets.len());
    (0..len)
        .map(|i| {
            (
                sources.get(i).map(PathBuf::from),
                targets.get(i).map(PathBuf::from),
            )
        })
        .collect()
}

/// Target dir as written to the record
fn record_dir(target_dir: &Path, opts: &Options) -> String {
    if opts.relative_target_path {
        path_string(&relativize(target_dir, &opts.state_dir))
    } else {
        path_string(target_dir)
    }
}

/// Target dir as read from the record, relative ones are based on the state dir
fn stored_dir(dir: &str, opts: &Options) -> PathBuf {
    opts.state_dir.join(dir)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let a = fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b
}

/// `path` relative to `base`, walking up with `..` where needed
fn relativize(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &path[common..] {
        rel.push(component);
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

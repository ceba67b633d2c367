// src/commands.rs

//! Command implementations behind the CLI
//!
//! Package arguments are resolved against `Options::cwd`. Without arguments
//! the package in the current directory is used, or every child package as a
//! batch after a confirmation. In a batch a failing package does not stop the
//! remaining ones; the failures are collected into `Error::BatchFailed`.

use crate::error::{Error, Result};
use crate::install::{install, uninstall, upgrade_install_record};
use crate::options::Options;
use crate::package::{Package, PackageRefs, batch_skip_reason};
use crate::prompt::confirm;
use tracing::{error, info, warn};

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// The user declined the batch confirmation
    Cancelled,
}

/// Install the given packages
pub fn install_cmd(args: &[String], opts: &Options) -> Result<CommandOutcome> {
    let Some(refs) = select(args, "Install", opts)? else {
        return Ok(CommandOutcome::Cancelled);
    };

    for_each_package(&refs, "install", |pkg| {
        info!("Installing {} ({})...", pkg.name(), pkg.manifest.description);
        let report = install(pkg, opts)?;
        println!(
            "Installed {} to {} ({} paths, {} skipped, {} ignored)",
            pkg.name(),
            report.target_dir.display(),
            report.placements.len(),
            report.skipped,
            report.ignored
        );
        Ok(())
    })?;

    Ok(CommandOutcome::Done)
}

/// Uninstall the given packages
pub fn uninstall_cmd(args: &[String], opts: &Options) -> Result<CommandOutcome> {
    let Some(refs) = select(args, "Uninstall", opts)? else {
        return Ok(CommandOutcome::Cancelled);
    };

    for_each_package(&refs, "uninstall", |pkg| {
        info!("Uninstalling {} ({})...", pkg.name(), pkg.manifest.description);
        let report = uninstall(pkg, opts)?;
        println!(
            "Uninstalled {} ({} removed, {} kept)",
            pkg.name(),
            report.removed.len(),
            report.kept.len()
        );
        Ok(())
    })?;

    Ok(CommandOutcome::Done)
}

/// Uninstall, then install the given packages
pub fn sync_cmd(args: &[String], opts: &Options) -> Result<CommandOutcome> {
    match uninstall_cmd(args, opts)? {
        CommandOutcome::Done => install_cmd(args, opts),
        CommandOutcome::Cancelled => Ok(CommandOutcome::Cancelled),
    }
}

/// Migrate the install record in the state directory
pub fn upgrade_cmd(opts: &Options) -> Result<CommandOutcome> {
    match upgrade_install_record(opts)? {
        Some(report) => {
            println!(
                "Upgraded install manifest from version {} ({} packages reinstalled)",
                report.from_version,
                report.packages.len()
            );
            if let Some(backup) = report.backup {
                println!("Old install manifest saved as {}", backup.display());
            }
        }
        None => println!("Install manifest is already up to date"),
    }
    Ok(CommandOutcome::Done)
}

/// Resolve the packages a command applies to, `None` if the user cancelled
fn select(args: &[String], verb: &str, opts: &Options) -> Result<Option<PackageRefs>> {
    if !args.is_empty() {
        return Ok(Some(PackageRefs::from_args(&opts.cwd, args)));
    }

    let refs = PackageRefs::discover(&opts.cwd)?;
    if refs.is_batch && !confirm(&format!("{} dotpkgs {}?", verb, refs.names().join(", ")), true, opts)? {
        println!("Cancelling");
        return Ok(None);
    }
    Ok(Some(refs))
}

fn for_each_package<F>(refs: &PackageRefs, action_name: &str, mut action: F) -> Result<()>
where
    F: FnMut(&Package) -> Result<()>,
{
    let mut failed = Vec::new();

    for pkg_ref in &refs.refs {
        let result = pkg_ref.read().and_then(|pkg| {
            if refs.is_batch {
                if let Some(reason) = batch_skip_reason(&pkg.manifest) {
                    warn!("Skipping {} ({})", pkg.name(), reason);
                    return Ok(());
                }
            }
            action(&pkg)
        });

        if let Err(e) = result {
            if !refs.is_batch {
                return Err(e);
            }
            error!("Failed to {} {}: {}", action_name, pkg_ref.name(), e);
            failed.push(pkg_ref.name());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::BatchFailed(failed))
    }
}

// src/hooks.rs

//! Lifecycle hook execution
//!
//! Hooks are shell commands from the manifest's `scripts` table, run through
//! `sh -c` in the package directory. They inherit the terminal, so a hook may
//! prompt the user itself.

use crate::error::{Error, Result};
use crate::options::Options;
use crate::package::{Hook, Package};
use std::process::Command;
use tracing::{debug, info, warn};

/// Run `hook` for `pkg` if the manifest defines it
pub fn run_hook(hook: Hook, pkg: &Package, opts: &Options) -> Result<()> {
    let Some(command) = pkg.manifest.scripts.command(hook) else {
        debug!("No {} script for {}", hook, pkg.name());
        return Ok(());
    };

    if opts.safe_mode {
        warn!("Skipping script '{}' ('{}') in safe mode", hook, command);
        return Ok(());
    }

    info!("Running script '{}' ('{}')...", hook, command);
    if opts.dry_run {
        return Ok(());
    }

    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(&pkg.path)
        .env("DOTPKG_NAME", pkg.name())
        .env("DOTPKG_HOOK", hook.as_str())
        .status()?;

    if !status.success() {
        return Err(Error::HookFailed {
            hook: hook.to_string(),
            command: command.to_string(),
            status: status.to_string(),
        });
    }

    Ok(())
}

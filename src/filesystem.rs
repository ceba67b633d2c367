// src/filesystem.rs

//! Filesystem mutations used by install and uninstall
//!
//! Every function here honours `Options::dry_run`: in a dry run the action is
//! logged and `Ok(())` is returned without touching the filesystem, so callers
//! behave the same way in both modes.

use crate::error::Result;
use crate::options::Options;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Copy a file or directory tree to `target_path`
pub fn copy(src_path: &Path, target_path: &Path, opts: &Options) -> Result<()> {
    info!("Copying {} to {}", src_path.display(), target_path.display());
    if opts.dry_run {
        return Ok(());
    }
    copy_recursive(src_path, target_path)
}

/// Move `src_path` to `target_path`, falling back to copy + remove across devices
pub fn move_path(src_path: &Path, target_path: &Path, opts: &Options) -> Result<()> {
    info!("Moving {} to {}", src_path.display(), target_path.display());
    if opts.dry_run {
        return Ok(());
    }

    match fs::rename(src_path, target_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                "{} is on another device, falling back to copy",
                src_path.display()
            );
            copy_recursive(src_path, target_path)?;
            remove_any(src_path)
        }
        Err(e) => Err(e.into()),
    }
}

/// Create a symlink at `target_path` pointing to `src_path`
pub fn link(src_path: &Path, target_path: &Path, opts: &Options) -> Result<()> {
    info!("Linking {} -> {}", target_path.display(), src_path.display());
    if opts.dry_run {
        return Ok(());
    }
    symlink(src_path, target_path)?;
    Ok(())
}

/// Create an empty file (and its parents) unless something already exists there
pub fn touch(path: &Path, opts: &Options) -> Result<()> {
    if path.exists() || path.is_symlink() {
        debug!("Not touching existing {}", path.display());
        return Ok(());
    }
    info!("Touching {}", path.display());
    if opts.dry_run {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(())
}

/// Remove a symlink, file or directory tree
pub fn remove(target_path: &Path, opts: &Options) -> Result<()> {
    info!("Removing {}", target_path.display());
    if opts.dry_run {
        return Ok(());
    }
    remove_any(target_path)
}

/// Create a directory and its parents
pub fn create_dir(path: &Path, opts: &Options) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    info!("Creating directory {}", path.display());
    if opts.dry_run {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    Ok(())
}

fn remove_any(path: &Path) -> Result<()> {
    // symlink_metadata so links to directories are unlinked, not followed
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn copy_recursive(src_path: &Path, target_path: &Path) -> Result<()> {
    if !fs::metadata(src_path)?.is_dir() {
        fs::copy(src_path, target_path)?;
        return Ok(());
    }

    for entry in WalkDir::new(src_path).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src_path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let dest = target_path.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            symlink(&link_target, &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(src_path: &Path, target_path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src_path, target_path)
}

#[cfg(windows)]
fn symlink(src_path: &Path, target_path: &Path) -> io::Result<()> {
    if src_path.is_dir() {
        std::os::windows::fs::symlink_dir(src_path, target_path)
    } else {
        std::os::windows::fs::symlink_file(src_path, target_path)
    }
}

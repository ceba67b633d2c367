// src/record/mod.rs

//! Install record persistence
//!
//! The record (`installs.json` in the state directory) remembers, per
//! package, where its files were placed so they can be removed later. This
//! module handles:
//! - Reading any supported version, absent files read as an empty record
//! - The version gate applied before install and uninstall
//! - Atomic rewrites and backups of the record file

pub mod schema;

pub use schema::{CURRENT_VERSION, EntryView, InstallRecord, InstalledEntry, ParseFailure};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::prompt::confirm;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// File name of the install record
pub const RECORD_NAME: &str = "installs.json";

/// Path of the record inside `state_dir`
pub fn path(state_dir: &Path) -> PathBuf {
    state_dir.join(RECORD_NAME)
}

/// Path an old record at `version` is moved to during an upgrade
pub fn backup_path(state_dir: &Path, version: u32) -> PathBuf {
    state_dir.join(format!("installs.v{}.json.backup", version))
}

/// Read the record as stored, whatever supported version it has
///
/// A missing file yields an empty current record.
pub fn read(state_dir: &Path) -> Result<InstallRecord> {
    let file = path(state_dir);
    if !file.exists() {
        debug!("No install record at {}", file.display());
        return Ok(InstallRecord::default());
    }

    let raw = fs::read_to_string(&file)?;
    InstallRecord::parse(&raw).map_err(|failure| match failure {
        ParseFailure::UnsupportedVersion(version) => Error::UnsupportedRecordVersion(version),
        ParseFailure::Malformed(reason) => Error::InvalidRecord {
            path: file.clone(),
            reason,
        },
    })
}

/// Read the record for an install or uninstall
///
/// A record one version behind may be used as is. Anything older has to go
/// through `upgrade-install-manifest` unless the user agrees to discard it.
pub fn load(state_dir: &Path, opts: &Options) -> Result<InstallRecord> {
    let record = read(state_dir)?;
    let version = record.version();
    if record.is_current() {
        return Ok(record);
    }

    let file = path(state_dir);
    if version + 1 == CURRENT_VERSION
        && confirm(
            &format!(
                "{} is at version {} (current is {}). Keep using it as-is?",
                file.display(),
                version,
                CURRENT_VERSION
            ),
            true,
            opts,
        )?
    {
        return Ok(record);
    }

    if confirm(
        &format!(
            "{} is at version {} (current is {}). Discard it and start with an empty install manifest?",
            file.display(),
            version,
            CURRENT_VERSION
        ),
        false,
        opts,
    )? {
        warn!("Discarding install manifest {}", file.display());
        return Ok(InstallRecord::default());
    }

    Err(Error::RecordUpgradeRequired {
        found: version,
        current: CURRENT_VERSION,
    })
}

/// Replace the record file with `record`
pub fn write(state_dir: &Path, record: &InstallRecord, opts: &Options) -> Result<()> {
    let file = path(state_dir);
    if file.exists() {
        info!("Updating {}", file.display());
    } else {
        info!("Creating {}", file.display());
    }
    if opts.dry_run {
        return Ok(());
    }

    fs::create_dir_all(state_dir)?;
    let data = record
        .to_json()
        .map_err(|e| Error::InvalidRecord {
            path: file.clone(),
            reason: e.to_string(),
        })?;

    let mut tmp = NamedTempFile::new_in(state_dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(&file).map_err(|e| e.error)?;
    Ok(())
}

/// Move the record file aside before an upgrade
pub fn backup(state_dir: &Path, version: u32, opts: &Options) -> Result<Option<PathBuf>> {
    let file = path(state_dir);
    if !file.exists() {
        return Ok(None);
    }

    let dest = backup_path(state_dir, version);
    info!("Backing up {} to {}", file.display(), dest.display());
    if !opts.dry_run {
        fs::rename(&file, &dest)?;
    }
    Ok(Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unattended(dir: &Path) -> Options {
        Options::unattended(dir, dir)
    }

    #[test]
    fn test_read_missing_record_is_empty_current() {
        let dir = TempDir::new().unwrap();
        let record = read(dir.path()).unwrap();
        assert!(record.is_current());
        assert!(record.is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("nested/state");
        let mut record = InstallRecord::default();
        record.insert(
            "/pkgs/minimal".to_string(),
            InstalledEntry {
                target_dir: "/home/u".to_string(),
                src_paths: vec!["/pkgs/minimal/hello.txt".to_string()],
                paths: vec!["/home/u/hello.txt".to_string()],
                checksums: Vec::new(),
            },
        );

        write(&state_dir, &record, &unattended(dir.path())).unwrap();
        assert_eq!(read(&state_dir).unwrap(), record);

        let leftovers = fs::read_dir(&state_dir).unwrap().count();
        assert_eq!(leftovers, 1, "Only installs.json should remain");
    }

    #[test]
    fn test_write_dry_run_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut opts = unattended(dir.path());
        opts.dry_run = true;

        write(dir.path(), &InstallRecord::default(), &opts).unwrap();
        assert!(!path(dir.path()).exists());
    }

    #[test]
    fn test_newer_version_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(path(dir.path()), r#"{"version": 99, "installs": {}}"#).unwrap();

        assert!(matches!(
            read(dir.path()),
            Err(Error::UnsupportedRecordVersion(99))
        ));
        assert!(load(dir.path(), &unattended(dir.path())).is_err());
    }

    #[test]
    fn test_corrupt_record_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(path(dir.path()), "{").unwrap();

        assert!(matches!(read(dir.path()), Err(Error::InvalidRecord { .. })));
    }

    #[test]
    fn test_load_accepts_previous_version() {
        let dir = TempDir::new().unwrap();
        fs::write(path(dir.path()), r#"{"version": 3, "installs": {}}"#).unwrap();

        let record = load(dir.path(), &unattended(dir.path())).unwrap();
        assert_eq!(record.version(), 3);
    }

    #[test]
    fn test_load_refuses_older_versions_by_default() {
        let dir = TempDir::new().unwrap();
        fs::write(path(dir.path()), r#"{"version": 2, "installs": {}}"#).unwrap();

        let result = load(dir.path(), &unattended(dir.path()));
        assert!(matches!(
            result,
            Err(Error::RecordUpgradeRequired { found: 2, current: 4 })
        ));
    }

    #[test]
    fn test_backup_moves_record() {
        let dir = TempDir::new().unwrap();
        fs::write(path(dir.path()), r#"{"version": 2, "installs": {}}"#).unwrap();

        let dest = backup(dir.path(), 2, &unattended(dir.path())).unwrap().unwrap();
        assert_eq!(dest, dir.path().join("installs.v2.json.backup"));
        assert!(dest.exists());
        assert!(!path(dir.path()).exists());
    }
}

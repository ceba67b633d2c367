// src/package/mod.rs

//! Package resolution for dotpkg
//!
//! A package is a directory containing a `dotpkg.json` manifest. Packages are
//! referenced by path and identified by their canonical path, which is also
//! the key used in the install record.

pub mod manifest;

pub use manifest::{Hook, Manifest, Requires, Scripts};

use crate::error::{Error, Result};
use crate::planner::RESERVED_NAMES;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the package manifest
pub const MANIFEST_NAME: &str = "dotpkg.json";

/// A package whose manifest has been read
#[derive(Debug, Clone)]
pub struct Package {
    /// Canonical source directory
    pub path: PathBuf,
    pub manifest: Manifest,
}

impl Package {
    /// Display name, falling back to the directory name
    pub fn name(&self) -> String {
        self.manifest
            .name
            .clone()
            .unwrap_or_else(|| dir_name(&self.path))
    }

    /// Identity key used in the install record
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// A reference to a package directory whose manifest has not been read yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub path: PathBuf,
}

impl PackageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> String {
        dir_name(&self.path)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_NAME)
    }

    /// Canonicalize the path and parse the manifest
    pub fn read(&self) -> Result<Package> {
        if !self.path.is_dir() {
            return Err(Error::PackageNotFound(self.path.clone()));
        }

        let manifest_path = self.manifest_path();
        if !manifest_path.is_file() {
            return Err(Error::MissingManifest(self.name()));
        }

        let raw = fs::read_to_string(&manifest_path)?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|source| Error::InvalidManifest {
                path: manifest_path.clone(),
                source,
            })?;

        Ok(Package {
            path: fs::canonicalize(&self.path)?,
            manifest,
        })
    }
}

/// Packages selected for a command
#[derive(Debug, Clone)]
pub struct PackageRefs {
    pub refs: Vec<PackageRef>,
    /// Selected implicitly rather than named by the user
    pub is_batch: bool,
}

impl PackageRefs {
    /// Resolve explicitly named package paths against `cwd`
    pub fn from_args(cwd: &Path, args: &[String]) -> Self {
        Self {
            refs: args.iter().map(|arg| PackageRef::new(cwd.join(arg))).collect(),
            is_batch: false,
        }
    }

    /// The package in `cwd` if it has a manifest, otherwise every child package
    pub fn discover(cwd: &Path) -> Result<Self> {
        let here = PackageRef::new(cwd);
        if here.manifest_path().is_file() {
            return Ok(Self {
                refs: vec![here],
                is_batch: false,
            });
        }

        let mut refs = Vec::new();
        for entry in fs::read_dir(cwd)? {
            let path = entry?.path();
            let name = dir_name(&path);
            if RESERVED_NAMES.contains(&name.as_str()) {
                continue;
            }
            let candidate = PackageRef::new(path);
            if candidate.manifest_path().is_file() {
                refs.push(candidate);
            }
        }
        refs.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Discovered {} packages in {}", refs.len(), cwd.display());

        Ok(Self {
            refs,
            is_batch: true,
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.refs.iter().map(PackageRef::name).collect()
    }
}

/// Why a package should not take part in a batch install, if at all
pub fn batch_skip_reason(manifest: &Manifest) -> Option<String> {
    if manifest.skip_during_batch_install {
        return Some("Batch-install".to_string());
    }

    let platform = current_platform();
    if !manifest.platforms.is_empty() && !manifest.platforms.iter().any(|p| p == platform) {
        let mut supported = manifest.platforms.clone();
        supported.sort();
        return Some(format!(
            "Platform {} is not supported, supported are {}",
            platform,
            supported.join(", ")
        ));
    }

    let missing: Vec<&str> = manifest
        .requires_on_path
        .iter()
        .filter(|bin| which::which(bin.as_str()).is_err())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Some(format!("Could not find {} on PATH", missing.join(", ")));
    }

    None
}

/// Platform identifier as used in manifests
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_package(root: &Path, name: &str, manifest: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_NAME), manifest).unwrap();
        dir
    }

    #[test]
    fn test_read_package_canonicalizes_path() {
        let root = TempDir::new().unwrap();
        write_package(root.path(), "minimal", r#"{"name": "minimal"}"#);

        let pkg = PackageRef::new(root.path().join("./minimal")).read().unwrap();
        assert_eq!(pkg.path, fs::canonicalize(root.path().join("minimal")).unwrap());
        assert_eq!(pkg.name(), "minimal");
    }

    #[test]
    fn test_name_falls_back_to_directory() {
        let root = TempDir::new().unwrap();
        write_package(root.path(), "unnamed", "{}");

        let pkg = PackageRef::new(root.path().join("unnamed")).read().unwrap();
        assert_eq!(pkg.name(), "unnamed");
    }

    #[test]
    fn test_missing_manifest() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("empty")).unwrap();

        let result = PackageRef::new(root.path().join("empty")).read();
        assert!(matches!(result, Err(Error::MissingManifest(_))));

        let result = PackageRef::new(root.path().join("absent")).read();
        assert!(matches!(result, Err(Error::PackageNotFound(_))));
    }

    #[test]
    fn test_invalid_manifest() {
        let root = TempDir::new().unwrap();
        write_package(root.path(), "broken", "{ not json");

        let result = PackageRef::new(root.path().join("broken")).read();
        assert!(matches!(result, Err(Error::InvalidManifest { .. })));
    }

    #[test]
    fn test_discover_prefers_cwd_package() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(MANIFEST_NAME), "{}").unwrap();
        write_package(root.path(), "child", "{}");

        let refs = PackageRefs::discover(root.path()).unwrap();
        assert!(!refs.is_batch);
        assert_eq!(refs.refs, vec![PackageRef::new(root.path())]);
    }

    #[test]
    fn test_discover_children_sorted() {
        let root = TempDir::new().unwrap();
        write_package(root.path(), "zsh", "{}");
        write_package(root.path(), "git", "{}");
        fs::create_dir(root.path().join("not-a-package")).unwrap();

        let refs = PackageRefs::discover(root.path()).unwrap();
        assert!(refs.is_batch);
        assert_eq!(refs.names(), vec!["git", "zsh"]);
    }

    #[test]
    fn test_batch_skip_reasons() {
        let mut manifest = Manifest::default();
        assert_eq!(batch_skip_reason(&manifest), None);

        manifest.platforms = vec!["no-such-os".to_string()];
        assert!(batch_skip_reason(&manifest).unwrap().starts_with("Platform"));

        manifest.platforms = vec![current_platform().to_string()];
        manifest.requires_on_path = vec!["dotpkg-test-binary-that-does-not-exist".to_string()];
        assert!(batch_skip_reason(&manifest).unwrap().contains("on PATH"));

        manifest.skip_during_batch_install = true;
        assert_eq!(batch_skip_reason(&manifest).as_deref(), Some("Batch-install"));
    }
}

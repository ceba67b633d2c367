// src/resolve.rs

//! Resolution of manifest settings against the current host

use crate::error::{Error, Result};
use crate::options::ManifestVars;
use crate::package::{Manifest, Package};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix of host-specific files that are never ignored
const PRIVATE_SUFFIX: &str = ".private";

/// Pick the directory a package is installed into
///
/// The first existing candidate wins. If none exists and the manifest allows
/// it, the first candidate is returned without creating it, since an old
/// installation may still have to be removed first.
pub fn find_target_dir(manifest: &Manifest, vars: &ManifestVars) -> Result<PathBuf> {
    let candidates: Vec<PathBuf> = manifest
        .target_dir
        .iter()
        .map(|raw| PathBuf::from(vars.resolve(raw)))
        .collect();

    if let Some(existing) = candidates.iter().find(|path| path.is_dir()) {
        return Ok(existing.clone());
    }

    if manifest.create_target_dir_if_needed {
        if let Some(first) = candidates.into_iter().next() {
            return Ok(first);
        }
    }

    Err(Error::NoTargetDir(manifest.target_dir.clone()))
}

/// Source paths of a package that must not be placed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    paths: BTreeSet<PathBuf>,
}

impl IgnoreSet {
    /// Expand the package's ignore and host-specific patterns
    ///
    /// A host-specific pattern such as `settings.${hostname}.json` ignores the
    /// variants for every other host, keeping the current host's file and any
    /// file ending in `.private`.
    pub fn for_package(pkg: &Package, vars: &ManifestVars) -> Result<Self> {
        let mut paths = BTreeSet::new();

        for pattern in &pkg.manifest.host_specific_files {
            let include = pkg.path.join(vars.resolve(pattern));
            for candidate in expand(&pkg.path, &pattern.replace("${hostname}", "*"))? {
                let is_private = candidate
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(PRIVATE_SUFFIX));
                if candidate != include && !is_private {
                    paths.insert(candidate);
                }
            }
        }

        for pattern in &pkg.manifest.ignored_files {
            paths.extend(expand(&pkg.path, pattern)?);
        }

        debug!("Ignoring {} paths in {}", paths.len(), pkg.path.display());
        Ok(Self { paths })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Glob `pattern` relative to `base`
fn expand(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&base.to_string_lossy()),
        pattern
    );
    let mut matches = Vec::new();
    for entry in glob::glob(&full)? {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => debug!("Skipping unreadable glob match: {}", e),
        }
    }
    Ok(matches)
}

/// Substring rename rules applied to placed entry names
#[derive(Debug, Clone, Default)]
pub struct Renamer {
    rules: Vec<(String, String)>,
}

impl Renamer {
    /// Rules from the manifest with variables resolved, in pattern order
    pub fn new(manifest: &Manifest, vars: &ManifestVars) -> Self {
        Self {
            rules: manifest
                .renames
                .iter()
                .map(|(pattern, replacement)| (vars.resolve(pattern), vars.resolve(replacement)))
                .collect(),
        }
    }

    pub fn apply(&self, name: &str) -> String {
        self.rules
            .iter()
            .fold(name.to_string(), |acc, (pattern, replacement)| {
                acc.replace(pattern.as_str(), replacement)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vars(home: &Path) -> ManifestVars {
        ManifestVars {
            home: home.to_path_buf(),
            hostname: "thishost".to_string(),
        }
    }

    fn package(dir: &Path, manifest: Manifest) -> Package {
        Package {
            path: dir.to_path_buf(),
            manifest,
        }
    }

    #[test]
    fn test_find_target_dir_first_existing() {
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".config/b")).unwrap();
        let manifest = Manifest {
            target_dir: vec![
                "${home}/.config/a".to_string(),
                "${home}/.config/b".to_string(),
                "${home}/.config/c".to_string(),
            ],
            ..Manifest::default()
        };

        let dir = find_target_dir(&manifest, &vars(home.path())).unwrap();
        assert_eq!(dir, home.path().join(".config/b"));
    }

    #[test]
    fn test_find_target_dir_deferred_creation() {
        let home = TempDir::new().unwrap();
        let mut manifest = Manifest {
            target_dir: vec!["${home}/.config/someapp".to_string()],
            ..Manifest::default()
        };

        let result = find_target_dir(&manifest, &vars(home.path()));
        assert!(matches!(result, Err(Error::NoTargetDir(_))));

        manifest.create_target_dir_if_needed = true;
        let dir = find_target_dir(&manifest, &vars(home.path())).unwrap();
        assert_eq!(dir, home.path().join(".config/someapp"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_ignore_set_host_specific_and_explicit() {
        let pkg_dir = TempDir::new().unwrap();
        for name in [
            "settings.thishost.json",
            "settings.otherhost.json",
            "secrets.thishost",
            "secrets.otherhost",
            "secrets.shared.private",
            "install.sh",
            "keep.txt",
        ] {
            fs::write(pkg_dir.path().join(name), "").unwrap();
        }
        let manifest = Manifest {
            host_specific_files: vec![
                "settings.${hostname}.json".to_string(),
                "secrets.${hostname}".to_string(),
            ],
            ignored_files: vec!["*.sh".to_string()],
            ..Manifest::default()
        };

        let ignores =
            IgnoreSet::for_package(&package(pkg_dir.path(), manifest), &vars(pkg_dir.path()))
                .unwrap();

        assert!(ignores.contains(&pkg_dir.path().join("settings.otherhost.json")));
        assert!(ignores.contains(&pkg_dir.path().join("install.sh")));
        assert!(!ignores.contains(&pkg_dir.path().join("settings.thishost.json")));
        assert!(ignores.contains(&pkg_dir.path().join("secrets.otherhost")));
        assert!(!ignores.contains(&pkg_dir.path().join("secrets.thishost")));
        assert!(!ignores.contains(&pkg_dir.path().join("secrets.shared.private")));
        assert!(!ignores.contains(&pkg_dir.path().join("keep.txt")));
    }

    #[test]
    fn test_renamer_resolves_variables() {
        let mut manifest = Manifest::default();
        manifest
            .renames
            .insert("${hostname}".to_string(), "current".to_string());
        manifest.renames.insert("dot_".to_string(), ".".to_string());

        let renamer = Renamer::new(&manifest, &vars(Path::new("/home/u")));
        assert_eq!(renamer.apply("dot_profile.thishost"), ".profile.current");
        assert_eq!(renamer.apply("plain"), "plain");
    }
}

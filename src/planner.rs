// src/planner.rs

//! Placement planning
//!
//! Walks a package's source directory alongside the target directory and
//! yields one `Placement` per entry to project. When the target already holds
//! a real directory of the same name (not a symlink, not a Git checkout), the
//! planner descends into it instead of claiming the whole directory, so a
//! package can add a few files to a directory that something else manages.

use crate::error::Result;
use crate::package::MANIFEST_NAME;
use crate::record::RECORD_NAME;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::vec;
use tracing::debug;

/// Entry names that are never placed or descended into
pub const RESERVED_NAMES: &[&str] = &[MANIFEST_NAME, RECORD_NAME, ".git", ".gitignore", ".DS_Store"];

/// A source entry and the target path it should appear at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Placement {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Lazily plan the placements of `source_dir` into `target_dir`
///
/// `rename` maps a source entry name to its target name. Nothing is mutated;
/// calling `plan` again walks the trees afresh.
pub fn plan<F>(source_dir: &Path, target_dir: &Path, rename: F) -> Placements<F>
where
    F: Fn(&str) -> String,
{
    Placements {
        rename,
        pending: Some((source_dir.to_path_buf(), target_dir.to_path_buf())),
        stack: Vec::new(),
    }
}

struct Level {
    children: vec::IntoIter<PathBuf>,
    target_dir: PathBuf,
}

/// Iterator returned by [`plan`]
pub struct Placements<F> {
    rename: F,
    /// Directory pair whose children have not been listed yet
    pending: Option<(PathBuf, PathBuf)>,
    stack: Vec<Level>,
}

impl<F> Placements<F>
where
    F: Fn(&str) -> String,
{
    fn descend(&mut self, source_dir: &Path, target_dir: PathBuf) -> Result<()> {
        let mut children = fs::read_dir(source_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        children.sort();

        self.stack.push(Level {
            children: children.into_iter(),
            target_dir,
        });
        Ok(())
    }

    fn target_name(&self, source: &Path) -> Option<OsString> {
        let name = source.file_name()?;
        Some(match name.to_str() {
            Some(s) => OsString::from((self.rename)(s)),
            None => name.to_os_string(),
        })
    }
}

impl<F> Iterator for Placements<F>
where
    F: Fn(&str) -> String,
{
    type Item = Result<Placement>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((source_dir, target_dir)) = self.pending.take() {
            if let Err(e) = self.descend(&source_dir, target_dir) {
                return Some(Err(e));
            }
        }

        loop {
            let level = self.stack.last_mut()?;
            let Some(source) = level.children.next() else {
                self.stack.pop();
                continue;
            };
            let target_dir = level.target_dir.clone();

            let Some(name) = self.target_name(&source) else {
                continue;
            };
            if RESERVED_NAMES.iter().any(|reserved| name == *reserved) {
                debug!("Not planning reserved entry {}", source.display());
                continue;
            }

            let target = target_dir.join(&name);
            if is_mergeable_dir(&target) && source.is_dir() {
                debug!("Merging {} into existing {}", source.display(), target.display());
                if let Err(e) = self.descend(&source, target) {
                    return Some(Err(e));
                }
                continue;
            }

            return Some(Ok(Placement { source, target }));
        }
    }
}

/// An existing real directory that is not a Git working tree
fn is_mergeable_dir(path: &Path) -> bool {
    !path.is_symlink() && path.is_dir() && !path.join(".git").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(name: &str) -> String {
        name.to_string()
    }

    fn collect<F: Fn(&str) -> String>(placements: Placements<F>) -> Vec<Placement> {
        placements.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_plan_sorted_and_skips_reserved_names() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(src.path().join(MANIFEST_NAME), "{}").unwrap();
        fs::write(src.path().join(".gitignore"), "").unwrap();
        fs::write(src.path().join("b.txt"), "").unwrap();
        fs::write(src.path().join("a.txt"), "").unwrap();
        fs::create_dir(src.path().join("dir")).unwrap();

        let placements = collect(plan(src.path(), target.path(), identity));

        assert_eq!(
            placements,
            vec![
                Placement::new(src.path().join("a.txt"), target.path().join("a.txt")),
                Placement::new(src.path().join("b.txt"), target.path().join("b.txt")),
                Placement::new(src.path().join("dir"), target.path().join("dir")),
            ]
        );
    }

    #[test]
    fn test_plan_descends_into_existing_directory() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join(".config/app")).unwrap();
        fs::write(src.path().join(".config/app/settings.json"), "{}").unwrap();
        fs::create_dir(target.path().join(".config")).unwrap();
        fs::write(target.path().join(".config/other"), "foreign").unwrap();

        let placements = collect(plan(src.path(), target.path(), identity));

        assert_eq!(
            placements,
            vec![Placement::new(
                src.path().join(".config/app"),
                target.path().join(".config/app"),
            )]
        );
    }

    #[test]
    fn test_plan_does_not_descend_into_git_checkout() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("repo")).unwrap();
        fs::write(src.path().join("repo/file"), "").unwrap();
        fs::create_dir_all(target.path().join("repo/.git")).unwrap();

        let placements = collect(plan(src.path(), target.path(), identity));

        assert_eq!(
            placements,
            vec![Placement::new(src.path().join("repo"), target.path().join("repo"))]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_does_not_descend_through_symlink() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir(src.path().join("dir")).unwrap();
        fs::write(src.path().join("dir/file"), "").unwrap();
        std::os::unix::fs::symlink(src.path().join("dir"), target.path().join("dir")).unwrap();

        let placements = collect(plan(src.path(), target.path(), identity));

        assert_eq!(
            placements,
            vec![Placement::new(src.path().join("dir"), target.path().join("dir"))]
        );
    }

    #[test]
    fn test_plan_applies_renames_and_checks_reserved_after_renaming() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(src.path().join("dot_bashrc"), "").unwrap();
        fs::write(src.path().join("dot_gitignore"), "").unwrap();

        let placements = collect(plan(src.path(), target.path(), |name: &str| {
            name.replace("dot_", ".")
        }));

        assert_eq!(
            placements,
            vec![Placement::new(
                src.path().join("dot_bashrc"),
                target.path().join(".bashrc"),
            )]
        );
    }

    #[test]
    fn test_plan_is_restartable() {
        let src = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(src.path().join("x"), "").unwrap();

        let first = collect(plan(src.path(), target.path(), identity));
        let second = collect(plan(src.path(), target.path(), identity));
        assert_eq!(first, second);
    }
}

// src/package/manifest.rs

//! The `dotpkg.json` package manifest

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle hooks a manifest may define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Preinstall,
    Install,
    Postinstall,
    Preuninstall,
    Uninstall,
    Postuninstall,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Preinstall => "preinstall",
            Hook::Install => "install",
            Hook::Postinstall => "postinstall",
            Hook::Preuninstall => "preuninstall",
            Hook::Uninstall => "uninstall",
            Hook::Postuninstall => "postuninstall",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shell commands run at lifecycle events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scripts {
    pub preinstall: Option<String>,
    pub install: Option<String>,
    pub postinstall: Option<String>,
    pub preuninstall: Option<String>,
    pub uninstall: Option<String>,
    pub postuninstall: Option<String>,
}

impl Scripts {
    /// The command configured for `hook`, ignoring empty strings
    pub fn command(&self, hook: Hook) -> Option<&str> {
        let command = match hook {
            Hook::Preinstall => &self.preinstall,
            Hook::Install => &self.install,
            Hook::Postinstall => &self.postinstall,
            Hook::Preuninstall => &self.preuninstall,
            Hook::Uninstall => &self.uninstall,
            Hook::Postuninstall => &self.postuninstall,
        };
        command.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Whether applying a package needs the session or machine restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requires {
    None,
    Logout,
    Reboot,
}

/// A dotfile package description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    /// Short identifier, defaults to the package directory's name
    pub name: Option<String>,
    pub description: String,
    /// Copy files instead of linking them
    pub copy: bool,
    /// Create the first `target_dir` candidate if none exists
    pub create_target_dir_if_needed: bool,
    /// Only run scripts, never place files
    pub is_scripts_only: bool,
    pub skip_during_batch_install: bool,
    /// Supported platforms, empty for all
    pub platforms: Vec<String>,
    /// Executables that must be on PATH for batch installs
    pub requires_on_path: Vec<String>,
    /// Globs containing `${hostname}`; variants for other hosts are ignored
    pub host_specific_files: Vec<String>,
    pub ignored_files: Vec<String>,
    /// Substring replacements applied to placed file names
    pub renames: BTreeMap<String, String>,
    pub requires: Option<Requires>,
    /// Candidate target directories, first existing one wins
    pub target_dir: Vec<String>,
    /// Files created in the target directory if missing
    pub touch_files: Vec<String>,
    pub scripts: Scripts,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            name: None,
            description: String::new(),
            copy: false,
            create_target_dir_if_needed: false,
            is_scripts_only: false,
            skip_during_batch_install: false,
            platforms: Vec::new(),
            requires_on_path: Vec::new(),
            host_specific_files: Vec::new(),
            ignored_files: Vec::new(),
            renames: BTreeMap::new(),
            requires: None,
            target_dir: vec!["${home}".to_string()],
            touch_files: Vec::new(),
            scripts: Scripts::default(),
        }
    }
}

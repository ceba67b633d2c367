// src/options.rs

//! Run-wide options shared by every operation

use crate::reconcile::ConflictResolution;
use std::path::{Path, PathBuf};

/// Values substituted into manifest strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVars {
    /// Replaces `${home}`
    pub home: PathBuf,
    /// Replaces `${hostname}`
    pub hostname: String,
}

impl ManifestVars {
    /// Variables for the current user and host
    pub fn from_env() -> Self {
        Self {
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            hostname: local_hostname().unwrap_or_else(|| "localhost".to_string()),
        }
    }

    /// Substitute all known variables in `s`
    pub fn resolve(&self, s: &str) -> String {
        s.replace("${home}", &self.home.to_string_lossy())
            .replace("${hostname}", &self.hostname)
    }
}

/// Get the local hostname
fn local_hostname() -> Option<String> {
    #[cfg(unix)]
    {
        use std::ffi::CStr;
        let mut buf = [0u8; 256];
        unsafe {
            if libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) == 0 {
                if let Ok(cstr) = CStr::from_ptr(buf.as_ptr() as *const libc::c_char).to_str() {
                    return Some(cstr.to_string());
                }
            }
        }
    }
    None
}

/// Options controlling install, uninstall and record handling
#[derive(Debug, Clone)]
pub struct Options {
    /// Log mutations without performing them
    pub dry_run: bool,
    /// Answer every prompt with its default
    pub assume_yes: bool,
    /// Skip all lifecycle scripts
    pub safe_mode: bool,
    /// Read and write the install record
    pub update_install_manifest: bool,
    /// Store target dirs relative to the state dir
    pub relative_target_path: bool,
    /// Resolve every conflict this way instead of prompting
    pub on_conflict: Option<ConflictResolution>,
    /// Directory holding `installs.json`
    pub state_dir: PathBuf,
    /// Directory that package arguments are resolved against
    pub cwd: PathBuf,
    pub vars: ManifestVars,
}

impl Options {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            dry_run: false,
            assume_yes: false,
            safe_mode: false,
            update_install_manifest: true,
            relative_target_path: false,
            on_conflict: None,
            state_dir: cwd.clone(),
            cwd,
            vars: ManifestVars::from_env(),
        }
    }

    /// Options for non-interactive use against an explicit home directory
    pub fn unattended(cwd: impl Into<PathBuf>, home: &Path) -> Self {
        let mut opts = Self::new(cwd);
        opts.assume_yes = true;
        opts.vars.home = home.to_path_buf();
        opts
    }
}

// src/lib.rs

//! dotpkg - Dotfile Package Manager
//!
//! Installs "dotpkgs", directories with a `dotpkg.json` manifest, into a
//! target directory (usually the home directory) by linking or copying their
//! files, and removes them again later.
//!
//! # Architecture
//!
//! - Planning: source and target trees are walked together, merging into
//!   existing directories instead of replacing them
//! - Reconciliation: each placement is skipped, installed or resolved as a
//!   conflict (backup, overwrite, skip, theirs)
//! - Install record: `installs.json` remembers what was placed, versioned and
//!   upgraded by a full uninstall/reinstall cycle
//! - Copy identity: SHA-256 content digests decide whether a copy is still
//!   the package's own before it is removed

pub mod commands;
mod error;
pub mod filesystem;
pub mod hash;
pub mod hooks;
pub mod install;
pub mod options;
pub mod package;
pub mod planner;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod resolve;

pub use error::{Error, Result};

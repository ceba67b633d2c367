// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dotpkg::commands::{self, CommandOutcome};
use dotpkg::options::Options;
use dotpkg::reconcile::ConflictResolution;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "dotpkg")]
#[command(author, version, about = "Dotfile package manager", long_about = None)]
struct Cli {
    /// Simulate a run without any modifications to the file system
    #[arg(short, long, global = true)]
    dry_run: bool,

    /// Accept prompts with their default and run non-interactively
    #[arg(short = 'y', long, global = true)]
    assume_yes: bool,

    /// Skip any user-defined shell commands such as scripts
    #[arg(short, long, global = true)]
    safe_mode: bool,

    /// Skip reading and writing the install manifest (installs.json)
    #[arg(long, global = true)]
    no_install_manifest: bool,

    /// Store the target dir relative to the state dir in the install manifest
    #[arg(long, global = true)]
    relative_target_path: bool,

    /// Resolve every conflict this way instead of prompting
    #[arg(long, value_enum, global = true)]
    on_conflict: Option<ConflictResolution>,

    /// Directory holding the install manifest (default: current directory)
    #[arg(long, env = "DOTPKG_STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    /// Home directory substituted for ${home} in manifests
    #[arg(long, env = "DOTPKG_HOME", global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install dotpkgs (all in the current directory by default)
    Install {
        /// Paths of the dotpkgs to install
        dotpkgs: Vec<String>,
    },
    /// Uninstall dotpkgs (all in the current directory by default)
    Uninstall {
        /// Paths of the dotpkgs to uninstall
        dotpkgs: Vec<String>,
    },
    /// Uninstall, then install dotpkgs again
    Sync {
        /// Paths of the dotpkgs to sync
        dotpkgs: Vec<String>,
    },
    /// Reinstall everything recorded in an old install manifest at the current version
    UpgradeInstallManifest,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    fn options(&self) -> Result<Options> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let mut opts = Options::new(cwd);
        opts.dry_run = self.dry_run;
        opts.assume_yes = self.assume_yes;
        opts.safe_mode = self.safe_mode;
        opts.update_install_manifest = !self.no_install_manifest;
        opts.relative_target_path = self.relative_target_path;
        opts.on_conflict = self.on_conflict;
        if let Some(state_dir) = &self.state_dir {
            opts.state_dir = opts.cwd.join(state_dir);
        }
        if let Some(home) = &self.home {
            opts.vars.home = opts.cwd.join(home);
        }
        debug!("Running with {:?}", opts);
        Ok(opts)
    }
}

fn run(cli: Cli) -> Result<CommandOutcome> {
    let Some(command) = &cli.command else {
        // No command provided, show help
        println!("dotpkg v{}", env!("CARGO_PKG_VERSION"));
        println!("Run 'dotpkg --help' for usage information");
        return Ok(CommandOutcome::Done);
    };

    if let Commands::Completions { shell } = command {
        clap_complete::generate(*shell, &mut Cli::command(), "dotpkg", &mut std::io::stdout());
        return Ok(CommandOutcome::Done);
    }

    let opts = cli.options()?;
    let outcome = match command {
        Commands::Install { dotpkgs } => commands::install_cmd(dotpkgs, &opts)?,
        Commands::Uninstall { dotpkgs } => commands::uninstall_cmd(dotpkgs, &opts)?,
        Commands::Sync { dotpkgs } => commands::sync_cmd(dotpkgs, &opts)?,
        Commands::UpgradeInstallManifest => commands::upgrade_cmd(&opts)?,
        Commands::Completions { .. } => CommandOutcome::Done,
    };
    Ok(outcome)
}

fn main() -> ExitCode {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(CommandOutcome::Done) => ExitCode::SUCCESS,
        Ok(CommandOutcome::Cancelled) => {
            debug!("Cancelled by user");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dotpkg",
            "install",
            "-y",
            "--on-conflict",
            "theirs",
            "--no-install-manifest",
            "vim",
            "zsh",
        ])
        .unwrap();

        assert!(cli.assume_yes);
        assert!(cli.no_install_manifest);
        assert_eq!(cli.on_conflict, Some(ConflictResolution::Theirs));
        match cli.command {
            Some(Commands::Install { dotpkgs }) => assert_eq!(dotpkgs, vec!["vim", "zsh"]),
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_parse_upgrade_command() {
        let cli = Cli::try_parse_from(["dotpkg", "-d", "upgrade-install-manifest"]).unwrap();
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Some(Commands::UpgradeInstallManifest)));
    }

    #[test]
    fn test_unknown_conflict_resolution_is_rejected() {
        let result = Cli::try_parse_from(["dotpkg", "--on-conflict", "merge", "install"]);
        assert!(result.is_err());
    }
}

// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn flag(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(long)
        .action(ArgAction::SetTrue)
        .global(true)
        .help(help)
}

fn dotpkgs_arg(help: &'static str) -> Arg {
    Arg::new("dotpkgs").num_args(0..).help(help)
}

fn build_cli() -> Command {
    Command::new("dotpkg")
        .version(env!("CARGO_PKG_VERSION"))
        .author("dotpkg Contributors")
        .about("Dotfile package manager")
        .subcommand_required(false)
        .arg(
            flag("dry_run", "dry-run", "Simulate a run without any modifications to the file system")
                .short('d'),
        )
        .arg(
            flag("assume_yes", "assume-yes", "Accept prompts with their default and run non-interactively")
                .short('y'),
        )
        .arg(
            flag("safe_mode", "safe-mode", "Skip any user-defined shell commands such as scripts")
                .short('s'),
        )
        .arg(flag(
            "no_install_manifest",
            "no-install-manifest",
            "Skip reading and writing the install manifest (installs.json)",
        ))
        .arg(flag(
            "relative_target_path",
            "relative-target-path",
            "Store the target dir relative to the state dir in the install manifest",
        ))
        .arg(
            Arg::new("on_conflict")
                .long("on-conflict")
                .value_parser(["backup", "overwrite", "skip", "theirs"])
                .global(true)
                .help("Resolve every conflict this way instead of prompting"),
        )
        .arg(
            Arg::new("state_dir")
                .long("state-dir")
                .value_name("DIR")
                .env("DOTPKG_STATE_DIR")
                .global(true)
                .help("Directory holding the install manifest (default: current directory)"),
        )
        .arg(
            Arg::new("home")
                .long("home")
                .value_name("DIR")
                .env("DOTPKG_HOME")
                .global(true)
                .help("Home directory substituted for ${home} in manifests"),
        )
        .subcommand(
            Command::new("install")
                .about("Install dotpkgs (all in the current directory by default)")
                .arg(dotpkgs_arg("Paths of the dotpkgs to install")),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Uninstall dotpkgs (all in the current directory by default)")
                .arg(dotpkgs_arg("Paths of the dotpkgs to uninstall")),
        )
        .subcommand(
            Command::new("sync")
                .about("Uninstall, then install dotpkgs again")
                .arg(dotpkgs_arg("Paths of the dotpkgs to sync")),
        )
        .subcommand(Command::new("upgrade-install-manifest").about(
            "Reinstall everything recorded in an old install manifest at the current version",
        ))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell to generate completions for"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("dotpkg.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}

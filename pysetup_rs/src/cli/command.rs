//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::DEFAULT_LOG_LEVEL;
use crate::manifest::MatchMode;

/// Python project setup helper: find the packages a project imports, check
/// them against PyPI, keep requirements.txt in sync, install and bootstrap
/// virtual environments.
#[derive(Parser, Debug)]
#[command(name = "pysetup", author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Log filter (`info`, `debug`, `pysetup=trace`). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    /// Config file (default: `<root>/.pysetup/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Print the pip/git commands instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the third-party packages a project imports.
    Scan(ScanArgs),
    /// Sort package names into published, local and undetermined.
    Classify(ClassifyArgs),
    /// Offer to append missing package names to a requirements file.
    UpdateManifest(UpdateManifestArgs),
    /// pip-install a single package.
    Install(InstallArgs),
    /// pip-install a requirements file.
    InstallRequirements(InstallRequirementsArgs),
    /// Clone a git repository and pip-install it.
    Clone(CloneArgs),
    /// Clone and install every repository listed in a file.
    InstallNetwork(InstallNetworkArgs),
    /// Create a virtual environment with a chosen interpreter.
    Venv(VenvArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Project root to scan.
    #[arg(default_value = ".")]
    pub root: PathBuf,
    /// File name glob; repeatable (default `*.py`).
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,
    /// Skip paths containing this text; repeatable (default `venv`).
    #[arg(long = "exclude-folder")]
    pub exclude_folders: Vec<String>,
    /// Extra package name to leave out; repeatable.
    #[arg(long = "exclude-package")]
    pub exclude_packages: Vec<String>,
    /// Keep standard-library names in the result.
    #[arg(long)]
    pub no_default_excludes: bool,
    /// Log the imports found in every file.
    #[arg(short, long)]
    pub verbose: bool,
    /// Check the packages against the index and the reference directory.
    #[arg(long)]
    pub classify: bool,
    /// Directory holding local modules (default: the scan root).
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,
    /// Offer to add the published packages to this requirements file.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub match_mode: Option<MatchMode>,
    /// Answer yes to every question.
    #[arg(short, long)]
    pub yes: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(required = true)]
    pub names: Vec<String>,
    /// Directory holding local modules (default: current directory).
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateManifestArgs {
    pub manifest: PathBuf,
    #[arg(required = true)]
    pub names: Vec<String>,
    #[arg(long, value_enum)]
    pub match_mode: Option<MatchMode>,
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    pub package: String,
    /// Editable (developer) install.
    #[arg(short = 'e', long)]
    pub editable: bool,
    /// Extra arguments passed to pip after `--`.
    #[arg(last = true)]
    pub pip_args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InstallRequirementsArgs {
    #[arg(default_value = "requirements.txt")]
    pub manifest: PathBuf,
    /// Install line by line and report a summary.
    #[arg(long)]
    pub one_at_a_time: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    /// Repository URL, optionally `URL@branch`.
    pub url: String,
    /// Editable install; keep the checkout.
    #[arg(long)]
    pub dev: bool,
    /// Directory to clone into.
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InstallNetworkArgs {
    /// File with one repository URL per line.
    pub manifest: PathBuf,
    #[arg(long)]
    pub dev: bool,
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct VenvArgs {
    #[arg(default_value = "venv")]
    pub path: PathBuf,
    /// Use the first interpreter found without asking.
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pysetup").chain(args.iter().copied()))
            .expect("valid command line")
    }

    #[test]
    fn scan_defaults() {
        let cli = parse(&["scan"]);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.root, PathBuf::from("."));
        assert!(args.patterns.is_empty());
        assert!(args.match_mode.is_none());
        assert_eq!(cli.global.log_level, "info");
    }

    #[test]
    fn scan_repeatable_flags_and_globals_after_subcommand() {
        let cli = parse(&[
            "scan",
            "proj",
            "--exclude-folder",
            "venv",
            "--exclude-folder",
            "build",
            "--match-mode",
            "name",
            "--log-level",
            "debug",
        ]);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.exclude_folders, vec!["venv", "build"]);
        assert_eq!(args.match_mode, Some(MatchMode::Name));
        assert_eq!(cli.global.log_level, "debug");
    }

    #[test]
    fn install_passes_trailing_pip_args() {
        let cli = parse(&["install", "-e", "./pkg", "--", "--no-deps", "--upgrade"]);
        let Command::Install(args) = cli.command else {
            panic!("expected install");
        };
        assert!(args.editable);
        assert_eq!(args.package, "./pkg");
        assert_eq!(args.pip_args, vec!["--no-deps", "--upgrade"]);
    }

    #[test]
    fn classify_needs_names() {
        assert!(Cli::try_parse_from(["pysetup", "classify"]).is_err());
    }
}

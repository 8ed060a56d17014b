//! Handlers behind each subcommand.
//!
//! Handlers return the process exit code; unexpected failures propagate as
//! `anyhow` errors and are printed by the entry point.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::config::PysetupConfig;
use crate::install::{
    CloneOptions, CommandRunner, InstallSummary, Installer, RecordingRunner, RepoSource,
    SystemRunner,
};
use crate::manifest::{ManifestUpdate, MatchMode, update_manifest};
use crate::pipeline::{ScanOptions, scan_project};
use crate::progress::{self, CountingSpinner, format_count, format_duration};
use crate::prompt::{self, AssumeYes, LinePrompt, Prompt};
use crate::registry::{Lookup, LookupObserver, PypiRegistry, classify_packages_observed};
use crate::types::{Classified, ScanReport};
use crate::venv::{VenvSetup, setup_virtual_env};

use super::command::*;

pub fn dispatch(cli: &Cli) -> Result<ExitCode> {
    let global = &cli.global;
    match &cli.command {
        Command::Scan(args) => run_scan(args, global),
        Command::Classify(args) => run_classify(args, global),
        Command::UpdateManifest(args) => run_update_manifest(args, global),
        Command::Install(args) => run_install(args, global),
        Command::InstallRequirements(args) => run_install_requirements(args, global),
        Command::Clone(args) => run_clone(args, global),
        Command::InstallNetwork(args) => run_install_network(args, global),
        Command::Venv(args) => run_venv(args, global),
    }
}

/// `--config` when given, otherwise `<root>/.pysetup/config.toml`.
fn load_config(global: &GlobalOptions, root: &Path) -> PysetupConfig {
    match &global.config {
        Some(path) => {
            if !path.exists() {
                warn!("config file {} not found, using defaults", path.display());
            }
            PysetupConfig::load_from_path(path)
        }
        None => PysetupConfig::load(root),
    }
}

/// Relative paths from the config file are taken from the project root.
fn rooted(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn make_prompt(yes: bool, json: bool) -> Box<dyn Prompt> {
    if yes {
        Box::new(AssumeYes)
    } else if json {
        // Keep stdout clean for the JSON document.
        Box::new(LinePrompt::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(prompt::terminal())
    }
}

fn classify_blocking(
    names: &[String],
    reference_dir: &Path,
    config: &PysetupConfig,
    quiet: bool,
) -> Result<Classified> {
    let options = config.registry.options();
    let registry = PypiRegistry::new(&options)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let spinner = (!quiet).then(|| {
        CountingSpinner::new(&format!("Checking against {}:", options.index_url))
    });
    let observer: &dyn LookupObserver = match &spinner {
        Some(spinner) => spinner,
        None => &(),
    };
    let started = Instant::now();
    let classified = runtime.block_on(classify_packages_observed(
        names,
        reference_dir,
        &registry,
        config.registry.workers(),
        observer,
    ));
    if let Some(spinner) = spinner {
        spinner.finish(&format!(
            "Checked {} ({} looked up) in {}",
            format_count(classified.len(), "package", "packages"),
            spinner.done(),
            format_duration(started.elapsed())
        ));
    }
    Ok(classified)
}

impl LookupObserver for CountingSpinner {
    fn pending(&self, count: usize) {
        self.set_total(count);
    }

    fn answered(&self, name: &str, _answer: &Lookup) {
        self.advance(name);
    }
}

fn print_classified(classified: &Classified) {
    let sections = [
        ("Published", &classified.published),
        ("Local", &classified.local),
        ("Undetermined", &classified.undetermined),
    ];
    for (title, names) in sections {
        if names.is_empty() {
            continue;
        }
        progress::info(&format!("{title} ({}):", names.len()));
        for name in names {
            println!("  {name}");
        }
    }
}

/// Print a manifest outcome; failures map to exit code 1.
fn report_manifest(update: &ManifestUpdate, path: &Path) -> ExitCode {
    let file = path.display();
    match update {
        ManifestUpdate::UpToDate => {
            progress::success(&format!("No packages listed are missing in {file}"));
            ExitCode::SUCCESS
        }
        ManifestUpdate::Declined { missing } => {
            progress::info(&format!(
                "{file} left unchanged ({} not added)",
                format_count(missing.len(), "package", "packages")
            ));
            ExitCode::SUCCESS
        }
        ManifestUpdate::Appended { added } => {
            progress::success(&format!("Added to {file}: {}", added.join(", ")));
            ExitCode::SUCCESS
        }
        ManifestUpdate::Failed { message, .. } => {
            progress::error(message);
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    #[serde(flatten)]
    report: &'a ScanReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    classified: Option<&'a Classified>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<&'a ManifestUpdate>,
}

fn run_scan(args: &ScanArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let config = load_config(global, &args.root);
    let mut options = ScanOptions::from_config(&config);
    if !args.patterns.is_empty() {
        options.patterns = args.patterns.clone();
    }
    if !args.exclude_folders.is_empty() {
        options.excluded_folders = args.exclude_folders.clone();
    }
    options
        .extra_exclusions
        .extend(args.exclude_packages.iter().cloned());
    options.exclude_defaults = !args.no_default_excludes;
    options.verbose = args.verbose;

    let report = scan_project(&args.root, &options)?;

    let manifest = args
        .manifest
        .clone()
        .or_else(|| config.manifest.as_deref().map(|m| rooted(&args.root, m)));
    let classified = if args.classify || manifest.is_some() {
        let reference_dir = args
            .reference_dir
            .clone()
            .or_else(|| config.reference_dir.as_deref().map(|d| rooted(&args.root, d)))
            .unwrap_or_else(|| args.root.clone());
        Some(classify_blocking(
            &report.packages,
            &reference_dir,
            &config,
            args.json,
        )?)
    } else {
        None
    };

    if !args.json {
        for (path, message) in report.error_files() {
            progress::warning(&format!("{}: {}", path.display(), message));
        }
        progress::info(&format!(
            "Scanned {} under {}",
            format_count(report.files.len(), "file", "files"),
            args.root.display()
        ));
        if !report.excluded.is_empty() {
            progress::info(&format!("Excluded packages: {}", report.excluded.join(", ")));
        }
        match &classified {
            Some(classified) => print_classified(classified),
            None => {
                progress::success(&format!(
                    "Found {}",
                    format_count(report.packages.len(), "package", "packages")
                ));
                for name in &report.packages {
                    println!("  {name}");
                }
            }
        }
    }

    let mut code = ExitCode::SUCCESS;
    let update = match (&manifest, &classified) {
        (Some(path), Some(classified)) => {
            let mode = args.match_mode.unwrap_or(config.match_mode);
            let mut prompt = make_prompt(args.yes, args.json);
            let update = update_manifest(&classified.published, path, mode, prompt.as_mut());
            if !args.json {
                code = report_manifest(&update, path);
            } else if matches!(update, ManifestUpdate::Failed { .. }) {
                code = ExitCode::FAILURE;
            }
            Some(update)
        }
        _ => None,
    };

    if args.json {
        let output = ScanOutput {
            report: &report,
            classified: classified.as_ref(),
            manifest: update.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(code)
}

fn run_classify(args: &ClassifyArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let cwd = Path::new(".");
    let config = load_config(global, cwd);
    let reference_dir = args
        .reference_dir
        .clone()
        .or_else(|| config.reference_dir.clone())
        .unwrap_or_else(|| cwd.to_path_buf());
    let classified = classify_blocking(&args.names, &reference_dir, &config, args.json)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
    } else {
        print_classified(&classified);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_update_manifest(args: &UpdateManifestArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let config = load_config(global, Path::new("."));
    let mode: MatchMode = args.match_mode.unwrap_or(config.match_mode);
    let mut prompt = make_prompt(args.yes, false);
    let update = update_manifest(&args.names, &args.manifest, mode, prompt.as_mut());
    Ok(report_manifest(&update, &args.manifest))
}

/// Run `f` against the real runner, or against a recorder whose command
/// lines are printed afterwards when `--dry-run` is set.
fn with_runner<T>(global: &GlobalOptions, f: impl FnOnce(&dyn CommandRunner) -> T) -> T {
    if global.dry_run {
        let runner = RecordingRunner::new();
        let out = f(&runner);
        for line in runner.command_lines() {
            println!("{line}");
        }
        out
    } else {
        f(&SystemRunner)
    }
}

fn report_summary(summary: &InstallSummary) -> ExitCode {
    progress::success(&format!(
        "Installed {}",
        format_count(summary.installed.len(), "package", "packages")
    ));
    for entry in &summary.failed {
        if summary.already_present.contains(entry) {
            progress::warning(&format!(
                "{entry} failed to install but is already present in the Python environment"
            ));
        } else {
            progress::error(&format!("{entry} failed to install"));
        }
    }
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_install(args: &InstallArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let config = load_config(global, Path::new("."));
    let installed = with_runner(global, |runner| {
        Installer::new(runner, config.install.python.as_str()).pip_install(
            &args.package,
            &args.pip_args,
            args.editable,
        )
    });
    if installed {
        progress::success(&format!("Installed {}", args.package));
        Ok(ExitCode::SUCCESS)
    } else {
        progress::error(&format!("Could not install {}", args.package));
        Ok(ExitCode::FAILURE)
    }
}

fn run_install_requirements(
    args: &InstallRequirementsArgs,
    global: &GlobalOptions,
) -> Result<ExitCode> {
    let config = load_config(global, Path::new("."));
    with_runner(global, |runner| -> Result<ExitCode> {
        let installer = Installer::new(runner, config.install.python.as_str());
        if args.one_at_a_time {
            let summary = installer.install_requirements_one_at_a_time(&args.manifest)?;
            Ok(report_summary(&summary))
        } else {
            installer.install_requirements(&args.manifest)?;
            progress::success(&format!(
                "Packages from {} installed",
                args.manifest.display()
            ));
            Ok(ExitCode::SUCCESS)
        }
    })
}

fn run_clone(args: &CloneArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let config = load_config(global, Path::new("."));
    let source = RepoSource::parse(&args.url);
    let options = CloneOptions {
        dev_mode: args.dev,
        destination: args.dest.clone(),
    };
    with_runner(global, |runner| {
        Installer::new(runner, config.install.python.as_str())
            .clone_and_install(&source, &options)
    })?;
    progress::success(&format!("Installed {}", source.package_name()));
    Ok(ExitCode::SUCCESS)
}

fn run_install_network(args: &InstallNetworkArgs, global: &GlobalOptions) -> Result<ExitCode> {
    let config = load_config(global, Path::new("."));
    let options = CloneOptions {
        dev_mode: args.dev,
        destination: args.dest.clone(),
    };
    let summary = with_runner(global, |runner| {
        Installer::new(runner, config.install.python.as_str())
            .install_network_one_at_a_time(&args.manifest, &options)
    })?;
    Ok(report_summary(&summary))
}

fn run_venv(args: &VenvArgs, _global: &GlobalOptions) -> Result<ExitCode> {
    let mut prompt = make_prompt(args.yes, false);
    match setup_virtual_env(&args.path, &SystemRunner, prompt.as_mut()) {
        VenvSetup::Failed { .. } => Ok(ExitCode::FAILURE),
        VenvSetup::AlreadyExists | VenvSetup::Created { .. } | VenvSetup::Skipped => {
            Ok(ExitCode::SUCCESS)
        }
    }
}

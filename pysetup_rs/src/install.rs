//! Package installation through `pip` and `git`.
//!
//! Every process goes through a [`CommandRunner`], so command lines can be
//! checked without spawning anything.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {}: {stderr}", .code.map_or("a signal".to_string(), |c| format!("status {c}")))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("requirements file not found at {}", .0.display())]
    ManifestNotFound(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Spawns real processes and captures their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Records every command line and answers from a queue (success by default).
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<Vec<String>>>,
    outcomes: Mutex<Vec<(String, CommandOutput)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any command whose joined text contains `needle` fail.
    pub fn fail_when(self, needle: &str, stderr: &str) -> Self {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push((
                needle.to_string(),
                CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            ));
        }
        self
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|c| c.join(" ")).collect())
            .unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let mut line = vec![program.to_string()];
        line.extend(args.iter().cloned());
        let joined = line.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line);
        }
        let outcomes = self
            .outcomes
            .lock()
            .map_err(|_| io::Error::other("runner state poisoned"))?;
        let scripted = outcomes
            .iter()
            .find(|(needle, _)| joined.contains(needle.as_str()))
            .map(|(_, out)| out.clone());
        Ok(scripted.unwrap_or(CommandOutput {
            success: true,
            code: Some(0),
            ..CommandOutput::default()
        }))
    }
}

/// A repository to clone, optionally pinned to a branch (`URL@branch`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoSource {
    pub url: String,
    pub branch: Option<String>,
}

impl RepoSource {
    /// Split a trailing `@branch`, leaving `git@host:org/repo.git` style URLs alone.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if let Some((url, branch)) = spec.rsplit_once('@')
            && !branch.is_empty()
            && !branch.contains(['/', ':'])
            && url.contains(['/', '\\'])
        {
            return Self {
                url: url.to_string(),
                branch: Some(branch.to_string()),
            };
        }
        Self {
            url: spec.to_string(),
            branch: None,
        }
    }

    /// Stem of the last path segment: `https://host/org/tool.git` → `tool`.
    pub fn package_name(&self) -> String {
        let last = self
            .url
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.url);
        Path::new(last)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| last.to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CloneOptions {
    /// Install editable and keep the checkout.
    pub dev_mode: bool,
    /// Parent directory for the checkout; defaults to the current directory.
    pub destination: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub installed: Vec<String>,
    pub failed: Vec<String>,
    /// Failed entries whose module still imports in the target interpreter.
    pub already_present: Vec<String>,
}

impl InstallSummary {
    pub fn is_success(&self) -> bool {
        self.failed.len() == self.already_present.len()
    }
}

/// Non-empty, trimmed lines of a requirements file.
pub fn read_requirement_lines(path: &Path) -> Result<Vec<String>, InstallError> {
    if !path.is_file() {
        return Err(InstallError::ManifestNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| InstallError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub struct Installer<'r> {
    runner: &'r dyn CommandRunner,
    python: String,
}

impl<'r> Installer<'r> {
    pub fn new(runner: &'r dyn CommandRunner, python: impl Into<String>) -> Self {
        Self {
            runner,
            python: python.into(),
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    /// Run a command; success and failure are both logged.
    pub fn exec_command(&self, program: &str, args: &[String]) -> Result<CommandOutput, InstallError> {
        let command = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        let output = self
            .runner
            .run(program, args)
            .map_err(|source| InstallError::Spawn {
                command: command.clone(),
                source,
            })
            .inspect_err(|err| error!("Error with: {}", err))?;
        if output.success {
            info!("{} : successful", command);
            Ok(output)
        } else {
            let err = InstallError::Failed {
                command,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            };
            error!("Error with: {}", err);
            Err(err)
        }
    }

    fn pip_args(&self, tail: impl IntoIterator<Item = String>) -> Vec<String> {
        ["-m", "pip", "install"]
            .into_iter()
            .map(str::to_string)
            .chain(tail)
            .collect()
    }

    /// `python -m pip install [-e] <package> [extra args]`.
    ///
    /// Editable mode can be requested with `editable`, with a `-e` among
    /// `extra_args`, or with a `-e ` prefix on the package itself.
    pub fn pip_install(&self, package: &str, extra_args: &[String], editable: bool) -> bool {
        let mut editable = editable;
        let mut rest: Vec<String> = Vec::with_capacity(extra_args.len());
        for arg in extra_args {
            if arg == "-e" {
                editable = true;
            } else {
                rest.push(arg.clone());
            }
        }
        let mut package = package.trim();
        if let Some(stripped) = package.strip_prefix("-e ") {
            editable = true;
            package = stripped.trim();
        }

        let mut tail = Vec::new();
        if editable {
            tail.push("-e".to_string());
        }
        tail.push(package.to_string());
        tail.extend(rest);

        let args = self.pip_args(tail);
        match self.runner.run(&self.python, &args) {
            Ok(output) if output.success => {
                if editable {
                    info!("Installed package: {} (developer mode)", package);
                } else {
                    info!("Installed package: {}", package);
                }
                true
            }
            Ok(output) => {
                error!("Installation failed: {}", output.stderr.trim());
                false
            }
            Err(err) => {
                error!("Error during installation: {}", err);
                false
            }
        }
    }

    /// `python -m pip install -r <absolute path>`.
    pub fn install_requirements(&self, path: &Path) -> Result<(), InstallError> {
        if !path.is_file() {
            let err = InstallError::ManifestNotFound(path.to_path_buf());
            error!("{}", err);
            return Err(err);
        }
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let args = self.pip_args(["-r".to_string(), absolute.display().to_string()]);
        self.exec_command(&self.python, &args)?;
        info!("Packages from {} installed successfully.", absolute.display());
        Ok(())
    }

    /// Whether `python -c "import <module>"` succeeds.
    pub fn is_importable(&self, module: &str) -> bool {
        let args = vec!["-c".to_string(), format!("import {module}")];
        self.runner
            .run(&self.python, &args)
            .map(|out| out.success)
            .unwrap_or(false)
    }

    fn summarize(&self, mut summary: InstallSummary) -> InstallSummary {
        for entry in &summary.failed {
            let module = entry.split("==").next().unwrap_or(entry).trim();
            if !module.is_empty() && self.is_importable(module) {
                summary.already_present.push(entry.clone());
            }
        }

        info!("Installation summary:");
        info!("Total packages installed: {}", summary.installed.len());
        for entry in &summary.installed {
            info!("  {}", entry);
        }
        if !summary.failed.is_empty() {
            error!("Failed to install the following packages:");
            for entry in &summary.failed {
                if summary.already_present.contains(entry) {
                    info!("  {} but it is already present in the Python environment.", entry);
                } else {
                    error!("  {}", entry);
                }
            }
        }
        summary
    }

    /// Install each line of a requirements file separately, so one bad entry
    /// does not block the rest.
    pub fn install_requirements_one_at_a_time(&self, path: &Path) -> Result<InstallSummary, InstallError> {
        let packages = read_requirement_lines(path).inspect_err(|err| error!("{}", err))?;
        let mut summary = InstallSummary::default();
        for package in packages {
            if self.pip_install(&package, &[], false) {
                info!("Successfully installed package: {}", package);
                summary.installed.push(package);
            } else {
                error!("Failed to install package: {}", package);
                summary.failed.push(package);
            }
        }
        Ok(self.summarize(summary))
    }

    /// Clone a repository and pip-install the checkout.
    ///
    /// In dev mode the install is editable and the checkout stays; otherwise
    /// the checkout is removed after installing, but only when the clone
    /// created it. A directory that was already there is never deleted.
    pub fn clone_and_install(&self, source: &RepoSource, options: &CloneOptions) -> Result<(), InstallError> {
        info!("Attempt to clone package: {}", source.url);
        let name = source.package_name();
        let checkout = options
            .destination
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(&name);

        let mut args = vec!["clone".to_string(), source.url.clone()];
        if let Some(branch) = &source.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        if options.destination.is_some() {
            args.push(checkout.display().to_string());
        }
        let existed = checkout.exists();
        self.exec_command("git", &args)?;
        let created = !existed && checkout.exists();

        let target = checkout.display().to_string();
        let installed = self.pip_install(&target, &[], options.dev_mode);
        if !installed {
            warn!("{} was cloned but could not be installed", name);
        }

        // Only a checkout this call produced is ours to remove.
        if !options.dev_mode {
            if created {
                match std::fs::remove_dir_all(&checkout) {
                    Ok(()) => info!("Removed folder: {}", checkout.display()),
                    Err(err) => warn!("Could not remove {}: {}", checkout.display(), err),
                }
            } else if existed {
                info!("Left pre-existing folder in place: {}", checkout.display());
            }
        }

        if installed {
            Ok(())
        } else {
            Err(InstallError::Failed {
                command: format!("{} -m pip install {}", self.python, target),
                code: None,
                stderr: "installation failed".to_string(),
            })
        }
    }

    /// Clone-and-install every repository listed in a requirements file.
    pub fn install_network_one_at_a_time(
        &self,
        path: &Path,
        options: &CloneOptions,
    ) -> Result<InstallSummary, InstallError> {
        let entries = read_requirement_lines(path).inspect_err(|err| error!("{}", err))?;
        let mut summary = InstallSummary::default();
        for entry in entries {
            match self.clone_and_install(&RepoSource::parse(&entry), options) {
                Ok(()) => {
                    info!("Successfully installed package: {}", entry);
                    summary.installed.push(entry);
                }
                Err(err) => {
                    error!("Failed to install package: {} ({})", entry, err);
                    summary.failed.push(entry);
                }
            }
        }
        Ok(self.summarize(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn installer(runner: &RecordingRunner) -> Installer<'_> {
        Installer::new(runner, "py")
    }

    #[test]
    fn pip_install_plain_package() {
        let runner = RecordingRunner::new();
        assert!(installer(&runner).pip_install("example-package", &[], false));
        assert_eq!(
            runner.command_lines(),
            vec!["py -m pip install example-package"]
        );
    }

    #[test]
    fn pip_install_editable_from_any_spelling() {
        let runner = RecordingRunner::new();
        let inst = installer(&runner);
        assert!(inst.pip_install("./pkg", &["-e".to_string(), "--no-deps".to_string()], false));
        assert!(inst.pip_install("-e ./pkg", &[], false));
        assert!(inst.pip_install("./pkg", &[], true));
        assert_eq!(
            runner.command_lines(),
            vec![
                "py -m pip install -e ./pkg --no-deps",
                "py -m pip install -e ./pkg",
                "py -m pip install -e ./pkg",
            ]
        );
    }

    #[test]
    fn pip_install_failure_returns_false() {
        let runner = RecordingRunner::new().fail_when("broken", "No matching distribution");
        assert!(!installer(&runner).pip_install("broken", &[], false));
    }

    #[test]
    fn install_requirements_uses_absolute_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "numpy\n").expect("write");
        let runner = RecordingRunner::new();

        installer(&runner)
            .install_requirements(&path)
            .expect("install");
        let lines = runner.command_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("py -m pip install -r /"));
        assert!(lines[0].ends_with("requirements.txt"));
    }

    #[test]
    fn install_requirements_reports_missing_file_and_pip_failure() {
        let dir = TempDir::new().expect("temp dir");
        let runner = RecordingRunner::new().fail_when("-r", "boom");
        let inst = installer(&runner);

        let missing = inst.install_requirements(&dir.path().join("nope.txt"));
        assert!(matches!(missing, Err(InstallError::ManifestNotFound(_))));
        assert!(runner.command_lines().is_empty());

        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "numpy\n").expect("write");
        let failed = inst.install_requirements(&path);
        assert!(matches!(failed, Err(InstallError::Failed { code: Some(1), .. })));
    }

    #[test]
    fn one_at_a_time_summarizes_and_checks_imports() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "numpy==1.26\n\nbadpkg==0.1\nyaml_thing\n").expect("write");
        // `badpkg` fails to install but imports; `yaml_thing` fails both ways.
        let runner = RecordingRunner::new()
            .fail_when("install badpkg", "nope")
            .fail_when("install yaml_thing", "nope")
            .fail_when("import yaml_thing", "ModuleNotFoundError");

        let summary = installer(&runner)
            .install_requirements_one_at_a_time(&path)
            .expect("summary");
        assert_eq!(summary.installed, vec!["numpy==1.26"]);
        assert_eq!(summary.failed, vec!["badpkg==0.1", "yaml_thing"]);
        assert_eq!(summary.already_present, vec!["badpkg==0.1"]);
        assert!(!summary.is_success());
        assert!(runner
            .command_lines()
            .contains(&"py -c import badpkg".to_string()));
    }

    #[test]
    fn repo_source_parsing() {
        let plain = RepoSource::parse("https://example.com/org/tool.git");
        assert_eq!(plain.branch, None);
        assert_eq!(plain.package_name(), "tool");

        let pinned = RepoSource::parse("https://example.com/org/tool.git@dev");
        assert_eq!(pinned.url, "https://example.com/org/tool.git");
        assert_eq!(pinned.branch.as_deref(), Some("dev"));

        let ssh = RepoSource::parse("git@github.com:org/repo.git");
        assert_eq!(ssh.url, "git@github.com:org/repo.git");
        assert_eq!(ssh.branch, None);
        assert_eq!(ssh.package_name(), "repo");

        let share = RepoSource::parse(r"\\server\git\Toolbox\toolkit");
        assert_eq!(share.package_name(), "toolkit");
    }

    /// Records like [`RecordingRunner`] and materializes the checkout a real
    /// `git clone` would leave behind.
    struct CloningRunner {
        inner: RecordingRunner,
    }

    impl CommandRunner for CloningRunner {
        fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
            if program == "git"
                && args.first().map(String::as_str) == Some("clone")
                && let Some(dest) = args.last()
            {
                std::fs::create_dir_all(Path::new(dest).join(".git"))?;
            }
            self.inner.run(program, args)
        }
    }

    #[test]
    fn clone_and_install_removes_checkout_unless_dev() {
        let dir = TempDir::new().expect("temp dir");
        let checkout = dir.path().join("tool");
        let runner = CloningRunner {
            inner: RecordingRunner::new(),
        };
        let inst = Installer::new(&runner, "py");
        let source = RepoSource::parse("https://example.com/org/tool.git@main");
        let options = CloneOptions {
            dev_mode: false,
            destination: Some(dir.path().to_path_buf()),
        };

        inst.clone_and_install(&source, &options).expect("clone");
        let lines = runner.inner.command_lines();
        assert_eq!(
            lines[0],
            format!(
                "git clone https://example.com/org/tool.git --branch main {}",
                checkout.display()
            )
        );
        assert_eq!(lines[1], format!("py -m pip install {}", checkout.display()));
        assert!(!checkout.exists(), "fresh checkout should be removed");

        let dev = CloneOptions {
            dev_mode: true,
            ..options
        };
        inst.clone_and_install(&source, &dev).expect("dev clone");
        assert!(runner
            .inner
            .command_lines()
            .contains(&format!("py -m pip install -e {}", checkout.display())));
        assert!(checkout.exists(), "dev checkout stays");
    }

    #[test]
    fn existing_checkout_survives_recorded_clone() {
        let dir = TempDir::new().expect("temp dir");
        let checkout = dir.path().join("tool");
        std::fs::create_dir_all(&checkout).expect("existing dir");
        std::fs::write(checkout.join("precious.txt"), "keep me").expect("write");
        let runner = RecordingRunner::new();
        let source = RepoSource::parse("https://example.com/org/tool.git");
        let options = CloneOptions {
            dev_mode: false,
            destination: Some(dir.path().to_path_buf()),
        };

        installer(&runner)
            .clone_and_install(&source, &options)
            .expect("recorded clone");
        assert_eq!(runner.command_lines().len(), 2);
        assert_eq!(
            std::fs::read_to_string(checkout.join("precious.txt")).expect("still there"),
            "keep me"
        );
    }

    #[test]
    fn failed_clone_skips_install() {
        let runner = RecordingRunner::new().fail_when("git clone", "fatal: repository not found");
        let err = installer(&runner)
            .clone_and_install(&RepoSource::parse("https://example.com/x.git"), &CloneOptions::default())
            .expect_err("clone must fail");
        assert!(err.to_string().contains("repository not found"));
        assert_eq!(runner.command_lines().len(), 1);
    }

    #[test]
    fn network_install_counts_failures() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("repos.txt");
        std::fs::write(&path, "https://example.com/a.git\nhttps://example.com/b.git\n").expect("write");
        let runner = RecordingRunner::new()
            .fail_when("b.git", "fatal")
            .fail_when("import https", "SyntaxError");
        let summary = installer(&runner)
            .install_network_one_at_a_time(
                &path,
                &CloneOptions {
                    dev_mode: true,
                    destination: Some(dir.path().to_path_buf()),
                },
            )
            .expect("summary");
        assert_eq!(summary.installed, vec!["https://example.com/a.git"]);
        assert_eq!(summary.failed, vec!["https://example.com/b.git"]);
    }
}

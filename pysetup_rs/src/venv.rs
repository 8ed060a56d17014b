//! Virtual environment bootstrap.

use std::path::Path;

use tracing::{error, info, warn};

use crate::install::CommandRunner;
use crate::progress;
use crate::prompt::Prompt;

pub const PYTHON_DOWNLOAD_URL: &str = "https://www.python.org/downloads/";

/// What [`setup_virtual_env`] ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenvSetup {
    AlreadyExists,
    Created { python: String },
    /// No interpreter was chosen, or none was found.
    Skipped,
    Failed { python: String, reason: String },
}

/// Interpreters on `PATH`, as reported by `which -a` (`where` on Windows).
pub fn list_pythons(runner: &dyn CommandRunner) -> Vec<String> {
    let (program, args): (&str, Vec<String>) = if cfg!(windows) {
        ("where", vec!["python".to_string()])
    } else {
        (
            "which",
            vec!["-a".to_string(), "python".to_string(), "python3".to_string()],
        )
    };
    info!("Executing command: {} {}", program, args.join(" "));
    match runner.run(program, &args) {
        // `which -a` exits non-zero when one of the names is missing but still
        // prints the ones it found.
        Ok(output) => {
            let found: Vec<String> = output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if found.is_empty() && !output.success {
                error!("Error executing command: {}", output.stderr.trim());
            }
            found
        }
        Err(err) => {
            error!("Unexpected error: {}", err);
            Vec::new()
        }
    }
}

pub fn venv_exists(path: &Path) -> bool {
    let exists = path.exists();
    info!(
        "Checking if virtual environment exists at {}: {}",
        path.display(),
        if exists { "Found" } else { "Not found" }
    );
    exists
}

/// `<python> -m venv <path>`, creating the directory first.
pub fn create_virtual_env(
    runner: &dyn CommandRunner,
    python: &str,
    path: &Path,
) -> Result<(), String> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|err| err.to_string())?;
        info!("Created directory for virtual environment: {}", path.display());
    }
    let args = vec![
        "-m".to_string(),
        "venv".to_string(),
        path.display().to_string(),
    ];
    match runner.run(python, &args) {
        Ok(output) if output.success => {
            info!("Virtual environment created successfully in {}", path.display());
            Ok(())
        }
        Ok(output) => {
            error!("Failed to create virtual environment: {}", output.stderr.trim());
            Err(output.stderr.trim().to_string())
        }
        Err(err) => {
            error!("An error occurred while creating virtual environment: {}", err);
            Err(err.to_string())
        }
    }
}

/// Shell command that activates the environment on this platform.
pub fn activation_command(path: &Path) -> String {
    if cfg!(windows) {
        format!("{}\\Scripts\\activate.bat", path.display())
    } else {
        format!("source {}/bin/activate", path.display())
    }
}

/// Create a virtual environment at `path` unless one is already there,
/// letting the user pick the interpreter.
pub fn setup_virtual_env(
    path: &Path,
    runner: &dyn CommandRunner,
    prompt: &mut dyn Prompt,
) -> VenvSetup {
    info!("Starting setup of Python virtual environment.");
    if venv_exists(path) {
        progress::info(&format!(
            "Virtual environment already exists at '{}'.",
            path.display()
        ));
        return VenvSetup::AlreadyExists;
    }

    let pythons = list_pythons(runner);
    if pythons.is_empty() {
        warn!("No Python installations found.");
        progress::warning("No Python installations found.");
        if prompt.confirm("Would you like to install Python now?") {
            progress::info(&format!(
                "Please visit '{PYTHON_DOWNLOAD_URL}' to download and install Python."
            ));
            info!("Directed user to download Python.");
        } else {
            progress::info("Python installation is required to proceed.");
            info!("User opted not to install Python.");
        }
        return VenvSetup::Skipped;
    }

    progress::info("Found Python installations:");
    let Some(idx) = prompt.choose(
        "Choose which one you want to use by entering the number, or enter \"n\" for no installation:",
        &pythons,
    ) else {
        progress::info("No installation selected.");
        info!("User selected no installation.");
        return VenvSetup::Skipped;
    };
    let python = pythons[idx].clone();
    info!("User selected Python installation: {}", python);

    let spinner = progress::Spinner::new(&format!(
        "Creating virtual environment using {} at '{}'...",
        python,
        path.display()
    ));
    match create_virtual_env(runner, &python, path) {
        Ok(()) => {
            spinner.finish_success("Virtual environment created successfully.");
            progress::info(&format!(
                "To activate the virtual environment, run: {}",
                activation_command(path)
            ));
            info!(
                "Virtual environment setup completed successfully using {}.",
                python
            );
            VenvSetup::Created { python }
        }
        Err(reason) => {
            spinner.finish_error(&format!("Failed to create virtual environment: {reason}"));
            VenvSetup::Failed { python, reason }
        }
    }
}

//! `requirements.txt` maintenance.
//!
//! The manifest is only ever appended to. Problems reading or writing it are
//! reported through [`ManifestUpdate::Failed`], never raised.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::prompt::Prompt;

/// How an existing manifest line is compared with a package name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The whole trimmed line must equal the name (`numpy==1.0` does not cover `numpy`).
    #[default]
    Exact,
    /// Compare the requirement's project name, ignoring version specifiers,
    /// extras, markers and `-`/`_`/`.` spelling differences.
    Name,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestErrorKind {
    NotFound,
    PermissionDenied,
    Io,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found at {0}")]
    NotFound(String),
    #[error("cannot access manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == io::ErrorKind::NotFound {
            ManifestError::NotFound(path)
        } else {
            ManifestError::Io { path, source }
        }
    }

    pub fn kind(&self) -> ManifestErrorKind {
        match self {
            ManifestError::NotFound(_) => ManifestErrorKind::NotFound,
            ManifestError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                ManifestErrorKind::PermissionDenied
            }
            ManifestError::Io { .. } => ManifestErrorKind::Io,
        }
    }
}

/// What [`update_manifest`] did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ManifestUpdate {
    /// Every name was already listed.
    UpToDate,
    /// Names were missing but the user said no; the file is untouched.
    Declined { missing: Vec<String> },
    Appended { added: Vec<String> },
    Failed {
        kind: ManifestErrorKind,
        message: String,
    },
}

/// Project name of a requirement line, normalized for comparison.
///
/// `Foo_Bar[extra]>=1.0 ; python_version<"3.8"` becomes `foo-bar`.
pub fn requirement_name(line: &str) -> String {
    let end = line
        .find(|c: char| c.is_whitespace() || "=<>!~;[@".contains(c))
        .unwrap_or(line.len());
    normalize_name(&line[..end])
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}

/// Trimmed, non-empty, non-comment lines of the manifest.
pub fn read_manifest(path: &Path) -> Result<Vec<String>, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|e| ManifestError::from_io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Names not yet covered by `existing`, in input order, without duplicates.
pub fn missing_packages(names: &[String], existing: &[String], mode: MatchMode) -> Vec<String> {
    let covered = |name: &str| match mode {
        MatchMode::Exact => existing.iter().any(|line| line == name),
        MatchMode::Name => {
            let wanted = normalize_name(name);
            existing
                .iter()
                .filter(|line| !line.starts_with('#'))
                .any(|line| requirement_name(line) == wanted)
        }
    };
    let mut missing: Vec<String> = Vec::new();
    for name in names {
        if !covered(name) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    missing
}

/// Append `names` as bare lines, adding a newline first when the file lacks one.
pub fn append_packages(path: &Path, names: &[String]) -> Result<(), ManifestError> {
    let needs_newline = std::fs::read(path)
        .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
        .map_err(|e| ManifestError::from_io(path, e))?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| ManifestError::from_io(path, e))?;
    let mut buf = String::new();
    if needs_newline {
        buf.push('\n');
    }
    for name in names {
        buf.push_str(name);
        buf.push('\n');
    }
    file.write_all(buf.as_bytes())
        .map_err(|e| ManifestError::from_io(path, e))
}

fn failed(err: ManifestError) -> ManifestUpdate {
    error!("{}", err);
    ManifestUpdate::Failed {
        kind: err.kind(),
        message: err.to_string(),
    }
}

/// Offer to add every name missing from the manifest at `path`.
pub fn update_manifest(
    names: &[String],
    path: &Path,
    mode: MatchMode,
    prompt: &mut dyn Prompt,
) -> ManifestUpdate {
    let existing = match read_manifest(path) {
        Ok(lines) => lines,
        Err(err) => return failed(err),
    };

    let missing = missing_packages(names, &existing, mode);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    if missing.is_empty() {
        info!("No packages listed are missing in {}", file_name);
        return ManifestUpdate::UpToDate;
    }

    info!(
        "The following packages are not listed in {}: {}",
        file_name,
        missing.join(", ")
    );
    if !prompt.confirm_strict(&format!("Do you want to add them to {file_name}?")) {
        info!("{} left unchanged", file_name);
        return ManifestUpdate::Declined { missing };
    }

    match append_packages(path, &missing) {
        Ok(()) => {
            info!("Added {} package(s) to {}", missing.len(), file_name);
            ManifestUpdate::Appended { added: missing }
        }
        Err(err) => failed(err),
    }
}

//! Locate, extract and reduce: a project directory in, a [`ScanReport`] out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::PysetupConfig;
use crate::fs_utils::find_files;
use crate::packages::{default_exclusions, filter_excluded, unique_root_packages};
use crate::python::{ImportParser, PythonImportParser, analyze_files_with};
use crate::types::{DEFAULT_EXCLUDED_FOLDER, DEFAULT_PATTERN, ScanEntry, ScanReport};

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub patterns: Vec<String>,
    pub excluded_folders: Vec<String>,
    /// Drop standard-library names and `extra_exclusions` from the result.
    pub exclude_defaults: bool,
    pub extra_exclusions: Vec<String>,
    /// Log every file's import records.
    pub verbose: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            patterns: vec![DEFAULT_PATTERN.to_string()],
            excluded_folders: vec![DEFAULT_EXCLUDED_FOLDER.to_string()],
            exclude_defaults: true,
            extra_exclusions: Vec::new(),
            verbose: false,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &PysetupConfig) -> Self {
        Self {
            patterns: config.patterns.clone(),
            excluded_folders: config.excluded_folders.clone(),
            extra_exclusions: config.exclude_packages.clone(),
            ..Self::default()
        }
    }
}

pub fn scan_project(root: &Path, options: &ScanOptions) -> Result<ScanReport> {
    scan_project_with(&PythonImportParser, root, options)
}

pub fn scan_project_with(
    parser: &dyn ImportParser,
    root: &Path,
    options: &ScanOptions,
) -> Result<ScanReport> {
    let files: Vec<PathBuf> = find_files(root, &options.patterns, &options.excluded_folders)
        .with_context(|| format!("failed to locate source files under {}", root.display()))?;
    info!("Found {} file(s) under {}", files.len(), root.display());

    let results = analyze_files_with(parser, &files);
    if options.verbose {
        for (path, entry) in &results {
            match entry {
                ScanEntry::Imports(records) => {
                    info!("File: {}, Imports: {:?}", path.display(), records)
                }
                ScanEntry::Error(msg) => info!("File: {}, {}", path.display(), msg),
            }
        }
    }

    let unique = unique_root_packages(&results);
    let (packages, excluded) = if options.exclude_defaults {
        let exclusions: HashSet<String> = default_exclusions(&options.extra_exclusions);
        let filtered = filter_excluded(&unique, &exclusions);
        info!("Excluded packages: {:?}", filtered.excluded);
        (filtered.kept, filtered.excluded)
    } else {
        (unique, Vec::new())
    };

    Ok(ScanReport {
        files: results,
        packages,
        excluded,
    })
}

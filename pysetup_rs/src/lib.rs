//! # pysetup
//!
//! **Python project setup helper.** Finds the third-party packages a Python
//! project imports, checks them against PyPI, keeps `requirements.txt` in
//! sync, installs packages and bootstraps virtual environments.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use pysetup::pipeline::{ScanOptions, scan_project};
//! use std::path::Path;
//!
//! let report = scan_project(Path::new("."), &ScanOptions::default()).unwrap();
//! for name in &report.packages {
//!     println!("{name}");
//! }
//! for (path, error) in report.error_files() {
//!     eprintln!("{}: {}", path.display(), error);
//! }
//! ```
//!
//! ## Classifying Against the Index
//!
//! ```rust,no_run
//! use pysetup::registry::{PypiRegistry, RegistryOptions, classify_packages};
//! use std::path::Path;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let options = RegistryOptions::default();
//! let registry = PypiRegistry::new(&options)?;
//! let names = vec!["numpy".to_string(), "helpers".to_string()];
//! let classified = classify_packages(&names, Path::new("."), &registry, 10).await;
//! println!("published: {:?}", classified.published);
//! # Ok(())
//! # }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! pysetup scan .                                   # List imported packages
//! pysetup scan . --manifest requirements.txt       # Offer to add published ones
//! pysetup install-requirements --one-at-a-time     # Install line by line
//! pysetup venv                                     # Create ./venv
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// File discovery by glob pattern with substring exclusion.
pub mod fs_utils;

/// Python import extraction.
///
/// # Key Items
///
/// - [`ImportParser`](python::ImportParser) - parser capability used by the scanner
/// - [`PythonImportParser`](python::PythonImportParser) - the built-in tokenizer-backed parser
/// - [`analyze_files`](python::analyze_files) - batch extraction into [`ScanResults`]
pub mod python;

/// Root-package reduction and exclusion filtering.
pub mod packages;

/// Local / published / undetermined classification against a package index.
pub mod registry;

/// `requirements.txt` comparison and append-only updates.
pub mod manifest;

/// Scan orchestration: locate, extract, reduce, filter.
pub mod pipeline;

/// pip and git installation helpers.
pub mod install;

/// Virtual environment bootstrap.
pub mod venv;

/// Yes/no and numbered-menu questions.
pub mod prompt;

/// Optional `.pysetup/config.toml`.
pub mod config;

/// Common types used throughout the crate.
pub mod types;

// ============================================================================
// CLI support
// ============================================================================

pub mod cli;
pub mod logging;
pub mod progress;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::PysetupConfig;
pub use manifest::{ManifestUpdate, MatchMode, update_manifest};
pub use pipeline::{ScanOptions, scan_project};
pub use registry::{LookupObserver, PackageRegistry, PypiRegistry, classify_packages};
pub use types::{Classification, Classified, ImportRecord, ScanEntry, ScanReport, ScanResults};

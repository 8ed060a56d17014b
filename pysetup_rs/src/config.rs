//! Configuration file support.
//!
//! Loads optional `.pysetup/config.toml` from the project root. Every key is
//! optional; command-line flags win over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::install::DEFAULT_PYTHON;
use crate::manifest::MatchMode;
use crate::registry::RegistryOptions;
use crate::types::{
    DEFAULT_EXCLUDED_FOLDER, DEFAULT_INDEX_URL, DEFAULT_PATTERN, DEFAULT_REGISTRY_TIMEOUT_SECS,
    DEFAULT_REGISTRY_WORKERS,
};

pub const CONFIG_DIR: &str = ".pysetup";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PysetupConfig {
    /// Glob patterns for source files, matched against file names.
    pub patterns: Vec<String>,
    /// Path substrings that exclude a file from the scan.
    pub excluded_folders: Vec<String>,
    /// Extra package names to drop on top of the standard library.
    pub exclude_packages: Vec<String>,
    /// Directory whose top-level `.py` files count as local modules.
    pub reference_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub match_mode: MatchMode,
    pub registry: RegistryConfig,
    pub install: InstallConfig,
}

impl Default for PysetupConfig {
    fn default() -> Self {
        Self {
            patterns: vec![DEFAULT_PATTERN.to_string()],
            excluded_folders: vec![DEFAULT_EXCLUDED_FOLDER.to_string()],
            exclude_packages: Vec::new(),
            reference_dir: None,
            manifest: None,
            match_mode: MatchMode::default(),
            registry: RegistryConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub index_url: String,
    pub timeout_secs: u64,
    /// Lookups in flight at once.
    pub workers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            timeout_secs: DEFAULT_REGISTRY_TIMEOUT_SECS,
            workers: DEFAULT_REGISTRY_WORKERS,
        }
    }
}

impl RegistryConfig {
    pub fn options(&self) -> RegistryOptions {
        RegistryOptions {
            index_url: self.index_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }

    /// Lookups in flight at once; zero is treated as one.
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Interpreter used for `-m pip` and `-m venv`.
    pub python: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl PysetupConfig {
    /// Load config from `.pysetup/config.toml` in the given root directory.
    /// Returns the default config if the file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

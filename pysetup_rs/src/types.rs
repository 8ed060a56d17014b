use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PATTERN: &str = "*.py";
pub const DEFAULT_EXCLUDED_FOLDER: &str = "venv";
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";
pub const DEFAULT_REGISTRY_WORKERS: usize = 10;
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 5;

/// Prefix every per-file error marker starts with.
pub const SCAN_ERROR_PREFIX: &str = "Error analyzing file: ";

/// One import found in a source file: `module` for a plain import,
/// `module.symbol` for a from-import. Relative from-imports keep their
/// leading dots (`.x`, `..pkg.y`).
pub type ImportRecord = String;

/// Per-file outcome of the import extractor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ScanEntry {
    Imports(Vec<ImportRecord>),
    /// Error marker for a file that could not be read or parsed.
    Error(String),
}

impl ScanEntry {
    pub fn error(detail: impl std::fmt::Display) -> Self {
        ScanEntry::Error(format!("{SCAN_ERROR_PREFIX}{detail}"))
    }

    pub fn imports(&self) -> &[ImportRecord] {
        match self {
            ScanEntry::Imports(records) => records,
            ScanEntry::Error(_) => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScanEntry::Error(_))
    }
}

/// Extractor output keyed by full path, so files sharing a basename never collide.
pub type ScanResults = BTreeMap<PathBuf, ScanEntry>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Local,
    Published,
    Undetermined,
}

/// Classifier output. Each list is sorted and the three are pairwise disjoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classified {
    pub published: Vec<String>,
    pub local: Vec<String>,
    pub undetermined: Vec<String>,
}

impl Classified {
    pub fn classification_of(&self, name: &str) -> Option<Classification> {
        let has = |list: &[String]| list.iter().any(|n| n == name);
        if has(&self.published) {
            Some(Classification::Published)
        } else if has(&self.local) {
            Some(Classification::Local)
        } else if has(&self.undetermined) {
            Some(Classification::Undetermined)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.published.len() + self.local.len() + self.undetermined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of reducing a scan to root packages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub files: ScanResults,
    /// Sorted, deduplicated root packages left after exclusion filtering.
    pub packages: Vec<String>,
    /// Names the exclusion filter actually removed.
    pub excluded: Vec<String>,
}

impl ScanReport {
    pub fn error_files(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.files.iter().filter_map(|(path, entry)| match entry {
            ScanEntry::Error(msg) => Some((path, msg.as_str())),
            ScanEntry::Imports(_) => None,
        })
    }
}

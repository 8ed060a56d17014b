//! Reduce per-file import records to root package names.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::python::python_stdlib_set;
use crate::types::ScanResults;

/// Text before the first `.`, or the whole record.
///
/// Relative records (`.x`, `..pkg.y`) have an empty root.
pub fn root_package(record: &str) -> &str {
    record.split('.').next().unwrap_or(record)
}

/// Sorted, deduplicated root packages across every file.
///
/// Error markers and relative imports contribute nothing. Ordering is by
/// bytes, not locale.
pub fn unique_root_packages(results: &ScanResults) -> Vec<String> {
    results
        .values()
        .flat_map(|entry| entry.imports())
        .map(|record| root_package(record))
        .filter(|root| !root.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Outcome of exclusion filtering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub kept: Vec<String>,
    /// Names that were present and got removed, sorted.
    pub excluded: Vec<String>,
}

/// Drop every package that exactly matches an exclusion.
pub fn filter_excluded(packages: &[String], exclusions: &HashSet<String>) -> Exclusion {
    let (excluded, kept): (Vec<String>, Vec<String>) = packages
        .iter()
        .cloned()
        .partition(|pkg| exclusions.contains(pkg));
    let mut excluded = excluded;
    excluded.sort();
    excluded.dedup();
    Exclusion { kept, excluded }
}

/// Standard library names plus caller-supplied extras.
pub fn default_exclusions(extra: &[String]) -> HashSet<String> {
    python_stdlib_set()
        .iter()
        .cloned()
        .chain(extra.iter().cloned())
        .collect()
}

//! Python import extraction.
//!
//! Source text goes through a tokenizer ([`lexer`]) and an import-statement
//! parser ([`imports`]). The pair sits behind the [`ImportParser`] trait so
//! the batch scanner does not care how a file is parsed.

mod imports;
mod lexer;
mod stdlib;

pub use stdlib::python_stdlib_set;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{ImportRecord, ScanEntry, ScanResults};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid syntax (line {line}): {message}")]
    Syntax { line: usize, message: String },
}

impl ParseError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. } => *line,
        }
    }
}

/// Given source text, produce its import declarations in order.
pub trait ImportParser {
    fn parse_imports(&self, source: &str) -> Result<Vec<ImportRecord>, ParseError>;
}

/// Tokenizer-backed parser for Python source.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonImportParser;

impl ImportParser for PythonImportParser {
    fn parse_imports(&self, source: &str) -> Result<Vec<ImportRecord>, ParseError> {
        let tokens = lexer::tokenize(source)?;
        imports::collect_imports(&tokens)
    }
}

/// Imports declared in `source`, e.g. `["os", "collections.defaultdict"]`.
pub fn extract_imports(source: &str) -> Result<Vec<ImportRecord>, ParseError> {
    PythonImportParser.parse_imports(source)
}

/// Read and parse one file. Failures become an error marker instead of an `Err`.
pub fn analyze_file_with(parser: &dyn ImportParser, path: &Path) -> ScanEntry {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!("cannot read {}: {}", path.display(), err);
            return ScanEntry::error(format!("{}: {}", path.display(), err));
        }
    };
    match parser.parse_imports(&source) {
        Ok(records) => {
            debug!("{}: {} import(s)", path.display(), records.len());
            ScanEntry::Imports(records)
        }
        Err(err) => {
            warn!("cannot parse {}: {}", path.display(), err);
            ScanEntry::error(err)
        }
    }
}

pub fn analyze_file(path: &Path) -> ScanEntry {
    analyze_file_with(&PythonImportParser, path)
}

/// Scan every path; one bad file never stops the batch.
pub fn analyze_files_with(parser: &dyn ImportParser, paths: &[PathBuf]) -> ScanResults {
    paths
        .iter()
        .map(|path| (path.clone(), analyze_file_with(parser, path)))
        .collect()
}

pub fn analyze_files(paths: &[PathBuf]) -> ScanResults {
    analyze_files_with(&PythonImportParser, paths)
}

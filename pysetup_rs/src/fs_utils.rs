use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::warn;
use walkdir::WalkDir;

/// Compile shell-style filename patterns (`*`, `?`, `[...]`).
pub fn compile_patterns(patterns: &[String]) -> io::Result<Vec<GlobMatcher>> {
    patterns
        .iter()
        .map(|pattern| {
            Glob::new(pattern)
                .map(|glob| glob.compile_matcher())
                .map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("invalid pattern {pattern:?}: {err}"),
                    )
                })
        })
        .collect()
}

/// True when the path string contains any of the excluded substrings.
///
/// This is a plain substring test: `build` also excludes `src/builder/x.py`.
pub fn is_excluded(path: &Path, excluded: &[String]) -> bool {
    let text = path.to_string_lossy();
    excluded.iter().any(|needle| text.contains(needle.as_str()))
}

fn walk_matching(root: &Path, matcher: &GlobMatcher, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other(format!("cannot walk {}", root.display()))));
            }
            Err(err) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        // Symlinked files count; symlinked directories are not descended into.
        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

/// Recursively collect files under `root` whose file name matches any pattern,
/// dropping paths that contain an excluded substring.
///
/// Patterns are walked one after another, so a file matched by two patterns is
/// listed twice. An unreadable root is an error; unreadable entries below it
/// are skipped with a warning.
pub fn find_files(root: &Path, patterns: &[String], excluded: &[String]) -> io::Result<Vec<PathBuf>> {
    let matchers = compile_patterns(patterns)?;
    let mut files = Vec::new();
    for matcher in &matchers {
        walk_matching(root, matcher, &mut files)?;
    }
    files.retain(|path| !is_excluded(path, excluded));
    Ok(files)
}

/// Python module stems (file name minus `.py`) directly inside `dir`.
pub fn local_module_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("py") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

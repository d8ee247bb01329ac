//! Env file handling: deciding whether a file is loaded, parsing it and
//! applying its assignments to the process environment.
//!
//! Assignments are applied insert-if-absent: a key that is already set, by
//! the ambient environment or by an earlier file, keeps its value. Each pair is
//! applied before the next line is parsed, so `${KEY}` references resolve
//! against keys set by earlier files and earlier lines only.

use crate::error::LoadError;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

/// What happened to one env file during a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The file did not exist and missing files are skipped
    Skipped,
    /// The file was parsed; counts of keys set and keys left untouched
    Applied { set: usize, kept: usize },
}

/// Check that `path` exists, honoring the skip-missing policy
///
/// Returns `Ok(false)` when the file is missing and may be skipped. Only
/// "not found" is skippable; every other I/O error is surfaced.
pub fn resolve(path: &Path, skip_missing_files: bool) -> Result<bool, LoadError> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if skip_missing_files {
                debug!(source = %path.display(), "env file not found, skipping");
                Ok(false)
            } else {
                Err(LoadError::SourceNotFound {
                    path: path.to_path_buf(),
                })
            }
        }
        Err(source) => Err(LoadError::SourceAccess {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse `content` and apply each assignment to the process environment
///
/// `path` is only used for error reporting.
pub fn apply_str(path: &Path, content: &str) -> Result<SourceOutcome, LoadError> {
    let mut cursor = LineCursor::new(content);
    let mut set = 0;
    let mut kept = 0;

    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item.map_err(|e| parse_error(path, &cursor, e))?;
        let line = cursor.advance_past(&key);

        if value.contains('\0') {
            return Err(LoadError::Parse {
                path: path.to_path_buf(),
                line,
                message: format!("value of {key} contains a NUL byte"),
            });
        }

        if env::var_os(&key).is_some() {
            trace!(source = %path.display(), key = %key, "already set, keeping existing value");
            kept += 1;
            continue;
        }

        // SAFETY: configuration is loaded before worker threads start; callers
        // must not load concurrently with other environment readers or writers.
        unsafe { env::set_var(&key, &value) };
        trace!(source = %path.display(), key = %key, "set from env file");
        set += 1;
    }

    Ok(SourceOutcome::Applied { set, kept })
}

/// Resolve, read, parse and apply one env file
pub fn apply_file(path: &Path, skip_missing_files: bool) -> Result<SourceOutcome, LoadError> {
    if !resolve(path, skip_missing_files)? {
        return Ok(SourceOutcome::Skipped);
    }

    let content = fs::read_to_string(path).map_err(|source| access_error(path, source))?;
    let outcome = apply_str(path, &content)?;

    if let SourceOutcome::Applied { set, kept } = outcome {
        debug!(source = %path.display(), set, kept, "applied env file");
    }
    Ok(outcome)
}

fn access_error(path: &Path, source: io::Error) -> LoadError {
    let path: PathBuf = path.to_path_buf();
    if source.kind() == io::ErrorKind::NotFound {
        LoadError::SourceNotFound { path }
    } else {
        LoadError::SourceAccess { path, source }
    }
}

fn parse_error(path: &Path, cursor: &LineCursor<'_>, error: dotenvy::Error) -> LoadError {
    match error {
        dotenvy::Error::LineParse(fragment, index) => LoadError::Parse {
            path: path.to_path_buf(),
            line: cursor.locate(&fragment),
            message: format!("unexpected character at position {index} in '{fragment}'"),
        },
        dotenvy::Error::Io(source) => access_error(path, source),
        other => LoadError::Parse {
            path: path.to_path_buf(),
            line: None,
            message: other.to_string(),
        },
    }
}

/// Tracks how far parsing has progressed through the physical lines of a
/// file, so errors can be reported with a line number
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl<'a> LineCursor<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().collect(),
            next: 0,
        }
    }

    /// Move past the line assigning `key`, returning its 1-based number
    fn advance_past(&mut self, key: &str) -> Option<usize> {
        let index = (self.next..self.lines.len()).find(|&i| assigns(self.lines[i], key))?;
        self.next = index + 1;
        Some(index + 1)
    }

    /// 1-based number of the unparsed line holding `fragment`
    ///
    /// Blank lines and comments are never candidates. Falls back to the first
    /// unparsed assignment line when no line contains the fragment.
    fn locate(&self, fragment: &str) -> Option<usize> {
        let first = fragment.lines().next().unwrap_or(fragment).trim();
        let candidates: Vec<usize> = (self.next..self.lines.len())
            .filter(|&i| {
                let line = self.lines[i].trim_start();
                !line.is_empty() && !line.starts_with('#')
            })
            .collect();

        candidates
            .iter()
            .copied()
            .find(|&i| !first.is_empty() && self.lines[i].contains(first))
            .or_else(|| candidates.first().copied())
            .map(|i| i + 1)
    }
}

/// Whether `line` is an assignment to `key`, with or without `export`
fn assigns(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

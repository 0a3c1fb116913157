//! Path and identifier validation for anything handed to a subprocess.
//!
//! File paths and function names end up on helper command lines, so they
//! are checked for flag injection, NUL bytes and escapes from the working
//! directory before any process is spawned.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Error types for path and identifier validation.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Leading dash would be read as a flag by the helper
    #[error("invalid file path (starts with dash): {0}")]
    StartsWithDash(String),

    #[error("invalid file path (contains null byte)")]
    NulByte,

    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Resolved path escapes the working directory
    #[error("path escapes project root: {0} (root: {1})")]
    OutsideRoot(String, String),

    #[error("invalid function name (starts with dash): {0}")]
    NameStartsWithDash(String),

    #[error("invalid function name (not a valid identifier): {0}")]
    InvalidIdentifier(String),
}

/// Dotted Python identifiers: `name`, `module.name`, `Class.method`
static PYTHON_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("valid python identifier pattern")
});

/// Same as the Python pattern with `$` allowed
static TYPESCRIPT_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*(\.[a-zA-Z_$][a-zA-Z0-9_$]*)*$")
        .expect("valid typescript identifier pattern")
});

/// Identifier grammar accepted by a helper's `--functions` filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRules {
    Python,
    TypeScript,
}

impl IdentifierRules {
    fn pattern(&self) -> &'static Regex {
        match self {
            IdentifierRules::Python => &PYTHON_IDENTIFIER,
            IdentifierRules::TypeScript => &TYPESCRIPT_IDENTIFIER,
        }
    }
}

/// Canonicalize a path using std::fs::canonicalize.
///
/// Resolves all symlinks, `..` and `.` components. Fails if the path
/// doesn't exist or cannot be accessed.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    std::fs::canonicalize(path).map_err(|_| {
        PathValidationError::CannotCanonicalize(path.to_string_lossy().to_string())
    })
}

/// Remove `.` and resolve `..` without touching the filesystem
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve symlinks as far as the path exists.
///
/// The longest existing ancestor is canonicalized and the missing tail is
/// appended lexically, so files that do not exist yet still get a
/// comparable absolute path.
pub fn resolve_best_effort(path: &Path) -> PathBuf {
    let normalized = lexical_normalize(path);
    if let Ok(real) = std::fs::canonicalize(&normalized) {
        return real;
    }

    let mut tail = Vec::new();
    let mut current = normalized.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(mut real) = std::fs::canonicalize(parent) {
            for name in tail.iter().rev() {
                real.push(name);
            }
            return real;
        }
        current = parent;
    }
    normalized
}

/// Validate that an existing path is within the given root directory.
///
/// Both sides are canonicalized before comparison. Returns the canonical
/// path on success.
pub fn validate_path_within_root(path: &Path, root: &Path) -> Result<PathBuf, PathValidationError> {
    let canonical_path = canonicalize_path(path)?;
    let canonical_root = canonicalize_path(root)?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathValidationError::OutsideRoot(
            canonical_path.to_string_lossy().to_string(),
            canonical_root.to_string_lossy().to_string(),
        ));
    }

    Ok(canonical_path)
}

/// Validate one helper file argument against `work_dir`.
///
/// Relative paths are anchored at `work_dir`. The file does not need to
/// exist, but whatever part of it does exist is resolved through symlinks
/// before the containment check.
pub fn sanitize_file_path(file: &str, work_dir: &Path) -> Result<(), PathValidationError> {
    if file.starts_with('-') {
        return Err(PathValidationError::StartsWithDash(file.to_string()));
    }
    if file.contains('\0') {
        return Err(PathValidationError::NulByte);
    }

    let root = resolve_best_effort(&absolute_from(work_dir, Path::new(".")));
    let resolved = resolve_best_effort(&absolute_from(work_dir, Path::new(file)));

    if !resolved.starts_with(&root) {
        return Err(PathValidationError::OutsideRoot(
            file.to_string(),
            root.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate every file; the first rejection fails the whole list.
///
/// Accepted paths are returned unchanged so helper output keeps the
/// caller's spelling of each file.
pub fn sanitize_file_paths(files: &[String], work_dir: &Path) -> Result<Vec<String>, PathValidationError> {
    files
        .iter()
        .map(|f| sanitize_file_path(f, work_dir).map(|_| f.clone()))
        .collect()
}

/// Validate function names for a helper's `--functions` filter
pub fn sanitize_function_names(
    names: &[String],
    rules: IdentifierRules,
) -> Result<Vec<String>, PathValidationError> {
    let pattern = rules.pattern();
    names
        .iter()
        .map(|name| {
            if name.starts_with('-') {
                Err(PathValidationError::NameStartsWithDash(name.clone()))
            } else if !pattern.is_match(name) {
                Err(PathValidationError::InvalidIdentifier(name.clone()))
            } else {
                Ok(name.clone())
            }
        })
        .collect()
}

fn absolute_from(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    if joined.is_absolute() {
        joined
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&joined))
            .unwrap_or(joined)
    }
}

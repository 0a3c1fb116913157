//! Go package loading: directory walk, parse and program assembly
//!
//! Walks the working directory in file-name order, parses every `.go`
//! file (tests included) and groups them into a `Program`. Problems with
//! individual files are warnings; only the deadline and an unusable root
//! stop loading.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use super::parser::GoParser;
use super::program::{ParsedFile, Program};
use crate::budget::TimeBudget;
use crate::impact::to_slash;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("package loading exceeded the time budget")]
    DeadlineExceeded,

    #[error("cannot walk {path}: {reason}")]
    Root { path: PathBuf, reason: String },

    #[error("failed to initialise Go parser: {0}")]
    Parser(String),
}

/// The loaded program plus the per-package problems met on the way
#[derive(Debug)]
pub struct LoadedProgram {
    pub program: Program,
    pub warnings: Vec<String>,
}

/// Load every Go package under `work_dir`
pub fn load_program(work_dir: &Path, budget: &TimeBudget) -> Result<LoadedProgram, LoadError> {
    if !work_dir.is_dir() {
        return Err(LoadError::Root {
            path: work_dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut parser = GoParser::new().map_err(|e| LoadError::Parser(e.to_string()))?;
    let module_path = read_module_path(work_dir);
    let mut warnings = Vec::new();
    let mut parsed = Vec::new();

    let walker = WalkDir::new(work_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

    for entry in walker {
        if budget.expired() {
            return Err(LoadError::DeadlineExceeded);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_go_source(entry.path()) {
            continue;
        }

        let rel_path = relative_slash(entry.path(), work_dir);
        let dir = match rel_path.rfind('/') {
            Some(idx) => &rel_path[..idx],
            None => ".",
        };

        let source = match fs::read(entry.path()) {
            Ok(source) => source,
            Err(e) => {
                warnings.push(format!("package {dir}: {rel_path}: {e}"));
                continue;
            }
        };

        let Some(syntax) = parser.parse(&source) else {
            warnings.push(format!("package {dir}: {rel_path}: parse failed"));
            continue;
        };
        if syntax.package.is_none() {
            warnings.push(format!("package {dir}: {rel_path}: missing package clause"));
            continue;
        }
        if syntax.has_errors {
            warnings.push(format!("package {dir}: {rel_path}: syntax errors"));
        }

        parsed.push(ParsedFile {
            rel_path,
            abs_path: entry.path().to_path_buf(),
            syntax,
        });
    }

    tracing::debug!(
        files = parsed.len(),
        module = module_path.as_deref().unwrap_or("<none>"),
        "parsed Go sources"
    );

    Ok(LoadedProgram {
        program: Program::build(module_path.as_deref(), parsed),
        warnings,
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_go_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("go")
}

fn relative_slash(path: &Path, root: &Path) -> String {
    to_slash(path.strip_prefix(root).unwrap_or(path))
}

/// Module path from the `module` directive of `go.mod`, if any
fn read_module_path(work_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(work_dir.join("go.mod")).ok()?;
    parse_module_directive(&content)
}

fn parse_module_directive(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_module_directive() {
        assert_eq!(
            parse_module_directive("module example.com/app\n\ngo 1.22\n"),
            Some("example.com/app".to_string())
        );
        assert_eq!(
            parse_module_directive("// comment\nmodule \"example.com/q\" // trailing\n"),
            Some("example.com/q".to_string())
        );
        assert_eq!(parse_module_directive("modulex foo\n"), None);
        assert_eq!(parse_module_directive("go 1.22\n"), None);
    }

    #[test]
    fn test_loads_packages_and_skips_vendor() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/app\n");
        write(root, "main.go", "package main\nfunc main() {}\n");
        write(root, "internal/service/user.go", "package service\nfunc CreateUser() {}\n");
        write(root, "vendor/dep/dep.go", "package dep\nfunc Dep() {}\n");
        write(root, "testdata/x.go", "package x\nfunc X() {}\n");
        write(root, ".git/hooks/h.go", "package h\n");
        write(root, "notes.txt", "package nope\n");

        let loaded = load_program(root, &TimeBudget::new(Duration::from_secs(30))).unwrap();
        let program = &loaded.program;
        let files: Vec<&str> = program.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(files, vec!["internal/service/user.go", "main.go"]);
        assert_eq!(
            program.package_by_import("example.com/app/internal/service"),
            Some(0)
        );
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_file_problems_become_warnings() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "pkg/broken.go", "package pkg\nfunc Broken( {\n");
        write(root, "pkg/noclause.go", "func Lonely() {}\n");

        let loaded = load_program(root, &TimeBudget::new(Duration::from_secs(30))).unwrap();
        assert_eq!(loaded.program.files.len(), 1);
        assert!(loaded
            .warnings
            .iter()
            .any(|w| w.starts_with("package pkg: pkg/broken.go:") && w.contains("syntax")));
        assert!(loaded
            .warnings
            .iter()
            .any(|w| w == "package pkg: pkg/noclause.go: missing package clause"));
    }

    #[test]
    fn test_expired_budget_stops_loading() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.go", "package a\n");
        let err = load_program(dir.path(), &TimeBudget::new(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, LoadError::DeadlineExceeded));
    }
}

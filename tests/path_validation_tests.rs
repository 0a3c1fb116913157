//! Integration tests for input and helper argument validation.
//!
//! Diff files must resolve inside the working directory, and file paths
//! handed to helper processes must not escape it or pose as flags.

use ripple::config::ToolCommands;
use ripple::input::read_json_file;
use ripple::validation::{sanitize_file_path, validate_path_within_root, PathValidationError};
use ripple::{Analyzer, AnalyzerConfig, ModifiedFunction, PythonAnalyzer, TypeScriptAnalyzer};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a file and return its path
fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn offline_config() -> AnalyzerConfig {
    AnalyzerConfig {
        tools: ToolCommands {
            python: vec!["ripple-missing-python".to_string()],
            node: "ripple-missing-node".to_string(),
            npx: "ripple-missing-npx".to_string(),
            depcruise: "ripple-missing-depcruise".to_string(),
            pyan3: "ripple-missing-pyan3".to_string(),
        },
        ..AnalyzerConfig::default()
    }
}

// =========================================================================
// Diff input files
// =========================================================================

#[test]
fn test_read_json_file_inside_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_file(temp_dir.path(), ".ring/codereview/go-ast.json", b"[]");

    let data = read_json_file(&path, temp_dir.path()).unwrap();
    assert_eq!(data, b"[]");
}

#[test]
fn test_read_json_file_parent_traversal_rejected() {
    let root_dir = TempDir::new().unwrap();
    let project = root_dir.path().join("project");
    fs::create_dir_all(&project).unwrap();
    create_test_file(root_dir.path(), "secret.json", b"{}");

    let traversal = project.join("../secret.json");
    let err = read_json_file(&traversal, &project).unwrap_err();
    assert!(format!("{err:#}").contains("escapes project root"), "{err:#}");
}

#[test]
fn test_read_json_file_missing() {
    let temp_dir = TempDir::new().unwrap();
    let result = validate_path_within_root(&temp_dir.path().join("absent.json"), temp_dir.path());
    assert!(matches!(result, Err(PathValidationError::CannotCanonicalize(_))));
    assert!(read_json_file(&temp_dir.path().join("absent.json"), temp_dir.path()).is_err());
}

#[cfg(unix)]
#[test]
fn test_read_json_file_symlink_escape_rejected() {
    let root_dir = TempDir::new().unwrap();
    let other_dir = TempDir::new().unwrap();
    let target = create_test_file(other_dir.path(), "diff.json", b"[]");
    let link = root_dir.path().join("diff.json");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert!(read_json_file(&link, root_dir.path()).is_err());
}

#[cfg(unix)]
#[test]
fn test_read_json_file_symlink_inside_root_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let target = create_test_file(temp_dir.path(), "data/diff.json", b"null");
    let link = temp_dir.path().join("diff.json");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert_eq!(read_json_file(&link, temp_dir.path()).unwrap(), b"null");
}

// =========================================================================
// Helper arguments
// =========================================================================

#[test]
fn test_helper_file_arguments() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    assert!(sanitize_file_path("src/app.py", root).is_ok());
    assert!(sanitize_file_path("src/../src/app.py", root).is_ok());
    assert!(matches!(
        sanitize_file_path("../outside.py", root),
        Err(PathValidationError::OutsideRoot(_, _))
    ));
    assert!(matches!(
        sanitize_file_path("-e", root),
        Err(PathValidationError::StartsWithDash(_))
    ));
}

#[test]
fn test_python_traversal_degrades_without_spawning() {
    let temp_dir = TempDir::new().unwrap();
    let analyzer = PythonAnalyzer::new(temp_dir.path(), offline_config());
    let input = vec![ModifiedFunction::new("run", "../../etc/passwd", "")];

    let result = analyzer.analyze(&input, 5).unwrap();
    assert_eq!(result.modified_functions.len(), 1);
    // both tiers reject the path before looking for a tool
    assert_eq!(result.warnings.len(), 2, "{:?}", result.warnings);
    assert!(result
        .warnings
        .iter()
        .all(|w| w.contains("file path validation failed")));
}

#[test]
fn test_typescript_flag_injection_degrades() {
    let temp_dir = TempDir::new().unwrap();
    let analyzer = TypeScriptAnalyzer::new(temp_dir.path(), offline_config());
    let input = vec![ModifiedFunction::new("handler", "--require=evil.js", "")];

    let result = analyzer.analyze(&input, 5).unwrap();
    assert_eq!(result.modified_functions.len(), 1);
    assert!(result.modified_functions[0].callers.is_empty());
    assert!(result
        .warnings
        .iter()
        .all(|w| w.contains("file path validation failed")));
}

#[test]
fn test_invalid_function_name_degrades() {
    let temp_dir = TempDir::new().unwrap();
    let analyzer = PythonAnalyzer::new(temp_dir.path(), offline_config());
    let input = vec![ModifiedFunction::new("f; rm -rf /", "app.py", "")];

    let result = analyzer.analyze(&input, 5).unwrap();
    assert!(result.warnings[0].contains("function name validation failed"));
}

//! CLI smoke tests for the ripple binary
//!
//! Spawns the built binary against a throwaway Go module and checks the
//! files it leaves in the output directory.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn bin_path() -> String {
    std::env::var("CARGO_BIN_EXE_ripple").unwrap_or_else(|_| {
        // Fallback: construct path to debug binary
        let mut path = std::env::current_exe().unwrap();
        path.pop(); // Remove test executable name from deps/
        path.pop(); // Remove deps/ directory
        path.push("ripple");
        path.to_str().unwrap().to_string()
    })
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn go_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "go.mod", "module example.com/app\n");
    write(
        root,
        "internal/service/user.go",
        "package service\n\nfunc CreateUser(name string) error {\n\treturn nil\n}\n",
    );
    write(
        root,
        "internal/service/user_test.go",
        "package service\n\nimport \"testing\"\n\nfunc TestCreateUser(t *testing.T) {\n\tCreateUser(\"a\")\n}\n",
    );
    write(
        root,
        "internal/handler/signup.go",
        "package handler\n\nimport \"example.com/app/internal/service\"\n\nfunc HandleSignup() {\n\tservice.CreateUser(\"b\")\n}\n",
    );
    write(
        root,
        "go-ast.json",
        r#"[{
  "language": "go",
  "file_path": "internal/service/user.go",
  "functions": [
    {"name": "CreateUser", "change_type": "modified"},
    {"name": "OldHelper", "change_type": "removed"}
  ]
}]"#,
    );
    temp_dir
}

#[test]
fn test_version_flag() {
    let output = Command::new(bin_path())
        .arg("--version")
        .output()
        .expect("Failed to start ripple binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ripple "), "stdout: {stdout}");
}

#[test]
fn test_help_and_usage_errors() {
    let output = Command::new(bin_path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--ast <FILE>"));

    let output = Command::new(bin_path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--ast is required"));
}

#[test]
fn test_analyze_go_project() {
    let project = go_project();
    let output = Command::new(bin_path())
        .current_dir(project.path())
        .args(["--ast", "go-ast.json", "--timeout", "60"])
        .output()
        .expect("Failed to start ripple binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");
    assert!(stdout.contains("Call graph analysis complete:"));
    assert!(stdout.contains("Direct callers: 2"));

    let out_dir = project.path().join(".ring/codereview");
    let json = fs::read_to_string(out_dir.join("go-calls.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["language"], "go");
    let functions = value["modified_functions"].as_array().unwrap();
    // the removed function is not analyzed
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0]["function"], "CreateUser");
    assert_eq!(value["impact_analysis"]["direct_callers"], 2);
    assert_eq!(value["impact_analysis"]["affected_tests"], 1);

    let summary = fs::read_to_string(out_dir.join("impact-summary.md")).unwrap();
    assert!(summary.contains("CreateUser"));
    assert!(summary.contains("**Language:** go"), "{summary}");
}

#[test]
fn test_explicit_language_with_suffix() {
    let project = go_project();
    let output = Command::new(bin_path())
        .current_dir(project.path())
        .args([
            "--ast",
            "go-ast.json",
            "--lang",
            "golang",
            "--output",
            "out",
            "--output-suffix",
            "-go",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(project.path().join("out-go/go-calls.json").is_file());
    assert!(project.path().join("out-go/impact-summary.md").is_file());
}

#[test]
fn test_unsupported_language_fails() {
    let project = go_project();
    let output = Command::new(bin_path())
        .current_dir(project.path())
        .args(["--ast", "go-ast.json", "--lang", "rust"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported language: rust"));
    assert!(!project.path().join(".ring").exists());
}

#[test]
fn test_ast_outside_working_directory_rejected() {
    let project = go_project();
    let elsewhere = TempDir::new().unwrap();
    let ast = elsewhere.path().join("go-ast.json");
    fs::write(&ast, "[]").unwrap();

    let output = Command::new(bin_path())
        .current_dir(project.path())
        .arg("--ast")
        .arg(&ast)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read AST file"));
}

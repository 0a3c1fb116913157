//! Naming heuristics that classify callers as tests

use std::path::{Component, Path};

const GO_TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example", "Fuzz"];

const TS_TEST_FUNCTIONS: &[&str] = &[
    "it",
    "test",
    "describe",
    "beforeeach",
    "aftereach",
    "beforeall",
    "afterall",
];

const TS_TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec.", "_test.", "_spec."];

/// Everything after the last `.`, so `(*Svc).TestFoo` becomes `TestFoo`
pub fn unqualified_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Go test, benchmark, example and fuzz functions, matched by prefix
pub fn is_go_test_function(name: &str) -> bool {
    let base = unqualified_name(name);
    GO_TEST_PREFIXES.iter().any(|p| base.starts_with(p))
}

/// `test_*.py`, `*_test.py`, or anything under a `test`/`tests` directory
pub fn is_python_test_file(path: &str) -> bool {
    let p = Path::new(path);
    let base = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if base.starts_with("test_") || base.ends_with("_test.py") {
        return true;
    }
    in_test_directory(p)
}

/// `test_*`, `Test*` or `*_test`, judged on the last dotted segment
pub fn is_python_test_function(name: &str) -> bool {
    let base = unqualified_name(name);
    base.starts_with("test_") || base.starts_with("Test") || base.ends_with("_test")
}

/// Jest/Mocha naming: `*.test.ts`, `*.spec.js`, `__tests__/`, `test/`, `tests/`
pub fn is_typescript_test_file(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or(&normalized);
    if TS_TEST_FILE_MARKERS.iter().any(|m| base.contains(m)) {
        return true;
    }
    normalized.split('/').any(|c| c == "__tests__") || in_test_directory(Path::new(&normalized))
}

/// Test framework callbacks (`it`, `describe`, hooks) and `test_`/`spec_` helpers
pub fn is_typescript_test_function(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    TS_TEST_FUNCTIONS.contains(&lower.as_str())
        || lower.starts_with("test_")
        || lower.starts_with("spec_")
}

fn in_test_directory(path: &Path) -> bool {
    path.parent().map_or(false, |dir| {
        dir.components()
            .any(|c| matches!(c, Component::Normal(s) if s == "test" || s == "tests"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_prefixes() {
        assert!(is_go_test_function("TestFoo"));
        assert!(is_go_test_function("(S).TestFoo"));
        assert!(is_go_test_function("(*S).TestFoo"));
        assert!(is_go_test_function("TestingSomethingElse"));
        assert!(is_go_test_function("BenchmarkParse"));
        assert!(is_go_test_function("ExampleClient"));
        assert!(is_go_test_function("FuzzDecode"));
        assert!(!is_go_test_function("mytest"));
        assert!(!is_go_test_function("Handler.testHelper"));
    }

    #[test]
    fn test_python_files() {
        assert!(is_python_test_file("test_user.py"));
        assert!(is_python_test_file("pkg/user_test.py"));
        assert!(is_python_test_file("tests/helpers.py"));
        assert!(is_python_test_file("app/test/conftest.py"));
        assert!(!is_python_test_file("app/latest/models.py"));
        assert!(!is_python_test_file("app/user.py"));
    }

    #[test]
    fn test_python_functions() {
        assert!(is_python_test_function("test_create"));
        assert!(is_python_test_function("TestUser.test_create"));
        assert!(is_python_test_function("tests.TestUser"));
        assert!(is_python_test_function("create_test"));
        assert!(!is_python_test_function("create_user"));
        assert!(!is_python_test_function("testing"));
    }

    #[test]
    fn test_typescript_files() {
        assert!(is_typescript_test_file("src/user.test.ts"));
        assert!(is_typescript_test_file("src/user.spec.tsx"));
        assert!(is_typescript_test_file("src/__tests__/user.ts"));
        assert!(is_typescript_test_file("test/user.ts"));
        assert!(is_typescript_test_file("src/user_spec.js"));
        assert!(!is_typescript_test_file("src/contest.ts"));
        assert!(!is_typescript_test_file("src/user.ts"));
    }

    #[test]
    fn test_typescript_functions() {
        assert!(is_typescript_test_function("it"));
        assert!(is_typescript_test_function("beforeEach"));
        assert!(is_typescript_test_function("Describe"));
        assert!(is_typescript_test_function("test_login"));
        assert!(is_typescript_test_function("spec_helper"));
        assert!(!is_typescript_test_function("iterate"));
        assert!(!is_typescript_test_function("testLogin"));
    }
}

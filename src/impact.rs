//! Program-level impact rollup and the lenient file identity rule

use std::collections::HashSet;
use std::path::Path;

use camino::Utf8PathBuf;

use crate::types::{ImpactAnalysis, ModifiedFunction};
use crate::validation::lexical_normalize;

/// Deduplication key for a caller: `file:function`
pub fn caller_key(file: &str, function: &str) -> String {
    format!("{file}:{function}")
}

/// Affected packages in order of first occurrence.
///
/// A function contributes its package name, or its file's directory when
/// that directory ends in the package name (so `service` declared in
/// `internal/service/user.go` becomes `internal/service`). Functions
/// without a package contribute their directory.
pub fn affected_packages(functions: &[ModifiedFunction]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for function in functions {
        let dir = parent_dir(&function.file);
        let package = if function.package.is_empty() {
            dir
        } else if dir.rsplit('/').next() == Some(function.package.as_str()) {
            dir
        } else {
            function.package.clone()
        };

        if seen.insert(package.clone()) {
            packages.push(package);
        }
    }
    packages
}

/// Directory part of a diff path with `/` separators, `.` for bare names
fn parent_dir(file: &str) -> String {
    let normalized = to_slash(&lexical_normalize(Path::new(file)));
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Render a path with `/` separators
pub fn to_slash(path: &Path) -> String {
    match Utf8PathBuf::from_path_buf(path.to_path_buf()) {
        Ok(utf8) => utf8.as_str().replace('\\', "/"),
        Err(raw) => raw.to_string_lossy().replace('\\', "/"),
    }
}

/// Lenient file identity used to match diff paths against analysed files.
///
/// Matches when the paths are equal, when `candidate` ends with `target`,
/// or when `target` ends with the file name of `candidate`. The last rule
/// accepts any file sharing a base name.
pub fn file_matches(candidate: &str, target: &str) -> bool {
    if candidate.is_empty() || target.is_empty() {
        return candidate == target;
    }
    let candidate = to_slash(&lexical_normalize(Path::new(candidate)));
    let target = to_slash(&lexical_normalize(Path::new(target)));

    if candidate == target || candidate.ends_with(&target) {
        return true;
    }
    let base = candidate.rsplit('/').next().unwrap_or(&candidate);
    !base.is_empty() && target.ends_with(base)
}

/// Accumulates distinct direct-caller and test-caller keys across functions
#[derive(Debug, Default)]
pub struct ImpactTally {
    direct: HashSet<String>,
    tests: HashSet<String>,
}

impl ImpactTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_caller(&mut self, file: &str, function: &str, is_test: bool) {
        let key = caller_key(file, function);
        if is_test {
            self.tests.insert(key.clone());
        }
        self.direct.insert(key);
    }

    pub fn direct_callers(&self) -> usize {
        self.direct.len()
    }

    pub fn affected_tests(&self) -> usize {
        self.tests.len()
    }

    /// Write counts into `impact`.
    ///
    /// `transitive_keys` is the size of the BFS result set, which includes
    /// the direct callers; they are subtracted with a floor of zero.
    pub fn apply(&self, impact: &mut ImpactAnalysis, transitive_keys: Option<usize>) {
        impact.direct_callers = self.direct_callers();
        impact.affected_tests = self.affected_tests();
        impact.transitive_callers = transitive_keys
            .map(|n| n.saturating_sub(self.direct_callers()))
            .unwrap_or(0);
    }
}

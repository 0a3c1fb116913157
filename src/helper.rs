//! JSON protocol spoken by the per-language call-graph helper scripts
//!
//! A helper prints one object on stdout:
//! `{functions: [{name, file, line, call_sites, called_by?}], error?}`.
//! This module decodes it and maps helper functions back onto the
//! modified functions that were asked about.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::analyzer::TierFailure;
use crate::impact::{caller_key, file_matches, ImpactTally};
use crate::types::{CallInfo, FunctionCallGraph, ModifiedFunction, TestCoverage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelperOutput {
    #[serde(default)]
    pub functions: Vec<HelperFunction>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelperFunction {
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub end_line: usize,
    #[serde(default)]
    pub call_sites: Vec<HelperCallSite>,
    #[serde(default)]
    pub called_by: Vec<HelperCaller>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelperCallSite {
    pub target: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub column: usize,
    #[serde(default)]
    pub is_method: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelperCaller {
    pub function: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
}

/// Decode helper stdout; a non-empty `error` field is a tier failure
pub fn parse_helper_output(bytes: &[u8]) -> Result<HelperOutput, TierFailure> {
    let output: HelperOutput = serde_json::from_slice(bytes)
        .map_err(|e| TierFailure::new(format!("failed to parse helper output: {e}")))?;

    match output.error.as_deref() {
        Some(err) if !err.is_empty() => Err(TierFailure::new(format!("helper error: {err}"))),
        _ => Ok(output),
    }
}

/// Files of the modified functions, deduplicated in first-seen order
pub fn collect_unique_files(functions: &[ModifiedFunction]) -> Vec<String> {
    let mut seen = HashSet::new();
    functions
        .iter()
        .filter(|f| !f.file.is_empty() && seen.insert(f.file.as_str()))
        .map(|f| f.file.clone())
        .collect()
}

/// Function names for the helper's `--functions` filter, deduplicated
pub fn collect_function_names(functions: &[ModifiedFunction]) -> Vec<String> {
    let mut seen = HashSet::new();
    functions
        .iter()
        .filter(|f| seen.insert(f.name.as_str()))
        .map(|f| f.name.clone())
        .collect()
}

/// Index over helper functions: exact `file:name`, then by name
struct HelperIndex<'a> {
    exact: HashMap<String, &'a HelperFunction>,
    by_name: HashMap<&'a str, Vec<&'a HelperFunction>>,
}

impl<'a> HelperIndex<'a> {
    fn new(output: &'a HelperOutput) -> Self {
        let mut exact = HashMap::new();
        let mut by_name: HashMap<&str, Vec<&HelperFunction>> = HashMap::new();
        for function in &output.functions {
            exact
                .entry(caller_key(&function.file, &function.name))
                .or_insert(function);
            by_name.entry(function.name.as_str()).or_default().push(function);
        }
        Self { exact, by_name }
    }

    fn find(&self, target: &ModifiedFunction) -> Option<&'a HelperFunction> {
        if let Some(found) = self.exact.get(&caller_key(&target.file, &target.name)) {
            return Some(found);
        }
        self.by_name
            .get(target.name.as_str())?
            .iter()
            .copied()
            .find(|f| file_matches(&f.file, &target.file))
    }
}

/// Turn helper output into one `FunctionCallGraph` per modified function.
///
/// Callees come from the function's call sites. Callers come from
/// `called_by`; a caller is test coverage when `is_test(file, function)`.
pub fn map_helper_results<F>(
    output: &HelperOutput,
    functions: &[ModifiedFunction],
    tally: &mut ImpactTally,
    is_test: F,
) -> Vec<FunctionCallGraph>
where
    F: Fn(&str, &str) -> bool,
{
    let index = HelperIndex::new(output);

    functions
        .iter()
        .map(|target| {
            let mut graph = FunctionCallGraph::empty(target);
            let Some(found) = index.find(target) else {
                return graph;
            };

            let site_file = Path::new(&target.file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| target.file.clone());

            graph.callees = found
                .call_sites
                .iter()
                .map(|call| CallInfo {
                    function: call.target.clone(),
                    file: target.file.clone(),
                    line: call.line,
                    call_site: Some(format!("{}:{}", site_file, call.line)),
                })
                .collect();

            for caller in &found.called_by {
                let test = is_test(&caller.file, &caller.function);
                tally.record_caller(&caller.file, &caller.function, test);
                if test {
                    graph.test_coverage.push(TestCoverage {
                        test_function: caller.function.clone(),
                        file: caller.file.clone(),
                        line: caller.line,
                    });
                }
                graph.callers.push(CallInfo {
                    function: caller.function.clone(),
                    file: caller.file.clone(),
                    line: caller.line,
                    call_site: None,
                });
            }
            graph
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"{
        "functions": [
            {
                "name": "create_user",
                "file": "app/users.py",
                "line": 10,
                "end_line": 20,
                "call_sites": [
                    {"target": "db.insert", "line": 12, "column": 8, "is_method": true}
                ],
                "called_by": [
                    {"function": "signup", "file": "app/views.py", "line": 30},
                    {"function": "test_create_user", "file": "tests/test_users.py", "line": 5}
                ]
            }
        ]
    }"#;

    fn is_test(file: &str, function: &str) -> bool {
        crate::heuristics::is_python_test_file(file)
            || crate::heuristics::is_python_test_function(function)
    }

    #[test]
    fn test_parse_rejects_error_field() {
        let err = parse_helper_output(br#"{"functions": [], "error": "syntax error in x.py"}"#)
            .unwrap_err();
        assert_eq!(err.reason, "helper error: syntax error in x.py");

        let err = parse_helper_output(b"not json").unwrap_err();
        assert!(err.reason.starts_with("failed to parse helper output"));

        let ok = parse_helper_output(br#"{"error": ""}"#).unwrap();
        assert!(ok.functions.is_empty());
    }

    #[test]
    fn test_map_exact_key() {
        let output = parse_helper_output(OUTPUT.as_bytes()).unwrap();
        let functions = vec![
            ModifiedFunction::new("create_user", "app/users.py", "app"),
            ModifiedFunction::new("delete_user", "app/users.py", "app"),
        ];
        let mut tally = ImpactTally::new();
        let graphs = map_helper_results(&output, &functions, &mut tally, is_test);

        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[0].callers.len(), 2);
        assert_eq!(graphs[0].callees[0].function, "db.insert");
        assert_eq!(graphs[0].callees[0].call_site.as_deref(), Some("users.py:12"));
        assert_eq!(graphs[0].test_coverage.len(), 1);
        assert_eq!(graphs[0].test_coverage[0].test_function, "test_create_user");
        assert!(graphs[1].callers.is_empty());
        assert_eq!(tally.direct_callers(), 2);
        assert_eq!(tally.affected_tests(), 1);
    }

    #[test]
    fn test_map_falls_back_to_suffix_match() {
        let output = parse_helper_output(OUTPUT.as_bytes()).unwrap();
        let functions = vec![ModifiedFunction::new(
            "create_user",
            "/checkout/app/users.py",
            "app",
        )];
        let mut tally = ImpactTally::new();
        let graphs = map_helper_results(&output, &functions, &mut tally, is_test);
        assert_eq!(graphs[0].callers.len(), 2);
    }

    #[test]
    fn test_collectors_dedupe() {
        let functions = vec![
            ModifiedFunction::new("a", "x.py", ""),
            ModifiedFunction::new("b", "x.py", ""),
            ModifiedFunction::new("a", "y.py", ""),
            ModifiedFunction::new("c", "", ""),
        ];
        assert_eq!(collect_unique_files(&functions), vec!["x.py", "y.py"]);
        assert_eq!(collect_function_names(&functions), vec!["a", "b", "c"]);
    }
}

//! Data model shared by every analyzer backend
//!
//! All types serialize with snake_case field names; `CallGraphResult` is the
//! document downstream report writers consume.

use serde::{Deserialize, Serialize};

/// A changed function as reported by the upstream diff phase.
///
/// `file` is whatever path the diff tool recorded. It may be relative or
/// absolute and is not guaranteed to match the graph builder's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedFunction {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl ModifiedFunction {
    pub fn new(name: impl Into<String>, file: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            package: package.into(),
            receiver: None,
        }
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        let receiver = receiver.into();
        self.receiver = if receiver.is_empty() { None } else { Some(receiver) };
        self
    }

    /// Receiver with an empty string treated as absent
    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref().filter(|r| !r.is_empty())
    }
}

/// One caller or callee endpoint.
///
/// `call_site` renders the call expression location as `file:line`, which
/// differs from the declaration site carried in `file`/`line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub function: String,
    pub file: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_site: Option<String>,
}

/// A caller that also matches the language's test heuristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCoverage {
    pub test_function: String,
    pub file: String,
    pub line: usize,
}

/// Per-function result. Exactly one is emitted for every retained input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallGraph {
    pub function: String,
    pub file: String,
    #[serde(default)]
    pub callers: Vec<CallInfo>,
    #[serde(default)]
    pub callees: Vec<CallInfo>,
    #[serde(default)]
    pub test_coverage: Vec<TestCoverage>,
}

impl FunctionCallGraph {
    /// Entry with no edges, used whenever analysis of a function is skipped
    pub fn empty(function: &ModifiedFunction) -> Self {
        Self {
            function: function.name.clone(),
            file: function.file.clone(),
            callers: Vec::new(),
            callees: Vec::new(),
            test_coverage: Vec::new(),
        }
    }
}

/// Program-level rollup of the per-function results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub direct_callers: usize,
    pub transitive_callers: usize,
    pub affected_tests: usize,
    #[serde(default)]
    pub affected_packages: Vec<String>,
}

/// Complete output of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphResult {
    pub language: String,
    #[serde(default)]
    pub modified_functions: Vec<FunctionCallGraph>,
    #[serde(default)]
    pub impact_analysis: ImpactAnalysis,
    #[serde(default)]
    pub time_budget_exceeded: bool,
    #[serde(default)]
    pub partial_results: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl CallGraphResult {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            modified_functions: Vec::new(),
            impact_analysis: ImpactAnalysis::default(),
            time_budget_exceeded: false,
            partial_results: false,
            warnings: Vec::new(),
        }
    }
}

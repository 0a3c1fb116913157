//! Python backend: `call_graph.py` helper, then pyan3, then empty results

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::analyzer::{govern, Analyzer, Governed, TierFailure, TierOutcome};
use crate::budget::TimeBudget;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::heuristics::{is_python_test_file, is_python_test_function};
use crate::helper::{
    collect_function_names, collect_unique_files, map_helper_results, parse_helper_output,
    HelperOutput,
};
use crate::impact::ImpactTally;
use crate::language::Language;
use crate::subprocess::{run_first_available, ToolCommand};
use crate::types::{CallGraphResult, CallInfo, FunctionCallGraph, ModifiedFunction, TestCoverage};
use crate::validation::{
    lexical_normalize, sanitize_file_paths, sanitize_function_names, IdentifierRules,
};

const HELPER_SCRIPT: &str = "call_graph.py";

/// Python call-graph analyzer
pub struct PythonAnalyzer {
    work_dir: PathBuf,
    config: AnalyzerConfig,
}

impl PythonAnalyzer {
    pub fn new(work_dir: impl Into<PathBuf>, config: AnalyzerConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }

    /// Tier 1: function-level call sites from the helper script
    fn run_helper(
        &self,
        files: &[String],
        functions: &[ModifiedFunction],
        budget: &TimeBudget,
    ) -> TierOutcome<HelperOutput> {
        if files.is_empty() {
            return TierOutcome::Success(HelperOutput::default());
        }

        let files = match sanitize_file_paths(files, &self.work_dir) {
            Ok(files) => files,
            Err(e) => {
                return TierOutcome::Degraded(TierFailure::new(format!(
                    "file path validation failed: {e}"
                )))
            }
        };
        let names = match sanitize_function_names(
            &collect_function_names(functions),
            IdentifierRules::Python,
        ) {
            Ok(names) => names,
            Err(e) => {
                return TierOutcome::Degraded(TierFailure::new(format!(
                    "function name validation failed: {e}"
                )))
            }
        };
        let Some(helper) = self.find_helper_script() else {
            return TierOutcome::Degraded(TierFailure::new(format!(
                "{HELPER_SCRIPT} helper script not found"
            )));
        };

        let commands: Vec<ToolCommand> = self
            .config
            .tools
            .python
            .iter()
            .map(|python| {
                let mut cmd = ToolCommand::new(python, &self.work_dir)
                    .arg(helper.as_os_str())
                    .args(&files);
                if !names.is_empty() {
                    cmd = cmd.arg("--functions").arg(names.join(","));
                }
                cmd
            })
            .collect();

        match run_first_available(&commands, budget, self.config.max_helper_output) {
            Ok(stdout) => match parse_helper_output(&stdout) {
                Ok(output) => TierOutcome::Success(output),
                Err(failure) => TierOutcome::Degraded(failure),
            },
            Err(e) => {
                let mut failure = TierFailure::from(e);
                failure.reason = format!("failed to run Python helper: {}", failure.reason);
                TierOutcome::Degraded(failure)
            }
        }
    }

    /// Tier 2: module-level approximation from pyan3's DOT graph
    fn run_pyan(&self, files: &[String], budget: &TimeBudget) -> TierOutcome<String> {
        if files.is_empty() {
            return TierOutcome::Success(String::new());
        }
        let files = match sanitize_file_paths(files, &self.work_dir) {
            Ok(files) => files,
            Err(e) => {
                return TierOutcome::Degraded(TierFailure::new(format!(
                    "file path validation failed: {e}"
                )))
            }
        };

        let mut commands = Vec::new();
        if let Some(python) = self.config.tools.python.first() {
            commands.push(
                ToolCommand::new(python, &self.work_dir)
                    .args(["-c", "from pyan import main; main()", "--dot"])
                    .args(&files),
            );
        }
        commands.push(
            ToolCommand::new(&self.config.tools.pyan3, &self.work_dir)
                .arg("--dot")
                .args(&files),
        );

        match run_first_available(&commands, budget, self.config.max_helper_output) {
            Ok(stdout) => TierOutcome::Success(String::from_utf8_lossy(&stdout).into_owned()),
            Err(e) => TierOutcome::Degraded(e.into()),
        }
    }

    /// Configured helper, else `py/` or `scripts/codereview/py/` next to
    /// the installed binary's parent directory
    fn find_helper_script(&self) -> Option<PathBuf> {
        if let Some(configured) = &self.config.python_helper {
            return configured.is_file().then(|| configured.clone());
        }

        let exe = std::env::current_exe().ok()?;
        let root = exe.parent()?.parent()?.to_path_buf();
        [
            root.join("py").join(HELPER_SCRIPT),
            root.join("scripts").join("codereview").join("py").join(HELPER_SCRIPT),
        ]
        .into_iter()
        .map(|candidate| lexical_normalize(&candidate))
        .find(|candidate| candidate.starts_with(&root) && candidate.is_file())
    }
}

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(
        &self,
        functions: &[ModifiedFunction],
        time_budget_secs: u64,
    ) -> Result<CallGraphResult, AnalyzerError> {
        let mut session = match govern(Language::Python, functions, time_budget_secs, &self.config)
        {
            Governed::Empty(result) => return Ok(result),
            Governed::Run(session) => session,
        };

        let budget = *session.budget();
        let files = collect_unique_files(session.functions());
        let mut tally = ImpactTally::new();

        tracing::debug!(files = files.len(), "trying Python helper");
        let graphs = match self.run_helper(&files, session.functions(), &budget) {
            TierOutcome::Success(output) => {
                map_helper_results(&output, session.functions(), &mut tally, is_python_test)
            }
            TierOutcome::Degraded(failure) => {
                session.degrade(&failure, "Python helper unavailable");
                tracing::debug!("falling back to pyan3");
                match self.run_pyan(&files, &budget) {
                    TierOutcome::Success(dot) => {
                        let edges = parse_dot_edges(&dot);
                        map_pyan_edges(&edges, session.functions(), &mut tally)
                    }
                    TierOutcome::Degraded(failure) => {
                        session.degrade(&failure, "pyan3 not available");
                        Vec::new()
                    }
                }
            }
        };

        for graph in graphs {
            session.push(graph);
        }
        tally.apply(session.impact_mut(), None);
        Ok(session.finish())
    }
}

fn is_python_test(file: &str, function: &str) -> bool {
    is_python_test_file(file) || is_python_test_function(function)
}

/// Directed `caller -> callee` pairs from a DOT document.
///
/// Attribute lists are ignored, except that dashed edges (pyan's
/// "defines" relation) are skipped.
pub fn parse_dot_edges(dot: &str) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for line in dot.lines() {
        let line = line.trim();
        let Some((lhs, rhs)) = line.split_once("->") else {
            continue;
        };
        let (rhs, attrs) = match rhs.find('[') {
            Some(idx) => (&rhs[..idx], &rhs[idx..]),
            None => (rhs, ""),
        };
        if attrs.contains("dashed") {
            continue;
        }

        let caller = unquote(lhs);
        let callee = unquote(rhs.trim().trim_end_matches(';'));
        if !caller.is_empty() && !callee.is_empty() {
            edges.push((caller.to_string(), callee.to_string()));
        }
    }
    edges
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim()
}

/// Split a pyan node or Python qualified name into its segments
fn segments(name: &str) -> Vec<&str> {
    name.split("__")
        .flat_map(|part| part.split('.'))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Dotted rendering of a pyan node id
fn display_name(node: &str) -> String {
    segments(node).join(".")
}

fn node_matches(node: &str, function: &str) -> bool {
    let node = segments(node);
    let wanted = segments(function);
    !wanted.is_empty() && node.ends_with(&wanted)
}

/// Module path of a dotted name, as a file path for the test-file heuristic
fn module_file(display: &str) -> String {
    match display.rsplit_once('.') {
        Some((module, _)) => format!("{}.py", module.replace('.', "/")),
        None => String::new(),
    }
}

/// Map pyan edges onto modified functions.
///
/// pyan reports no files or lines, so caller entries carry names only.
fn map_pyan_edges(
    edges: &[(String, String)],
    functions: &[ModifiedFunction],
    tally: &mut ImpactTally,
) -> Vec<FunctionCallGraph> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for (caller, callee) in edges {
        outgoing.entry(caller.as_str()).or_default().push(callee.as_str());
        incoming.entry(callee.as_str()).or_default().push(caller.as_str());
    }

    let mut nodes: Vec<&str> = outgoing.keys().chain(incoming.keys()).copied().collect();
    nodes.sort_unstable();
    nodes.dedup();

    functions
        .iter()
        .map(|target| {
            let mut graph = FunctionCallGraph::empty(target);
            let mut seen_callers = HashSet::new();
            let mut seen_callees = HashSet::new();

            for node in nodes.iter().filter(|n| node_matches(n, &target.name)) {
                for callee in outgoing.get(node).into_iter().flatten() {
                    let name = display_name(callee);
                    if seen_callees.insert(name.clone()) {
                        graph.callees.push(CallInfo {
                            function: name,
                            file: String::new(),
                            line: 0,
                            call_site: None,
                        });
                    }
                }
                for caller in incoming.get(node).into_iter().flatten() {
                    let name = display_name(caller);
                    if !seen_callers.insert(name.clone()) {
                        continue;
                    }
                    let test = is_python_test_function(&name)
                        || is_python_test_file(&module_file(&name));
                    tally.record_caller("", &name, test);
                    if test {
                        graph.test_coverage.push(TestCoverage {
                            test_function: name.clone(),
                            file: String::new(),
                            line: 0,
                        });
                    }
                    graph.callers.push(CallInfo {
                        function: name,
                        file: String::new(),
                        line: 0,
                        call_site: None,
                    });
                }
            }
            graph
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOT: &str = r#"digraph G {
    graph [rankdir=TB];
    "app__users__create_user" [label="create_user"];
    "app__views__signup" -> "app__users__create_user" [style="solid"];
    "tests__test_users__test_signup" -> "app__views__signup";
    "tests__test_users__test_create" -> "app__users__create_user";
    "app__users__create_user" -> "app__db__insert";
    "app__users" -> "app__users__create_user" [style="dashed"];
}"#;

    #[test]
    fn test_parse_dot_edges() {
        let edges = parse_dot_edges(DOT);
        assert_eq!(edges.len(), 4);
        assert_eq!(
            edges[0],
            ("app__views__signup".to_string(), "app__users__create_user".to_string())
        );
    }

    #[test]
    fn test_map_pyan_edges() {
        let edges = parse_dot_edges(DOT);
        let functions = vec![
            ModifiedFunction::new("create_user", "app/users.py", "app"),
            ModifiedFunction::new("unknown", "app/users.py", "app"),
        ];
        let mut tally = ImpactTally::new();
        let graphs = map_pyan_edges(&edges, &functions, &mut tally);

        assert_eq!(graphs.len(), 2);
        let callers: Vec<&str> = graphs[0].callers.iter().map(|c| c.function.as_str()).collect();
        assert_eq!(callers, vec!["app.views.signup", "tests.test_users.test_create"]);
        assert_eq!(graphs[0].callees[0].function, "app.db.insert");
        assert_eq!(graphs[0].test_coverage.len(), 1);
        assert!(graphs[1].callers.is_empty());
        assert_eq!(tally.direct_callers(), 2);
        assert_eq!(tally.affected_tests(), 1);
    }

    #[test]
    fn test_node_matching_uses_trailing_segments() {
        assert!(node_matches("app__svc__UserService__create", "UserService.create"));
        assert!(node_matches("app__svc__UserService__create", "create"));
        assert!(!node_matches("app__svc__UserService__create_all", "create"));
    }
}

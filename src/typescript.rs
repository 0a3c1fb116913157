//! TypeScript backend: `call-graph.ts` helper, then dependency-cruiser,
//! then empty results

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analyzer::{govern, Analyzer, Governed, TierFailure, TierOutcome};
use crate::budget::TimeBudget;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::heuristics::{is_typescript_test_file, is_typescript_test_function};
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

/// Helper locations tried under the working directory, in order
const HELPER_SEARCH_PATHS: &[&str] = &[
    "ts/call-graph.ts",
    "ts/dist/call-graph.js",
    "scripts/codereview/ts/call-graph.ts",
    "scripts/codereview/ts/dist/call-graph.js",
    "../ts/call-graph.ts",
    "../ts/dist/call-graph.js",
];

/// dependency-cruiser JSON report, reduced to what the fallback needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepCruiseOutput {
    #[serde(default)]
    pub modules: Vec<DepCruiseModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepCruiseModule {
    pub source: String,
    #[serde(default)]
    pub dependencies: Vec<DepCruiseDependency>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepCruiseDependency {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub resolved: String,
    #[serde(default)]
    pub module_system: String,
    #[serde(default)]
    pub dynamic: bool,
}

/// TypeScript/JavaScript call-graph analyzer
pub struct TypeScriptAnalyzer {
    work_dir: PathBuf,
    config: AnalyzerConfig,
}

impl TypeScriptAnalyzer {
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
            IdentifierRules::TypeScript,
        ) {
            Ok(names) => names,
            Err(e) => {
                return TierOutcome::Degraded(TierFailure::new(format!(
                    "function name validation failed: {e}"
                )))
            }
        };
        let Some(helper) = self.find_helper_script() else {
            return TierOutcome::Degraded(TierFailure::new("call-graph.ts helper script not found"));
        };

        let commands = self.helper_commands(&helper, &files, &names);
        match run_first_available(&commands, budget, self.config.max_helper_output) {
            Ok(stdout) => match parse_helper_output(&stdout) {
                Ok(output) => TierOutcome::Success(output),
                Err(failure) => TierOutcome::Degraded(failure),
            },
            Err(e) => {
                let mut failure = TierFailure::from(e);
                failure.reason = format!("failed to run TypeScript helper: {}", failure.reason);
                TierOutcome::Degraded(failure)
            }
        }
    }

    /// `npx ts-node` for `.ts` helpers, with compiled `.js` siblings as
    /// `node` fallbacks
    fn helper_commands(&self, helper: &Path, files: &[String], names: &[String]) -> Vec<ToolCommand> {
        let with_args = |cmd: ToolCommand, script: &Path| {
            let mut cmd = cmd.arg(script.as_os_str()).args(files);
            if !names.is_empty() {
                cmd = cmd.arg("--functions").arg(names.join(","));
            }
            cmd
        };

        let is_ts = helper.extension().map_or(false, |ext| ext == "ts");
        if !is_ts {
            return vec![with_args(ToolCommand::new(&self.config.tools.node, &self.work_dir), helper)];
        }

        let mut commands = vec![with_args(
            ToolCommand::new(&self.config.tools.npx, &self.work_dir).arg("ts-node"),
            helper,
        )];
        let js = helper.with_extension("js");
        let dist = helper
            .parent()
            .map(|dir| dir.join("dist").join("call-graph.js"))
            .unwrap_or_else(|| PathBuf::from("dist/call-graph.js"));
        for alt in [js, dist] {
            if alt.is_file() {
                commands.push(with_args(
                    ToolCommand::new(&self.config.tools.node, &self.work_dir),
                    &alt,
                ));
            }
        }
        commands
    }

    fn find_helper_script(&self) -> Option<PathBuf> {
        if let Some(configured) = &self.config.typescript_helper {
            return configured.is_file().then(|| configured.clone());
        }
        HELPER_SEARCH_PATHS
            .iter()
            .map(|rel| lexical_normalize(&self.work_dir.join(rel)))
            .find(|candidate| candidate.is_file())
    }

    /// Tier 2: module-level approximation from dependency-cruiser
    fn run_depcruise(&self, files: &[String], budget: &TimeBudget) -> TierOutcome<DepCruiseOutput> {
        if files.is_empty() {
            return TierOutcome::Success(DepCruiseOutput::default());
        }
        let files = match sanitize_file_paths(files, &self.work_dir) {
            Ok(files) => files,
            Err(e) => {
                return TierOutcome::Degraded(TierFailure::new(format!(
                    "file path validation failed: {e}"
                )))
            }
        };

        let commands = [
            ToolCommand::new(&self.config.tools.npx, &self.work_dir)
                .args(["depcruise", "--output-type", "json"])
                .args(&files),
            ToolCommand::new(&self.config.tools.depcruise, &self.work_dir)
                .args(["--output-type", "json"])
                .args(&files),
        ];

        match run_first_available(&commands, budget, self.config.max_helper_output) {
            Ok(stdout) => match serde_json::from_slice::<DepCruiseOutput>(&stdout) {
                Ok(report) => TierOutcome::Success(report),
                Err(e) => TierOutcome::Degraded(TierFailure::new(format!(
                    "failed to parse depcruise output: {e}"
                ))),
            },
            Err(e) => TierOutcome::Degraded(e.into()),
        }
    }
}

impl Analyzer for TypeScriptAnalyzer {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn analyze(
        &self,
        functions: &[ModifiedFunction],
        time_budget_secs: u64,
    ) -> Result<CallGraphResult, AnalyzerError> {
        let mut session =
            match govern(Language::TypeScript, functions, time_budget_secs, &self.config) {
                Governed::Empty(result) => return Ok(result),
                Governed::Run(session) => session,
            };

        let budget = *session.budget();
        let files = collect_unique_files(session.functions());
        let mut tally = ImpactTally::new();

        tracing::debug!(files = files.len(), "trying TypeScript helper");
        let graphs = match self.run_helper(&files, session.functions(), &budget) {
            TierOutcome::Success(output) => {
                map_helper_results(&output, session.functions(), &mut tally, is_typescript_test)
            }
            TierOutcome::Degraded(failure) => {
                session.degrade(&failure, "TypeScript helper unavailable");
                tracing::debug!("falling back to dependency-cruiser");
                match self.run_depcruise(&files, &budget) {
                    TierOutcome::Success(report) => {
                        map_module_dependencies(&report, session.functions(), &mut tally)
                    }
                    TierOutcome::Degraded(failure) => {
                        session.degrade(&failure, "dependency-cruiser unavailable");
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

fn is_typescript_test(file: &str, function: &str) -> bool {
    is_typescript_test_file(file) || is_typescript_test_function(function)
}

/// Strip a leading `./` and clean the path for comparison
fn normalize_module_path(path: &str) -> String {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    lexical_normalize(Path::new(trimmed))
        .to_string_lossy()
        .replace('\\', "/")
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Modules with a dependency resolving to `target`, in report order
fn find_importers<'a>(report: &'a DepCruiseOutput, target: &str) -> Vec<&'a str> {
    let target = normalize_module_path(target);
    report
        .modules
        .iter()
        .filter(|module| {
            module.dependencies.iter().any(|dep| {
                let resolved = normalize_module_path(&dep.resolved);
                !dep.resolved.is_empty() && (resolved == target || resolved.ends_with(&target))
            })
        })
        .map(|module| module.source.as_str())
        .collect()
}

/// Resolved dependencies of the module for `target`
fn find_imports<'a>(report: &'a DepCruiseOutput, target: &str) -> Vec<&'a str> {
    let target = normalize_module_path(target);
    let module = report
        .modules
        .iter()
        .find(|m| normalize_module_path(&m.source) == target)
        .or_else(|| {
            report.modules.iter().find(|m| {
                let source = normalize_module_path(&m.source);
                source.ends_with(&target) || target.ends_with(&source)
            })
        });

    module
        .map(|m| {
            m.dependencies
                .iter()
                .filter(|dep| !dep.resolved.is_empty())
                .map(|dep| dep.resolved.as_str())
                .collect()
        })
        .unwrap_or_default()
}

/// Approximate callers/callees as importing/imported modules
fn map_module_dependencies(
    report: &DepCruiseOutput,
    functions: &[ModifiedFunction],
    tally: &mut ImpactTally,
) -> Vec<FunctionCallGraph> {
    functions
        .iter()
        .map(|target| {
            let mut graph = FunctionCallGraph::empty(target);
            if target.file.is_empty() {
                return graph;
            }

            graph.callees = find_imports(report, &target.file)
                .into_iter()
                .map(|module| CallInfo {
                    function: base_name(module),
                    file: module.to_string(),
                    line: 0,
                    call_site: None,
                })
                .collect();

            let mut seen = HashSet::new();
            for importer in find_importers(report, &target.file) {
                if !seen.insert(importer) {
                    continue;
                }
                let name = base_name(importer);
                let test = is_typescript_test_file(importer);
                tally.record_caller(importer, "", test);
                if test {
                    graph.test_coverage.push(TestCoverage {
                        test_function: name.clone(),
                        file: importer.to_string(),
                        line: 0,
                    });
                }
                graph.callers.push(CallInfo {
                    function: name,
                    file: importer.to_string(),
                    line: 0,
                    call_site: None,
                });
            }
            graph
        })
        .collect()
}

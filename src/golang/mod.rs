//! Go backend: whole-program CHA call graph built from tree-sitter facts
//!
//! Pipeline: `loader` walks and parses the module, `program` indexes the
//! declarations, `cha` resolves call sites into edges, `resolve` maps diff
//! identities onto declarations and `traverse` walks callers for the
//! transitive count.

pub mod cha;
pub mod loader;
pub mod parser;
pub mod program;
pub mod resolve;
pub mod traverse;

use std::path::PathBuf;

use crate::analyzer::{govern, Analyzer, Governed};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::heuristics::is_go_test_function;
use crate::impact::ImpactTally;
use crate::language::Language;
use crate::types::{
    CallGraphResult, CallInfo, FunctionCallGraph, ModifiedFunction, TestCoverage,
};

pub use cha::{CallGraph, Edge};
pub use loader::{load_program, LoadError, LoadedProgram};
pub use parser::GoParser;
pub use program::{FuncId, Program};
pub use resolve::find_function;
pub use traverse::{transitive_callers, Traversal, TraversalLimits};

/// Go call-graph analyzer rooted at a module directory
pub struct GoAnalyzer {
    work_dir: PathBuf,
    config: AnalyzerConfig,
}

impl GoAnalyzer {
    pub fn new(work_dir: impl Into<PathBuf>, config: AnalyzerConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }
}

impl Analyzer for GoAnalyzer {
    fn language(&self) -> Language {
        Language::Go
    }

    fn analyze(
        &self,
        functions: &[ModifiedFunction],
        time_budget_secs: u64,
    ) -> Result<CallGraphResult, AnalyzerError> {
        let mut session = match govern(Language::Go, functions, time_budget_secs, &self.config) {
            Governed::Empty(result) => return Ok(result),
            Governed::Run(session) => session,
        };
        let budget = *session.budget();

        let loaded = match load_program(&self.work_dir, &budget) {
            Ok(loaded) => loaded,
            Err(LoadError::DeadlineExceeded) => {
                session.mark_timed_out("Package loading timed out");
                return Ok(session.finish());
            }
            Err(e) => {
                session.warn(format!("Failed to load packages: {e}"));
                session.mark_partial();
                return Ok(session.finish());
            }
        };
        for warning in loaded.warnings {
            session.warn(warning);
        }

        let program = loaded.program;
        if program.packages.is_empty() {
            session.warn("No packages found");
            session.mark_partial();
            return Ok(session.finish());
        }

        let graph = match CallGraph::build(&program, &budget) {
            Ok(graph) => graph,
            Err(_) => {
                session.mark_timed_out("Call graph construction timed out");
                return Ok(session.finish());
            }
        };

        let mut tally = ImpactTally::new();
        let mut starts = Vec::new();
        let mut completed = true;

        for function in session.functions().to_vec() {
            if budget.expired() {
                session.mark_timed_out("Analysis timed out during function processing");
                completed = false;
                break;
            }
            match find_function(&program, &function) {
                Some(id) => {
                    starts.push(id);
                    session.push(describe(&program, &graph, id, &function, &mut tally));
                }
                None => {
                    tracing::debug!(function = %function.name, file = %function.file, "no declaration matched");
                    session.push(FunctionCallGraph::empty(&function));
                }
            }
        }

        if !completed {
            tally.apply(session.impact_mut(), None);
            return Ok(session.finish());
        }

        let limits = TraversalLimits {
            max_depth: self.config.max_bfs_depth,
            max_callers: self.config.max_transitive_callers,
        };
        let traversal = transitive_callers(&program, &graph, &starts, limits, &budget);
        if traversal.capped {
            session.warn(format!(
                "Transitive caller search stopped at {} callers",
                limits.max_callers
            ));
            session.mark_partial();
        }
        if traversal.timed_out {
            session.mark_timed_out("Transitive caller search timed out");
        }

        tally.apply(session.impact_mut(), Some(traversal.keys.len()));
        Ok(session.finish())
    }
}

/// Direct callers, callees and tests of one resolved function
fn describe(
    program: &Program,
    graph: &CallGraph,
    id: FuncId,
    function: &ModifiedFunction,
    tally: &mut ImpactTally,
) -> FunctionCallGraph {
    let mut result = FunctionCallGraph::empty(function);

    for edge in graph.callers(id) {
        let name = program.display_name(edge.caller);
        let file = program.file_of(edge.caller).rel_path.clone();
        let is_test = is_go_test_function(&name);
        tally.record_caller(&file, &name, is_test);

        if is_test {
            result.test_coverage.push(TestCoverage {
                test_function: name.clone(),
                file: file.clone(),
                line: edge.line,
            });
        }
        result.callers.push(CallInfo {
            call_site: Some(call_site(&file, edge.line)),
            function: name,
            file,
            line: edge.line,
        });
    }

    let caller_file = &program.file_of(id).rel_path;
    for edge in graph.callees(id) {
        let callee = &program.funcs[edge.callee];
        result.callees.push(CallInfo {
            function: program.display_name(edge.callee),
            file: program.file_of(edge.callee).rel_path.clone(),
            line: callee.line,
            call_site: Some(call_site(caller_file, edge.line)),
        });
    }

    result
}

/// `base(file):line`
fn call_site(file: &str, line: usize) -> String {
    let base = file.rsplit('/').next().unwrap_or(file);
    format!("{base}:{line}")
}

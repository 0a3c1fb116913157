//! The `Analyzer` capability and the governance every backend runs first
//!
//! `govern` truncates oversized input, starts the time budget and computes
//! affected packages before any backend work. The resulting `Session`
//! guarantees that `finish` emits exactly one `FunctionCallGraph` per
//! retained function, whatever path the backend took to get there.

use crate::budget::TimeBudget;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, HelperError};
use crate::impact::affected_packages;
use crate::language::Language;
use crate::types::{CallGraphResult, FunctionCallGraph, ImpactAnalysis, ModifiedFunction};

/// Call-graph impact analysis for one language
pub trait Analyzer: Send + Sync {
    fn language(&self) -> Language;

    /// Analyse `functions` within `time_budget_secs` (0 selects the default).
    ///
    /// Degraded conditions such as missing tools, timeouts or empty graphs
    /// are reported through warnings and flags on an `Ok` result.
    fn analyze(
        &self,
        functions: &[ModifiedFunction],
        time_budget_secs: u64,
    ) -> Result<CallGraphResult, AnalyzerError>;
}

/// Outcome of one strategy tier
#[derive(Debug)]
pub enum TierOutcome<T> {
    Success(T),
    Degraded(TierFailure),
}

/// Why a tier could not produce data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub reason: String,
    pub deadline_exceeded: bool,
}

impl TierFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            deadline_exceeded: false,
        }
    }
}

impl From<HelperError> for TierFailure {
    fn from(err: HelperError) -> Self {
        Self {
            deadline_exceeded: err.is_deadline(),
            reason: err.to_string(),
        }
    }
}

/// Result of governance: nothing to do, or a running session
pub enum Governed {
    Empty(CallGraphResult),
    Run(Session),
}

/// Apply input governance and open a session
pub fn govern(
    language: Language,
    functions: &[ModifiedFunction],
    time_budget_secs: u64,
    config: &AnalyzerConfig,
) -> Governed {
    let mut result = CallGraphResult::new(language.as_str());
    if functions.is_empty() {
        return Governed::Empty(result);
    }

    let budget = TimeBudget::from_secs(time_budget_secs, config.default_time_budget);
    let mut retained = functions.to_vec();
    if retained.len() > config.max_modified_functions {
        let msg = format!(
            "Truncated modified functions from {} to {}",
            retained.len(),
            config.max_modified_functions
        );
        tracing::warn!(language = %language, "{}", msg);
        retained.truncate(config.max_modified_functions);
        result.warnings.push(msg);
        result.partial_results = true;
    }

    result.impact_analysis = ImpactAnalysis {
        affected_packages: affected_packages(&retained),
        ..ImpactAnalysis::default()
    };

    tracing::debug!(
        language = %language,
        functions = retained.len(),
        budget_secs = budget.limit().as_secs(),
        "starting call graph analysis"
    );

    Governed::Run(Session {
        language,
        result,
        functions: retained,
        budget,
    })
}

/// A governed analysis in progress
pub struct Session {
    language: Language,
    result: CallGraphResult,
    functions: Vec<ModifiedFunction>,
    budget: TimeBudget,
}

impl Session {
    /// Retained (post-truncation) functions
    pub fn functions(&self) -> &[ModifiedFunction] {
        &self.functions
    }

    pub fn budget(&self) -> &TimeBudget {
        &self.budget
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(language = %self.language, "{}", message);
        self.result.warnings.push(message);
    }

    pub fn mark_partial(&mut self) {
        self.result.partial_results = true;
    }

    /// Record a deadline abort
    pub fn mark_timed_out(&mut self, message: impl Into<String>) {
        self.result.time_budget_exceeded = true;
        self.result.partial_results = true;
        self.warn(message);
    }

    /// Record a degraded tier, flagging the deadline when it was the cause
    pub fn degrade(&mut self, failure: &TierFailure, context: &str) {
        let message = format!("{context}: {}", failure.reason);
        if failure.deadline_exceeded {
            self.mark_timed_out(message);
        } else {
            self.warn(message);
        }
    }

    pub fn push(&mut self, graph: FunctionCallGraph) {
        self.result.modified_functions.push(graph);
    }

    pub fn impact_mut(&mut self) -> &mut ImpactAnalysis {
        &mut self.result.impact_analysis
    }

    /// Close the session, filling empty entries for functions not reached
    pub fn finish(mut self) -> CallGraphResult {
        let done = self.result.modified_functions.len();
        for function in self.functions.iter().skip(done) {
            self.result
                .modified_functions
                .push(FunctionCallGraph::empty(function));
        }
        self.result.modified_functions.truncate(self.functions.len());

        tracing::debug!(
            language = %self.language,
            direct = self.result.impact_analysis.direct_callers,
            transitive = self.result.impact_analysis.transitive_callers,
            tests = self.result.impact_analysis.affected_tests,
            elapsed_ms = self.budget.elapsed().as_millis() as u64,
            "call graph analysis finished"
        );
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions(n: usize) -> Vec<ModifiedFunction> {
        (0..n)
            .map(|i| ModifiedFunction::new(format!("F{i}"), format!("pkg{}/f.go", i % 3), format!("pkg{}", i % 3)))
            .collect()
    }

    #[test]
    fn test_empty_input_returns_immediately() {
        match govern(Language::Go, &[], 0, &AnalyzerConfig::default()) {
            Governed::Empty(result) => {
                assert_eq!(result.language, "go");
                assert!(result.modified_functions.is_empty());
                assert!(result.warnings.is_empty());
                assert!(result.impact_analysis.affected_packages.is_empty());
                assert!(!result.partial_results);
            }
            Governed::Run(_) => panic!("expected empty result"),
        }
    }

    #[test]
    fn test_truncation_and_fill() {
        let input = functions(600);
        let session = match govern(Language::Python, &input, 0, &AnalyzerConfig::default()) {
            Governed::Run(session) => session,
            Governed::Empty(_) => panic!("expected session"),
        };
        assert_eq!(session.functions().len(), 500);
        let result = session.finish();
        assert_eq!(result.modified_functions.len(), 500);
        assert!(result.partial_results);
        assert!(result.warnings.iter().any(|w| w.contains("500")));
        for (graph, function) in result.modified_functions.iter().zip(&input) {
            assert_eq!(graph.function, function.name);
        }
        assert_eq!(result.impact_analysis.affected_packages, vec!["pkg0", "pkg1", "pkg2"]);
    }

    #[test]
    fn test_degrade_on_deadline_sets_flags() {
        let input = functions(2);
        let mut session = match govern(Language::TypeScript, &input, 5, &AnalyzerConfig::default()) {
            Governed::Run(session) => session,
            Governed::Empty(_) => panic!("expected session"),
        };
        session.degrade(&HelperError::DeadlineExceeded(std::time::Duration::from_secs(5)).into(), "helper failed");
        let result = session.finish();
        assert!(result.time_budget_exceeded);
        assert!(result.partial_results);
        assert!(result.warnings[0].starts_with("helper failed: "));
        assert_eq!(result.modified_functions.len(), 2);
    }
}

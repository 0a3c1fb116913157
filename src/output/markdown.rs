//! Markdown impact summary for reviewers

use std::fmt::Write as _;

use crate::types::{CallGraphResult, CallInfo, FunctionCallGraph, TestCoverage};

const MAX_CALLERS_SHOWN: usize = 10;
const MAX_CALLEES_SHOWN: usize = 10;

/// Risk bucket by direct caller count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactLevel {
    /// 3 or more callers
    High,
    /// 1 or 2 callers
    Medium,
    /// no callers
    Low,
}

impl ImpactLevel {
    pub fn for_callers(count: usize) -> Self {
        match count {
            0 => ImpactLevel::Low,
            1 | 2 => ImpactLevel::Medium,
            _ => ImpactLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::High => "HIGH",
            ImpactLevel::Medium => "MEDIUM",
            ImpactLevel::Low => "LOW",
        }
    }

    fn heading(&self) -> (&'static str, &'static str) {
        match self {
            ImpactLevel::High => (
                "High Impact Functions",
                "Functions with 3 or more callers - changes here have wide-reaching effects.",
            ),
            ImpactLevel::Medium => (
                "Medium Impact Functions",
                "Functions with 1-2 callers - changes affect a limited scope.",
            ),
            ImpactLevel::Low => (
                "Low Impact Functions",
                "Functions with no callers - may be entry points, tests, or dead code.",
            ),
        }
    }
}

/// Render the impact summary document for one language
pub fn render_impact_summary(result: &CallGraphResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Impact Summary\n");
    let _ = writeln!(out, "**Language:** {}\n", result.language);

    render_warnings(&mut out, result);
    render_metrics(&mut out, result);

    for level in [ImpactLevel::High, ImpactLevel::Medium, ImpactLevel::Low] {
        let functions: Vec<&FunctionCallGraph> = result
            .modified_functions
            .iter()
            .filter(|f| ImpactLevel::for_callers(f.callers.len()) == level)
            .collect();
        if functions.is_empty() {
            continue;
        }
        let (title, blurb) = level.heading();
        let _ = writeln!(out, "## {title}\n\n{blurb}\n");
        for function in functions {
            render_function(&mut out, function, level);
        }
    }

    if result.modified_functions.is_empty() {
        out.push_str("## No Modified Functions Analyzed\n\n");
        out.push_str("No functions were found in the modified files for call graph analysis.\n\n");
    }
    out
}

fn render_warnings(out: &mut String, result: &CallGraphResult) {
    if !result.time_budget_exceeded && !result.partial_results && result.warnings.is_empty() {
        return;
    }
    out.push_str("## Warnings\n\n");
    if result.time_budget_exceeded {
        out.push_str(
            "- **Time Budget Exceeded:** Analysis was stopped before completion due to time constraints.\n",
        );
    }
    if result.partial_results {
        out.push_str("- **Partial Results:** Some functions could not be fully analyzed.\n");
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "- {warning}");
    }
    out.push('\n');
}

fn render_metrics(out: &mut String, result: &CallGraphResult) {
    let impact = &result.impact_analysis;
    out.push_str("## Summary Metrics\n\n");
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(out, "| Modified Functions | {} |", result.modified_functions.len());
    let _ = writeln!(out, "| Direct Callers | {} |", impact.direct_callers);
    let _ = writeln!(out, "| Transitive Callers | {} |", impact.transitive_callers);
    let _ = writeln!(out, "| Affected Tests | {} |", impact.affected_tests);
    let _ = writeln!(out, "| Affected Packages | {} |", impact.affected_packages.len());
    out.push('\n');

    if !impact.affected_packages.is_empty() {
        out.push_str("### Affected Packages\n\n");
        for package in &impact.affected_packages {
            let _ = writeln!(out, "- `{package}`");
        }
        out.push('\n');
    }
}

fn render_function(out: &mut String, function: &FunctionCallGraph, level: ImpactLevel) {
    let _ = writeln!(out, "### `{}`\n", function.function);
    let _ = writeln!(out, "**File:** `{}`", function.file);
    let _ = writeln!(out, "**Risk Level:** {}", level.as_str());
    let _ = writeln!(out, "**Callers:** {}\n", function.callers.len());

    render_tests(out, &function.test_coverage);
    render_callers(out, &function.callers);
    render_callees(out, &function.callees);
    out.push_str("---\n\n");
}

fn render_tests(out: &mut String, tests: &[TestCoverage]) {
    if tests.is_empty() {
        out.push_str("**Test Coverage:** :warning: No tests found\n\n");
        return;
    }
    out.push_str("**Test Coverage:** :white_check_mark: Has tests\n\n");
    out.push_str("<details>\n<summary>Tests covering this function</summary>\n\n");
    for test in tests {
        let _ = writeln!(out, "- `{}` ({}:{})", test.test_function, test.file, test.line);
    }
    out.push_str("\n</details>\n\n");
}

fn render_callers(out: &mut String, callers: &[CallInfo]) {
    if callers.is_empty() {
        out.push_str("**Direct Callers:** None\n\n");
        return;
    }
    out.push_str("**Direct Callers:**\n\n");
    for caller in callers.iter().take(MAX_CALLERS_SHOWN) {
        match &caller.call_site {
            Some(site) => {
                let _ = writeln!(
                    out,
                    "- `{}` at `{}:{}` (call site: {site})",
                    caller.function, caller.file, caller.line
                );
            }
            None => {
                let _ = writeln!(out, "- `{}` at `{}:{}`", caller.function, caller.file, caller.line);
            }
        }
    }
    render_overflow(out, callers.len(), MAX_CALLERS_SHOWN);
    out.push('\n');
}

fn render_callees(out: &mut String, callees: &[CallInfo]) {
    if callees.is_empty() {
        out.push_str("**Calls:** None\n\n");
        return;
    }
    out.push_str("**Calls:**\n\n");
    for callee in callees.iter().take(MAX_CALLEES_SHOWN) {
        if !callee.file.is_empty() && callee.line > 0 {
            let _ = writeln!(out, "- `{}` at `{}:{}`", callee.function, callee.file, callee.line);
        } else {
            let _ = writeln!(out, "- `{}`", callee.function);
        }
    }
    render_overflow(out, callees.len(), MAX_CALLEES_SHOWN);
    out.push('\n');
}

fn render_overflow(out: &mut String, total: usize, shown: usize) {
    if total > shown {
        let _ = writeln!(out, "- ... and {} more", total - shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImpactAnalysis, ModifiedFunction};

    fn caller(name: &str, line: usize) -> CallInfo {
        CallInfo {
            function: name.to_string(),
            file: "internal/handler/signup.go".to_string(),
            line,
            call_site: Some(format!("signup.go:{line}")),
        }
    }

    fn sample() -> CallGraphResult {
        let mut busy = FunctionCallGraph::empty(&ModifiedFunction::new("Busy", "a/a.go", "a"));
        busy.callers = (1..=12).map(|i| caller(&format!("C{i}"), i)).collect();

        let mut create =
            FunctionCallGraph::empty(&ModifiedFunction::new("CreateUser", "internal/service/user.go", "service"));
        create.callers = vec![caller("HandleSignup", 6)];
        create.test_coverage = vec![TestCoverage {
            test_function: "TestCreateUser".to_string(),
            file: "internal/service/user_test.go".to_string(),
            line: 6,
        }];

        let idle = FunctionCallGraph::empty(&ModifiedFunction::new("Idle", "a/b.go", "a"));

        let mut result = CallGraphResult::new("go");
        result.modified_functions = vec![idle, create, busy];
        result.impact_analysis = ImpactAnalysis {
            direct_callers: 13,
            transitive_callers: 4,
            affected_tests: 1,
            affected_packages: vec!["internal/service".to_string(), "a".to_string()],
        };
        result
    }

    #[test]
    fn test_levels() {
        assert_eq!(ImpactLevel::for_callers(0), ImpactLevel::Low);
        assert_eq!(ImpactLevel::for_callers(2), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::for_callers(3), ImpactLevel::High);
    }

    #[test]
    fn test_sections_in_order() {
        let md = render_impact_summary(&sample());
        assert!(md.starts_with("# Impact Summary\n\n**Language:** go\n"));
        assert!(!md.contains("## Warnings"));
        assert!(md.contains("| Direct Callers | 13 |"));
        assert!(md.contains("- `internal/service`"));

        let high = md.find("## High Impact Functions").unwrap();
        let medium = md.find("## Medium Impact Functions").unwrap();
        let low = md.find("## Low Impact Functions").unwrap();
        assert!(high < medium && medium < low);

        assert!(md.contains("- `HandleSignup` at `internal/handler/signup.go:6` (call site: signup.go:6)"));
        assert!(md.contains(":white_check_mark: Has tests"));
        assert!(md.contains("- `TestCreateUser` (internal/service/user_test.go:6)"));
        assert!(md.contains("- ... and 2 more"));
        assert!(!md.contains("`C11`"));
    }

    #[test]
    fn test_warnings_and_empty() {
        let mut result = CallGraphResult::new("python");
        result.partial_results = true;
        result.time_budget_exceeded = true;
        result.warnings.push("pyan3 not available: pyan3 not found in PATH".to_string());

        let md = render_impact_summary(&result);
        assert!(md.contains("## Warnings"));
        assert!(md.contains("**Time Budget Exceeded:**"));
        assert!(md.contains("**Partial Results:**"));
        assert!(md.contains("- pyan3 not available: pyan3 not found in PATH"));
        assert!(md.contains("## No Modified Functions Analyzed"));
    }
}

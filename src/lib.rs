//! Ripple: call-graph impact analysis for code review
//!
//! Given the functions a change touched, ripple reports who calls them
//! (directly and transitively), which tests exercise them and which
//! packages are affected. Each language has its own backend behind the
//! [`Analyzer`] trait:
//!
//! - **Go**: a whole-program call graph built from tree-sitter facts using
//!   class hierarchy analysis, walked with a bounded BFS
//! - **TypeScript** and **Python**: an external helper for function-level
//!   call sites, a module-level dependency tool as fallback, and an empty
//!   result when neither is installed
//!
//! # Position Conventions
//!
//! - **Line positions**: 1-indexed
//! - **File paths** in Go results: relative to the working directory, `/`-separated
//!
//! # Degradation
//!
//! `Analyzer::analyze` only fails on caller misuse. Missing tools, timeouts
//! and oversized inputs are reported through `warnings`,
//! `partial_results` and `time_budget_exceeded` on an otherwise valid
//! [`CallGraphResult`].

pub mod analyzer;
pub mod budget;
pub mod config;
pub mod error;
pub mod factory;
pub mod golang;
pub mod helper;
pub mod heuristics;
pub mod impact;
pub mod input;
pub mod language;
pub mod output;
pub mod python;
pub mod subprocess;
pub mod types;
pub mod typescript;
pub mod validation;
pub mod version;

pub use analyzer::Analyzer;
pub use budget::TimeBudget;
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, HelperError};
pub use factory::{new_analyzer, new_analyzer_with_config};
pub use golang::GoAnalyzer;
pub use language::{
    is_supported, normalize_language, supported_languages, supported_languages_normalized,
    Language,
};
pub use python::PythonAnalyzer;
pub use types::{
    CallGraphResult, CallInfo, FunctionCallGraph, ImpactAnalysis, ModifiedFunction, TestCoverage,
};
pub use typescript::TypeScriptAnalyzer;
pub use validation::PathValidationError;

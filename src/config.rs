//! Analyzer configuration
//!
//! Limits default to the values the review pipeline has always used.
//! `from_env` lets deployments point at helper scripts and toolchains
//! without code changes.

use std::path::PathBuf;
use std::time::Duration;

/// Default cap on modified functions analysed per run
pub const DEFAULT_MAX_MODIFIED_FUNCTIONS: usize = 500;

/// Default cap on transitive caller keys collected by the BFS
pub const DEFAULT_MAX_TRANSITIVE_CALLERS: usize = 10_000;

/// Default BFS depth limit
pub const DEFAULT_MAX_BFS_DEPTH: usize = 10;

/// Default time budget when the caller passes zero
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(120);

/// Default cap on helper stdout (50 MiB)
pub const DEFAULT_MAX_HELPER_OUTPUT: usize = 50 * 1024 * 1024;

/// Command names of the external tools the helper tiers invoke.
///
/// Each entry is looked up in PATH (or used directly when it contains a
/// path separator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    /// Interpreters tried in order for the Python helper and pyan
    pub python: Vec<String>,
    pub node: String,
    pub npx: String,
    pub depcruise: String,
    pub pyan3: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            python: vec!["python3".to_string(), "python".to_string()],
            node: "node".to_string(),
            npx: "npx".to_string(),
            depcruise: "depcruise".to_string(),
            pyan3: "pyan3".to_string(),
        }
    }
}

/// Limits and tool locations shared by all backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub max_modified_functions: usize,
    pub default_time_budget: Duration,
    pub max_transitive_callers: usize,
    pub max_bfs_depth: usize,
    pub max_helper_output: usize,
    pub tools: ToolCommands,
    /// Explicit `call_graph.py` location
    pub python_helper: Option<PathBuf>,
    /// Explicit `call-graph.ts`/`.js` location
    pub typescript_helper: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_modified_functions: DEFAULT_MAX_MODIFIED_FUNCTIONS,
            default_time_budget: DEFAULT_TIME_BUDGET,
            max_transitive_callers: DEFAULT_MAX_TRANSITIVE_CALLERS,
            max_bfs_depth: DEFAULT_MAX_BFS_DEPTH,
            max_helper_output: DEFAULT_MAX_HELPER_OUTPUT,
            tools: ToolCommands::default(),
            python_helper: None,
            typescript_helper: None,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults overlaid with `RIPPLE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("RIPPLE_PYTHON_HELPER") {
            config.python_helper = Some(PathBuf::from(path));
        }
        if let Some(path) = get("RIPPLE_TS_HELPER") {
            config.typescript_helper = Some(PathBuf::from(path));
        }
        if let Some(python) = get("RIPPLE_PYTHON") {
            config.tools.python = vec![python];
        }
        if let Some(node) = get("RIPPLE_NODE") {
            config.tools.node = node;
        }
        if let Some(npx) = get("RIPPLE_NPX") {
            config.tools.npx = npx;
        }
        if let Some(depcruise) = get("RIPPLE_DEPCRUISE") {
            config.tools.depcruise = depcruise;
        }
        if let Some(pyan3) = get("RIPPLE_PYAN3") {
            config.tools.pyan3 = pyan3;
        }
        if let Some(raw) = get("RIPPLE_DEFAULT_TIME_BUDGET_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.default_time_budget = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid RIPPLE_DEFAULT_TIME_BUDGET_SECS"
                ),
            }
        }

        config
    }
}

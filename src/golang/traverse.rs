//! Bounded breadth-first search over caller edges

use std::collections::{HashSet, VecDeque};

use super::cha::CallGraph;
use super::program::{FuncId, Program};
use crate::budget::TimeBudget;

/// Limits for one transitive-caller search
#[derive(Debug, Clone, Copy)]
pub struct TraversalLimits {
    pub max_depth: usize,
    pub max_callers: usize,
}

#[derive(Debug, Default)]
pub struct Traversal {
    /// `file:function` keys of every caller reached, direct callers included
    pub keys: HashSet<String>,
    /// Stopped because `max_callers` keys were collected
    pub capped: bool,
    /// Stopped because the budget ran out
    pub timed_out: bool,
}

/// Collect callers reachable from `starts` within `limits`.
///
/// All starts are at depth 0 and count as visited, so cycles through them
/// (or through any caller) are walked once.
pub fn transitive_callers(
    program: &Program,
    graph: &CallGraph,
    starts: &[FuncId],
    limits: TraversalLimits,
    budget: &TimeBudget,
) -> Traversal {
    let mut result = Traversal::default();
    let mut visited: HashSet<FuncId> = starts.iter().copied().collect();
    let mut queue: VecDeque<(FuncId, usize)> = starts.iter().map(|id| (*id, 0)).collect();

    'search: while let Some((current, depth)) = queue.pop_front() {
        if budget.expired() {
            result.timed_out = true;
            break;
        }
        if depth >= limits.max_depth {
            continue;
        }

        for edge in graph.callers(current) {
            if !visited.insert(edge.caller) {
                continue;
            }
            result.keys.insert(program.key(edge.caller));
            if result.keys.len() >= limits.max_callers {
                result.capped = true;
                break 'search;
            }
            queue.push_back((edge.caller, depth + 1));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golang::test_support::program;
    use std::time::Duration;

    const LIMITS: TraversalLimits = TraversalLimits {
        max_depth: 10,
        max_callers: 10_000,
    };

    fn budget() -> TimeBudget {
        TimeBudget::new(Duration::from_secs(30))
    }

    fn id(program: &Program, name: &str) -> FuncId {
        program.package_function(0, name).unwrap()
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let program = program(
            None,
            &[("r/r.go", "package r\nfunc A() { B() }\nfunc B() { A() }\nfunc C() { A() }\n")],
        );
        let graph = CallGraph::build(&program, &budget()).unwrap();
        let result = transitive_callers(&program, &graph, &[id(&program, "A")], LIMITS, &budget());

        let mut keys: Vec<_> = result.keys.into_iter().collect();
        keys.sort();
        assert_eq!(keys, vec!["r/r.go:B", "r/r.go:C"]);
        assert!(!result.capped);
        assert!(!result.timed_out);
    }

    #[test]
    fn test_depth_limit() {
        let program = program(
            None,
            &[(
                "c/c.go",
                "package c\nfunc F0() {}\nfunc F1() { F0() }\nfunc F2() { F1() }\nfunc F3() { F2() }\n",
            )],
        );
        let graph = CallGraph::build(&program, &budget()).unwrap();
        let limits = TraversalLimits {
            max_depth: 2,
            ..LIMITS
        };
        let result = transitive_callers(&program, &graph, &[id(&program, "F0")], limits, &budget());
        assert_eq!(result.keys.len(), 2);
        assert!(result.keys.contains("c/c.go:F2"));
        assert!(!result.keys.contains("c/c.go:F3"));
    }

    #[test]
    fn test_cap_stops_search() {
        let program = program(
            None,
            &[(
                "w/w.go",
                "package w\nfunc T() {}\nfunc A() { T() }\nfunc B() { T() }\nfunc C() { T() }\n",
            )],
        );
        let graph = CallGraph::build(&program, &budget()).unwrap();
        let limits = TraversalLimits {
            max_callers: 2,
            ..LIMITS
        };
        let result = transitive_callers(&program, &graph, &[id(&program, "T")], limits, &budget());
        assert_eq!(result.keys.len(), 2);
        assert!(result.capped);
    }

    #[test]
    fn test_expired_budget() {
        let program = program(None, &[("a/a.go", "package a\nfunc A() {}\nfunc B() { A() }\n")]);
        let graph = CallGraph::build(&program, &budget()).unwrap();
        let result = transitive_callers(
            &program,
            &graph,
            &[id(&program, "A")],
            LIMITS,
            &TimeBudget::new(Duration::ZERO),
        );
        assert!(result.timed_out);
        assert!(result.keys.is_empty());
    }
}

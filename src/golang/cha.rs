//! Class hierarchy analysis over a `Program`
//!
//! Each call site is resolved conservatively: a call through an interface
//! reaches every method whose receiver type has all of the interface's
//! methods (promoted ones included), and a call on a value of unknown type
//! reaches every method of that name. A value whose type comes from outside
//! the program counts as unknown, since program types may implement it.
//! Functions of outside packages, builtins and function values produce no
//! edge.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use super::parser::{CallTarget, TypeKind, TypeRef};
use super::program::{FuncId, ImportTarget, Program};
use crate::budget::TimeBudget;

/// Functions resolved between deadline checks
const DEADLINE_STRIDE: usize = 64;

#[derive(Debug, Error)]
#[error("call graph construction exceeded the time budget")]
pub struct BuildDeadline;

/// A resolved call: `caller` invokes `callee` at `line:column` in the caller's file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub caller: FuncId,
    pub callee: FuncId,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    edges: Vec<Edge>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
}

impl CallGraph {
    /// Resolve every call site in `program`
    pub fn build(program: &Program, budget: &TimeBudget) -> Result<CallGraph, BuildDeadline> {
        let mut graph = CallGraph {
            edges: Vec::new(),
            incoming: vec![Vec::new(); program.funcs.len()],
            outgoing: vec![Vec::new(); program.funcs.len()],
        };
        let mut resolver = Resolver::new(program);

        for (caller, func) in program.funcs.iter().enumerate() {
            if caller % DEADLINE_STRIDE == 0 && budget.expired() {
                return Err(BuildDeadline);
            }
            for site in &func.calls {
                for callee in resolver.resolve(caller, &site.target) {
                    graph.add_edge(Edge {
                        caller,
                        callee,
                        line: site.line,
                        column: site.column,
                    });
                }
            }
        }

        tracing::debug!(
            functions = program.funcs.len(),
            edges = graph.edge_count(),
            "built CHA call graph"
        );
        Ok(graph)
    }

    fn add_edge(&mut self, edge: Edge) {
        let idx = self.edges.len();
        self.incoming[edge.callee].push(idx);
        self.outgoing[edge.caller].push(idx);
        self.edges.push(edge);
    }

    /// Edges into `id`, in caller declaration order
    pub fn callers(&self, id: FuncId) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_list(&self.incoming, id)
    }

    /// Edges out of `id`, in call-site order
    pub fn callees(&self, id: FuncId) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_list(&self.outgoing, id)
    }

    fn edge_list<'a>(
        &'a self,
        index: &'a [Vec<usize>],
        id: FuncId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        index
            .get(id)
            .into_iter()
            .flatten()
            .map(move |idx| &self.edges[*idx])
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Per-build resolution state with the interface implementer cache
struct Resolver<'p> {
    program: &'p Program,
    /// Method sets of every type that can carry methods
    method_sets: Vec<BTreeMap<&'p str, Vec<FuncId>>>,
    implementers: HashMap<(usize, String), Vec<FuncId>>,
    interface_methods: HashMap<usize, HashSet<String>>,
}

impl<'p> Resolver<'p> {
    fn new(program: &'p Program) -> Self {
        let method_sets = program
            .receiver_types()
            .into_iter()
            .map(|(package, name)| program.method_set(package, name))
            .collect();
        Self {
            program,
            method_sets,
            implementers: HashMap::new(),
            interface_methods: HashMap::new(),
        }
    }

    /// Callees of one call site made from `caller`; deduplicated
    fn resolve(&mut self, caller: FuncId, target: &CallTarget) -> Vec<FuncId> {
        let func = &self.program.funcs[caller];
        let mut targets = match target {
            CallTarget::Func { name } => self.resolve_func(func.package, func.file, name),
            CallTarget::Qualified { qualifier, name } => {
                match self.program.resolve_import(func.file, qualifier) {
                    ImportTarget::Program(pkg) => {
                        self.program.package_function(pkg, name).into_iter().collect()
                    }
                    ImportTarget::External => Vec::new(),
                    ImportTarget::NotImport => self.program.methods_named(name).to_vec(),
                }
            }
            CallTarget::Method { name, recv: None } => self.program.methods_named(name).to_vec(),
            CallTarget::Method {
                name,
                recv: Some(recv),
            } => self.resolve_method(func.package, func.file, recv, name),
        };
        let mut seen = HashSet::new();
        targets.retain(|id| seen.insert(*id));
        targets
    }

    fn resolve_func(&self, package: usize, file: usize, name: &str) -> Vec<FuncId> {
        if let Some(id) = self.program.package_function(package, name) {
            return vec![id];
        }
        self.program
            .dot_imports(file)
            .into_iter()
            .filter_map(|pkg| self.program.package_function(pkg, name))
            .take(1)
            .collect()
    }

    fn resolve_method(
        &mut self,
        package: usize,
        file: usize,
        recv: &TypeRef,
        name: &str,
    ) -> Vec<FuncId> {
        let type_package = match &recv.qualifier {
            None => package,
            Some(qualifier) => match self.program.resolve_import(file, qualifier) {
                ImportTarget::Program(pkg) => pkg,
                ImportTarget::External | ImportTarget::NotImport => {
                    return self.program.methods_named(name).to_vec()
                }
            },
        };

        let Some(type_idx) = self.program.type_index(type_package, &recv.name) else {
            return self.program.methods_named(name).to_vec();
        };

        match &self.program.types[type_idx].kind {
            TypeKind::Interface { .. } => self.interface_targets(type_idx, name),
            _ => match self.program.method(type_package, &recv.name, name) {
                Some(id) => vec![id],
                None => {
                    let promoted = self
                        .program
                        .method_set(type_package, &recv.name)
                        .remove(name)
                        .unwrap_or_default();
                    if promoted.is_empty() {
                        self.program.methods_named(name).to_vec()
                    } else {
                        promoted
                    }
                }
            },
        }
    }

    /// Methods `name` on every type implementing interface `type_idx`
    fn interface_targets(&mut self, type_idx: usize, name: &str) -> Vec<FuncId> {
        let key = (type_idx, name.to_string());
        if let Some(cached) = self.implementers.get(&key) {
            return cached.clone();
        }

        let required = self.interface_method_names(type_idx);
        let mut targets: Vec<FuncId> = Vec::new();
        if required.contains(name) {
            targets = self
                .method_sets
                .iter()
                .filter(|set| required.iter().all(|m| set.contains_key(m.as_str())))
                .filter_map(|set| set.get(name))
                .flatten()
                .copied()
                .collect();
        }
        // declared through an interface we cannot see, or implemented
        // through embedded types outside the program
        if targets.is_empty() {
            targets = self.program.methods_named(name).to_vec();
        }

        self.implementers.insert(key, targets.clone());
        targets
    }

    /// Method names of an interface, embedded interfaces included
    fn interface_method_names(&mut self, type_idx: usize) -> HashSet<String> {
        if let Some(names) = self.interface_methods.get(&type_idx) {
            return names.clone();
        }
        let mut names = HashSet::new();
        let mut visited = HashSet::new();
        self.collect_interface_methods(type_idx, &mut names, &mut visited);
        self.interface_methods.insert(type_idx, names.clone());
        names
    }

    fn collect_interface_methods(
        &self,
        type_idx: usize,
        names: &mut HashSet<String>,
        visited: &mut HashSet<usize>,
    ) {
        if !visited.insert(type_idx) {
            return;
        }
        let decl = &self.program.types[type_idx];
        let TypeKind::Interface { methods, embeds } = &decl.kind else {
            return;
        };
        names.extend(methods.iter().cloned());

        for embed in embeds {
            let package = match &embed.qualifier {
                None => Some(decl.package),
                Some(qualifier) => match self.program.resolve_import(decl.file, qualifier) {
                    ImportTarget::Program(pkg) => Some(pkg),
                    _ => None,
                },
            };
            if let Some(embedded) =
                package.and_then(|pkg| self.program.type_index(pkg, &embed.name))
            {
                self.collect_interface_methods(embedded, names, visited);
            }
        }
    }
}

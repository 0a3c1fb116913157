//! Whole-program index over the parsed Go files
//!
//! Files are grouped into packages by (directory, package clause), so an
//! external `foo_test` package is distinct from `foo` in the same
//! directory while in-package `_test.go` files share their package.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use super::parser::{CallSite, FileSyntax, ImportSyntax, ReceiverSyntax, TypeKind};
use crate::impact::caller_key;

pub type FuncId = usize;

/// One parsed source file, with its path relative to the working directory
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// `/`-separated, relative to the working directory
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub syntax: FileSyntax,
}

#[derive(Debug, Clone)]
pub struct Package {
    /// `/`-separated directory relative to the working directory, `""` for the root
    pub dir: String,
    pub name: String,
    pub import_path: String,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub package: usize,
    pub imports: Vec<ImportSyntax>,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub package: usize,
    pub file: usize,
    pub name: String,
    pub receiver: Option<ReceiverSyntax>,
    pub line: usize,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub package: usize,
    pub file: usize,
    pub name: String,
    pub kind: TypeKind,
}

/// How an identifier used as `q.X` relates to the file's imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    /// Import of a package inside the analysed program
    Program(usize),
    /// Import of a package outside the program (stdlib, dependencies)
    External,
    /// Not an import name in this file
    NotImport,
}

#[derive(Debug, Default)]
pub struct Program {
    pub packages: Vec<Package>,
    pub files: Vec<SourceFile>,
    pub funcs: Vec<FuncDecl>,
    pub types: Vec<TypeDecl>,
    functions_by_name: HashMap<(usize, String), FuncId>,
    methods_by_type: BTreeMap<(usize, String), Vec<FuncId>>,
    methods_by_name: HashMap<String, Vec<FuncId>>,
    types_by_name: HashMap<(usize, String), usize>,
    packages_by_import: HashMap<String, usize>,
}

impl Program {
    /// Index `parsed` files (already in deterministic order).
    ///
    /// Import paths are `module_path/dir`, or the bare directory when the
    /// project has no `go.mod`.
    pub fn build(module_path: Option<&str>, parsed: Vec<ParsedFile>) -> Program {
        let mut program = Program::default();
        let mut package_ids: HashMap<(String, String), usize> = HashMap::new();

        for file in parsed {
            let Some(package_name) = file.syntax.package.clone() else {
                continue;
            };
            let dir = match file.rel_path.rfind('/') {
                Some(idx) => file.rel_path[..idx].to_string(),
                None => String::new(),
            };

            let package = *package_ids
                .entry((dir.clone(), package_name.clone()))
                .or_insert_with(|| {
                    let import_path = match (module_path, dir.is_empty()) {
                        (Some(module), true) => module.to_string(),
                        (Some(module), false) => format!("{module}/{dir}"),
                        (None, true) => ".".to_string(),
                        (None, false) => dir.clone(),
                    };
                    program.packages.push(Package {
                        dir: dir.clone(),
                        name: package_name.clone(),
                        import_path,
                    });
                    program.packages.len() - 1
                });

            let file_id = program.files.len();
            program.files.push(SourceFile {
                rel_path: file.rel_path,
                abs_path: file.abs_path,
                package,
                imports: file.syntax.imports,
            });

            for ty in file.syntax.types {
                program.types.push(TypeDecl {
                    package,
                    file: file_id,
                    name: ty.name,
                    kind: ty.kind,
                });
            }
            for func in file.syntax.functions {
                program.funcs.push(FuncDecl {
                    package,
                    file: file_id,
                    name: func.name,
                    receiver: func.receiver,
                    line: func.line,
                    calls: func.calls,
                });
            }
        }

        program.index();
        program
    }

    fn index(&mut self) {
        for (id, func) in self.funcs.iter().enumerate() {
            match &func.receiver {
                Some(recv) => {
                    self.methods_by_type
                        .entry((func.package, recv.type_name.clone()))
                        .or_default()
                        .push(id);
                    self.methods_by_name
                        .entry(func.name.clone())
                        .or_default()
                        .push(id);
                }
                None => {
                    self.functions_by_name
                        .entry((func.package, func.name.clone()))
                        .or_insert(id);
                }
            }
        }
        for (idx, ty) in self.types.iter().enumerate() {
            self.types_by_name
                .entry((ty.package, ty.name.clone()))
                .or_insert(idx);
        }
        for (idx, package) in self.packages.iter().enumerate() {
            if package.name.ends_with("_test") {
                continue;
            }
            self.packages_by_import
                .entry(package.import_path.clone())
                .or_insert(idx);
        }
    }

    /// Package-level function `name` in `package`
    pub fn package_function(&self, package: usize, name: &str) -> Option<FuncId> {
        self.functions_by_name.get(&(package, name.to_string())).copied()
    }

    /// Method `name` declared on `type_name` in `package`
    pub fn method(&self, package: usize, type_name: &str, name: &str) -> Option<FuncId> {
        self.methods_by_type
            .get(&(package, type_name.to_string()))?
            .iter()
            .copied()
            .find(|id| self.funcs[*id].name == name)
    }

    /// Every method in the program called `name`
    pub fn methods_named(&self, name: &str) -> &[FuncId] {
        self.methods_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Types that can carry methods: those with declared methods and
    /// structs with embedded fields, in deterministic order
    pub fn receiver_types(&self) -> Vec<(usize, &str)> {
        let mut types: BTreeSet<(usize, &str)> = self
            .methods_by_type
            .keys()
            .map(|(package, name)| (*package, name.as_str()))
            .collect();
        for ty in &self.types {
            if matches!(&ty.kind, TypeKind::Struct { embeds } if !embeds.is_empty()) {
                types.insert((ty.package, ty.name.as_str()));
            }
        }
        types.into_iter().collect()
    }

    /// Method set of a named type, keyed by method name.
    ///
    /// Methods promoted from embedded fields are included unless the type
    /// declares a method of the same name. Methods of an embedded interface
    /// are present with no declarations behind them.
    pub fn method_set(&self, package: usize, type_name: &str) -> BTreeMap<&str, Vec<FuncId>> {
        let mut path = Vec::new();
        self.collect_method_set(package, type_name, &mut path)
    }

    fn collect_method_set<'a>(
        &'a self,
        package: usize,
        type_name: &str,
        path: &mut Vec<(usize, String)>,
    ) -> BTreeMap<&'a str, Vec<FuncId>> {
        let key = (package, type_name.to_string());
        let mut set: BTreeMap<&str, Vec<FuncId>> = BTreeMap::new();
        if path.contains(&key) {
            return set;
        }
        if let Some(ids) = self.methods_by_type.get(&key) {
            for id in ids {
                set.entry(self.funcs[*id].name.as_str()).or_default().push(*id);
            }
        }

        let Some(decl) = self.type_index(package, type_name).map(|idx| &self.types[idx]) else {
            return set;
        };
        let embeds = match &decl.kind {
            TypeKind::Struct { embeds } => embeds,
            TypeKind::Interface { methods, .. } => {
                for method in methods {
                    set.entry(method.as_str()).or_default();
                }
                return set;
            }
            TypeKind::Other => return set,
        };

        path.push(key);
        let mut promoted: BTreeMap<&str, Vec<FuncId>> = BTreeMap::new();
        for embed in embeds {
            let embed_package = match &embed.qualifier {
                None => package,
                Some(qualifier) => match self.resolve_import(decl.file, qualifier) {
                    ImportTarget::Program(pkg) => pkg,
                    _ => continue,
                },
            };
            for (name, ids) in self.collect_method_set(embed_package, &embed.name, path) {
                if !set.contains_key(name) {
                    promoted.entry(name).or_default().extend(ids);
                }
            }
        }
        path.pop();

        set.extend(promoted);
        set
    }

    pub fn type_index(&self, package: usize, name: &str) -> Option<usize> {
        self.types_by_name.get(&(package, name.to_string())).copied()
    }

    pub fn package_by_import(&self, import_path: &str) -> Option<usize> {
        self.packages_by_import.get(import_path).copied()
    }

    /// Resolve `qualifier` against the imports of `file`
    pub fn resolve_import(&self, file: usize, qualifier: &str) -> ImportTarget {
        for import in &self.files[file].imports {
            let in_program = self.package_by_import(&import.path);
            let name = match import.alias.as_deref() {
                Some(".") | Some("_") => continue,
                Some(alias) => alias.to_string(),
                None => match in_program {
                    Some(idx) => self.packages[idx].name.clone(),
                    None => default_import_name(&import.path),
                },
            };
            if name == qualifier {
                return match in_program {
                    Some(idx) => ImportTarget::Program(idx),
                    None => ImportTarget::External,
                };
            }
        }
        ImportTarget::NotImport
    }

    /// Program packages dot-imported by `file`
    pub fn dot_imports(&self, file: usize) -> Vec<usize> {
        self.files[file]
            .imports
            .iter()
            .filter(|i| i.alias.as_deref() == Some("."))
            .filter_map(|i| self.package_by_import(&i.path))
            .collect()
    }

    /// `Name`, `Type.Name` or `(*Type).Name`
    pub fn display_name(&self, id: FuncId) -> String {
        let func = &self.funcs[id];
        match &func.receiver {
            None => func.name.clone(),
            Some(recv) if recv.pointer => format!("(*{}).{}", recv.type_name, func.name),
            Some(recv) => format!("{}.{}", recv.type_name, func.name),
        }
    }

    pub fn file_of(&self, id: FuncId) -> &SourceFile {
        &self.files[self.funcs[id].file]
    }

    /// `file:function` key used for caller deduplication
    pub fn key(&self, id: FuncId) -> String {
        caller_key(&self.file_of(id).rel_path, &self.display_name(id))
    }
}

/// Package name Go tooling would assume for an import path it cannot see
fn default_import_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        last = segments.next().unwrap_or(last);
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.split('.').next().unwrap_or(last);
    last.replace('-', "_")
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

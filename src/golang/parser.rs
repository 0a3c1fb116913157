//! Go fact extraction using tree-sitter-go.
//!
//! Pulls the package clause, imports, type declarations, and function and
//! method declarations (with their call sites) out of one source file.
//! Local variable types are tracked per block so that `x.M()` can be
//! resolved against the declared type of `x`; a local whose type cannot be
//! inferred is still recorded, which keeps it from being read as a package
//! name. Calls in package-level `var` initializers are gathered into a
//! synthetic `init` function.

use anyhow::Result;
use std::collections::HashMap;
use tree_sitter::Node;

/// A named type as written in source: `T`, `*T`, `pkg.T`, `T[int]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl TypeRef {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }
}

/// What a call expression targets, before program-wide resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// `f()`
    Func { name: String },
    /// `q.F()` where `q` is not a known local; usually a package name
    Qualified { qualifier: String, name: String },
    /// `x.M()`, with the type of `x` when it is known
    Method { name: String, recv: Option<TypeRef> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub target: CallTarget,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSyntax {
    pub type_name: String,
    pub pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSyntax {
    pub name: String,
    pub receiver: Option<ReceiverSyntax>,
    pub line: usize,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// `embeds` are the anonymous fields, whose methods are promoted
    Struct { embeds: Vec<TypeRef> },
    Interface {
        methods: Vec<String>,
        embeds: Vec<TypeRef>,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub name: String,
    pub kind: TypeKind,
}

/// One import spec; `alias` is `.` or `_` for dot and blank imports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSyntax {
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSyntax {
    pub package: Option<String>,
    pub imports: Vec<ImportSyntax>,
    pub types: Vec<TypeSyntax>,
    pub functions: Vec<FuncSyntax>,
    pub has_errors: bool,
}

/// Parser that extracts call-graph facts from Go source code.
///
/// Pure function: Input source → Output FileSyntax.
/// No filesystem access. No global state.
pub struct GoParser {
    parser: tree_sitter::Parser,
}

/// Locals in scope; `None` when the variable's type is not known
type LocalTypes = HashMap<String, Option<TypeRef>>;

/// Name given to the calls made by package-level variable initializers
const PACKAGE_INIT: &str = "init";

impl GoParser {
    /// Create a new parser for Go source code.
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_go::language())?;
        Ok(Self { parser })
    }

    /// Extract facts from Go source code.
    ///
    /// Returns `None` only when tree-sitter produces no tree at all. Files
    /// with syntax errors still yield whatever could be recovered, with
    /// `has_errors` set.
    pub fn parse(&mut self, source: &[u8]) -> Option<FileSyntax> {
        let tree = self.parser.parse(source, None)?;
        let root = tree.root_node();

        let mut file = FileSyntax {
            has_errors: root.has_error(),
            ..FileSyntax::default()
        };

        let mut init_calls = Vec::new();
        let mut init_line = None;

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => file.package = package_name(&child, source),
                "var_declaration" => {
                    let before = init_calls.len();
                    collect_calls(&child, source, &mut LocalTypes::new(), &mut init_calls);
                    if init_calls.len() > before {
                        init_line.get_or_insert(child.start_position().row + 1);
                    }
                }
                "import_declaration" => collect_imports(&child, source, &mut file.imports),
                "type_declaration" => collect_types(&child, source, &mut file.types),
                "function_declaration" | "method_declaration" => {
                    if let Some(function) = extract_function(&child, source) {
                        file.functions.push(function);
                    }
                }
                _ => {}
            }
        }

        if let Some(line) = init_line {
            file.functions.push(FuncSyntax {
                name: PACKAGE_INIT.to_string(),
                receiver: None,
                line,
                calls: init_calls,
            });
        }

        Some(file)
    }
}

fn text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn package_name(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let name = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "package_identifier")
        .map(|c| text(&c, source).to_string());
    name.filter(|n| !n.is_empty())
}

fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<ImportSyntax>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => {
                if let Some(import) = import_spec(&child, source) {
                    imports.push(import);
                }
            }
            "import_spec_list" => collect_imports(&child, source, imports),
            _ => {}
        }
    }
}

fn import_spec(node: &Node, source: &[u8]) -> Option<ImportSyntax> {
    let path = node.child_by_field_name("path")?;
    let path = text(&path, source)
        .trim_matches(|c| c == '"' || c == '`')
        .to_string();
    if path.is_empty() {
        return None;
    }
    let alias = node.child_by_field_name("name").map(|n| match n.kind() {
        "dot" => ".".to_string(),
        "blank_identifier" => "_".to_string(),
        _ => text(&n, source).to_string(),
    });
    Some(ImportSyntax { alias, path })
}

fn collect_types(node: &Node, source: &[u8], types: &mut Vec<TypeSyntax>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "type_spec" | "type_alias" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                let kind = match child.child_by_field_name("type") {
                    Some(t) if child.kind() == "type_spec" => type_kind(&t, source),
                    _ => TypeKind::Other,
                };
                types.push(TypeSyntax {
                    name: text(&name, source).to_string(),
                    kind,
                });
            }
            // grouped `type ( ... )` in some grammar versions
            "type_spec_list" => collect_types(&child, source, types),
            _ => {}
        }
    }
}

fn type_kind(node: &Node, source: &[u8]) -> TypeKind {
    match node.kind() {
        "struct_type" => TypeKind::Struct {
            embeds: embedded_fields(node, source),
        },
        "interface_type" => {
            let mut methods = Vec::new();
            let mut embeds = Vec::new();
            let mut cursor = node.walk();
            for member in node.named_children(&mut cursor) {
                match member.kind() {
                    "method_elem" | "method_spec" => {
                        if let Some(name) = member.child_by_field_name("name") {
                            methods.push(text(&name, source).to_string());
                        }
                    }
                    "type_elem" | "constraint_elem" | "interface_type_name" => {
                        let mut inner = member.walk();
                        embeds.extend(
                            member
                                .named_children(&mut inner)
                                .filter_map(|t| type_ref(&t, source)),
                        );
                    }
                    "type_identifier" | "qualified_type" => {
                        embeds.extend(type_ref(&member, source));
                    }
                    _ => {}
                }
            }
            TypeKind::Interface { methods, embeds }
        }
        _ => TypeKind::Other,
    }
}

fn embedded_fields(node: &Node, source: &[u8]) -> Vec<TypeRef> {
    let mut embeds = Vec::new();
    let mut cursor = node.walk();
    for list in node.named_children(&mut cursor) {
        if list.kind() != "field_declaration_list" {
            continue;
        }
        let mut fields = list.walk();
        for field in list.named_children(&mut fields) {
            if field.kind() != "field_declaration" || field.child_by_field_name("name").is_some() {
                continue;
            }
            embeds.extend(
                field
                    .child_by_field_name("type")
                    .and_then(|t| type_ref(&t, source)),
            );
        }
    }
    embeds
}

/// Named type behind a type expression, through pointers and generics
fn type_ref(node: &Node, source: &[u8]) -> Option<TypeRef> {
    match node.kind() {
        "type_identifier" => Some(TypeRef::local(text(node, source))),
        "qualified_type" => {
            let package = node.child_by_field_name("package")?;
            let name = node.child_by_field_name("name")?;
            Some(TypeRef {
                qualifier: Some(text(&package, source).to_string()),
                name: text(&name, source).to_string(),
            })
        }
        "generic_type" => type_ref(&node.child_by_field_name("type")?, source),
        "pointer_type" | "parenthesized_type" => type_ref(&node.named_child(0)?, source),
        _ => None,
    }
}

fn extract_function(node: &Node, source: &[u8]) -> Option<FuncSyntax> {
    let name = text(&node.child_by_field_name("name")?, source).to_string();
    let mut locals = LocalTypes::new();

    let receiver = node
        .child_by_field_name("receiver")
        .and_then(|list| receiver_of(&list, source, &mut locals));

    if let Some(params) = node.child_by_field_name("parameters") {
        bind_parameters(&params, source, &mut locals);
    }
    if let Some(result) = node.child_by_field_name("result") {
        if result.kind() == "parameter_list" {
            bind_parameters(&result, source, &mut locals);
        }
    }

    let mut calls = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(&body, source, &mut locals, &mut calls);
    }

    Some(FuncSyntax {
        name,
        receiver,
        line: node.start_position().row + 1,
        calls,
    })
}

fn receiver_of(list: &Node, source: &[u8], locals: &mut LocalTypes) -> Option<ReceiverSyntax> {
    let mut cursor = list.walk();
    let decl = list
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = decl.child_by_field_name("type")?;

    let pointer = ty.kind() == "pointer_type";
    let recv_type = type_ref(&ty, source)?;
    if let Some(var) = decl.child_by_field_name("name") {
        locals.insert(text(&var, source).to_string(), Some(recv_type.clone()));
    }
    Some(ReceiverSyntax {
        type_name: recv_type.name,
        pointer,
    })
}

fn bind_parameters(list: &Node, source: &[u8], locals: &mut LocalTypes) {
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        if !matches!(
            decl.kind(),
            "parameter_declaration" | "variadic_parameter_declaration"
        ) {
            continue;
        }
        let ty = decl.child_by_field_name("type").and_then(|t| type_ref(&t, source));
        let mut names = decl.walk();
        for name in decl.children_by_field_name("name", &mut names) {
            bind(locals, text(&name, source), ty.clone());
        }
    }
}

/// Nodes that open a new lexical scope for locals
fn opens_scope(kind: &str) -> bool {
    matches!(
        kind,
        "block"
            | "func_literal"
            | "if_statement"
            | "for_statement"
            | "expression_switch_statement"
            | "type_switch_statement"
            | "select_statement"
            | "expression_case"
            | "type_case"
            | "default_case"
            | "communication_case"
    )
}

/// Walk a body in source order, recording declarations before the calls
/// that follow them. Declarations bind after their initializers are walked,
/// so `s := s.Clone()` reads the outer `s`.
fn collect_calls(node: &Node, source: &[u8], locals: &mut LocalTypes, calls: &mut Vec<CallSite>) {
    let kind = node.kind();
    if opens_scope(kind) {
        let mut inner = locals.clone();
        if kind == "func_literal" {
            if let Some(params) = node.child_by_field_name("parameters") {
                bind_parameters(&params, source, &mut inner);
            }
        }
        if kind == "type_switch_statement" {
            if let Some(alias) = node.child_by_field_name("alias") {
                bind_unknown(&alias, source, &mut inner);
            }
        }
        collect_children(node, source, &mut inner, calls);
        return;
    }

    if kind == "call_expression" {
        if let Some(target) = classify_call(node, source, locals) {
            let pos = node.start_position();
            calls.push(CallSite {
                target,
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }
    }

    collect_children(node, source, locals, calls);

    match kind {
        "var_spec" => bind_var_spec(node, source, locals),
        "short_var_declaration" => bind_short_var(node, source, locals),
        "range_clause" => {
            if let Some(left) = node.child_by_field_name("left") {
                bind_unknown(&left, source, locals);
            }
        }
        _ => {}
    }
}

fn collect_children(
    node: &Node,
    source: &[u8],
    locals: &mut LocalTypes,
    calls: &mut Vec<CallSite>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(&child, source, locals, calls);
    }
}

fn bind(locals: &mut LocalTypes, name: &str, ty: Option<TypeRef>) {
    if name != "_" {
        locals.insert(name.to_string(), ty);
    }
}

fn bind_unknown(names: &Node, source: &[u8], locals: &mut LocalTypes) {
    for name in expressions(names) {
        if name.kind() == "identifier" {
            bind(locals, text(&name, source), None);
        }
    }
}

fn bind_var_spec(node: &Node, source: &[u8], locals: &mut LocalTypes) {
    let names: Vec<String> = {
        let mut cursor = node.walk();
        node.children_by_field_name("name", &mut cursor)
            .map(|n| text(&n, source).to_string())
            .collect()
    };

    if let Some(ty) = node.child_by_field_name("type") {
        let ty = type_ref(&ty, source);
        for name in names {
            bind(locals, &name, ty.clone());
        }
        return;
    }

    match node.child_by_field_name("value") {
        Some(values) => bind_positional(names, &values, source, locals),
        None => {
            for name in names {
                bind(locals, &name, None);
            }
        }
    }
}

fn bind_short_var(node: &Node, source: &[u8], locals: &mut LocalTypes) {
    let (Some(left), Some(right)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return;
    };
    let names: Vec<String> = expressions(&left)
        .iter()
        .filter(|n| n.kind() == "identifier")
        .map(|n| text(n, source).to_string())
        .collect();
    bind_positional(names, &right, source, locals);
}

fn bind_positional(names: Vec<String>, values: &Node, source: &[u8], locals: &mut LocalTypes) {
    let values = expressions(values);
    if values.len() != names.len() {
        // v, err := f()
        for name in names {
            bind(locals, &name, None);
        }
        return;
    }
    for (name, value) in names.iter().zip(values.iter()) {
        bind(locals, name, infer_type(value, source));
    }
}

fn expressions<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    if node.kind() == "expression_list" {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    } else {
        vec![*node]
    }
}

/// Type of `T{}`, `&T{}` and `new(T)`
fn infer_type(expr: &Node, source: &[u8]) -> Option<TypeRef> {
    match expr.kind() {
        "composite_literal" => type_ref(&expr.child_by_field_name("type")?, source),
        "unary_expression" => {
            let operator = expr.child_by_field_name("operator")?;
            if text(&operator, source) != "&" {
                return None;
            }
            infer_type(&expr.child_by_field_name("operand")?, source)
        }
        "parenthesized_expression" => infer_type(&expr.named_child(0)?, source),
        "call_expression" => {
            let function = expr.child_by_field_name("function")?;
            if function.kind() != "identifier" || text(&function, source) != "new" {
                return None;
            }
            let args = expr.child_by_field_name("arguments")?;
            let arg = args.named_child(0)?;
            // the argument may parse as an expression rather than a type
            match arg.kind() {
                "identifier" => Some(TypeRef::local(text(&arg, source))),
                "selector_expression" => {
                    let operand = arg.child_by_field_name("operand")?;
                    let field = arg.child_by_field_name("field")?;
                    Some(TypeRef {
                        qualifier: Some(text(&operand, source).to_string()),
                        name: text(&field, source).to_string(),
                    })
                }
                _ => type_ref(&arg, source),
            }
        }
        _ => None,
    }
}

fn classify_call(call: &Node, source: &[u8], locals: &LocalTypes) -> Option<CallTarget> {
    let mut function = call.child_by_field_name("function")?;
    while function.kind() == "parenthesized_expression" {
        function = function.named_child(0)?;
    }
    // explicit instantiation: F[int](x)
    if function.kind() == "index_expression" {
        function = function.child_by_field_name("operand")?;
    }

    match function.kind() {
        "identifier" => Some(CallTarget::Func {
            name: text(&function, source).to_string(),
        }),
        "selector_expression" => {
            let operand = function.child_by_field_name("operand")?;
            let name = text(&function.child_by_field_name("field")?, source).to_string();
            if operand.kind() == "identifier" {
                let qualifier = text(&operand, source);
                return Some(match locals.get(qualifier) {
                    Some(recv) => CallTarget::Method {
                        name,
                        recv: recv.clone(),
                    },
                    None => CallTarget::Qualified {
                        qualifier: qualifier.to_string(),
                        name,
                    },
                });
            }
            Some(CallTarget::Method {
                name,
                recv: infer_type(&operand, source),
            })
        }
        _ => None,
    }
}

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{UsestructError, Result};
use crate::core::model::{normalize_type_text, Callee, CallSite, FileModel, FunctionDecl, ParamDecl, TypeExpr};
use super::{ensure_well_formed, node_text, position, Frame, LanguageParser, Scopes};

/// Wrappers that method calls see straight through
const SMART_POINTERS: &[&str] = &["Box", "Rc", "Arc"];

/// Associated functions treated as constructors of their type
const CONSTRUCTORS: &[&str] = &["new", "default"];

/// Expressions whose bindings are invisible outside them
const SCOPE_NODES: &[&str] = &["block", "if_expression", "while_expression", "match_arm"];

/// Rust-specific parser using Tree-sitter
pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let rust_language = tree_sitter_rust::language();
        parser.set_language(&rust_language)
            .map_err(|e| UsestructError::Parser(format!("Failed to set Rust language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for RustParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<FileModel> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| UsestructError::SourceModel {
                path: file_path.to_path_buf(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;

        let root_node = tree.root_node();
        ensure_well_formed(root_node, file_path)?;

        let mut functions = Vec::new();
        self.extract_rust_items(root_node, content, file_path, None, &mut functions);
        Ok(FileModel {
            package: None,
            functions,
        })
    }

    fn file_extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn language_name(&self) -> &str {
        "rust"
    }
}

impl RustParser {
    /// Walk items, descending into `impl`, `trait` and `mod` bodies
    fn extract_rust_items(
        &self,
        node: Node,
        source: &str,
        file_path: &Path,
        owner: Option<&TypeExpr>,
        functions: &mut Vec<FunctionDecl>,
    ) {
        let mut cursor = node.walk();

        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "function_item" => {
                    if let Some(function) = self.parse_rust_function(child, source, file_path, owner) {
                        functions.push(function);
                    }
                }
                "impl_item" => {
                    let implemented = child
                        .child_by_field_name("type")
                        .map(|ty| self.type_expr(ty, source, None));
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_rust_items(body, source, file_path, implemented.as_ref(), functions);
                    }
                }
                "trait_item" => {
                    let trait_type = child
                        .child_by_field_name("name")
                        .map(|name| TypeExpr::named(node_text(name, source)));
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_rust_items(body, source, file_path, trait_type.as_ref(), functions);
                    }
                }
                "mod_item" => {
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_rust_items(body, source, file_path, None, functions);
                    }
                }
                _ => {}
            }
        }
    }

    /// Parse a Rust function, method or associated function
    fn parse_rust_function(
        &self,
        node: Node,
        source: &str,
        file_path: &Path,
        owner: Option<&TypeExpr>,
    ) -> Option<FunctionDecl> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();
        let mut frame = Frame::new();

        let params = node
            .child_by_field_name("parameters")
            .map(|list| self.parse_parameters(list, source, owner, &mut frame))
            .unwrap_or_default();

        let mut calls = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut scopes = Scopes::with_root(frame);
            self.walk(body, source, file_path, owner, &mut scopes, &mut calls);
        }

        Some(FunctionDecl {
            name,
            receiver: owner.cloned(),
            params,
            calls,
            position: position(node, file_path),
        })
    }

    /// `self` parameters are the receiver and never count as a unit
    fn parse_parameters(&self, list: Node, source: &str, owner: Option<&TypeExpr>, frame: &mut Frame) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        let mut cursor = list.walk();

        for child in list.named_children(&mut cursor) {
            if child.kind() != "parameter" {
                continue;
            }
            let Some(type_node) = child.child_by_field_name("type") else {
                continue;
            };

            let names: Vec<String> = child
                .child_by_field_name("pattern")
                .and_then(|pattern| self.binding_name(pattern, source))
                .into_iter()
                .collect();

            let ty = self.type_expr(type_node, source, owner);
            for name in &names {
                frame.insert(name.clone(), Some(ty.clone()));
            }

            params.push(ParamDecl::new(names, normalize_type_text(node_text(type_node, source))));
        }

        params
    }

    /// The single name a pattern binds; `_` and destructuring bind none
    fn binding_name(&self, pattern: Node, source: &str) -> Option<String> {
        match pattern.kind() {
            "identifier" => Some(node_text(pattern, source).to_string()),
            "mut_pattern" | "ref_pattern" | "reference_pattern" => {
                let count = pattern.named_child_count();
                let inner = pattern.named_child(count.checked_sub(1)?)?;
                self.binding_name(inner, source)
            }
            _ => None,
        }
    }

    fn type_expr(&self, node: Node, source: &str, owner: Option<&TypeExpr>) -> TypeExpr {
        match node.kind() {
            "type_identifier" => {
                let text = node_text(node, source);
                match (text, owner) {
                    ("Self", Some(owner)) => owner.clone(),
                    _ => TypeExpr::named(text),
                }
            }
            "primitive_type" => TypeExpr::named(node_text(node, source)),
            "scoped_type_identifier" => match node.child_by_field_name("name") {
                Some(name) => TypeExpr::Named {
                    name: node_text(name, source).to_string(),
                    qualifier: node
                        .child_by_field_name("path")
                        .map(|path| node_text(path, source).to_string()),
                },
                None => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            "generic_type" => {
                let Some(base) = node.child_by_field_name("type") else {
                    return TypeExpr::Other(normalize_type_text(node_text(node, source)));
                };
                let base = self.type_expr(base, source, owner);

                let wrapped = node.child_by_field_name("type_arguments").and_then(|args| {
                    let mut cursor = args.walk();
                    let first = args
                        .named_children(&mut cursor)
                        .find(|arg| arg.kind() != "lifetime");
                    first
                });

                let is_smart_pointer = matches!(
                    &base,
                    TypeExpr::Named { name, .. } if SMART_POINTERS.contains(&name.as_str())
                );

                match wrapped {
                    Some(inner) if is_smart_pointer => TypeExpr::pointer_to(self.type_expr(inner, source, owner)),
                    _ => base,
                }
            }
            "reference_type" | "pointer_type" => match node.child_by_field_name("type") {
                Some(inner) => TypeExpr::pointer_to(self.type_expr(inner, source, owner)),
                None => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            _ => TypeExpr::Other(normalize_type_text(node_text(node, source))),
        }
    }

    /// Walk a body in source order, recording calls against the bindings in scope
    fn walk(
        &self,
        node: Node,
        source: &str,
        file_path: &Path,
        owner: Option<&TypeExpr>,
        scopes: &mut Scopes,
        calls: &mut Vec<CallSite>,
    ) {
        match node.kind() {
            // Nested fn items are separate scopes we do not model
            "function_item" => return,
            // The initializer runs before the pattern binds
            "let_declaration" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value, source, file_path, owner, scopes, calls);
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.walk(alternative, source, file_path, owner, scopes, calls);
                }
                self.bind_let(node, source, owner, scopes);
                return;
            }
            "let_condition" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value, source, file_path, owner, scopes, calls);
                }
                if let Some(pattern) = node.child_by_field_name("pattern") {
                    self.bind_unknown(pattern, source, scopes);
                }
                return;
            }
            "for_expression" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value, source, file_path, owner, scopes, calls);
                }
                scopes.push(Frame::new());
                if let Some(pattern) = node.child_by_field_name("pattern") {
                    self.bind_unknown(pattern, source, scopes);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(body, source, file_path, owner, scopes, calls);
                }
                scopes.pop();
                return;
            }
            "closure_expression" => {
                let mut frame = Frame::new();
                if let Some(list) = node.child_by_field_name("parameters") {
                    self.closure_parameters(list, source, owner, &mut frame);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    scopes.push(frame);
                    self.walk(body, source, file_path, owner, scopes, calls);
                    scopes.pop();
                }
                return;
            }
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .map(|function| self.resolve_callee(function, source, owner, scopes))
                    .unwrap_or(Callee::Unresolved);

                calls.push(CallSite {
                    callee,
                    position: position(node, file_path),
                });
            }
            _ => {}
        }

        let opens_scope = SCOPE_NODES.contains(&node.kind());
        if opens_scope {
            scopes.push(Frame::new());
        }

        // Match arm patterns bind before the guard and body run
        if node.kind() == "match_arm" {
            let pattern = node
                .child_by_field_name("pattern")
                .and_then(|arm| arm.named_child(0));
            if let Some(pattern) = pattern {
                self.bind_unknown(pattern, source, scopes);
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, source, file_path, owner, scopes, calls);
        }

        if opens_scope {
            scopes.pop();
        }
    }

    fn bind_let(&self, node: Node, source: &str, owner: Option<&TypeExpr>, scopes: &mut Scopes) {
        let Some(pattern) = node.child_by_field_name("pattern") else {
            return;
        };

        match self.binding_name(pattern, source) {
            Some(name) => {
                let ty = match node.child_by_field_name("type") {
                    Some(ty) => Some(self.type_expr(ty, source, owner)),
                    None => node
                        .child_by_field_name("value")
                        .and_then(|value| self.value_type(value, source, owner)),
                };
                scopes.bind(name, ty);
            }
            None => self.bind_unknown(pattern, source, scopes),
        }
    }

    /// Shadow every name a destructuring pattern introduces
    fn bind_unknown(&self, pattern: Node, source: &str, scopes: &mut Scopes) {
        let mut names = Vec::new();
        self.pattern_names(pattern, source, &mut names);
        for name in names {
            scopes.bind(name, None);
        }
    }

    fn pattern_names(&self, pattern: Node, source: &str, names: &mut Vec<String>) {
        if matches!(pattern.kind(), "identifier" | "shorthand_field_identifier") {
            names.push(node_text(pattern, source).to_string());
            return;
        }

        let mut cursor = pattern.walk();
        for child in pattern.named_children(&mut cursor) {
            self.pattern_names(child, source, names);
        }
    }

    /// `|w: &Worker, x|`: annotated parameters are typed, the rest only shadow
    fn closure_parameters(&self, list: Node, source: &str, owner: Option<&TypeExpr>, frame: &mut Frame) {
        let mut cursor = list.walk();
        for child in list.named_children(&mut cursor) {
            if child.kind() == "parameter" {
                let name = child
                    .child_by_field_name("pattern")
                    .and_then(|pattern| self.binding_name(pattern, source));
                if let Some(name) = name {
                    let ty = child
                        .child_by_field_name("type")
                        .map(|ty| self.type_expr(ty, source, owner));
                    frame.insert(name, ty);
                }
                continue;
            }

            let mut names = Vec::new();
            self.pattern_names(child, source, &mut names);
            for name in names {
                frame.insert(name, None);
            }
        }
    }

    /// Static type of an initializer, when it is evident from the syntax
    fn value_type(&self, value: Node, source: &str, owner: Option<&TypeExpr>) -> Option<TypeExpr> {
        match value.kind() {
            "struct_expression" => {
                let name = value.child_by_field_name("name")?;
                let name = match name.kind() {
                    "generic_type_with_turbofish" => name.child_by_field_name("type")?,
                    _ => name,
                };
                Some(self.type_expr(name, source, owner))
            }
            "reference_expression" => {
                let inner = value.child_by_field_name("value")?;
                self.value_type(inner, source, owner).map(TypeExpr::pointer_to)
            }
            // T::new(..) and T::default()
            "call_expression" => {
                let function = value.child_by_field_name("function")?;
                if function.kind() != "scoped_identifier" {
                    return None;
                }
                let name = node_text(function.child_by_field_name("name")?, source);
                if !CONSTRUCTORS.contains(&name) {
                    return None;
                }
                self.path_type(function.child_by_field_name("path")?, source, owner)
            }
            "parenthesized_expression" => self.value_type(value.named_child(0)?, source, owner),
            _ => None,
        }
    }

    /// The type named by the last segment of a path, if it looks like a type
    fn path_type(&self, path: Node, source: &str, owner: Option<&TypeExpr>) -> Option<TypeExpr> {
        let segment = match path.kind() {
            "scoped_identifier" => node_text(path.child_by_field_name("name")?, source),
            _ => node_text(path, source),
        };

        if segment == "Self" {
            return owner.cloned();
        }

        let starts_upper = segment.chars().next().map_or(false, char::is_uppercase);
        if starts_upper {
            Some(TypeExpr::named(segment))
        } else {
            None
        }
    }

    fn resolve_callee(&self, function: Node, source: &str, owner: Option<&TypeExpr>, scopes: &Scopes) -> Callee {
        match function.kind() {
            "identifier" => Callee::Function(node_text(function, source).to_string()),
            // path::f(), Type::f(), Self::f()
            "scoped_identifier" => {
                let Some(name) = function.child_by_field_name("name") else {
                    return Callee::Unresolved;
                };
                let name = node_text(name, source).to_string();

                // A lowercase path is a module; only its last segment matters
                match function
                    .child_by_field_name("path")
                    .and_then(|path| self.path_type(path, source, owner))
                {
                    Some(receiver) => Callee::Method { receiver: Some(receiver), name },
                    None => Callee::Function(name),
                }
            }
            // self.m(), local.m()
            "field_expression" => {
                let Some(field) = function.child_by_field_name("field") else {
                    return Callee::Unresolved;
                };
                let receiver = function.child_by_field_name("value").and_then(|value| {
                    match (value.kind(), node_text(value, source)) {
                        (_, "self") => owner.cloned(),
                        ("identifier", local) => scopes.lookup(local).cloned(),
                        _ => None,
                    }
                });

                Callee::Method {
                    receiver,
                    name: node_text(field, source).to_string(),
                }
            }
            // f::<T>()
            "generic_function" => match function.child_by_field_name("function") {
                Some(inner) => self.resolve_callee(inner, source, owner, scopes),
                None => Callee::Unresolved,
            },
            _ => Callee::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chains::{call_key, decl_key};

    fn parse(source: &str) -> Vec<FunctionDecl> {
        let mut parser = RustParser::new().unwrap();
        parser.parse(source, Path::new("lib.rs")).unwrap().functions
    }

    fn call_keys(function: &FunctionDecl) -> Vec<Option<String>> {
        function.calls.iter().map(call_key).collect()
    }

    #[test]
    fn test_free_functions_and_parameters() {
        let source = r#"
fn a(x: i32, mut y: i32, _: i32, name: &str) {
    b(x, y, 0);
    util::helper(x);
}
"#;
        let functions = parse(source);
        assert_eq!(functions.len(), 1);

        let a = &functions[0];
        assert_eq!(a.param_units(), 4);
        assert_eq!(a.params[1].names, vec!["y"]);
        assert!(a.params[2].names.is_empty());
        assert_eq!(a.params[3].type_desc, "&str");
        assert_eq!(a.position.line, 2);
        assert_eq!(
            call_keys(a),
            vec![Some("b".to_string()), Some("helper".to_string())]
        );
    }

    #[test]
    fn test_impl_methods_are_qualified_and_self_is_not_counted() {
        let source = r#"
struct Processor;

impl Processor {
    pub fn start(&self, x: i32, y: i32, z: i32) {
        self.process(x, y, z);
        Self::finish(x, y, z);
        Processor::finish(x, y, z);
    }

    fn process(&mut self, a: i32, b: i32, c: i32) {}

    fn finish(a: i32, b: i32, c: i32) {}
}
"#;
        let functions = parse(source);
        assert_eq!(functions.len(), 3);
        assert_eq!(decl_key(&functions[0]), "Processor.start");
        assert_eq!(functions[0].param_units(), 3);
        assert_eq!(
            call_keys(&functions[0]),
            vec![
                Some("Processor.process".to_string()),
                Some("Processor.finish".to_string()),
                Some("Processor.finish".to_string()),
            ]
        );
    }

    #[test]
    fn test_locals_typed_by_annotation_literal_and_constructor() {
        let source = r#"
fn run(a: u8, b: u8, c: u8, handler: &mut Handler, shared: Arc<Store>) {
    let p = DataProcessor { id: 1 };
    let q = &Queue { items: vec![] };
    let w: Worker = make_worker();
    let s = Session::new();
    handler.handle(a, b, c);
    p.handle(a, b, c);
    q.push(a);
    w.work(a, b, c);
    s.open(a);
    shared.store(a);
    make_worker().work(a, b, c);
}
"#;
        let functions = parse(source);
        let keys = call_keys(&functions[0]);
        assert_eq!(
            keys,
            vec![
                Some("make_worker".to_string()),
                Some("Session.new".to_string()),
                Some("Handler.handle".to_string()),
                Some("DataProcessor.handle".to_string()),
                Some("Queue.push".to_string()),
                Some("Worker.work".to_string()),
                Some("Session.open".to_string()),
                Some("Store.store".to_string()),
                None,
                Some("make_worker".to_string()),
            ]
        );
    }

    #[test]
    fn test_trait_impls_and_default_methods() {
        let source = r#"
trait Visitor {
    fn visit(&self, a: i32, b: i32, c: i32) {
        self.leave(a, b, c);
    }
    fn leave(&self, a: i32, b: i32, c: i32);
}

impl<T> Visitor for Walker<T> {
    fn leave(&self, a: i32, b: i32, c: i32) {}
}

mod nested {
    pub fn inner(a: i32, b: i32) {}
}
"#;
        let functions = parse(source);
        let keys: Vec<String> = functions.iter().map(decl_key).collect();
        // signatures without a body are not declarations
        assert_eq!(keys, vec!["Visitor.visit", "Walker.leave", "inner"]);
        assert_eq!(call_keys(&functions[0]), vec![Some("Visitor.leave".to_string())]);
    }

    #[test]
    fn test_closures_are_scanned_and_nested_fns_are_not() {
        let source = r#"
fn outer(a: i32, b: i32, c: i32) {
    let f = |x: i32| inner_call(x);
    fn nested() { hidden(); }
    f(a);
}
"#;
        let functions = parse(source);
        assert_eq!(functions.len(), 1);
        assert_eq!(
            call_keys(&functions[0]),
            vec![Some("inner_call".to_string()), Some("f".to_string())]
        );
    }

    #[test]
    fn test_inner_block_shadowing_does_not_leak() {
        let source = r#"
impl Service {
    fn run(&self, a: i32, b: i32, c: i32, worker: Worker) {
        worker.step(a, b, c);
        if a > 0 {
            let worker = Other::new();
            worker.close();
        }
        worker.finish(a, b, c);
    }
}
"#;
        let functions = parse(source);
        assert_eq!(
            call_keys(&functions[0]),
            vec![
                Some("Worker.step".to_string()),
                Some("Other.new".to_string()),
                Some("Other.close".to_string()),
                Some("Worker.finish".to_string()),
            ]
        );
    }

    #[test]
    fn test_let_binds_after_its_initializer() {
        let source = r#"
fn run(job: Job, a: i32, b: i32, c: i32) {
    let job = job.split(a, b, c);
    job.finish(a, b, c);
}
"#;
        let functions = parse(source);
        // the initializer still sees the parameter; the new binding is untyped
        assert_eq!(call_keys(&functions[0]), vec![Some("Job.split".to_string()), None]);
    }

    #[test]
    fn test_closure_parameters_are_scoped_to_the_closure() {
        let source = r#"
fn run(w: &Worker, others: Vec<Other>, a: i32, b: i32, c: i32) {
    others.iter().for_each(|w: &Other| w.visit(a, b, c));
    items.iter().map(|w| w.len());
    w.work(a, b, c);
}
"#;
        let functions = parse(source);
        assert_eq!(
            call_keys(&functions[0]),
            vec![
                None,
                Some("Vec.iter".to_string()),
                Some("Other.visit".to_string()),
                None,
                None,
                None,
                Some("Worker.work".to_string()),
            ]
        );
    }

    #[test]
    fn test_match_and_for_patterns_shadow() {
        let source = r#"
fn run(s: Session, a: i32, b: i32, c: i32) {
    match lookup() {
        Some(s) => s.open(a),
        None => s.open(b),
    }
    for s in sessions() {
        s.close();
    }
    s.close();
}
"#;
        let functions = parse(source);
        assert_eq!(
            call_keys(&functions[0]),
            vec![
                Some("lookup".to_string()),
                None,
                Some("Session.open".to_string()),
                Some("sessions".to_string()),
                None,
                Some("Session.close".to_string()),
            ]
        );
    }

    #[test]
    fn test_syntax_error_is_source_model_failure() {
        let mut parser = RustParser::new().unwrap();
        let result = parser.parse("fn broken( {", Path::new("bad.rs"));
        assert!(matches!(result, Err(UsestructError::SourceModel { .. })));
    }
}

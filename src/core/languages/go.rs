use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{UsestructError, Result};
use crate::core::model::{normalize_type_text, Callee, CallSite, FileModel, FunctionDecl, ParamDecl, TypeExpr};
use super::{ensure_well_formed, node_text, position, Frame, LanguageParser, Scopes};

/// Statements whose declarations are invisible outside them
const SCOPE_NODES: &[&str] = &[
    "block",
    "if_statement",
    "for_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

/// Go-specific parser using Tree-sitter
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let go_language = tree_sitter_go::language();
        parser.set_language(&go_language)
            .map_err(|e| UsestructError::Parser(format!("Failed to set Go language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for GoParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<FileModel> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| UsestructError::SourceModel {
                path: file_path.to_path_buf(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;

        let root_node = tree.root_node();
        ensure_well_formed(root_node, file_path)?;

        let mut model = FileModel::default();
        let mut cursor = root_node.walk();
        for child in root_node.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    model.package = child
                        .named_child(0)
                        .map(|name| node_text(name, content).to_string());
                }
                "function_declaration" | "method_declaration" => {
                    if let Some(function) = self.parse_go_function(child, content, file_path) {
                        model.functions.push(function);
                    }
                }
                _ => {}
            }
        }

        Ok(model)
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn language_name(&self) -> &str {
        "go"
    }
}

impl GoParser {
    /// Parse a function or method declaration
    fn parse_go_function(&self, node: Node, source: &str, file_path: &Path) -> Option<FunctionDecl> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();
        let mut frame = Frame::new();

        // Method receiver: `(p *Processor)` binds `p` and qualifies the key
        let receiver = node
            .child_by_field_name("receiver")
            .and_then(|list| self.parse_receiver(list, source, &mut frame));

        let params = node
            .child_by_field_name("parameters")
            .map(|list| self.parse_parameters(list, source, &mut frame))
            .unwrap_or_default();

        let mut calls = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut scopes = Scopes::with_root(frame);
            self.walk(body, source, file_path, &mut scopes, &mut calls);
        }

        Some(FunctionDecl {
            name,
            receiver,
            params,
            calls,
            position: position(node, file_path),
        })
    }

    fn parse_receiver(&self, list: Node, source: &str, frame: &mut Frame) -> Option<TypeExpr> {
        let mut cursor = list.walk();
        let decl = list
            .named_children(&mut cursor)
            .find(|child| child.kind() == "parameter_declaration")?;

        let ty = self.type_expr(decl.child_by_field_name("type")?, source);
        let mut name_cursor = decl.walk();
        for name in decl.children_by_field_name("name", &mut name_cursor) {
            frame.insert(node_text(name, source).to_string(), Some(ty.clone()));
        }

        Some(ty)
    }

    /// Parse a parameter list; `a, b, c int` stays one group of three names
    fn parse_parameters(&self, list: Node, source: &str, frame: &mut Frame) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        let mut cursor = list.walk();

        for child in list.named_children(&mut cursor) {
            let Some(type_node) = child.child_by_field_name("type") else {
                continue;
            };

            let type_desc = match child.kind() {
                "parameter_declaration" => normalize_type_text(node_text(type_node, source)),
                "variadic_parameter_declaration" => {
                    format!("...{}", normalize_type_text(node_text(type_node, source)))
                }
                _ => continue,
            };

            let ty = self.type_expr(type_node, source);
            let mut name_cursor = child.walk();
            let names: Vec<String> = child
                .children_by_field_name("name", &mut name_cursor)
                .map(|name| node_text(name, source).to_string())
                .collect();

            for name in &names {
                frame.insert(name.clone(), Some(ty.clone()));
            }
            params.push(ParamDecl::new(names, type_desc));
        }

        params
    }

    /// Structural view of a type node
    fn type_expr(&self, node: Node, source: &str) -> TypeExpr {
        match node.kind() {
            "type_identifier" => TypeExpr::named(node_text(node, source)),
            "qualified_type" => match (node.child_by_field_name("package"), node.child_by_field_name("name")) {
                (Some(package), Some(name)) => TypeExpr::Named {
                    name: node_text(name, source).to_string(),
                    qualifier: Some(node_text(package, source).to_string()),
                },
                _ => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            // `List[T]` keys as `List`
            "generic_type" => match node.child_by_field_name("type") {
                Some(base) => self.type_expr(base, source),
                None => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::pointer_to(self.type_expr(inner, source)),
                None => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.type_expr(inner, source),
                None => TypeExpr::Other(normalize_type_text(node_text(node, source))),
            },
            _ => TypeExpr::Other(normalize_type_text(node_text(node, source))),
        }
    }

    /// Walk a body in source order, recording calls against the bindings in scope
    fn walk(&self, node: Node, source: &str, file_path: &Path, scopes: &mut Scopes, calls: &mut Vec<CallSite>) {
        match node.kind() {
            // Initializers are evaluated before the names come into scope
            "short_var_declaration" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right, source, file_path, scopes, calls);
                }
                self.bind_short_var(node, source, scopes);
                return;
            }
            "var_spec" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value, source, file_path, scopes, calls);
                }
                self.bind_var_spec(node, source, scopes);
                return;
            }
            "func_literal" => {
                let mut frame = Frame::new();
                if let Some(list) = node.child_by_field_name("parameters") {
                    self.parse_parameters(list, source, &mut frame);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    scopes.push(frame);
                    self.walk(body, source, file_path, scopes, calls);
                    scopes.pop();
                }
                return;
            }
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .map(|function| self.resolve_callee(function, source, scopes))
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

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, source, file_path, scopes, calls);
        }

        if opens_scope {
            scopes.pop();
        }
    }

    /// `a, b := x, y`; names already declared in this scope are only reassigned
    fn bind_short_var(&self, node: Node, source: &str, scopes: &mut Scopes) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let values: Vec<Node> = match node.child_by_field_name("right") {
            Some(right) => {
                let mut cursor = right.walk();
                right.named_children(&mut cursor).collect()
            }
            None => Vec::new(),
        };

        let mut cursor = left.walk();
        let targets: Vec<Node> = left.named_children(&mut cursor).collect();
        for (i, target) in targets.into_iter().enumerate() {
            if target.kind() != "identifier" {
                continue;
            }
            let name = node_text(target, source);
            if scopes.is_bound_here(name) {
                continue;
            }
            let ty = values.get(i).and_then(|value| self.value_type(*value, source));
            scopes.bind(name, ty);
        }
    }

    fn bind_var_spec(&self, node: Node, source: &str, scopes: &mut Scopes) {
        let mut name_cursor = node.walk();
        let names: Vec<String> = node
            .children_by_field_name("name", &mut name_cursor)
            .map(|name| node_text(name, source).to_string())
            .collect();

        if let Some(type_node) = node.child_by_field_name("type") {
            let ty = self.type_expr(type_node, source);
            for name in names {
                scopes.bind(name, Some(ty.clone()));
            }
            return;
        }

        let values: Vec<Node> = match node.child_by_field_name("value") {
            Some(list) => {
                let mut cursor = list.walk();
                list.named_children(&mut cursor).collect()
            }
            None => Vec::new(),
        };
        for (i, name) in names.into_iter().enumerate() {
            let ty = values.get(i).and_then(|value| self.value_type(*value, source));
            scopes.bind(name, ty);
        }
    }

    /// Static type of an initializer, when it is evident from the syntax
    fn value_type(&self, value: Node, source: &str) -> Option<TypeExpr> {
        match value.kind() {
            "composite_literal" => value
                .child_by_field_name("type")
                .map(|ty| self.type_expr(ty, source)),
            "unary_expression" => {
                let operator = value.child_by_field_name("operator")?;
                if node_text(operator, source) != "&" {
                    return None;
                }
                let operand = value.child_by_field_name("operand")?;
                self.value_type(operand, source).map(TypeExpr::pointer_to)
            }
            // new(T)
            "call_expression" => {
                let function = value.child_by_field_name("function")?;
                if node_text(function, source) != "new" {
                    return None;
                }
                let arguments = value.child_by_field_name("arguments")?;
                let target = arguments.named_child(0)?;
                let ty = match target.kind() {
                    "identifier" => TypeExpr::named(node_text(target, source)),
                    "selector_expression" => TypeExpr::Named {
                        name: node_text(target.child_by_field_name("field")?, source).to_string(),
                        qualifier: Some(node_text(target.child_by_field_name("operand")?, source).to_string()),
                    },
                    _ => self.type_expr(target, source),
                };
                Some(TypeExpr::pointer_to(ty))
            }
            "parenthesized_expression" => self.value_type(value.named_child(0)?, source),
            _ => None,
        }
    }

    fn resolve_callee(&self, function: Node, source: &str, scopes: &Scopes) -> Callee {
        match function.kind() {
            "identifier" => Callee::Function(node_text(function, source).to_string()),
            "selector_expression" => {
                let Some(field) = function.child_by_field_name("field") else {
                    return Callee::Unresolved;
                };
                // Only a typed local can qualify the call; package selectors stay unknown
                let receiver = function
                    .child_by_field_name("operand")
                    .filter(|operand| operand.kind() == "identifier")
                    .and_then(|operand| scopes.lookup(node_text(operand, source)).cloned());

                Callee::Method {
                    receiver,
                    name: node_text(field, source).to_string(),
                }
            }
            _ => Callee::Unresolved,
        }
    }
}

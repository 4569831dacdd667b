// src/core/model.rs
//! Language-neutral source model handed from the front-ends to the chain analysis.

use std::fmt;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

/// Location of a declaration or call in a source file (1-based)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Structural view of a type as written in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A named type, optionally qualified by a package or module path.
    /// Generic arguments are not retained.
    Named {
        name: String,
        qualifier: Option<String>,
    },
    /// A pointer, reference or smart-pointer indirection
    Pointer(Box<TypeExpr>),
    /// Anything else (slices, maps, tuples, function types...)
    Other(String),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            qualifier: None,
        }
    }

    pub fn pointer_to(inner: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(inner))
    }
}

/// One parameter group of a declaration.
///
/// `a, b, c int` is a single group with three names; an unnamed parameter
/// has no names but still contributes one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub names: Vec<String>,
    /// Resolved type descriptor, or the normalized source text of the type
    pub type_desc: String,
}

impl ParamDecl {
    pub fn new(names: Vec<String>, type_desc: impl Into<String>) -> Self {
        Self {
            names,
            type_desc: type_desc.into(),
        }
    }

    pub fn units(&self) -> usize {
        self.names.len().max(1)
    }
}

/// What a call expression targets, as far as the front-end could tell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Callee {
    /// A bare function name: `process(...)`
    Function(String),
    /// A selector call `recv.Method(...)` or `Type::method(...)`;
    /// `receiver` is `None` when the static type of the receiver is unknown
    Method {
        receiver: Option<TypeExpr>,
        name: String,
    },
    /// Closures, calls through arbitrary expressions, dynamic dispatch
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: Callee,
    pub position: SourcePosition,
}

/// A function or method declaration with everything the analysis needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Receiver (or implementing) type for methods
    pub receiver: Option<TypeExpr>,
    pub params: Vec<ParamDecl>,
    /// Every call expression in the body, in source order
    pub calls: Vec<CallSite>,
    pub position: SourcePosition,
}

impl FunctionDecl {
    /// Total parameter units: grouped names count individually
    pub fn param_units(&self) -> usize {
        self.params.iter().map(ParamDecl::units).sum()
    }
}

/// Everything a front-end extracts from one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModel {
    /// Package clause, for languages that declare one per file
    pub package: Option<String>,
    /// Declarations in source order
    pub functions: Vec<FunctionDecl>,
}

/// Collapse whitespace runs so that equivalent type spellings compare equal
pub fn normalize_type_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_units_count_each_name() {
        let decl = FunctionDecl {
            name: "f".to_string(),
            receiver: None,
            params: vec![
                ParamDecl::new(vec!["a".into(), "b".into(), "c".into()], "int"),
                ParamDecl::new(vec![], "string"),
            ],
            calls: vec![],
            position: SourcePosition::new("f.go", 1, 1),
        };
        assert_eq!(decl.param_units(), 4);
    }

    #[test]
    fn test_normalize_type_text() {
        assert_eq!(normalize_type_text("map[string]  int"), "map[string] int");
        assert_eq!(normalize_type_text("&'a\n    str"), "&'a str");
    }
}

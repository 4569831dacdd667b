//! Language-specific front-ends
//!
//! Each language gets its own module that turns source text into the
//! language-neutral declarations the chain analysis consumes.

mod go;
mod rust;

pub use go::GoParser;
pub use rust::RustParser;

use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Node;

use crate::error::{UsestructError, Result};
use super::model::{FileModel, SourcePosition, TypeExpr};

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse source code and extract function declarations with their call sites
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<FileModel>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Names bound by one lexical scope; `None` shadows with an unknown type
type Frame = HashMap<String, Option<TypeExpr>>;

/// Lexical scopes of one function body, innermost last.
///
/// Front-ends bind a name only after visiting its declaration, so a call is
/// resolved against exactly the bindings visible where it appears.
#[derive(Debug)]
struct Scopes {
    frames: Vec<Frame>,
}

impl Scopes {
    fn with_root(root: Frame) -> Self {
        Self { frames: vec![root] }
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        // the root frame outlives the walk
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    fn bind(&mut self, name: impl Into<String>, ty: Option<TypeExpr>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), ty);
        }
    }

    fn is_bound_here(&self, name: &str) -> bool {
        self.frames.last().map_or(false, |frame| frame.contains_key(name))
    }

    /// Static type of the innermost binding of `name`
    fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .and_then(Option::as_ref)
    }
}

/// Extract text content of a node
fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

fn position(node: Node, file_path: &Path) -> SourcePosition {
    let start = node.start_position();
    SourcePosition::new(file_path, start.row + 1, start.column + 1)
}

/// Reject trees with syntax errors: without a clean tree the declarations
/// and call targets cannot be trusted.
fn ensure_well_formed(root: Node, file_path: &Path) -> Result<()> {
    if !root.has_error() {
        return Ok(());
    }

    let reason = match first_error(root) {
        Some(node) => {
            let start = node.start_position();
            format!("syntax error at line {}, column {}", start.row + 1, start.column + 1)
        }
        None => "syntax error".to_string(),
    };

    Err(UsestructError::SourceModel {
        path: file_path.to_path_buf(),
        reason,
    })
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

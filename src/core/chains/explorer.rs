// src/core/chains/explorer.rs
//! Depth-first walk of the call graph carrying the shared argument multiset.

use crate::core::model::FunctionDecl;
use super::index::{DeclarationIndex, FunctionSignature};
use super::keyer::call_key;
use super::multiset::ArgMultiset;

/// Fewest shared parameter units that still justify a parameter struct.
/// Independent of the indexing minimum.
pub const MIN_SHARED_ARGS: usize = 3;

/// How many times one key may already sit on the stack before an edge back to it is skipped
const MAX_KEY_REPEATS: usize = 2;

/// A root-to-leaf call chain whose arguments survived intersection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain<'a> {
    /// Canonical keys, root first
    pub call_stack: Vec<String>,
    /// Arguments shared along the whole chain
    pub shared_args: ArgMultiset,
    /// The function the chain ends in
    pub leaf: &'a FunctionDecl,
}

impl Chain<'_> {
    /// `"make struct with arguments: int, int, int, for call stack: a -> b -> c"`
    pub fn message(&self) -> String {
        format!(
            "make struct with arguments: {}, for call stack: {}",
            self.shared_args.expanded().join(", "),
            self.call_stack.join(" -> ")
        )
    }
}

/// Explores chains over a frozen declaration index
pub struct ChainExplorer<'i, 'a> {
    index: &'i DeclarationIndex<'a>,
    max_depth: usize,
}

impl<'i, 'a> ChainExplorer<'i, 'a> {
    pub fn new(index: &'i DeclarationIndex<'a>, max_depth: usize) -> Self {
        Self { index, max_depth }
    }

    /// Explore every call site of every eligible root.
    ///
    /// Yields at most one chain per (root, call site) pair.
    pub fn explore_all(&self) -> Vec<Chain<'a>> {
        let mut chains = Vec::new();

        for root in self.index.roots() {
            let root_args = ArgMultiset::from_params(&root.decl.params);
            let stack = vec![root.key.clone()];

            for call in &root.decl.calls {
                let Some(callee) = call_key(call).and_then(|key| self.index.get(&key)) else {
                    continue;
                };

                if let Some(chain) = self.descend(callee, &root_args, 1, &stack) {
                    chains.push(chain);
                }
            }
        }

        chains
    }

    /// Descend into `callee`, returning the longest qualifying chain below it
    pub fn descend(
        &self,
        callee: &FunctionSignature<'a>,
        inherited: &ArgMultiset,
        depth: usize,
        call_stack: &[String],
    ) -> Option<Chain<'a>> {
        if depth > self.max_depth {
            return None;
        }

        let mut stack = call_stack.to_vec();
        stack.push(callee.key.clone());

        let shared = inherited.intersect(&ArgMultiset::from_params(&callee.decl.params));
        if shared.total() < MIN_SHARED_ARGS {
            return None;
        }

        let edges: Vec<&FunctionSignature<'a>> = callee
            .decl
            .calls
            .iter()
            .filter_map(|call| call_key(call).and_then(|key| self.index.get(&key)))
            .collect();

        if edges.is_empty() {
            return Some(Chain {
                call_stack: stack,
                shared_args: shared,
                leaf: callee.decl,
            });
        }

        let mut longest: Option<Chain<'a>> = None;
        for next in edges {
            let repeats = stack.iter().filter(|key| **key == next.key).count();
            if repeats >= MAX_KEY_REPEATS {
                continue;
            }

            if let Some(chain) = self.descend(next, &shared, depth + 1, &stack) {
                let is_longer = longest
                    .as_ref()
                    .map_or(true, |best| chain.call_stack.len() > best.call_stack.len());
                if is_longer {
                    longest = Some(chain);
                }
            }
        }

        longest
    }
}

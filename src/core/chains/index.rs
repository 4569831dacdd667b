// src/core/chains/index.rs
use std::collections::HashMap;
use tracing::debug;

use crate::core::model::FunctionDecl;
use super::keyer::decl_key;

/// An eligible declaration paired with its canonical key
#[derive(Debug, Clone)]
pub struct FunctionSignature<'a> {
    pub key: String,
    pub decl: &'a FunctionDecl,
}

/// Declarations with enough parameters to take part in a chain.
///
/// Built in a single pass and read-only afterwards. Every eligible
/// declaration is kept in `eligible` (in source order) so each can be
/// explored as a root; key lookups resolve to the last declaration
/// inserted under that key.
#[derive(Debug)]
pub struct DeclarationIndex<'a> {
    eligible: Vec<FunctionSignature<'a>>,
    by_key: HashMap<String, usize>,
}

impl<'a> DeclarationIndex<'a> {
    pub fn build<I>(decls: I, min_required_params: usize) -> Self
    where
        I: IntoIterator<Item = &'a FunctionDecl>,
    {
        let mut eligible: Vec<FunctionSignature<'a>> = Vec::new();
        let mut by_key = HashMap::new();

        for decl in decls {
            if decl.param_units() < min_required_params {
                continue;
            }

            let key = decl_key(decl);
            if let Some(previous) = by_key.insert(key.clone(), eligible.len()) {
                let previous: &FunctionSignature = &eligible[previous];
                debug!(
                    "Key collision on {}: {} replaces {}",
                    key, decl.position, previous.decl.position
                );
            }
            eligible.push(FunctionSignature { key, decl });
        }

        Self { eligible, by_key }
    }

    pub fn get(&self, key: &str) -> Option<&FunctionSignature<'a>> {
        self.by_key.get(key).map(|&slot| &self.eligible[slot])
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// All eligible declarations in source order, including ones shadowed by a key collision
    pub fn roots(&self) -> &[FunctionSignature<'a>] {
        &self.eligible
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

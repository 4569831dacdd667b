// src/core/chains/multiset.rs
use std::collections::BTreeMap;

use crate::core::model::ParamDecl;

/// Count of parameters available per type descriptor.
///
/// Absent types count as zero and are never stored. Values are never mutated
/// after construction; every hop along a chain derives a new multiset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgMultiset {
    counts: BTreeMap<String, usize>,
}

impl ArgMultiset {
    /// Build from a parameter list, one unit per bound name
    pub fn from_params(params: &[ParamDecl]) -> Self {
        let mut counts = BTreeMap::new();
        for param in params {
            *counts.entry(param.type_desc.clone()).or_insert(0) += param.units();
        }
        Self { counts }
    }

    /// Keep `min(self, other)` for every type present on both sides
    pub fn intersect(&self, other: &ArgMultiset) -> ArgMultiset {
        let counts = self
            .counts
            .iter()
            .filter_map(|(ty, &count)| {
                other
                    .counts
                    .get(ty)
                    .map(|&theirs| (ty.clone(), count.min(theirs)))
            })
            .filter(|&(_, count)| count > 0)
            .collect();

        ArgMultiset { counts }
    }

    #[cfg(test)]
    pub fn count(&self, ty: &str) -> usize {
        self.counts.get(ty).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// One entry per unit, lexicographically sorted: `{int: 2, string: 1}`
    /// expands to `["int", "int", "string"]`
    pub fn expanded(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .counts
            .iter()
            .flat_map(|(ty, &count)| std::iter::repeat(ty.clone()).take(count))
            .collect();
        types.sort();
        types
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ArgMultiset {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (ty, count) in iter {
            if count > 0 {
                *counts.entry(ty.into()).or_insert(0) += count;
            }
        }
        Self { counts }
    }
}

// src/core/chains/reducer.rs
use std::collections::HashSet;

use super::explorer::Chain;

/// Whether `sub` appears as a contiguous run inside the strictly longer `main`
pub fn is_sub_chain_of(sub: &[String], main: &[String]) -> bool {
    if sub.len() >= main.len() {
        return false;
    }
    if sub.is_empty() {
        return true;
    }

    main.windows(sub.len()).any(|window| window == sub)
}

/// Reduce raw chains to the maximal, de-duplicated set.
///
/// Longer chains are considered first (stable, so discovery order breaks
/// ties); a chain is dropped when it is a sub-chain of one already kept or
/// when an identical call stack was already kept.
pub fn reduce_chains(mut chains: Vec<Chain<'_>>) -> Vec<Chain<'_>> {
    chains.sort_by(|a, b| b.call_stack.len().cmp(&a.call_stack.len()));

    let mut kept: Vec<Chain> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for chain in chains {
        if kept.iter().any(|k| is_sub_chain_of(&chain.call_stack, &k.call_stack)) {
            continue;
        }

        if seen.insert(chain.call_stack.join("->")) {
            kept.push(chain);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chains::multiset::ArgMultiset;
    use crate::core::model::{FunctionDecl, SourcePosition};

    fn keys(stack: &[&str]) -> Vec<String> {
        stack.iter().map(|s| s.to_string()).collect()
    }

    fn chain<'a>(leaf: &'a FunctionDecl, stack: &[&str]) -> Chain<'a> {
        Chain {
            call_stack: keys(stack),
            shared_args: [("int", 3)].into_iter().collect::<ArgMultiset>(),
            leaf,
        }
    }

    fn leaf() -> FunctionDecl {
        FunctionDecl {
            name: "leaf".to_string(),
            receiver: None,
            params: vec![],
            calls: vec![],
            position: SourcePosition::new("r.go", 1, 1),
        }
    }

    #[test]
    fn test_is_sub_chain_of() {
        let main = keys(&["a", "b", "c", "d", "e"]);
        assert!(is_sub_chain_of(&keys(&["b", "c", "d"]), &main));
        assert!(is_sub_chain_of(&keys(&["a"]), &main));
        assert!(!is_sub_chain_of(&keys(&["b", "d"]), &main));
        assert!(!is_sub_chain_of(&main, &main));
        assert!(!is_sub_chain_of(&keys(&["a", "b", "c", "d", "e", "f"]), &main));
    }

    #[test]
    fn test_empty_stack_is_contained_in_any_longer_stack() {
        assert!(is_sub_chain_of(&[], &keys(&["a"])));
        assert!(!is_sub_chain_of(&[], &[]));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(reduce_chains(Vec::new()).is_empty());
    }

    #[test]
    fn test_keeps_only_longest_nested_chain() {
        let leaf = leaf();
        let chains = vec![
            chain(&leaf, &["a", "b"]),
            chain(&leaf, &["a", "b", "c"]),
            chain(&leaf, &["a", "b", "c", "d"]),
            chain(&leaf, &["b", "c", "d"]),
        ];

        let kept = reduce_chains(chains);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].call_stack, keys(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_duplicate_stacks_collapse() {
        let leaf = leaf();
        let kept = reduce_chains(vec![chain(&leaf, &["a", "b", "c"]), chain(&leaf, &["a", "b", "c"])]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_disjoint_chains_survive_in_stable_order() {
        let leaf = leaf();
        let kept = reduce_chains(vec![
            chain(&leaf, &["g", "h", "i"]),
            chain(&leaf, &["a", "b", "c", "d", "e", "f"]),
            chain(&leaf, &["j", "k", "l", "m"]),
            chain(&leaf, &["x", "y", "z"]),
        ]);

        let stacks: Vec<String> = kept.iter().map(|c| c.call_stack.join(" -> ")).collect();
        assert_eq!(
            stacks,
            vec!["a -> b -> c -> d -> e -> f", "j -> k -> l -> m", "g -> h -> i", "x -> y -> z"]
        );
    }

    #[test]
    fn test_overlapping_but_not_nested_chains_both_survive() {
        let leaf = leaf();
        let kept = reduce_chains(vec![
            chain(&leaf, &["a", "b", "c"]),
            chain(&leaf, &["b", "c", "d"]),
        ]);
        assert_eq!(kept.len(), 2);
    }
}

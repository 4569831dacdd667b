// src/core/chains/mod.rs
//! Parameter-chain analysis
//!
//! Finds call chains along which the same group of same-typed arguments is
//! passed through three or more calls, so the group can be bundled into a
//! single struct. The pipeline is: key declarations and call sites, index
//! the eligible declarations, explore chains from every indexed root, and
//! reduce the results to the maximal set.

mod keyer;
mod multiset;
mod index;
mod explorer;
mod reducer;
mod analyzer;

pub use explorer::Chain;
pub use analyzer::ParamAnalyzer;

#[cfg(test)]
pub use keyer::{call_key, decl_key};
#[cfg(test)]
pub use multiset::ArgMultiset;

// src/core/chains/analyzer.rs
use tracing::debug;

use crate::config::AnalyzerSettings;
use crate::core::parser::AnalysisUnit;
use crate::core::report::{Diagnostic, DiagnosticSink};
use super::explorer::{ChainExplorer, MIN_SHARED_ARGS};
use super::index::DeclarationIndex;
use super::reducer::reduce_chains;

/// Suggests a parameter struct for argument groups threaded through call chains
#[derive(Debug, Clone)]
pub struct ParamAnalyzer {
    min_required_params: usize,
    max_recursion_depth: usize,
}

impl ParamAnalyzer {
    pub fn new(settings: &AnalyzerSettings) -> Self {
        let analyzer = Self {
            min_required_params: settings.min_required_params(),
            max_recursion_depth: settings.max_recursion_depth(),
        };

        if analyzer.min_required_params < MIN_SHARED_ARGS {
            debug!(
                "min_required_params={} is below the shared-argument threshold {}; \
                 such functions may start chains but cannot end one alone",
                analyzer.min_required_params, MIN_SHARED_ARGS
            );
        }

        analyzer
    }

    pub fn min_required_params(&self) -> usize {
        self.min_required_params
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.max_recursion_depth
    }

    /// Analyze one unit and report every maximal chain to `sink`.
    ///
    /// Returns the number of diagnostics reported.
    pub fn run(&self, unit: &AnalysisUnit, sink: &mut dyn DiagnosticSink) -> usize {
        // Phase 1: the index is complete before any exploration starts
        let index = DeclarationIndex::build(unit.declarations(), self.min_required_params);
        let name = unit.name();
        debug!("{}: indexed {} functions", name, index.len());
        if index.is_empty() {
            return 0;
        }

        // Phase 2: read-only walk
        let explorer = ChainExplorer::new(&index, self.max_recursion_depth);
        let raw = explorer.explore_all();
        let raw_count = raw.len();

        let kept = reduce_chains(raw);
        debug!("{}: {} chains found, {} kept", name, raw_count, kept.len());

        for chain in &kept {
            sink.report(Diagnostic::from_chain(chain));
        }

        kept.len()
    }
}

impl Default for ParamAnalyzer {
    fn default() -> Self {
        Self::new(&AnalyzerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::core::model::{Callee, CallSite, FunctionDecl, ParamDecl, SourcePosition};
    use crate::core::parser::{AnalysisUnit, ParsedFile};

    fn func(name: &str, units: usize, calls: &[&str], line: usize) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            receiver: None,
            params: vec![ParamDecl::new((0..units).map(|i| format!("v{}", i)).collect(), "int")],
            calls: calls
                .iter()
                .map(|c| CallSite {
                    callee: Callee::Function(c.to_string()),
                    position: SourcePosition::new("unit.go", line, 10),
                })
                .collect(),
            position: SourcePosition::new("unit.go", line, 1),
        }
    }

    fn unit(functions: Vec<FunctionDecl>) -> AnalysisUnit {
        AnalysisUnit {
            language: "go".to_string(),
            root: PathBuf::from("."),
            package: Some("unit".to_string()),
            files: vec![ParsedFile {
                path: PathBuf::from("unit.go"),
                language: "go".to_string(),
                package: Some("unit".to_string()),
                functions,
            }],
        }
    }

    #[test]
    fn test_sub_chains_are_suppressed() {
        let unit = unit(vec![
            func("a", 3, &["b"], 1),
            func("b", 3, &["c"], 2),
            func("c", 3, &["d"], 3),
            func("d", 3, &[], 4),
        ]);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let reported = ParamAnalyzer::default().run(&unit, &mut diagnostics);

        assert_eq!(reported, 1);
        assert_eq!(diagnostics[0].call_stack, vec!["a", "b", "c", "d"]);
        assert_eq!(diagnostics[0].position.line, 4);
    }

    #[test]
    fn test_runs_are_idempotent() {
        let unit = unit(vec![
            func("g", 3, &["h"], 1),
            func("h", 3, &["i"], 2),
            func("i", 3, &[], 3),
            func("a", 3, &["b"], 4),
            func("b", 3, &[], 5),
        ]);
        let analyzer = ParamAnalyzer::new(&AnalyzerSettings::new(3, 10));

        let mut first: Vec<Diagnostic> = Vec::new();
        let mut second: Vec<Diagnostic> = Vec::new();
        analyzer.run(&unit, &mut first);
        analyzer.run(&unit, &mut second);

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_eligibility_threshold_comes_from_settings() {
        let unit = unit(vec![func("a", 3, &["b"], 1), func("b", 3, &[], 2)]);
        let strict = ParamAnalyzer::new(&AnalyzerSettings::new(4, 10));

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        assert_eq!(strict.run(&unit, &mut diagnostics), 0);
        assert_eq!(strict.min_required_params(), 4);
    }
}

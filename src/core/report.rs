// src/core/report.rs
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use crate::error::{UsestructError, Result};
use super::chains::Chain;
use super::model::SourcePosition;

/// Name attached to every text diagnostic
pub const LINTER_NAME: &str = "usestruct";

/// A parameter-struct recommendation anchored at the chain's leaf function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub position: SourcePosition,
    pub message: String,
    /// Shared argument types, one entry per unit, sorted
    pub arguments: Vec<String>,
    /// Canonical keys, root first
    pub call_stack: Vec<String>,
    /// Stable identity of the finding across runs
    pub fingerprint: String,
}

impl Diagnostic {
    pub fn from_chain(chain: &Chain<'_>) -> Self {
        let arguments = chain.shared_args.expanded();
        let fingerprint = fingerprint(&chain.call_stack, &arguments);

        Self {
            position: chain.leaf.position.clone(),
            message: chain.message(),
            arguments,
            call_stack: chain.call_stack.clone(),
            fingerprint,
        }
    }
}

/// Receiver of diagnostics produced by an analysis run
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Calculate SHA256 over the call stack and arguments
fn fingerprint(call_stack: &[String], arguments: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(call_stack.join(" -> ").as_bytes());
    hasher.update(b"\n");
    hasher.update(arguments.join(", ").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = UsestructError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(UsestructError::Config(format!("unknown output format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub units: usize,
    pub files: usize,
    pub diagnostics: usize,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    diagnostics: &'a [Diagnostic],
    summary: &'a ReportSummary,
}

/// Render diagnostics for stdout
pub fn render(diagnostics: &[Diagnostic], summary: &ReportSummary, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(diagnostics
            .iter()
            .map(|d| format!("{}: {} ({})\n", d.position, d.message, LINTER_NAME))
            .collect()),
        ReportFormat::Json => {
            let report = JsonReport { diagnostics, summary };
            let mut out = serde_json::to_string_pretty(&report)?;
            out.push('\n');
            Ok(out)
        }
    }
}

mod engine;
mod parser;
mod report;

// Language-neutral declarations shared by the front-ends and the analysis
mod model;

// Language-specific parsers
mod languages;

// Call-chain parameter analysis
mod chains;

pub use parser::{AnalysisUnit, CodeParser};
pub use report::{Diagnostic, ReportFormat, ReportSummary};
pub use chains::ParamAnalyzer;

// Export the main engine
pub use engine::{CheckOptions, Engine};

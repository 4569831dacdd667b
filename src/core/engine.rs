// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{info, debug};

use crate::config::{AnalyzerSettings, Config};
use crate::error::UsestructError;
use super::{AnalysisUnit, CodeParser, Diagnostic, ParamAnalyzer, ReportFormat, ReportSummary};
use super::report::render;

/// Name of the configuration file written by `init`
pub const CONFIG_FILE_NAME: &str = "usestruct.toml";

/// What to check and how, as requested on the command line
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Paths to analyze; the configured source directories when empty
    pub paths: Vec<PathBuf>,
    pub format: Option<ReportFormat>,
    /// Analyzer settings map as a host linter hands it over
    pub settings: Option<serde_json::Value>,
    pub min_required_params: Option<i64>,
    pub max_recursion_depth: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ReportSummary,
    /// Diagnostics rendered in the requested format
    pub rendered: String,
}

/// Main orchestration engine
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Create a new engine instance
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Ok(Self { config })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = path.unwrap_or_else(|| PathBuf::from("."));
        let config_path = target_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() && !force {
            return Err(UsestructError::Config(format!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ))
            .into());
        }

        std::fs::create_dir_all(&target_dir)?;
        Config::default().save(&config_path)?;
        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }

    /// Parse the requested paths, analyze every unit and render the findings
    pub async fn check(&self, options: CheckOptions) -> Result<CheckOutcome> {
        let roots = if options.paths.is_empty() {
            self.config.project.source_dirs.clone()
        } else {
            options.paths.clone()
        };

        // Config file, then the settings map, then individual flags
        let mut settings: AnalyzerSettings = self.config.analyzer.clone();
        if let Some(map) = &options.settings {
            let host = AnalyzerSettings::from_json(map)?;
            settings = settings.merged_with(host.min_required_params, host.max_recursion_depth);
        }
        let settings = settings.merged_with(options.min_required_params, options.max_recursion_depth);
        let analyzer = ParamAnalyzer::new(&settings);

        info!(
            "🔍 Checking {} path(s) (min params: {}, max depth: {})",
            roots.len(),
            analyzer.min_required_params(),
            analyzer.max_recursion_depth()
        );

        // Step 1: Parse sources into analysis units
        let parsing = self.config.parsing.clone();
        let project = self.config.project.clone();
        let units = tokio::task::spawn_blocking(move || -> crate::error::Result<Vec<AnalysisUnit>> {
            let mut parser = CodeParser::new(&parsing, &project)?;
            let mut units = Vec::new();
            for root in &roots {
                let files = parser.parse_directory(root)?;
                units.extend(AnalysisUnit::group(root, files));
            }
            Ok(units)
        })
        .await
        .context("parser task failed")??;

        let files_analyzed: usize = units.iter().map(|unit| unit.files.len()).sum();
        info!("📖 Parsed {} files into {} units", files_analyzed, units.len());

        // Step 2: Analyze units independently
        let unit_count = units.len();
        let mut tasks = JoinSet::new();
        for (order, unit) in units.into_iter().enumerate() {
            let analyzer = analyzer.clone();
            tasks.spawn_blocking(move || {
                let mut diagnostics: Vec<Diagnostic> = Vec::new();
                analyzer.run(&unit, &mut diagnostics);
                (order, diagnostics)
            });
        }

        let mut per_unit = Vec::with_capacity(unit_count);
        while let Some(joined) = tasks.join_next().await {
            per_unit.push(joined.context("analysis task failed")?);
        }

        // Completion order varies; unit order does not
        per_unit.sort_by_key(|(order, _)| *order);
        let diagnostics: Vec<Diagnostic> = per_unit
            .into_iter()
            .flat_map(|(_, diagnostics)| diagnostics)
            .collect();

        let summary = ReportSummary {
            units: unit_count,
            files: files_analyzed,
            diagnostics: diagnostics.len(),
        };
        info!("🎯 {} parameter struct recommendation(s)", summary.diagnostics);

        let format = match options.format {
            Some(format) => format,
            None => self.config.output.format.parse()?,
        };
        let rendered = render(&diagnostics, &summary, format)?;

        Ok(CheckOutcome {
            diagnostics,
            summary,
            rendered,
        })
    }
}

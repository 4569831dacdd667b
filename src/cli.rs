use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{Context, Result};

use crate::core::{CheckOptions, Engine, ReportFormat};

#[derive(Parser)]
#[command(name = "usestruct")]
#[command(about = "Finds call chains that thread the same arguments through every hop")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze source trees and report parameter struct candidates
    Check {
        /// Files or directories to analyze (defaults to the configured source dirs)
        paths: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<ReportFormat>,

        /// Analyzer settings as a JSON object, e.g. '{"min_required_params": 3}'
        #[arg(long, value_name = "JSON")]
        settings: Option<String>,

        /// Minimum parameter count for a function to take part in a chain
        #[arg(long)]
        min_required_params: Option<i64>,

        /// Maximum depth explored along one call chain
        #[arg(long)]
        max_recursion_depth: Option<i64>,

        /// Exit with an error when anything is reported (useful for CI)
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Check {
                paths,
                format,
                settings,
                min_required_params,
                max_recursion_depth,
                fail_on_findings,
            } => {
                let settings: Option<serde_json::Value> = settings
                    .map(|json| serde_json::from_str::<serde_json::Value>(&json))
                    .transpose()
                    .context("--settings is not valid JSON")?;

                let outcome = engine
                    .check(CheckOptions {
                        paths,
                        format,
                        settings,
                        min_required_params,
                        max_recursion_depth,
                    })
                    .await?;

                print!("{}", outcome.rendered);

                if fail_on_findings && !outcome.diagnostics.is_empty() {
                    anyhow::bail!(
                        "{} parameter struct recommendation(s) found in {} unit(s)",
                        outcome.diagnostics.len(),
                        outcome.summary.units
                    );
                }
                Ok(())
            }
            Commands::Init { path, force } => engine.init(path, force).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use crate::config::Config;

    #[test]
    fn test_check_arguments_parse() {
        let cli = Cli::try_parse_from([
            "usestruct",
            "--verbose",
            "check",
            "pkg/a",
            "pkg/b",
            "--format",
            "json",
            "--max-recursion-depth",
            "4",
            "--fail-on-findings",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Check { paths, format, settings, min_required_params, max_recursion_depth, fail_on_findings } => {
                assert_eq!(paths, vec![PathBuf::from("pkg/a"), PathBuf::from("pkg/b")]);
                assert_eq!(format, Some(ReportFormat::Json));
                assert_eq!(settings, None);
                assert_eq!(min_required_params, None);
                assert_eq!(max_recursion_depth, Some(4));
                assert!(fail_on_findings);
            }
            _ => panic!("expected check"),
        }
    }

    const CHAIN_GO: &str = "package p\n\nfunc a(x, y, z int) { b(x, y, z) }\nfunc b(x, y, z int) { c(x, y, z) }\nfunc c(x, y, z int) {}\n";

    fn engine() -> Engine {
        Engine::with_config(Config::default())
    }

    fn check(dir: &std::path::Path, extra: &[&str]) -> Cli {
        let dir = dir.to_string_lossy().to_string();
        let mut args = vec!["usestruct", "check", dir.as_str()];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn test_fail_on_findings_errors_when_something_is_reported() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("p/chain.go").write_str(CHAIN_GO).unwrap();

        let result = check(temp.path(), &["--fail-on-findings"]).execute(engine()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("1 parameter struct recommendation(s)"));

        // without the flag findings are only printed
        assert!(check(temp.path(), &[]).execute(engine()).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_on_findings_passes_on_clean_tree() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("p/clean.go")
            .write_str("package p\n\nfunc start(x, y, z int) { middle(x, y) }\nfunc middle(a, b int) {}\n")
            .unwrap();

        let result = check(temp.path(), &["--fail-on-findings"]).execute(engine()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_settings_flag_reaches_the_analyzer() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("p/chain.go").write_str(CHAIN_GO).unwrap();

        let strict = check(temp.path(), &["--settings", r#"{"min_required_params": 4}"#, "--fail-on-findings"]);
        assert!(strict.execute(engine()).await.is_ok());

        let malformed = check(temp.path(), &["--settings", "{not json"]);
        assert!(malformed.execute(engine()).await.is_err());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["usestruct", "check", "--format", "xml"]).is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{UsestructError, Result};

/// Default minimum parameter count for a function to be considered
pub const DEFAULT_MIN_REQUIRED_PARAMS: usize = 2;

/// Default ceiling on call-chain exploration depth
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Chain analysis tunables
    #[serde(default)]
    pub analyzer: AnalyzerSettings,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Source directories to analyze when no paths are given
    pub source_dirs: Vec<PathBuf>,

    /// Glob patterns to ignore
    pub ignore_patterns: Vec<String>,

    /// Regular expressions matched against file paths to exclude
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

/// The two analyzer tunables.
///
/// Values are kept signed because host configuration may hand over zero or
/// negative numbers; those (and absent values) fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Minimum number of parameter units for a function to anchor or continue a chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_required_params: Option<i64>,

    /// Maximum depth explored along a single call chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recursion_depth: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Languages to support
    pub languages: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (text, json)
    pub format: String,
}

impl AnalyzerSettings {
    pub fn new(min_required_params: i64, max_recursion_depth: i64) -> Self {
        Self {
            min_required_params: Some(min_required_params),
            max_recursion_depth: Some(max_recursion_depth),
        }
    }

    /// Parse the settings map a host plugin layer passes in.
    ///
    /// Anything that is not a JSON object yields the defaults; an object with
    /// fields of the wrong shape is a configuration error.
    pub fn from_json(settings: &serde_json::Value) -> Result<Self> {
        if !settings.is_object() {
            return Ok(Self::default());
        }

        serde_json::from_value(settings.clone())
            .map_err(|e| UsestructError::Config(format!("failed to parse analyzer settings: {}", e)))
    }

    pub fn min_required_params(&self) -> usize {
        positive_or(self.min_required_params, DEFAULT_MIN_REQUIRED_PARAMS)
    }

    pub fn max_recursion_depth(&self) -> usize {
        positive_or(self.max_recursion_depth, DEFAULT_MAX_RECURSION_DEPTH)
    }

    /// Overlay explicitly provided values on top of these settings
    pub fn merged_with(&self, min_required_params: Option<i64>, max_recursion_depth: Option<i64>) -> Self {
        Self {
            min_required_params: min_required_params.or(self.min_required_params),
            max_recursion_depth: max_recursion_depth.or(self.max_recursion_depth),
        }
    }
}

fn positive_or(value: Option<i64>, default: usize) -> usize {
    match value {
        Some(v) if v > 0 => v as usize,
        _ => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_dirs: vec![PathBuf::from(".")],
                ignore_patterns: vec![
                    "target/".to_string(),
                    "vendor/".to_string(),
                    "node_modules/".to_string(),
                    ".git/".to_string(),
                ],
                exclude_paths: vec![],
            },
            analyzer: AnalyzerSettings::new(
                DEFAULT_MIN_REQUIRED_PARAMS as i64,
                DEFAULT_MAX_RECURSION_DEPTH as i64,
            ),
            parsing: ParsingConfig {
                languages: vec!["go".to_string(), "rust".to_string()],
                max_file_size: 1024 * 1024, // 1MB
            },
            output: OutputConfig {
                format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| UsestructError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| UsestructError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "usestruct.toml",
                    ".usestruct.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_positive_settings_fall_back_to_defaults() {
        let settings = AnalyzerSettings::new(0, -4);
        assert_eq!(settings.min_required_params(), DEFAULT_MIN_REQUIRED_PARAMS);
        assert_eq!(settings.max_recursion_depth(), DEFAULT_MAX_RECURSION_DEPTH);

        let absent = AnalyzerSettings::default();
        assert_eq!(absent.min_required_params(), 2);
        assert_eq!(absent.max_recursion_depth(), 10);
    }

    #[test]
    fn test_settings_from_plugin_json() {
        let settings = AnalyzerSettings::from_json(&json!({
            "min_required_params": 4,
            "max_recursion_depth": 0
        }))
        .unwrap();
        assert_eq!(settings.min_required_params(), 4);
        assert_eq!(settings.max_recursion_depth(), DEFAULT_MAX_RECURSION_DEPTH);

        let not_a_map = AnalyzerSettings::from_json(&json!("whatever")).unwrap();
        assert_eq!(not_a_map, AnalyzerSettings::default());

        assert!(AnalyzerSettings::from_json(&json!({ "min_required_params": "three" })).is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let base = AnalyzerSettings::new(3, 10);
        let merged = base.merged_with(None, Some(4));
        assert_eq!(merged.min_required_params(), 3);
        assert_eq!(merged.max_recursion_depth(), 4);
    }

    #[test]
    fn test_config_round_trips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usestruct.toml");

        let mut config = Config::default();
        config.analyzer = AnalyzerSettings::new(3, 6);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.analyzer, config.analyzer);
        assert_eq!(loaded.parsing.languages, vec!["go", "rust"]);
    }

    #[test]
    fn test_missing_analyzer_table_uses_defaults() {
        let content = r#"
[project]
name = "demo"
source_dirs = ["src"]
ignore_patterns = []

[parsing]
languages = ["go"]
max_file_size = 1024

[output]
format = "json"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.analyzer.min_required_params(), 2);
        assert!(config.project.exclude_paths.is_empty());
    }
}

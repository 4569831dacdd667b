use std::path::{Path, PathBuf};
use std::collections::{BTreeMap, HashMap};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ParsingConfig, ProjectConfig};
use crate::error::{UsestructError, Result};
use super::languages::{LanguageParser, GoParser, RustParser};
use super::model::FunctionDecl;

/// Represents a parsed source file with its extracted declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    /// File path as discovered during the walk
    pub path: PathBuf,

    /// Programming language detected
    pub language: String,

    /// Package clause, for languages that declare one per file
    pub package: Option<String>,

    /// Function and method declarations in source order
    pub functions: Vec<FunctionDecl>,
}

/// A set of files analyzed together: one Go package or one Rust crate root
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    pub language: String,
    pub root: PathBuf,
    pub package: Option<String>,
    pub files: Vec<ParsedFile>,
}

impl AnalysisUnit {
    /// Group files discovered under `root` into units.
    ///
    /// Go files sharing a directory and a package clause form one package, so
    /// an external `_test` package never shares a unit with the package it
    /// tests; all Rust files under the root form one crate. Units come back
    /// ordered by language, path, then package.
    pub fn group(root: &Path, files: Vec<ParsedFile>) -> Vec<AnalysisUnit> {
        let mut grouped: BTreeMap<(String, PathBuf, Option<String>), Vec<ParsedFile>> = BTreeMap::new();

        for file in files {
            let unit_root = match file.language.as_str() {
                "go" => file.path.parent().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                _ => root.to_path_buf(),
            };
            let key = (file.language.clone(), unit_root, file.package.clone());
            grouped.entry(key).or_default().push(file);
        }

        grouped
            .into_iter()
            .map(|((language, root, package), mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                AnalysisUnit { language, root, package, files }
            })
            .collect()
    }

    /// Label for logs: `go pkg/widgets (widgets_test)`
    pub fn name(&self) -> String {
        match &self.package {
            Some(package) => format!("{} {} ({})", self.language, self.root.display(), package),
            None => format!("{} {}", self.language, self.root.display()),
        }
    }

    /// Every declaration of the unit, file by file in source order
    pub fn declarations(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.files.iter().flat_map(|file| file.functions.iter())
    }
}

/// Multi-language code parser that delegates to language-specific parsers
pub struct CodeParser {
    config: ParsingConfig,
    language_parsers: HashMap<String, Box<dyn LanguageParser + Send>>,
    ignore_patterns: Vec<String>,
    exclude_paths: Vec<Regex>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig, project: &ProjectConfig) -> Result<Self> {
        let mut language_parsers: HashMap<String, Box<dyn LanguageParser + Send>> = HashMap::new();

        // Initialize language parsers based on configuration
        for language in &config.languages {
            match language.as_str() {
                "go" => {
                    let go_parser = GoParser::new()?;
                    language_parsers.insert("go".to_string(), Box::new(go_parser));
                }
                "rust" => {
                    let rust_parser = RustParser::new()?;
                    language_parsers.insert("rust".to_string(), Box::new(rust_parser));
                }
                other => {
                    warn!("Skipping unsupported language: {}", other);
                    continue;
                }
            }
        }

        let exclude_paths = project
            .exclude_paths
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| UsestructError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config: config.clone(),
            language_parsers,
            ignore_patterns: project.ignore_patterns.clone(),
            exclude_paths,
        })
    }

    /// Parse all supported files under a directory (or a single file)
    pub fn parse_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<Vec<ParsedFile>> {
        let dir = dir.as_ref();
        let mut parsed_files = Vec::new();

        let mut overrides = OverrideBuilder::new(dir);
        for pattern in &self.ignore_patterns {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| UsestructError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
        }
        let overrides = overrides.build().map_err(|e| UsestructError::FileSystem(e.to_string()))?;

        // Use ignore crate to respect .gitignore and custom patterns
        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| UsestructError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() || !self.should_parse_file(path) {
                continue;
            }

            let size = std::fs::metadata(path)?.len();
            if size > self.config.max_file_size as u64 {
                warn!("Skipping {}: exceeds maximum size limit", path.display());
                continue;
            }

            parsed_files.push(self.parse_file(path)?);
        }

        debug!("Parsed {} files under {}", parsed_files.len(), dir.display());
        Ok(parsed_files)
    }

    /// Parse a single source file
    pub fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<ParsedFile> {
        let path = file_path.as_ref();
        let language = self.detect_language(path)?;

        let source_content = std::fs::read_to_string(path)?;

        let parser = self.language_parsers.get_mut(&language).ok_or_else(|| {
            UsestructError::Parser(format!("No parser registered for {}", language))
        })?;
        let model = parser.parse(&source_content, path)?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language,
            package: model.package,
            functions: model.functions,
        })
    }

    /// Determine if a file should be parsed based on configuration
    fn should_parse_file(&self, path: &Path) -> bool {
        let path_text = path.to_string_lossy();
        if self.exclude_paths.iter().any(|re| re.is_match(&path_text)) {
            debug!("Excluded by pattern: {}", path.display());
            return false;
        }

        self.detect_language(path).is_ok()
    }

    /// Detect programming language from file path
    fn detect_language(&self, path: &Path) -> Result<String> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            for (lang, parser) in &self.language_parsers {
                if parser.file_extensions().contains(&extension) {
                    return Ok(lang.clone());
                }
            }
        }

        Err(UsestructError::Parser(
            format!("Could not detect language for file: {}", path.display())
        ))
    }
}

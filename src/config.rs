//! Configuration system
//!
//! Reads configuration from:
//! - an explicit `--config` path
//! - `.xmlauditrc.yaml` / `.xmlauditrc.json` (project-level)
//! - the same names in the home directory (user-level)

use crate::classifier::{Classifier, ClassifierStrategy};
use crate::rules::{RuleBook, RULES_VERSION};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub strategy: ClassifierStrategy,

    /// Raw-text markers (textual strategy)
    pub markers: Vec<String>,

    /// Static-only tags (structural strategy); empty = the static rule set's tags
    pub tags: Vec<String>,

    /// Case-insensitive tag substrings that also mark a static document
    pub tag_fragments: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: ClassifierStrategy::Textual,
            markers: vec!["StaticData".to_string()],
            tags: Vec::new(),
            tag_fragments: Vec::new(),
        }
    }
}

/// File selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Extensions to audit, without the dot
    pub extensions: Vec<String>,

    /// Glob patterns to skip
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["xml".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving report files
    pub report_dir: PathBuf,

    pub format: OutputFormat,

    pub color: ColorMode,

    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("."),
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: RuleBook,

    pub classifier: ClassifierConfig,

    pub files: FilesConfig,

    pub output: OutputConfig,
}

/// CLI options to merge into config
#[derive(Debug, Default)]
pub struct CliOptions {
    pub format: Option<OutputFormat>,
    pub report_dir: Option<PathBuf>,
    pub strategy: Option<ClassifierStrategy>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file (YAML or JSON, by extension)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.finalize()
    }

    /// Load configuration from default locations
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let config_names = [
            ".xmlauditrc.yaml",
            ".xmlauditrc.yml",
            ".xmlauditrc.json",
            "xml-audit.yaml",
            "xml-audit.json",
        ];

        let mut dirs_to_check = vec![start_dir.to_path_buf()];
        if let Some(home) = dirs::home_dir() {
            dirs_to_check.push(home);
        }

        for dir in dirs_to_check {
            for name in &config_names {
                let path = dir.join(name);
                if path.exists() {
                    let config = Self::load(&path)?;
                    return Ok(Some((path, config)));
                }
            }
        }

        Ok(None)
    }

    /// Validate and normalize a freshly deserialized configuration
    fn finalize(mut self) -> Result<Self, ConfigError> {
        if self.rules.version != RULES_VERSION {
            return Err(ConfigError::Invalid(format!(
                "Unsupported rules version {} (expected {})",
                self.rules.version, RULES_VERSION
            )));
        }
        if self.files.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "files.extensions must not be empty".to_string(),
            ));
        }
        self.rules.normalize();
        self.exclude_set()?;
        Ok(self)
    }

    /// Merge CLI arguments into configuration (CLI takes precedence)
    pub fn merge_cli(&mut self, opts: CliOptions) {
        if let Some(format) = opts.format {
            self.output.format = format;
        }
        if let Some(dir) = opts.report_dir {
            self.output.report_dir = dir;
        }
        if let Some(strategy) = opts.strategy {
            self.classifier.strategy = strategy;
        }
        if opts.verbose {
            self.output.verbose = true;
        }
        if opts.no_color {
            self.output.color = ColorMode::Never;
        }
    }

    /// Build the classifier described by this configuration
    pub fn classifier(&self) -> Classifier {
        let tags = if self.classifier.tags.is_empty() {
            self.rules.static_data.required_tags.clone()
        } else {
            self.classifier.tags.clone()
        };
        Classifier::new(
            self.classifier.strategy,
            self.classifier.markers.clone(),
            tags,
            self.classifier.tag_fragments.clone(),
        )
    }

    /// Compile the exclude patterns
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.files.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    /// Whether a path has one of the configured extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.files
                    .extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

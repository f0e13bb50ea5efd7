//! Configuration management for talcleaner
//!
//! Configuration is read from `./config/talcleaner.toml` (or `--config`).
//! The embedded template below is the only place defaults live; it is used
//! as-is when no config file exists.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::vocabulary::Vocabulary;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/talcleaner.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/talcleaner.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' must be within {range} (got {value})")]
    OutOfRange {
        field: String,
        range: String,
        value: f64,
    },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Multi-label suffix '{suffix}' must start with '.' and contain at least two labels")]
    InvalidSuffix { suffix: String },

    #[error("Multi-label suffix '{suffix}' ends with another configured suffix '{other}'")]
    OverlappingSuffix { suffix: String, other: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub detection: DetectionConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

/// Where cleaned files and the report are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Name of the dedicated output subfolder
    pub subfolder_name: String,
    /// File name of the summary workbook
    pub report_file_name: String,
    /// Use the subfolder when cleaning a single file
    pub single_file_subfolder: bool,
    /// Use the subfolder when cleaning a whole folder
    pub folder_subfolder: bool,
    /// Produce the summary workbook
    pub report: bool,
}

/// Column detection thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Minimum domain/name non-missing ratio for the domain column to win
    pub dual_candidate_ratio: f64,
    /// Minimum domain-like fraction for content-based domain classification
    pub content_domain_fraction: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dual_candidate_ratio: 0.70,
            content_domain_fraction: 0.5,
        }
    }
}

/// Extra vocabulary entries appended to the built-in lists
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub legal_suffixes: Vec<String>,
    pub multi_label_suffixes: Vec<String>,
    pub brand_overrides: BTreeMap<String, String>,
    pub domain_keywords: Vec<String>,
    pub name_keywords: Vec<String>,
    pub header_keywords: Vec<String>,
    pub placeholder_tokens: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Code defaults apply only if the embedded template fails to parse
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            output: OutputConfig {
                subfolder_name: "clean_companies".to_string(),
                report_file_name: "tal_info.xlsx".to_string(),
                single_file_subfolder: false,
                folder_subfolder: true,
                report: false,
            },
            detection: DetectionConfig::default(),
            vocabulary: VocabularyConfig::default(),
        })
    }
}

impl AppConfig {
    /// Load configuration from the default path, falling back to the
    /// embedded template when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        match Self::load_from_path(Path::new(CONFIG_PATH)) {
            Err(ConfigError::FileNotFound(_)) => {
                let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.subfolder_name.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.subfolder_name".to_string(),
            });
        }
        if self.output.report_file_name.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.report_file_name".to_string(),
            });
        }

        let ratio = self.detection.dual_candidate_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "detection.dual_candidate_ratio".to_string(),
                range: "(0, inf)".to_string(),
                value: ratio,
            });
        }

        let fraction = self.detection.content_domain_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::OutOfRange {
                field: "detection.content_domain_fraction".to_string(),
                range: "[0, 1]".to_string(),
                value: fraction,
            });
        }

        self.vocabulary()?;
        Ok(())
    }

    /// The built-in vocabulary extended with this config's entries
    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        Vocabulary::extended(&self.vocabulary)
    }

    /// Create default configuration file at the given location
    pub fn create_default_config(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
        assert_eq!(config.output.subfolder_name, "clean_companies");
        assert_eq!(config.output.report_file_name, "tal_info.xlsx");
        assert!(!config.output.single_file_subfolder);
        assert!(config.output.folder_subfolder);
        assert!((config.detection.dual_candidate_ratio - 0.70).abs() < f64::EPSILON);
        assert!((config.detection.content_domain_fraction - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_vocabulary_section_is_optional() {
        let config_str = r#"
[output]
subfolder_name = "out"
report_file_name = "report.xlsx"
single_file_subfolder = true
folder_subfolder = false
report = true

[detection]
dual_candidate_ratio = 0.5
content_domain_fraction = 0.25
"#;

        let config: AppConfig = toml::from_str(config_str).expect("Config should parse without vocabulary section");
        assert!(config.validate().is_ok());
        assert!(config.vocabulary.legal_suffixes.is_empty());
        assert!(config.output.report);
    }

    #[test]
    fn test_vocabulary_extensions_parse() {
        let config_str = r#"
[output]
subfolder_name = "clean_companies"
report_file_name = "tal_info.xlsx"
single_file_subfolder = false
folder_subfolder = true
report = false

[detection]
dual_candidate_ratio = 0.70
content_domain_fraction = 0.5

[vocabulary]
legal_suffixes = ["KG", "Pty Ltd"]
multi_label_suffixes = [".co.nz"]
name_keywords = ["vendor"]

[vocabulary.brand_overrides]
Ebay = "eBay"
"#;

        let config: AppConfig = toml::from_str(config_str).expect("Config should parse");
        let vocab = config.vocabulary().expect("vocabulary should validate");
        assert!(vocab.legal_suffixes.contains(&"Pty Ltd".to_string()));
        assert!(vocab.multi_label_suffixes.contains(&".co.nz".to_string()));
        assert!(vocab.brand_overrides.contains(&("Ebay".to_string(), "eBay".to_string())));
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        let mut config = AppConfig::default();
        config.detection.content_domain_fraction = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        let mut config = AppConfig::default();
        config.detection.dual_candidate_ratio = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = AppConfig::load_from_path(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_create_default_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("talcleaner.toml");

        let written = AppConfig::create_default_config(&path).unwrap();
        assert_eq!(written, path);

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.output.subfolder_name, "clean_companies");
    }
}

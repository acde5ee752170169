//! Pipeline configuration and file loading.
//!
//! [`PipelineConfig`] aggregates the per-stage configs and can be loaded from
//! or saved to TOML and JSON. Every field has a default, so partial files are
//! accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::DocFieldError;
use crate::core::config::{ConfigError, ConfigValidator};
use crate::pipeline::rectify::RectifyConfig;
use crate::processors::{MergeConfig, SequencerConfig, SuppressionConfig};

/// What to do when a category of the family has no detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCategoryPolicy {
    /// Fail the document with an image-quality error.
    #[default]
    Abort,
    /// Record the error and continue with the remaining categories.
    Continue,
}

/// Configuration for [`FieldPipeline`](crate::pipeline::FieldPipeline).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub missing_category: MissingCategoryPolicy,
    pub suppression: SuppressionConfig,
    pub merge: MergeConfig,
    pub sequencer: SequencerConfig,
    pub rectify: RectifyConfig,
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.suppression.validate()?;
        self.validate_f32_open_range(
            self.suppression.overlap_threshold,
            0.0,
            1.0,
            "suppression.overlap_threshold",
        )?;
        self.merge.validate()?;
        self.sequencer.validate()?;
        self.rectify.validate()?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Loads and saves [`PipelineConfig`].
///
/// Loading only parses; validation happens when the config is handed to
/// [`FieldPipeline::new`](crate::pipeline::FieldPipeline::new).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use oar_docfields::pipeline::ConfigLoader;
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::load_from_file(Path::new("docfields.toml"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_file(path: &Path) -> Result<PipelineConfig, DocFieldError> {
        let format = Self::format_of(path)?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            DocFieldError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::load_from_string(&content, format)
    }

    /// Load configuration from a string with specified format
    pub fn load_from_string(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineConfig, DocFieldError> {
        match format {
            ConfigFormat::Toml => Self::load_from_toml(content),
            ConfigFormat::Json => Self::load_from_json(content),
        }
    }

    /// Load configuration from TOML string
    pub fn load_from_toml(content: &str) -> Result<PipelineConfig, DocFieldError> {
        toml::from_str(content)
            .map_err(|e| DocFieldError::config_error(format!("Failed to parse TOML config: {e}")))
    }

    /// Load configuration from JSON string
    pub fn load_from_json(content: &str) -> Result<PipelineConfig, DocFieldError> {
        serde_json::from_str(content)
            .map_err(|e| DocFieldError::config_error(format!("Failed to parse JSON config: {e}")))
    }

    /// Save configuration to a file, auto-detecting the format from the extension
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration to save
    /// * `path` - Path to save the configuration file
    pub fn save_to_file(config: &PipelineConfig, path: &Path) -> Result<(), DocFieldError> {
        let format = Self::format_of(path)?;
        let content = Self::save_to_string(config, format)?;

        std::fs::write(path, content).map_err(|e| {
            DocFieldError::config_error(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Save configuration to string with specified format
    pub fn save_to_string(
        config: &PipelineConfig,
        format: ConfigFormat,
    ) -> Result<String, DocFieldError> {
        match format {
            ConfigFormat::Toml => Self::save_to_toml(config),
            ConfigFormat::Json => Self::save_to_json(config),
        }
    }

    /// Save configuration to TOML string
    pub fn save_to_toml(config: &PipelineConfig) -> Result<String, DocFieldError> {
        toml::to_string_pretty(config).map_err(|e| {
            DocFieldError::config_error(format!("Failed to serialize config to TOML: {e}"))
        })
    }

    /// Save configuration to JSON string
    pub fn save_to_json(config: &PipelineConfig) -> Result<String, DocFieldError> {
        serde_json::to_string_pretty(config).map_err(|e| {
            DocFieldError::config_error(format!("Failed to serialize config to JSON: {e}"))
        })
    }

    fn format_of(path: &Path) -> Result<ConfigFormat, DocFieldError> {
        ConfigFormat::from_extension(path).ok_or_else(|| {
            DocFieldError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })
    }
}

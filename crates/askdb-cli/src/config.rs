//! Settings file and layered configuration
//!
//! Values are resolved in this order, first match wins: command-line flag,
//! environment variable (both handled by clap), `config.toml`, built-in default.

use crate::logging::LogFormat;
use anyhow::{Context, Result};
use askdb_ai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use askdb_core::PrimaryKeyStyle;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE: &str = "askdb-demo.db";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("askdb"))
}

pub fn default_config_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub primary_key_style: Option<PrimaryKeyStyle>,
    pub openai: OpenAiFileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiFileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    /// Load an explicitly requested file; it must exist
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing default file is not an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let path = match default_config_file() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(error = %e, "no config directory, using defaults");
                return Ok(Self::default());
            }
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub log_format: Option<LogFormat>,
    pub composite_pk: bool,
}

/// Fully resolved settings
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub database: PathBuf,
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub log_format: LogFormat,
    pub primary_key_style: PrimaryKeyStyle,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("database", &self.database)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("log_format", &self.log_format)
            .field("primary_key_style", &self.primary_key_style)
            .finish()
    }
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Self {
        let primary_key_style = if overrides.composite_pk {
            PrimaryKeyStyle::TableConstraint
        } else {
            file.primary_key_style.unwrap_or_default()
        };

        Self {
            database: overrides
                .database
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            model: overrides
                .model
                .or(file.openai.model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            api_base: overrides
                .api_base
                .or(file.openai.base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            api_key: overrides.api_key.filter(|k| !k.trim().is_empty()),
            temperature: file.openai.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            log_format: overrides.log_format.or(file.log_format).unwrap_or_default(),
            primary_key_style,
        }
    }
}

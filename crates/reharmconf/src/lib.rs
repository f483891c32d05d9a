//! Configuration loading for reharm.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/reharm/config.toml` (system)
//! 2. `~/.config/reharm/config.toml` (user)
//! 3. `./reharm.toml` (local override), or the `--config` path instead
//! 4. Environment variables (`REHARM_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! input = "Labyrinth-1.mid"
//! output = "output.mid"
//!
//! [analysis]
//! preview_limit = 10
//! include_percussion = false
//!
//! [transform]
//! context_octave = 4
//!
//! [output]
//! preserve_notes = true
//!
//! [telemetry]
//! log_level = "warn"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{AnalysisConfig, OutputConfig, PathsConfig, TelemetryConfig, TransformConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key} in {path}: {message}")]
    InvalidValue {
        path: PathBuf,
        key: String,
        message: String,
    },
}

/// Complete reharm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReharmConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ReharmConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file replacing `./reharm.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// An explicit path that does not exist is an error; the standard
    /// locations are skipped silently when absent.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        let mut sources = ConfigSources::default();
        let mut config = ReharmConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# reharm configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!("input = \"{}\"\n", self.paths.input.display()));
        output.push_str(&format!("output = \"{}\"\n", self.paths.output.display()));

        output.push_str("\n[analysis]\n");
        output.push_str(&format!("preview_limit = {}\n", self.analysis.preview_limit));
        output.push_str(&format!(
            "include_percussion = {}\n",
            self.analysis.include_percussion
        ));

        output.push_str("\n[transform]\n");
        output.push_str(&format!(
            "context_octave = {}\n",
            self.transform.context_octave
        ));

        output.push_str("\n[output]\n");
        output.push_str(&format!("preserve_notes = {}\n", self.output.preserve_notes));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}

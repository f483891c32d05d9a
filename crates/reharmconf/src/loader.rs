//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ReharmConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    // System config
    let system = PathBuf::from("/etc/reharm/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("reharm/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    // Local override (current directory)
    let local = PathBuf::from("reharm.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and lay its keys over `config`.
pub fn load_into(config: &mut ReharmConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Lay the keys present in a TOML document over `config`. Absent keys keep
/// their current value, so files can be stacked.
pub fn apply_toml(config: &mut ReharmConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("input").and_then(|v| v.as_str()) {
            config.paths.input = expand_path(v);
        }
        if let Some(v) = paths.get("output").and_then(|v| v.as_str()) {
            config.paths.output = expand_path(v);
        }
    }

    if let Some(analysis) = table.get("analysis").and_then(|v| v.as_table()) {
        if let Some(v) = analysis.get("preview_limit").and_then(|v| v.as_integer()) {
            config.analysis.preview_limit = usize::try_from(v).map_err(|_| ConfigError::InvalidValue {
                path: path.to_path_buf(),
                key: "analysis.preview_limit".into(),
                message: format!("{} is negative", v),
            })?;
        }
        if let Some(v) = analysis.get("include_percussion").and_then(|v| v.as_bool()) {
            config.analysis.include_percussion = v;
        }
    }

    if let Some(transform) = table.get("transform").and_then(|v| v.as_table()) {
        if let Some(v) = transform.get("context_octave").and_then(|v| v.as_integer()) {
            config.transform.context_octave = parse_octave(v).ok_or_else(|| ConfigError::InvalidValue {
                path: path.to_path_buf(),
                key: "transform.context_octave".into(),
                message: format!("{} is outside -1..=9", v),
            })?;
        }
    }

    if let Some(output) = table.get("output").and_then(|v| v.as_table()) {
        if let Some(v) = output.get("preserve_notes").and_then(|v| v.as_bool()) {
            config.output.preserve_notes = v;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

fn parse_octave(v: i64) -> Option<i8> {
    i8::try_from(v)
        .ok()
        .filter(|o| crate::TransformConfig::OCTAVE_RANGE.contains(o))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply `REHARM_*` environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ReharmConfig, sources: &mut ConfigSources) {
    apply_env_overrides_from(config, sources, env::vars());
}

/// Apply overrides from an explicit variable list. Unparseable values are ignored.
pub fn apply_env_overrides_from(
    config: &mut ReharmConfig,
    sources: &mut ConfigSources,
    vars: impl IntoIterator<Item = (String, String)>,
) {
    for (key, value) in vars {
        let applied = match key.as_str() {
            "REHARM_INPUT" => {
                config.paths.input = expand_path(&value);
                true
            }
            "REHARM_OUTPUT" => {
                config.paths.output = expand_path(&value);
                true
            }
            "REHARM_PREVIEW_LIMIT" => value
                .trim()
                .parse()
                .map(|n| config.analysis.preview_limit = n)
                .is_ok(),
            "REHARM_INCLUDE_PERCUSSION" => parse_bool(&value)
                .map(|b| config.analysis.include_percussion = b)
                .is_some(),
            "REHARM_CONTEXT_OCTAVE" => value
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(parse_octave)
                .map(|o| config.transform.context_octave = o)
                .is_some(),
            "REHARM_PRESERVE_NOTES" => parse_bool(&value)
                .map(|b| config.output.preserve_notes = b)
                .is_some(),
            "REHARM_LOG_LEVEL" => {
                config.telemetry.log_level = value;
                true
            }
            _ => false,
        };

        if applied {
            sources.env_overrides.push(key);
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

//! Config sections. Every field has a compiled default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input and output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// MIDI file to read.
    /// Default: Labyrinth-1.mid
    #[serde(default = "PathsConfig::default_input")]
    pub input: PathBuf,

    /// MIDI file to write.
    /// Default: output.mid
    #[serde(default = "PathsConfig::default_output")]
    pub output: PathBuf,
}

impl PathsConfig {
    fn default_input() -> PathBuf {
        PathBuf::from("Labyrinth-1.mid")
    }

    fn default_output() -> PathBuf {
        PathBuf::from("output.mid")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: Self::default_input(),
            output: Self::default_output(),
        }
    }
}

/// Chord detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How many distinct chord names to print.
    /// Default: 10
    #[serde(default = "AnalysisConfig::default_preview_limit")]
    pub preview_limit: usize,

    /// Chordify and transform drum parts too.
    /// Default: false
    #[serde(default)]
    pub include_percussion: bool,
}

impl AnalysisConfig {
    fn default_preview_limit() -> usize {
        10
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            preview_limit: Self::default_preview_limit(),
            include_percussion: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Octave at which chord-context pitch classes are realized when
    /// snapping melody notes (C4 = 60).
    /// Default: 4
    #[serde(default = "TransformConfig::default_context_octave")]
    pub context_octave: i8,
}

impl TransformConfig {
    pub const OCTAVE_RANGE: std::ops::RangeInclusive<i8> = -1..=9;

    fn default_context_octave() -> i8 {
        4
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            context_octave: Self::default_context_octave(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Keep the original notes when only the tempo changes.
    /// Default: true
    #[serde(default = "OutputConfig::default_preserve_notes")]
    pub preserve_notes: bool,
}

impl OutputConfig {
    fn default_preserve_notes() -> bool {
        true
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preserve_notes: Self::default_preserve_notes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: warn
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

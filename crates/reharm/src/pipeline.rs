//! Load, detect, ask, transform, write.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use midi_analysis::{gm, performance_to_midi, Performance};
use music_understand::{spelling_for, ChordDetector, KeyDetection, Score};
use reharmconf::ReharmConfig;
use tracing::{info, warn};

use crate::prompt::{valid_tempo, Prompter};
use crate::substitution::{parse_request, SubstitutionError, SubstitutionRule};
use crate::transform::{reharmonize, TransformOptions, TransformStats};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("MIDI file '{0}' not found")]
    NotFound(PathBuf),

    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: midi_analysis::Error,
    },
}

/// Both views of one file.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub performance: Performance,
    pub score: Score,
    pub original_bpm: f64,
}

pub fn load(path: &Path) -> Result<Loaded, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let performance = Performance::parse(&bytes).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let score = Score::from_performance(&performance);
    let original_bpm = performance.initial_bpm();

    info!(
        path = %path.display(),
        instruments = performance.instruments.len(),
        notes = performance.note_count(),
        bpm = original_bpm,
        "loaded MIDI file"
    );

    Ok(Loaded {
        performance,
        score,
        original_bpm,
    })
}

/// Everything one run needs. Answers left as `None` are asked for when
/// `interactive` is set.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tempo: Option<f64>,
    pub substitution: Option<String>,
    pub interactive: bool,
    pub preview_limit: usize,
    pub include_percussion: bool,
    pub context_octave: i8,
    pub preserve_notes: bool,
}

impl RunOptions {
    pub fn from_config(config: &ReharmConfig) -> Self {
        Self {
            input: config.paths.input.clone(),
            output: config.paths.output.clone(),
            tempo: None,
            substitution: None,
            interactive: true,
            preview_limit: config.analysis.preview_limit,
            include_percussion: config.analysis.include_percussion,
            context_octave: config.transform.context_octave,
            preserve_notes: config.output.preserve_notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubstitutionOutcome {
    NotRequested,
    Rejected(SubstitutionError),
    NoMatch(SubstitutionRule),
    Applied {
        rule: SubstitutionRule,
        stats: TransformStats,
    },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub original_bpm: f64,
    pub final_bpm: f64,
    pub key: KeyDetection,
    /// Distinct detected chord names, first-seen order.
    pub chords: Vec<String>,
    pub substitution: SubstitutionOutcome,
    pub output: PathBuf,
    pub notes_written: usize,
}

/// Run the whole flow, reading answers from `input` and writing prompts and
/// status lines to `output`.
pub fn run<R: BufRead, W: Write>(options: &RunOptions, mut input: R, mut output: W) -> Result<RunReport> {
    let loaded = load(&options.input)?;
    let performance = &loaded.performance;

    writeln!(output, "Loaded {}", options.input.display())?;
    writeln!(output, "Original tempo: {:.1} bpm", loaded.original_bpm)?;
    let names: Vec<&str> = performance
        .instruments
        .iter()
        .map(|i| gm::instrument_name(i.program, i.is_drum))
        .collect();
    writeln!(
        output,
        "Instruments: {} ({})",
        names.len(),
        names.join(", ")
    )?;

    let understanding = ChordDetector::new()
        .include_percussion(options.include_percussion)
        .detect(performance, &loaded.score);
    writeln!(output, "Key: {}", understanding.key)?;

    let distinct: Vec<String> = understanding
        .distinct_chord_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let preview: Vec<String> = understanding
        .distinct_chords()
        .into_iter()
        .take(options.preview_limit)
        .map(|chord| chord.label())
        .collect();
    writeln!(output)?;
    writeln!(output, "--- Detected chords ({} distinct) ---", distinct.len())?;
    writeln!(output, "{}", preview.join(", "))?;
    writeln!(output, "-----------------------------------")?;

    let (bpm, request) = {
        let mut prompter = Prompter::new(&mut input, &mut output);

        let bpm = match options.tempo {
            Some(tempo) => valid_tempo(tempo).unwrap_or_else(|| {
                warn!(tempo, "ignoring tempo, keeping the original");
                loaded.original_bpm
            }),
            None if options.interactive => prompter.ask_tempo(loaded.original_bpm)?,
            None => loaded.original_bpm,
        };

        let request = match &options.substitution {
            Some(text) => text.clone(),
            None if options.interactive => prompter.ask_substitution()?,
            None => String::new(),
        };

        (bpm, request)
    };

    let retimed = performance
        .with_tempo(bpm)
        .context("applying the new tempo")?;

    let mut substitution = match parse_request(&request) {
        Ok(None) => SubstitutionOutcome::NotRequested,
        Ok(Some(rule)) => {
            writeln!(
                output,
                "\n--- Replacing chords matching '{}' with '{}' and adjusting the melody ---",
                rule.pattern(),
                rule.target
            )?;
            SubstitutionOutcome::NoMatch(rule)
        }
        Err(e) => {
            warn!(request = %request, error = %e, "rejected chord change");
            writeln!(output, "Invalid chord change '{}': {}. Skipping it.", request.trim(), e)?;
            SubstitutionOutcome::Rejected(e)
        }
    };

    let mut result = if options.preserve_notes {
        retimed.clone()
    } else {
        retimed.without_notes()
    };

    let applied = match &substitution {
        SubstitutionOutcome::NoMatch(rule) => {
            let transform = TransformOptions {
                context_octave: options.context_octave,
                spelling: spelling_for(&understanding.key),
            };
            let elements = loaded.score.flatten(options.include_percussion);
            let reharmonized = reharmonize(elements, rule, &transform);

            reharmonized.chord_was_replaced.then(|| {
                let score = loaded
                    .score
                    .with_elements(reharmonized.elements, options.include_percussion);
                (
                    score.to_performance(&retimed.context),
                    SubstitutionOutcome::Applied {
                        rule: rule.clone(),
                        stats: reharmonized.stats,
                    },
                )
            })
        }
        _ => None,
    };
    if let Some((performance, outcome)) = applied {
        result = performance;
        substitution = outcome;
    }

    let bytes = performance_to_midi(&result);
    std::fs::write(&options.output, bytes)
        .with_context(|| format!("writing {}", options.output.display()))?;

    writeln!(output, "\nSaved {}", options.output.display())?;
    writeln!(output, "Tempo: {} bpm", bpm)?;
    match &substitution {
        SubstitutionOutcome::Applied { rule, stats } => writeln!(
            output,
            "Replaced '{}' with '{}': {} chord(s), {} melody note(s) adjusted",
            rule.pattern(),
            rule.target,
            stats.chords_replaced,
            stats.notes_snapped
        )?,
        SubstitutionOutcome::NoMatch(rule) => writeln!(
            output,
            "No matching chord found for '{}'; only the tempo was changed.",
            rule.pattern()
        )?,
        SubstitutionOutcome::Rejected(_) => {
            writeln!(output, "Chord change skipped; only the tempo was changed.")?
        }
        SubstitutionOutcome::NotRequested => {}
    }

    info!(
        output = %options.output.display(),
        bpm,
        notes = result.note_count(),
        "wrote MIDI file"
    );

    Ok(RunReport {
        original_bpm: loaded.original_bpm,
        final_bpm: bpm,
        key: understanding.key,
        chords: distinct,
        substitution,
        output: options.output.clone(),
        notes_written: result.note_count(),
    })
}

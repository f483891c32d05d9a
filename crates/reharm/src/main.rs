use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reharm::{pipeline, telemetry, RunOptions};
use reharmconf::ReharmConfig;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "reharm")]
#[command(about = "Swap a chord in a MIDI file and bend the melody to fit")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./reharm.toml
    #[arg(short, long, env = "REHARM_CONFIG")]
    config: Option<PathBuf>,

    /// MIDI file to read
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// MIDI file to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// New tempo in bpm (skips the tempo prompt)
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Chord change such as "F->C" (skips the chord prompt)
    #[arg(short, long, value_name = "OLD->NEW")]
    substitute: Option<String>,

    /// Never prompt; unanswered questions keep the original
    #[arg(long)]
    no_prompt: bool,

    /// How many detected chord names to list
    #[arg(long)]
    preview: Option<usize>,

    /// Octave for chord-context pitches when snapping melody (C4 = 60)
    #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i8).range(-1..=9))]
    context_octave: Option<i8>,

    /// Chordify and transform drum parts too
    #[arg(long)]
    include_percussion: bool,

    /// Drop notes when only the tempo changes
    #[arg(long)]
    strip_notes: bool,

    /// Log filter when RUST_LOG is unset (e.g. warn, debug, reharm=trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ReharmConfig) -> RunOptions {
        if let Some(input) = self.input {
            config.paths.input = input;
        }
        if let Some(output) = self.output {
            config.paths.output = output;
        }
        if let Some(preview) = self.preview {
            config.analysis.preview_limit = preview;
        }
        if let Some(octave) = self.context_octave {
            config.transform.context_octave = octave;
        }
        if self.include_percussion {
            config.analysis.include_percussion = true;
        }
        if self.strip_notes {
            config.output.preserve_notes = false;
        }
        if let Some(level) = self.log_level {
            config.telemetry.log_level = level;
        }

        RunOptions {
            tempo: self.tempo,
            substitution: self.substitute,
            interactive: !self.no_prompt,
            ..RunOptions::from_config(config)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = ReharmConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;
    let options = cli.apply(&mut config);

    telemetry::init(&config.telemetry.log_level)?;
    debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let stdin = io::stdin();
    pipeline::run(&options, stdin.lock(), io::stdout().lock())?;

    Ok(())
}

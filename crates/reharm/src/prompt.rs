//! Console questions. Generic over the streams so tests can script answers.

use std::io::{self, BufRead, Write};

use midi_analysis::TempoChange;

pub const TEMPO_QUESTION: &str = "New tempo in bpm (e.g. 100, Enter to keep): ";
pub const SUBSTITUTION_QUESTION: &str = "Chord change (e.g. F->C, Enter to skip): ";

pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Print `question` and read one line. EOF reads as an empty answer.
    pub fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.writer, "{}", question)?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    pub fn ask_tempo(&mut self, original_bpm: f64) -> io::Result<f64> {
        let answer = self.ask(TEMPO_QUESTION)?;
        Ok(parse_tempo(&answer, original_bpm))
    }

    pub fn ask_substitution(&mut self) -> io::Result<String> {
        self.ask(SUBSTITUTION_QUESTION)
    }
}

/// `bpm` when a MIDI Set Tempo event can hold it.
pub fn valid_tempo(bpm: f64) -> Option<f64> {
    TempoChange::is_representable(bpm).then_some(bpm)
}

/// A bpm a MIDI file can hold, or `original_bpm` for anything else.
pub fn parse_tempo(answer: &str, original_bpm: f64) -> f64 {
    answer
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(valid_tempo)
        .unwrap_or(original_bpm)
}

pub mod analyze;
pub mod gm;
pub mod midi_writer;
pub mod note;
pub mod performance;

pub use analyze::{extract_notes, MidiFileContext, TempoChange, TimeSignature, DEFAULT_BPM};
pub use midi_writer::performance_to_midi;
pub use note::TimedNote;
pub use performance::{Instrument, Performance};

/// Errors from MIDI analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("invalid tempo {0} bpm (a MIDI file can hold about 3.58 to 60000000 bpm)")]
    InvalidTempo(f64),
}

pub type Result<T> = std::result::Result<T, Error>;

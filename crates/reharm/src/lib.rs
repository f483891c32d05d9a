//! Swap one chord of a MIDI file for another and bend the melody to fit.
//!
//! The flow is strictly linear: [`pipeline::load`] reads both views of the
//! file, `music_understand::ChordDetector` names the chords, the prompts
//! collect a tempo and an `old->new` rule, [`transform::reharmonize`] does the
//! single pass over the score, and the result is written back as SMF.

pub mod pipeline;
pub mod prompt;
pub mod substitution;
pub mod telemetry;
pub mod transform;

pub use pipeline::{load, run, LoadError, Loaded, RunOptions, RunReport, SubstitutionOutcome};
pub use prompt::Prompter;
pub use substitution::{parse_request, SubstitutionError, SubstitutionRule};
pub use transform::{nearest_pitch, reharmonize, NoteOutcome, Reharmonized, SnapError, TransformOptions, TransformStats};

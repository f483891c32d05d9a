use midi_analysis::TimedNote;

use crate::chords::extract_chords;
use crate::key::detect_key;
use crate::notation::Element;
use crate::pitch::Spelling;
use crate::types::{ChordEvent, KeyDetection};

/// Trait for music analysis backends.
///
/// `HeuristicAnalyzer` is the default; tests and alternative backends
/// plug in through `ChordDetector::with_analyzer`.
pub trait MusicAnalyzer: Send + Sync {
    fn analyze_key(&self, notes: &[TimedNote]) -> KeyDetection;

    fn extract_chords(&self, elements: &[Element], ppq: u16, spelling: Spelling) -> Vec<ChordEvent>;
}

/// Krumhansl-Schmuckler key detection and template-matching chord naming
/// over chordified slices.
pub struct HeuristicAnalyzer;

impl MusicAnalyzer for HeuristicAnalyzer {
    fn analyze_key(&self, notes: &[TimedNote]) -> KeyDetection {
        detect_key(notes)
    }

    fn extract_chords(&self, elements: &[Element], ppq: u16, spelling: Spelling) -> Vec<ChordEvent> {
        extract_chords(elements, ppq, spelling)
    }
}

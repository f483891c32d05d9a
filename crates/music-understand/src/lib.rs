pub mod analyzer;
pub mod chord_symbol;
pub mod chord_templates;
pub mod chords;
pub mod key;
pub mod notation;
pub mod pitch;
pub mod types;

pub use analyzer::{HeuristicAnalyzer, MusicAnalyzer};
pub use chord_symbol::{ChordSymbol, ChordSymbolError};
pub use chord_templates::{name_chord, ChordName};
pub use key::spelling_for;
pub use notation::{Element, ElementKind, Part, Score, Tone};
pub use pitch::{Pitch, PitchClass, PitchError, Spelling};
pub use types::{ChordEvent, ChordQuality, KeyDetection, KeyMode, MusicUnderstanding};

use std::sync::Arc;

use midi_analysis::Performance;
use tracing::{debug, info};

/// Chord detection over the notation view of a file.
///
/// Key detection picks the spelling; chordified slices of the selected parts
/// are named and collected into a `MusicUnderstanding`.
pub struct ChordDetector {
    analyzer: Arc<dyn MusicAnalyzer>,
    include_percussion: bool,
}

impl Default for ChordDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordDetector {
    /// Create with the default heuristic analyzer.
    pub fn new() -> Self {
        Self::with_analyzer(Arc::new(HeuristicAnalyzer))
    }

    /// Create with a custom analyzer.
    pub fn with_analyzer(analyzer: Arc<dyn MusicAnalyzer>) -> Self {
        Self {
            analyzer,
            include_percussion: false,
        }
    }

    /// Also chordify drum parts.
    pub fn include_percussion(mut self, include: bool) -> Self {
        self.include_percussion = include;
        self
    }

    pub fn detect(&self, performance: &Performance, score: &Score) -> MusicUnderstanding {
        let key = self.analyzer.analyze_key(&performance.pitched_notes());
        let spelling = spelling_for(&key);
        debug!(key = %key, confidence = key.confidence, ?spelling, "detected key");

        let elements = score.flatten(self.include_percussion);
        let chords = self.analyzer.extract_chords(&elements, score.ppq, spelling);

        let understanding = MusicUnderstanding { key, chords };
        info!(
            chords = understanding.chords.len(),
            distinct = understanding.distinct_chord_names().len(),
            "chord detection complete"
        );
        understanding
    }
}

use crate::chord_templates::name_chord;
use crate::notation::Element;
use crate::pitch::{Pitch, Spelling};
use crate::types::ChordEvent;

/// A vertical slice of the score: everything sounding between two boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub offset: u64,
    pub end: u64,
    /// Sounding pitches, ascending, duplicates removed.
    pub pitches: Vec<Pitch>,
}

/// Cut the element stream at every onset and release, collecting the pitches
/// sounding in each span. Silent spans are dropped.
pub fn chordify(elements: &[Element]) -> Vec<Slice> {
    let mut sounding: Vec<&Element> = elements
        .iter()
        .filter(|e| e.duration > 0 && !e.tones().is_empty())
        .collect();
    sounding.sort_by_key(|e| e.offset);

    let mut boundaries: Vec<u64> = sounding.iter().flat_map(|e| [e.offset, e.end()]).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut slices = Vec::new();
    let mut active: Vec<&Element> = Vec::new();
    let mut next = 0;

    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);

        active.retain(|e| e.end() > start);
        while next < sounding.len() && sounding[next].offset <= start {
            active.push(sounding[next]);
            next += 1;
        }
        if active.is_empty() {
            continue;
        }

        let mut pitches: Vec<Pitch> = active
            .iter()
            .flat_map(|e| e.tones().iter().map(|t| t.pitch))
            .collect();
        pitches.sort();
        pitches.dedup();

        slices.push(Slice {
            offset: start,
            end,
            pitches,
        });
    }

    slices
}

/// Name every slice and merge consecutive slices that share a name.
pub fn extract_chords(elements: &[Element], ppq: u16, spelling: Spelling) -> Vec<ChordEvent> {
    let ppq = ppq.max(1) as f64;
    let mut chords: Vec<ChordEvent> = Vec::new();

    for slice in chordify(elements) {
        let named = name_chord(&slice.pitches, spelling);
        if chords.last().is_some_and(|prev| prev.name == named.name) {
            continue;
        }

        let mut pitch_classes: Vec<u8> = slice.pitches.iter().map(|p| p.class().index()).collect();
        pitch_classes.sort_unstable();
        pitch_classes.dedup();

        chords.push(ChordEvent {
            offset: slice.offset,
            beat: slice.offset as f64 / ppq,
            name: named.name,
            symbol: named.symbol,
            pitch_classes,
        });
    }

    chords
}

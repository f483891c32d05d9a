//! Notation view of a performance: parts made of notes, chords and rests.
//!
//! Each instrument becomes one part. Notes that start and release together,
//! within [`chord_tolerance`], are grouped into a chord; a group of one is a
//! note; gaps become rests.

use std::collections::BTreeMap;

use midi_analysis::{Instrument, MidiFileContext, Performance, TimedNote};
use serde::{Deserialize, Serialize};

use crate::pitch::{Pitch, PitchClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub pitch: Pitch,
    pub velocity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Note(Tone),
    /// Tones ascending by pitch.
    Chord(Vec<Tone>),
    Rest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Index into `Score::parts`.
    pub part: usize,
    pub offset: u64,
    pub duration: u64,
    pub kind: ElementKind,
}

impl Element {
    pub fn end(&self) -> u64 {
        self.offset + self.duration
    }

    pub fn tones(&self) -> &[Tone] {
        match &self.kind {
            ElementKind::Note(tone) => std::slice::from_ref(tone),
            ElementKind::Chord(tones) => tones,
            ElementKind::Rest => &[],
        }
    }

    /// Distinct pitch classes, ascending. Empty for rests.
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        let mut classes: Vec<PitchClass> = self.tones().iter().map(|t| t.pitch.class()).collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub track_index: usize,
    pub channel: u8,
    pub program: u8,
    pub is_drum: bool,
    pub name: Option<String>,
    pub elements: Vec<Element>,
}

/// Notes starting within this many ticks of each other (and releasing within
/// it) sound as one chord: a 64th note, the finest grid a played part is
/// read on.
pub fn chord_tolerance(ppq: u16) -> u64 {
    (ppq / 16) as u64
}

struct Group {
    onset: u64,
    release: u64,
    end: u64,
    tones: Vec<Tone>,
}

impl Part {
    fn from_instrument(index: usize, instrument: &Instrument, tolerance: u64) -> Self {
        let mut notes: Vec<&TimedNote> = instrument.notes.iter().collect();
        notes.sort_by_key(|n| (n.onset_tick, n.offset_tick, n.pitch));

        let mut groups: Vec<Group> = Vec::new();
        for note in notes {
            let tone = Tone {
                pitch: Pitch::clamped(note.pitch),
                velocity: note.velocity,
            };
            let joined = groups
                .iter_mut()
                .rev()
                .take_while(|g| note.onset_tick - g.onset <= tolerance)
                .find(|g| g.release.abs_diff(note.offset_tick) <= tolerance);
            match joined {
                Some(group) => {
                    group.end = group.end.max(note.offset_tick);
                    group.tones.push(tone);
                }
                None => groups.push(Group {
                    onset: note.onset_tick,
                    release: note.offset_tick,
                    end: note.offset_tick,
                    tones: vec![tone],
                }),
            }
        }

        let mut elements = Vec::with_capacity(groups.len());
        let mut cursor = 0u64;
        for Group {
            onset,
            end,
            mut tones,
            ..
        } in groups
        {
            if onset > cursor {
                elements.push(Element {
                    part: index,
                    offset: cursor,
                    duration: onset - cursor,
                    kind: ElementKind::Rest,
                });
            }
            cursor = cursor.max(end);

            tones.sort_by_key(|t| t.pitch);
            let kind = if tones.len() == 1 {
                ElementKind::Note(tones[0])
            } else {
                ElementKind::Chord(tones)
            };
            elements.push(Element {
                part: index,
                offset: onset,
                duration: end.saturating_sub(onset),
                kind,
            });
        }

        Self {
            track_index: instrument.track_index,
            channel: instrument.channel,
            program: instrument.program,
            is_drum: instrument.is_drum,
            name: instrument.name.clone(),
            elements,
        }
    }

    fn to_instrument(&self) -> Instrument {
        let mut notes: Vec<TimedNote> = self
            .elements
            .iter()
            .flat_map(|element| {
                element.tones().iter().map(move |tone| TimedNote {
                    onset_tick: element.offset,
                    offset_tick: element.end(),
                    pitch: tone.pitch.midi(),
                    velocity: tone.velocity,
                    channel: self.channel,
                    track_index: self.track_index,
                })
            })
            .collect();
        notes.sort_by(|a, b| a.onset_tick.cmp(&b.onset_tick).then(a.pitch.cmp(&b.pitch)));

        Instrument {
            track_index: self.track_index,
            channel: self.channel,
            program: self.program,
            is_drum: self.is_drum,
            name: self.name.clone(),
            notes,
        }
    }

    /// Parts that take part in chord detection and transformation.
    pub fn is_selected(&self, include_percussion: bool) -> bool {
        include_percussion || !self.is_drum
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub ppq: u16,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn from_performance(performance: &Performance) -> Self {
        let tolerance = chord_tolerance(performance.context.ppq);
        Self {
            ppq: performance.context.ppq,
            parts: performance
                .instruments
                .iter()
                .enumerate()
                .map(|(i, instrument)| Part::from_instrument(i, instrument, tolerance))
                .collect(),
        }
    }

    /// Elements of the selected parts ordered by `(offset, part)`.
    pub fn flatten(&self, include_percussion: bool) -> Vec<Element> {
        let mut elements: Vec<Element> = self
            .parts
            .iter()
            .filter(|p| p.is_selected(include_percussion))
            .flat_map(|p| p.elements.iter().cloned())
            .collect();
        // Stable: order within a part is kept
        elements.sort_by_key(|e| (e.offset, e.part));
        elements
    }

    /// Copy whose selected parts are rebuilt from a flattened element stream.
    ///
    /// Parts outside the selection keep their elements.
    pub fn with_elements(&self, elements: Vec<Element>, include_percussion: bool) -> Self {
        let mut by_part: BTreeMap<usize, Vec<Element>> = BTreeMap::new();
        for element in elements {
            by_part.entry(element.part).or_default().push(element);
        }

        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if !part.is_selected(include_percussion) {
                    return part.clone();
                }
                let mut elements = by_part.remove(&i).unwrap_or_default();
                elements.sort_by_key(|e| e.offset);
                Part {
                    elements,
                    ..part.clone()
                }
            })
            .collect();

        Self {
            ppq: self.ppq,
            parts,
        }
    }

    /// Performance with the given tempo map and one instrument per part.
    pub fn to_performance(&self, context: &MidiFileContext) -> Performance {
        Performance {
            context: MidiFileContext {
                ppq: self.ppq,
                ..context.clone()
            },
            instruments: self.parts.iter().map(Part::to_instrument).collect(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.parts
            .iter()
            .flat_map(|p| &p.elements)
            .map(|e| e.tones().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midi_analysis::analyze::TempoChange;
    use pretty_assertions::assert_eq;

    fn note(pitch: u8, onset: u64, offset: u64, channel: u8) -> TimedNote {
        TimedNote {
            onset_tick: onset,
            offset_tick: offset,
            pitch,
            velocity: 90,
            channel,
            track_index: 1,
        }
    }

    fn instrument(channel: u8, notes: Vec<TimedNote>) -> Instrument {
        Instrument {
            track_index: 1,
            channel,
            program: 0,
            is_drum: channel == 9,
            name: None,
            notes,
        }
    }

    fn performance(instruments: Vec<Instrument>) -> Performance {
        Performance {
            context: MidiFileContext {
                ppq: 480,
                format: 1,
                track_count: 2,
                tempo_changes: vec![TempoChange::from_bpm(0, 100.0)],
                time_signatures: vec![],
                total_ticks: 1920,
            },
            instruments,
        }
    }

    #[test]
    fn groups_notes_into_chords_notes_and_rests() {
        let perf = performance(vec![instrument(
            0,
            vec![
                note(53, 0, 480, 0),
                note(57, 0, 480, 0),
                note(60, 0, 480, 0),
                note(69, 960, 1440, 0),
            ],
        )]);
        let score = Score::from_performance(&perf);
        let elements = &score.parts[0].elements;

        assert_eq!(elements.len(), 3);
        assert!(matches!(&elements[0].kind, ElementKind::Chord(t) if t.len() == 3));
        assert_eq!(elements[1].kind, ElementKind::Rest);
        assert_eq!((elements[1].offset, elements[1].duration), (480, 480));
        assert!(matches!(elements[2].kind, ElementKind::Note(t) if t.pitch.midi() == 69));
    }

    #[test]
    fn different_offsets_are_not_a_chord() {
        let perf = performance(vec![instrument(
            0,
            vec![note(60, 0, 480, 0), note(64, 0, 960, 0)],
        )]);
        let score = Score::from_performance(&perf);
        let kinds: Vec<_> = score.parts[0].elements.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.iter().all(|k| matches!(k, ElementKind::Note(_))));
    }

    #[test]
    fn staggered_releases_still_make_a_chord() {
        let perf = performance(vec![instrument(
            0,
            vec![
                note(53, 0, 960, 0),
                note(57, 0, 958, 0),
                note(60, 0, 962, 0),
                note(69, 960, 1440, 0),
            ],
        )]);
        let score = Score::from_performance(&perf);
        let elements = &score.parts[0].elements;

        assert_eq!(elements.len(), 2);
        let pitches: Vec<u8> = elements[0].tones().iter().map(|t| t.pitch.midi()).collect();
        assert_eq!(pitches, vec![53, 57, 60]);
        // Longest release wins
        assert_eq!((elements[0].offset, elements[0].duration), (0, 962));
        assert!(matches!(elements[1].kind, ElementKind::Note(_)));
    }

    #[test]
    fn slightly_late_onsets_join_the_chord() {
        let perf = performance(vec![instrument(
            0,
            vec![note(60, 0, 480, 0), note(64, 12, 480, 0), note(67, 20, 476, 0)],
        )]);
        let score = Score::from_performance(&perf);
        let elements = &score.parts[0].elements;

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].offset, 0);
        assert!(matches!(&elements[0].kind, ElementKind::Chord(t) if t.len() == 3));
    }

    #[test]
    fn tolerance_follows_resolution() {
        assert_eq!(chord_tolerance(480), 30);
        assert_eq!(chord_tolerance(96), 6);
        assert_eq!(chord_tolerance(8), 0);
    }

    #[test]
    fn flatten_orders_by_offset_then_part_and_skips_drums() {
        let perf = performance(vec![
            instrument(0, vec![note(60, 480, 960, 0)]),
            instrument(1, vec![note(48, 0, 960, 1)]),
            instrument(9, vec![note(36, 0, 120, 9)]),
        ]);
        let score = Score::from_performance(&perf);

        let flat = score.flatten(false);
        let order: Vec<(u64, usize)> = flat.iter().map(|e| (e.offset, e.part)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (480, 0)]);

        assert_eq!(score.flatten(true).len(), 4);
    }

    #[test]
    fn round_trip_through_performance() {
        let perf = performance(vec![
            instrument(
                0,
                vec![
                    note(53, 0, 480, 0),
                    note(57, 0, 480, 0),
                    note(72, 240, 720, 0),
                    note(65, 960, 1440, 0),
                ],
            ),
            instrument(9, vec![note(36, 0, 120, 9)]),
        ]);
        let score = Score::from_performance(&perf);
        assert_eq!(score.note_count(), 5);
        assert_eq!(score.to_performance(&perf.context), perf);
    }

    #[test]
    fn with_elements_keeps_unselected_parts() {
        let perf = performance(vec![
            instrument(0, vec![note(60, 0, 480, 0)]),
            instrument(9, vec![note(36, 0, 120, 9)]),
        ]);
        let score = Score::from_performance(&perf);

        let mut flat = score.flatten(false);
        flat[0].kind = ElementKind::Note(Tone {
            pitch: Pitch::new(62).unwrap(),
            velocity: 90,
        });
        let rebuilt = score.with_elements(flat, false);

        assert_eq!(rebuilt.parts[1], score.parts[1]);
        assert_eq!(rebuilt.parts[0].elements[0].tones()[0].pitch.midi(), 62);
    }
}

//! The reharmonization pass.
//!
//! One forward scan over the flattened score. Chords whose name matches the
//! rule are replaced by the target chord; every chord (replaced or not) sets
//! the pitch-class context; melody notes outside the context move to the
//! nearest context pitch.

use std::collections::BTreeSet;

use music_understand::{name_chord, Element, ElementKind, Pitch, PitchClass, Spelling, Tone};
use tracing::{debug, warn};

use crate::substitution::SubstitutionRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnapError {
    #[error("no chord context to snap to")]
    EmptyContext,

    #[error("pitch class {class} does not exist in octave {octave}")]
    OutOfRange { class: PitchClass, octave: i8 },
}

/// What happened to one melody note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    Kept,
    Snapped { from: Pitch, to: Pitch },
    Skipped(SnapError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub chords_replaced: usize,
    pub chords_kept: usize,
    pub notes_kept: usize,
    pub notes_snapped: usize,
    pub notes_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Octave where context pitch classes are realized (C4 = 60).
    pub context_octave: i8,
    /// Spelling used to name chords before matching.
    pub spelling: Spelling,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            context_octave: 4,
            spelling: Spelling::Sharps,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reharmonized {
    pub elements: Vec<Element>,
    /// One entry per note element, in stream order.
    pub outcomes: Vec<NoteOutcome>,
    pub chord_was_replaced: bool,
    pub stats: TransformStats,
}

/// The context pitch closest to `pitch`, lowest MIDI number on a tie.
pub fn nearest_pitch(
    pitch: Pitch,
    context: &BTreeSet<PitchClass>,
    octave: i8,
) -> Result<Pitch, SnapError> {
    let candidates = context
        .iter()
        .map(|&class| Pitch::in_octave(class, octave).map_err(|_| SnapError::OutOfRange { class, octave }))
        .collect::<Result<Vec<_>, _>>()?;

    candidates
        .into_iter()
        .min_by_key(|candidate| (candidate.distance(pitch), candidate.midi()))
        .ok_or(SnapError::EmptyContext)
}

struct Pass {
    context: BTreeSet<PitchClass>,
    elements: Vec<Element>,
    outcomes: Vec<NoteOutcome>,
    chord_was_replaced: bool,
    stats: TransformStats,
}

fn replacement_tones(rule: &SubstitutionRule, tones: &[Tone]) -> Option<Vec<Tone>> {
    let bass = tones.iter().map(|t| t.pitch).min()?;
    let velocity = tones.iter().map(|t| t.velocity).max()?;

    match rule.target.voicing(bass.octave()) {
        Ok(pitches) => Some(
            pitches
                .into_iter()
                .map(|pitch| Tone { pitch, velocity })
                .collect(),
        ),
        Err(e) => {
            warn!(error = %e, "cannot voice substitution target, keeping chord");
            None
        }
    }
}

impl Pass {
    fn visit(mut self, element: Element, rule: &SubstitutionRule, options: &TransformOptions) -> Self {
        let element = match element.kind {
            ElementKind::Chord(ref tones) => {
                let pitches: Vec<Pitch> = tones.iter().map(|t| t.pitch).collect();
                let name = name_chord(&pitches, options.spelling).name;

                let replacement = rule
                    .matches(&name)
                    .then(|| replacement_tones(rule, tones))
                    .flatten();

                match replacement {
                    Some(new_tones) => {
                        debug!(offset = element.offset, from = %name, to = %rule.target, "replacing chord");
                        self.context = rule.target.pitch_classes().into_iter().collect();
                        self.chord_was_replaced = true;
                        self.stats.chords_replaced += 1;
                        Element {
                            kind: ElementKind::Chord(new_tones),
                            ..element
                        }
                    }
                    None => {
                        self.context = element.pitch_classes().into_iter().collect();
                        self.stats.chords_kept += 1;
                        element
                    }
                }
            }
            ElementKind::Note(tone) => {
                let outcome = if self.context.contains(&tone.pitch.class()) {
                    NoteOutcome::Kept
                } else {
                    match nearest_pitch(tone.pitch, &self.context, options.context_octave) {
                        Ok(to) => NoteOutcome::Snapped {
                            from: tone.pitch,
                            to,
                        },
                        Err(e) => NoteOutcome::Skipped(e),
                    }
                };

                let element = match outcome {
                    NoteOutcome::Kept => {
                        self.stats.notes_kept += 1;
                        element
                    }
                    NoteOutcome::Snapped { to, .. } => {
                        self.stats.notes_snapped += 1;
                        Element {
                            kind: ElementKind::Note(Tone { pitch: to, ..tone }),
                            ..element
                        }
                    }
                    NoteOutcome::Skipped(e) => {
                        debug!(offset = element.offset, pitch = %tone.pitch, error = %e, "note left as is");
                        self.stats.notes_skipped += 1;
                        element
                    }
                };
                self.outcomes.push(outcome);
                element
            }
            ElementKind::Rest => element,
        };

        self.elements.push(element);
        self
    }
}

/// Run the pass over a flattened element stream.
///
/// The context starts as the target chord's pitch classes, so melody before
/// the first chord is pulled toward the target.
pub fn reharmonize(
    elements: Vec<Element>,
    rule: &SubstitutionRule,
    options: &TransformOptions,
) -> Reharmonized {
    let start = Pass {
        context: rule.target.pitch_classes().into_iter().collect(),
        elements: Vec::with_capacity(elements.len()),
        outcomes: Vec::new(),
        chord_was_replaced: false,
        stats: TransformStats::default(),
    };

    let pass = elements
        .into_iter()
        .fold(start, |pass, element| pass.visit(element, rule, options));

    debug!(stats = ?pass.stats, "reharmonization pass complete");

    Reharmonized {
        elements: pass.elements,
        outcomes: pass.outcomes,
        chord_was_replaced: pass.chord_was_replaced,
        stats: pass.stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitution::parse_request;
    use pretty_assertions::assert_eq;

    fn rule(text: &str) -> SubstitutionRule {
        parse_request(text).unwrap().unwrap()
    }

    fn tone(midi: u8) -> Tone {
        Tone {
            pitch: Pitch::new(midi).unwrap(),
            velocity: 80,
        }
    }

    fn chord(midi: &[u8], offset: u64) -> Element {
        Element {
            part: 0,
            offset,
            duration: 480,
            kind: ElementKind::Chord(midi.iter().map(|&m| tone(m)).collect()),
        }
    }

    fn note(midi: u8, offset: u64) -> Element {
        Element {
            part: 1,
            offset,
            duration: 240,
            kind: ElementKind::Note(tone(midi)),
        }
    }

    fn classes(element: &Element) -> Vec<u8> {
        element.pitch_classes().into_iter().map(PitchClass::index).collect()
    }

    fn midi_of(element: &Element) -> Vec<u8> {
        element.tones().iter().map(|t| t.pitch.midi()).collect()
    }

    #[test]
    fn f_to_c_replaces_chord_and_snaps_melody() {
        let elements = vec![
            chord(&[53, 57, 60], 0),
            note(65, 0),  // F4: fits F, not C
            note(69, 240), // A4: fits F, not C
            note(67, 480), // G4: already in C
        ];
        let out = reharmonize(elements, &rule("F->C"), &TransformOptions::default());

        assert!(out.chord_was_replaced);
        assert_eq!(classes(&out.elements[0]), vec![0, 4, 7]);
        assert_eq!((out.elements[0].offset, out.elements[0].duration), (0, 480));
        // Voiced in the octave of the old bass (F3)
        assert_eq!(midi_of(&out.elements[0]), vec![48, 52, 55]);

        assert_eq!(midi_of(&out.elements[1]), vec![64]); // F4 -> E4
        assert_eq!(midi_of(&out.elements[2]), vec![67]); // A4 -> G4
        assert_eq!(midi_of(&out.elements[3]), vec![67]);
        assert_eq!(
            out.outcomes,
            vec![
                NoteOutcome::Snapped {
                    from: Pitch::new(65).unwrap(),
                    to: Pitch::new(64).unwrap()
                },
                NoteOutcome::Snapped {
                    from: Pitch::new(69).unwrap(),
                    to: Pitch::new(67).unwrap()
                },
                NoteOutcome::Kept,
            ]
        );
        assert_eq!(out.stats.chords_replaced, 1);
        assert_eq!(out.stats.notes_snapped, 2);
    }

    #[test]
    fn unmatched_chord_sets_its_own_context() {
        // G major does not match "F"; B4 fits G, C#5 does not
        let elements = vec![chord(&[55, 59, 62], 0), note(71, 0), note(73, 240)];
        let out = reharmonize(elements.clone(), &rule("F->C"), &TransformOptions::default());

        assert!(!out.chord_was_replaced);
        assert_eq!(out.elements[0], elements[0]);
        assert_eq!(out.elements[1], elements[1]);
        // Context pitches live in octave 4: G4 B4 D4 -> C#5 (73) goes to B4 (71)
        assert_eq!(midi_of(&out.elements[2]), vec![71]);
        assert_eq!(out.stats.chords_kept, 1);
    }

    #[test]
    fn notes_before_any_chord_use_target_context() {
        let out = reharmonize(vec![note(62, 0)], &rule("F->C"), &TransformOptions::default());
        // D4 is equidistant from C4 and E4: lowest wins
        assert_eq!(midi_of(&out.elements[0]), vec![60]);
        assert!(!out.chord_was_replaced);
    }

    #[test]
    fn rests_pass_through() {
        let rest = Element {
            part: 0,
            offset: 0,
            duration: 960,
            kind: ElementKind::Rest,
        };
        let out = reharmonize(vec![rest.clone()], &rule("F->C"), &TransformOptions::default());
        assert_eq!(out.elements, vec![rest]);
        assert!(out.outcomes.is_empty());
    }

    #[test]
    fn unrealizable_context_skips_note() {
        let options = TransformOptions {
            context_octave: 9,
            ..TransformOptions::default()
        };
        // B major context: B9 is above 127
        let out = reharmonize(vec![note(60, 0)], &rule("F->B"), &options);
        assert_eq!(midi_of(&out.elements[0]), vec![60]);
        assert!(matches!(out.outcomes[0], NoteOutcome::Skipped(SnapError::OutOfRange { .. })));
        assert_eq!(out.stats.notes_skipped, 1);
    }

    #[test]
    fn nearest_pitch_is_minimal_distance() {
        let context: BTreeSet<PitchClass> = [0, 4, 7].into_iter().map(PitchClass::new).collect();
        for midi in 40..100u8 {
            let pitch = Pitch::new(midi).unwrap();
            let chosen = nearest_pitch(pitch, &context, 4).unwrap();
            for &class in &context {
                let other = Pitch::in_octave(class, 4).unwrap();
                assert!(chosen.distance(pitch) <= other.distance(pitch));
            }
        }
        assert_eq!(
            nearest_pitch(Pitch::new(60).unwrap(), &BTreeSet::new(), 4),
            Err(SnapError::EmptyContext)
        );
    }

    #[test]
    fn replaced_chord_takes_loudest_velocity() {
        let mut element = chord(&[53, 57, 60], 0);
        if let ElementKind::Chord(tones) = &mut element.kind {
            tones[1].velocity = 110;
        }
        let out = reharmonize(vec![element], &rule("major->Am"), &TransformOptions::default());
        assert!(out.elements[0].tones().iter().all(|t| t.velocity == 110));
        assert_eq!(classes(&out.elements[0]), vec![0, 4, 9]);
    }
}

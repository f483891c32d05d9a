//! Pitches, pitch classes, and their spelling.

use serde::{Deserialize, Serialize};
use std::fmt;

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch classes conventionally spelled with flats.
pub static FLAT_KEY_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PitchError {
    #[error("MIDI pitch {0} is outside 0-127")]
    OutOfRange(i32),

    #[error("'{0}' is not a pitch name")]
    UnknownName(String),
}

/// Accidental spelling used when naming pitch classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    #[default]
    Sharps,
    Flats,
}

impl Spelling {
    /// Flats for keys rooted on Db, Eb, F, Gb, Ab, Bb; sharps otherwise.
    pub fn for_key_root(root: PitchClass) -> Self {
        if FLAT_KEY_ROOTS.contains(&root.index()) {
            Spelling::Flats
        } else {
            Spelling::Sharps
        }
    }
}

/// A pitch class 0–11 (C=0, C#=1, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);

    pub fn new(value: u8) -> Self {
        PitchClass(value % 12)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self, spelling: Spelling) -> &'static str {
        match spelling {
            Spelling::Sharps => NOTE_NAMES_SHARP[self.0 as usize],
            Spelling::Flats => NOTE_NAMES_FLAT[self.0 as usize],
        }
    }

    /// Transpose upward by `semitones`, wrapping within the octave.
    pub fn up(self, semitones: u8) -> Self {
        PitchClass::new(self.0 + semitones % 12)
    }

    /// Semitones from `root` up to this pitch class.
    pub fn interval_from(self, root: PitchClass) -> u8 {
        (self.0 + 12 - root.0) % 12
    }

    /// Parse a letter name with optional accidentals: `F`, `f#`, `Bb`, `E-`, `C♯`.
    pub fn parse(name: &str) -> Result<Self, PitchError> {
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        let base: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(PitchError::UnknownName(trimmed.to_string())),
        };

        let mut offset = 0i32;
        for c in chars {
            match accidental_offset(c) {
                Some(delta) => offset += delta,
                None => return Err(PitchError::UnknownName(trimmed.to_string())),
            }
        }

        Ok(PitchClass::new((base + offset).rem_euclid(12) as u8))
    }
}

/// Semitone shift of an accidental character.
pub(crate) fn accidental_offset(c: char) -> Option<i32> {
    match c {
        '#' | '♯' => Some(1),
        'b' | '-' | '♭' => Some(-1),
        _ => None,
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name(Spelling::Sharps))
    }
}

/// A MIDI pitch 0–127. Middle C (60) is C4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pitch(u8);

impl Pitch {
    pub fn new(midi: u8) -> Result<Self, PitchError> {
        Self::from_midi(midi as i32)
    }

    pub fn from_midi(midi: i32) -> Result<Self, PitchError> {
        if (0..=127).contains(&midi) {
            Ok(Pitch(midi as u8))
        } else {
            Err(PitchError::OutOfRange(midi))
        }
    }

    /// MIDI data bytes are 7-bit; anything above 127 is pinned to 127.
    pub fn clamped(midi: u8) -> Self {
        Pitch(midi.min(127))
    }

    /// The pitch of `class` in `octave` (C4 = 60).
    pub fn in_octave(class: PitchClass, octave: i8) -> Result<Self, PitchError> {
        Self::from_midi((octave as i32 + 1) * 12 + class.index() as i32)
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    pub fn class(self) -> PitchClass {
        PitchClass::new(self.0)
    }

    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Absolute distance in semitones.
    pub fn distance(self, other: Pitch) -> u8 {
        self.0.abs_diff(other.0)
    }

    pub fn name(self, spelling: Spelling) -> String {
        format!("{}{}", self.class().name(spelling), self.octave())
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name(Spelling::Sharps))
    }
}

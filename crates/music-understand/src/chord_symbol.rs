//! Chord symbols as typed at the prompt: `C`, `Am7`, `Bbmaj7`, `F#dim`, `G/B`.

use std::fmt;

use winnow::combinator::{opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::one_of;

use crate::chord_templates::template_for;
use crate::pitch::{accidental_offset, Pitch, PitchClass, PitchError, Spelling};
use crate::types::ChordQuality;

type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Quality spellings, longest first so that `maj7` wins over `maj` and `m`.
static QUALITY_ALIASES: &[(&str, ChordQuality)] = &[
    ("m(maj7)", ChordQuality::MinorMajor7),
    ("major", ChordQuality::Major),
    ("minor", ChordQuality::Minor),
    ("mMaj7", ChordQuality::MinorMajor7),
    ("maj7", ChordQuality::Major7),
    ("min7", ChordQuality::Minor7),
    ("min6", ChordQuality::Minor6),
    ("m7b5", ChordQuality::HalfDiminished7),
    ("dim7", ChordQuality::Diminished7),
    ("add9", ChordQuality::Add9),
    ("sus4", ChordQuality::Suspended4),
    ("sus2", ChordQuality::Suspended2),
    ("dom7", ChordQuality::Dominant7),
    ("mM7", ChordQuality::MinorMajor7),
    ("maj", ChordQuality::Major),
    ("min", ChordQuality::Minor),
    ("dim", ChordQuality::Diminished),
    ("aug", ChordQuality::Augmented),
    ("sus", ChordQuality::Suspended4),
    ("ø7", ChordQuality::HalfDiminished7),
    ("M7", ChordQuality::Major7),
    ("m7", ChordQuality::Minor7),
    ("m6", ChordQuality::Minor6),
    ("o7", ChordQuality::Diminished7),
    ("ø", ChordQuality::HalfDiminished7),
    ("o", ChordQuality::Diminished),
    ("+", ChordQuality::Augmented),
    ("M", ChordQuality::Major),
    ("m", ChordQuality::Minor),
    ("7", ChordQuality::Dominant7),
    ("6", ChordQuality::Major6),
    ("5", ChordQuality::Power),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordSymbolError {
    #[error("empty chord symbol")]
    Empty,

    #[error("'{symbol}' is not a chord symbol (stopped at byte {position})")]
    Unparseable { symbol: String, position: usize },

    #[error("cannot voice '{symbol}': {source}")]
    Voicing {
        symbol: String,
        #[source]
        source: PitchError,
    },
}

/// A parsed chord symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordSymbol {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Slash bass, when different from the root.
    pub bass: Option<PitchClass>,
    text: String,
}

fn pitch_letter(input: &mut &str) -> PResult<PitchClass> {
    let letter = one_of(|c: char| matches!(c, 'A'..='G' | 'a'..='g')).parse_next(input)?;
    let accidental = opt(one_of(['#', 'b', '-', '♯', '♭'])).parse_next(input)?;

    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        _ => 11,
    };
    let shift = accidental.and_then(accidental_offset).unwrap_or(0);
    Ok(PitchClass::new((base + shift).rem_euclid(12) as u8))
}

fn quality(input: &mut &str) -> PResult<ChordQuality> {
    for &(alias, quality) in QUALITY_ALIASES {
        if let Some(rest) = input.strip_prefix(alias) {
            *input = rest;
            return Ok(quality);
        }
    }
    Ok(ChordQuality::Major)
}

fn chord_symbol(input: &mut &str) -> PResult<(PitchClass, ChordQuality, Option<PitchClass>)> {
    let root = pitch_letter(input)?;
    let quality = quality(input)?;
    let bass = opt(preceded('/', pitch_letter)).parse_next(input)?;
    Ok((root, quality, bass))
}

impl ChordSymbol {
    pub fn parse(text: &str) -> Result<Self, ChordSymbolError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChordSymbolError::Empty);
        }

        let (root, quality, bass) =
            chord_symbol
                .parse(trimmed)
                .map_err(|e| ChordSymbolError::Unparseable {
                    symbol: trimmed.to_string(),
                    position: e.offset(),
                })?;

        Ok(Self {
            root,
            quality,
            bass: bass.filter(|&b| b != root),
            text: trimmed.to_string(),
        })
    }

    /// Symbol as typed, trimmed.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Distinct pitch classes of the chord, ascending.
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        let mut classes: Vec<PitchClass> = template_for(self.quality)
            .interval_list()
            .into_iter()
            .map(|i| self.root.up(i))
            .chain(self.bass)
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }

    /// Human-readable name, e.g. `C-major triad`.
    pub fn common_name(&self, spelling: Spelling) -> String {
        format!("{}-{}", self.root.name(spelling), self.quality.common_name())
    }

    /// Close-position voicing with the root in `octave` and the slash bass
    /// directly below it.
    ///
    /// The whole voicing moves down by octaves while its top exceeds 127 and
    /// up while its bottom is below 0.
    pub fn voicing(&self, octave: i8) -> Result<Vec<Pitch>, ChordSymbolError> {
        let root = (octave as i32 + 1) * 12 + self.root.index() as i32;

        let mut midi: Vec<i32> = template_for(self.quality)
            .interval_list()
            .into_iter()
            .map(|i| root + i as i32)
            .collect();
        if let Some(bass) = self.bass {
            let below = (self.root.index() as i32 - bass.index() as i32).rem_euclid(12);
            midi.insert(0, root - below);
        }

        while midi.iter().max().is_some_and(|&m| m > 127) {
            midi.iter_mut().for_each(|m| *m -= 12);
        }
        while midi.iter().min().is_some_and(|&m| m < 0) {
            midi.iter_mut().for_each(|m| *m += 12);
        }

        midi.into_iter()
            .map(Pitch::from_midi)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ChordSymbolError::Voicing {
                symbol: self.text.clone(),
                source,
            })
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for ChordSymbol {
    type Err = ChordSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

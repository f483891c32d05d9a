use serde::{Deserialize, Serialize};

/// What the detector found in a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicUnderstanding {
    pub key: KeyDetection,
    /// Chordified slices, consecutive duplicates merged.
    pub chords: Vec<ChordEvent>,
}

impl MusicUnderstanding {
    /// First event of each distinct chord name, in first-seen order.
    pub fn distinct_chords(&self) -> Vec<&ChordEvent> {
        let mut seen: Vec<&ChordEvent> = Vec::new();
        for chord in &self.chords {
            if !seen.iter().any(|c| c.name == chord.name) {
                seen.push(chord);
            }
        }
        seen
    }

    /// Distinct chord names in first-seen order.
    pub fn distinct_chord_names(&self) -> Vec<&str> {
        self.distinct_chords()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    Major,
    Minor,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Major => write!(f, "major"),
            KeyMode::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDetection {
    /// Root note name: "C", "Db", "F#", etc.
    pub root: String,
    /// Pitch class 0–11 (C=0, C#=1, ...)
    pub root_pitch_class: u8,
    pub mode: KeyMode,
    /// Pearson correlation with best-matching key profile
    pub confidence: f64,
}

impl std::fmt::Display for KeyDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.root, self.mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended4,
    Suspended2,
    Dominant7,
    Major7,
    Minor7,
    MinorMajor7,
    Diminished7,
    HalfDiminished7,
    Major6,
    Minor6,
    Add9,
    Power,
}

impl ChordQuality {
    /// Suffix for chord symbol display
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Suspended4 => "sus4",
            ChordQuality::Suspended2 => "sus2",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::MinorMajor7 => "m(maj7)",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::HalfDiminished7 => "m7b5",
            ChordQuality::Major6 => "6",
            ChordQuality::Minor6 => "m6",
            ChordQuality::Add9 => "add9",
            ChordQuality::Power => "5",
        }
    }

    /// Long-form name used in human-readable chord names ("F-major triad").
    pub fn common_name(&self) -> &'static str {
        match self {
            ChordQuality::Major => "major triad",
            ChordQuality::Minor => "minor triad",
            ChordQuality::Diminished => "diminished triad",
            ChordQuality::Augmented => "augmented triad",
            ChordQuality::Suspended4 => "suspended-fourth triad",
            ChordQuality::Suspended2 => "suspended-second triad",
            ChordQuality::Dominant7 => "dominant seventh chord",
            ChordQuality::Major7 => "major seventh chord",
            ChordQuality::Minor7 => "minor seventh chord",
            ChordQuality::MinorMajor7 => "minor-major seventh chord",
            ChordQuality::Diminished7 => "diminished seventh chord",
            ChordQuality::HalfDiminished7 => "half-diminished seventh chord",
            ChordQuality::Major6 => "major sixth chord",
            ChordQuality::Minor6 => "minor sixth chord",
            ChordQuality::Add9 => "added-ninth chord",
            ChordQuality::Power => "power chord",
        }
    }
}

/// One chordified slice of the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Tick where this chord begins
    pub offset: u64,
    /// Beat position where this chord begins
    pub beat: f64,
    /// Human-readable name: "F-major triad", "G-dominant seventh chord"
    pub name: String,
    /// Short chord symbol ("F", "G7") when a template matched exactly
    pub symbol: Option<String>,
    /// Sounding pitch classes, ascending
    pub pitch_classes: Vec<u8>,
}

impl ChordEvent {
    /// Name with the symbol alongside when there is one: `F-major triad (F)`.
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(symbol) => format!("{} ({})", self.name, symbol),
            None => self.name.clone(),
        }
    }
}

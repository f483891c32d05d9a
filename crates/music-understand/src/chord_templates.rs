use crate::pitch::{Pitch, PitchClass, Spelling};
use crate::types::ChordQuality;

/// A chord template: quality enum + interval set from root (as bitmask over 12 pitch classes).
pub struct ChordTemplate {
    pub quality: ChordQuality,
    pub intervals: u16, // bitmask: bit i set means interval i is in the template
    pub size: usize,
}

impl ChordTemplate {
    const fn new(quality: ChordQuality, intervals: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < intervals.len() {
            mask |= 1 << intervals[i];
            i += 1;
        }
        Self {
            quality,
            intervals: mask,
            size: intervals.len(),
        }
    }

    /// Intervals above the root, ascending.
    pub fn interval_list(&self) -> Vec<u8> {
        (0..12u8).filter(|i| self.intervals & (1 << i) != 0).collect()
    }
}

/// All recognized chord templates, ordered by specificity (larger first for tiebreaking).
pub static TEMPLATES: &[ChordTemplate] = &[
    // 4-note chords first (more specific)
    ChordTemplate::new(ChordQuality::Dominant7, &[0, 4, 7, 10]),
    ChordTemplate::new(ChordQuality::Major7, &[0, 4, 7, 11]),
    ChordTemplate::new(ChordQuality::Minor7, &[0, 3, 7, 10]),
    ChordTemplate::new(ChordQuality::MinorMajor7, &[0, 3, 7, 11]),
    ChordTemplate::new(ChordQuality::Diminished7, &[0, 3, 6, 9]),
    ChordTemplate::new(ChordQuality::HalfDiminished7, &[0, 3, 6, 10]),
    ChordTemplate::new(ChordQuality::Major6, &[0, 4, 7, 9]),
    ChordTemplate::new(ChordQuality::Minor6, &[0, 3, 7, 9]),
    ChordTemplate::new(ChordQuality::Add9, &[0, 2, 4, 7]),
    // Triads
    ChordTemplate::new(ChordQuality::Major, &[0, 4, 7]),
    ChordTemplate::new(ChordQuality::Minor, &[0, 3, 7]),
    ChordTemplate::new(ChordQuality::Diminished, &[0, 3, 6]),
    ChordTemplate::new(ChordQuality::Augmented, &[0, 4, 8]),
    ChordTemplate::new(ChordQuality::Suspended4, &[0, 5, 7]),
    ChordTemplate::new(ChordQuality::Suspended2, &[0, 2, 7]),
    // Dyad
    ChordTemplate::new(ChordQuality::Power, &[0, 7]),
];

/// Template for a quality. Every quality has exactly one.
pub fn template_for(quality: ChordQuality) -> &'static ChordTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.quality == quality)
        .unwrap_or(&TEMPLATES[9])
}

const INTERVAL_NAMES: [&str; 12] = [
    "unison",
    "minor second",
    "major second",
    "minor third",
    "major third",
    "perfect fourth",
    "tritone",
    "perfect fifth",
    "minor sixth",
    "major sixth",
    "minor seventh",
    "major seventh",
];

pub fn interval_name(semitones: u8) -> &'static str {
    INTERVAL_NAMES[(semitones % 12) as usize]
}

/// Convert a set of pitch classes to an interval bitmask relative to a root.
fn to_interval_mask(pitch_classes: &[u8], root: u8) -> u16 {
    let mut mask = 0u16;
    for &pc in pitch_classes {
        let interval = (pc % 12 + 12 - root) % 12;
        mask |= 1 << interval;
    }
    mask
}

fn popcount(x: u16) -> usize {
    x.count_ones() as usize
}

/// Match a set of pitch classes against chord templates.
///
/// Returns `(root_pc, symbol, quality, confidence)` or `None` if no match.
/// Tries all 12 possible roots and all templates, scores by template coverage.
/// `bass_hint` biases root selection when ambiguous.
pub fn match_chord(
    pitch_classes: &[u8],
    bass_hint: Option<u8>,
    spelling: Spelling,
) -> Option<(u8, String, ChordQuality, f64)> {
    if pitch_classes.len() < 2 {
        return None;
    }

    let mut best_root: u8 = 0;
    let mut best_score = 0.0_f64;
    let mut best_quality = ChordQuality::Major;

    for root in 0..12u8 {
        let intervals = to_interval_mask(pitch_classes, root);

        for template in TEMPLATES {
            // How many template tones are present?
            let matched = popcount(intervals & template.intervals);
            if matched < template.size.min(2) {
                continue;
            }

            // Score: fraction of template matched, penalize extra notes
            let extra = popcount(intervals & !template.intervals);
            let mut score = matched as f64 / template.size as f64 - extra as f64 * 0.1;

            // Bonus for bass hint matching root
            if let Some(bass) = bass_hint {
                if bass % 12 == root {
                    score += 0.15;
                }
            }

            // Bonus for complete match (all template tones present)
            if intervals & template.intervals == template.intervals {
                score += 0.1;
            }

            if score > best_score {
                best_score = score;
                best_root = root;
                best_quality = template.quality;
            }
        }
    }

    if best_score > 0.4 {
        let root_name = PitchClass::new(best_root).name(spelling);
        let symbol = format!("{}{}", root_name, best_quality.suffix());
        Some((best_root, symbol, best_quality, best_score.min(1.0)))
    } else {
        None
    }
}

/// Exact identification: the pitch-class set equals a template over some root.
///
/// When several roots fit (symmetric or ambiguous sets), the root equal to
/// `bass` wins; otherwise the first template in table order, then the lowest root.
pub fn identify(pitch_classes: &[u8], bass: Option<u8>) -> Option<(u8, ChordQuality)> {
    let mut first: Option<(u8, ChordQuality)> = None;

    for template in TEMPLATES {
        for root in 0..12u8 {
            if to_interval_mask(pitch_classes, root) != template.intervals {
                continue;
            }
            if bass.map(|b| b % 12) == Some(root) {
                return Some((root, template.quality));
            }
            first.get_or_insert((root, template.quality));
        }
    }

    first
}

/// Human-readable chord name plus the short symbol when one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordName {
    pub name: String,
    pub symbol: Option<String>,
}

/// Name a set of simultaneous pitches the way a score reader would.
///
/// `F-major triad`, `A-minor seventh chord`, `C-perfect fifth`, `E-note`;
/// inexact sets get the closest template with an `(approx.)` marker.
pub fn name_chord(pitches: &[Pitch], spelling: Spelling) -> ChordName {
    let Some(bass) = pitches.iter().min().map(|p| p.class()) else {
        return ChordName {
            name: "empty chord".to_string(),
            symbol: None,
        };
    };

    let mut classes: Vec<u8> = pitches.iter().map(|p| p.class().index()).collect();
    classes.sort_unstable();
    classes.dedup();

    let bass_name = bass.name(spelling);

    match classes.len() {
        1 => ChordName {
            name: format!("{}-note", bass_name),
            symbol: None,
        },
        2 => {
            let upper = classes
                .iter()
                .map(|&pc| PitchClass::new(pc))
                .find(|&pc| pc != bass)
                .unwrap_or(bass);
            let interval = upper.interval_from(bass);
            ChordName {
                name: format!("{}-{}", bass_name, interval_name(interval)),
                symbol: (interval == 7).then(|| format!("{}5", bass_name)),
            }
        }
        _ => {
            if let Some((root, quality)) = identify(&classes, Some(bass.index())) {
                let root_name = PitchClass::new(root).name(spelling);
                let mut symbol = format!("{}{}", root_name, quality.suffix());
                if root != bass.index() {
                    symbol.push('/');
                    symbol.push_str(bass_name);
                }
                ChordName {
                    name: format!("{}-{}", root_name, quality.common_name()),
                    symbol: Some(symbol),
                }
            } else if let Some((root, _, quality, _)) =
                match_chord(&classes, Some(bass.index()), spelling)
            {
                ChordName {
                    name: format!(
                        "{}-{} (approx.)",
                        PitchClass::new(root).name(spelling),
                        quality.common_name()
                    ),
                    symbol: None,
                }
            } else {
                ChordName {
                    name: format!("{}-cluster", bass_name),
                    symbol: None,
                }
            }
        }
    }
}

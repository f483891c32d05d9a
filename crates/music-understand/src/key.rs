use midi_analysis::TimedNote;

use crate::pitch::{PitchClass, Spelling};
use crate::types::{KeyDetection, KeyMode};

/// Krumhansl-Kessler major key profile (duration-weighted perception studies).
const MAJOR_PROFILE: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];

/// Krumhansl-Kessler minor key profile.
const MINOR_PROFILE: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

fn c_major() -> KeyDetection {
    KeyDetection {
        root: "C".into(),
        root_pitch_class: 0,
        mode: KeyMode::Major,
        confidence: 0.0,
    }
}

/// Detect the key of a piece using the Krumhansl-Schmuckler algorithm.
///
/// Builds a duration-weighted pitch-class histogram and correlates it
/// against all 24 major/minor key profiles. The best Pearson correlation
/// determines the detected key.
pub fn detect_key(notes: &[TimedNote]) -> KeyDetection {
    if notes.is_empty() {
        return c_major();
    }

    // Duration-weighted pitch-class histogram
    let mut histogram = [0.0_f64; 12];
    for note in notes {
        let duration = note.duration_ticks().max(1) as f64;
        histogram[note.pitch_class() as usize] += duration;
    }

    let total: f64 = histogram.iter().sum();
    if total == 0.0 {
        return c_major();
    }

    for h in &mut histogram {
        *h /= total;
    }

    // Correlate against all 24 key profiles (12 roots × 2 modes)
    let mut best_root: u8 = 0;
    let mut best_mode = KeyMode::Major;
    let mut best_corr = -1.0_f64;

    for root in 0..12u8 {
        let rotated: [f64; 12] = std::array::from_fn(|i| histogram[(i + root as usize) % 12]);

        let major_corr = pearson(&rotated, &MAJOR_PROFILE);
        if major_corr > best_corr {
            best_corr = major_corr;
            best_root = root;
            best_mode = KeyMode::Major;
        }

        let minor_corr = pearson(&rotated, &MINOR_PROFILE);
        if minor_corr > best_corr {
            best_corr = minor_corr;
            best_root = root;
            best_mode = KeyMode::Minor;
        }
    }

    let root = PitchClass::new(best_root);

    KeyDetection {
        root: root.name(Spelling::for_key_root(root)).to_string(),
        root_pitch_class: best_root,
        mode: best_mode,
        confidence: (best_corr * 10000.0).round() / 10000.0,
    }
}

/// Spelling to use for chord names in a piece in this key.
pub fn spelling_for(key: &KeyDetection) -> Spelling {
    Spelling::for_key_root(PitchClass::new(key.root_pitch_class))
}

/// Pearson correlation coefficient between two 12-element arrays.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let xd = xi - x_mean;
        let yd = yi - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_note(pitch: u8, onset: u64, offset: u64) -> TimedNote {
        TimedNote {
            pitch,
            onset_tick: onset,
            offset_tick: offset,
            velocity: 80,
            channel: 0,
            track_index: 0,
        }
    }

    fn scale(pitches: &[u8], beat: u64) -> Vec<TimedNote> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| make_note(p, i as u64 * beat, (i as u64 + 1) * beat))
            .collect()
    }

    #[test]
    fn empty_notes_returns_c_major() {
        let result = detect_key(&[]);
        assert_eq!(result.root, "C");
        assert_eq!(result.mode, KeyMode::Major);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(spelling_for(&result), Spelling::Sharps);
    }

    #[test]
    fn c_major_scale_detected() {
        let result = detect_key(&scale(&[60, 62, 64, 65, 67, 69, 71], 480));
        assert_eq!(result.root, "C");
        assert_eq!(result.mode, KeyMode::Major);
        assert!(result.confidence > 0.7, "confidence {} should be > 0.7", result.confidence);
        assert_eq!(result.to_string(), "C major");
    }

    #[test]
    fn a_minor_scale_detected() {
        let result = detect_key(&scale(&[57, 59, 60, 62, 64, 65, 67], 480));
        // A minor and C major are relative; either is acceptable
        assert!(result.confidence > 0.5, "confidence {} should be > 0.5", result.confidence);
    }

    #[test]
    fn f_major_triad_spells_with_flats() {
        // F A C with weight on F
        let mut notes = scale(&[53, 57, 60, 65, 70], 480);
        notes.push(make_note(53, 2400, 4800));
        let result = detect_key(&notes);
        if result.root_pitch_class == 5 {
            assert_eq!(result.root, "F");
            assert_eq!(spelling_for(&result), Spelling::Flats);
        }
    }

    #[test]
    fn flat_key_spelling() {
        let result = detect_key(&scale(&[61, 63, 65, 66, 68, 70, 72], 960));
        if result.root_pitch_class == 1 {
            assert_eq!(result.root, "Db");
        }
    }

    #[test]
    fn pearson_identical_arrays() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let r = pearson(&a, &a);
        assert!((r - 1.0).abs() < 1e-10, "self-correlation should be 1.0, got {}", r);
    }
}

//! Common test utilities: a small song written to a temp dir.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use midi_analysis::{
    performance_to_midi, Instrument, MidiFileContext, Performance, TempoChange,
    TimeSignature, TimedNote,
};
use tempfile::TempDir;

pub const PIANO: u8 = 0;
pub const MELODY: u8 = 1;
pub const DRUMS: u8 = 9;

fn note(pitch: u8, onset: u64, offset: u64, channel: u8, track_index: usize) -> TimedNote {
    TimedNote {
        onset_tick: onset,
        offset_tick: offset,
        pitch,
        velocity: 96,
        channel,
        track_index,
    }
}

/// Two bars at 480 ppq, 120 bpm: F major then C major on piano, a four-note
/// flute line (F4 A4 G4 E4) and a kick drum.
pub fn song() -> Performance {
    let piano = Instrument {
        track_index: 1,
        channel: PIANO,
        program: 0,
        is_drum: false,
        name: Some("Piano".into()),
        notes: vec![
            note(53, 0, 960, PIANO, 1),
            note(57, 0, 960, PIANO, 1),
            note(60, 0, 960, PIANO, 1),
            note(60, 960, 1920, PIANO, 1),
            note(64, 960, 1920, PIANO, 1),
            note(67, 960, 1920, PIANO, 1),
        ],
    };
    let melody = Instrument {
        track_index: 2,
        channel: MELODY,
        program: 73,
        is_drum: false,
        name: Some("Flute".into()),
        notes: vec![
            note(65, 0, 480, MELODY, 2),
            note(69, 480, 960, MELODY, 2),
            note(67, 960, 1440, MELODY, 2),
            note(64, 1440, 1920, MELODY, 2),
        ],
    };
    let drums = Instrument {
        track_index: 3,
        channel: DRUMS,
        program: 0,
        is_drum: true,
        name: Some("Drums".into()),
        notes: vec![note(36, 0, 120, DRUMS, 3), note(36, 960, 1080, DRUMS, 3)],
    };

    Performance {
        context: MidiFileContext {
            ppq: 480,
            format: 1,
            track_count: 4,
            tempo_changes: vec![TempoChange::from_bpm(0, 120.0)],
            time_signatures: vec![TimeSignature {
                tick: 0,
                numerator: 4,
                denominator: 4,
            }],
            total_ticks: 1920,
        },
        instruments: vec![piano, melody, drums],
    }
}

pub struct Workspace {
    pub dir: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Temp dir holding `song.mid`; `out.mid` is where runs should write.
pub fn workspace() -> Workspace {
    workspace_with(&song())
}

/// Like [`workspace`] with a caller-built song.
pub fn workspace_with(performance: &Performance) -> Workspace {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("song.mid");
    std::fs::write(&input, performance_to_midi(performance)).expect("write fixture");
    let output = dir.path().join("out.mid");
    Workspace { dir, input, output }
}

pub fn read(path: &Path) -> Performance {
    Performance::parse(&std::fs::read(path).expect("read output")).expect("parse output")
}

pub fn notes_on(performance: &Performance, channel: u8) -> Vec<(u64, u64, u8)> {
    performance
        .instruments
        .iter()
        .filter(|i| i.channel == channel)
        .flat_map(|i| &i.notes)
        .map(|n| (n.onset_tick, n.offset_tick, n.pitch))
        .collect()
}

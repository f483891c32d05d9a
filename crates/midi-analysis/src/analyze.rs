use crate::note::TimedNote;
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Tempo assumed when a file carries no tempo events (the SMF default).
pub const DEFAULT_BPM: f64 = 120.0;

/// Parsed MIDI file context: timing, format, and tempo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiFileContext {
    pub ppq: u16,
    pub format: u8,
    pub track_count: usize,
    pub tempo_changes: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
    pub total_ticks: u64,
}

impl MidiFileContext {
    /// Tempo in effect at tick 0.
    ///
    /// Before the first Set Tempo event a file plays at [`DEFAULT_BPM`].
    pub fn initial_bpm(&self) -> f64 {
        self.tempo_changes
            .first()
            .filter(|t| t.tick == 0)
            .map(|t| t.bpm)
            .unwrap_or(DEFAULT_BPM)
    }

    /// The tempo map with the implicit [`DEFAULT_BPM`] entry made explicit
    /// when the file does not set a tempo at tick 0.
    pub fn tempo_timeline(&self) -> Vec<TempoChange> {
        let mut timeline = self.tempo_changes.clone();
        if timeline.first().map_or(true, |t| t.tick > 0) {
            timeline.insert(0, TempoChange::from_bpm(0, DEFAULT_BPM));
        }
        timeline
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
    pub bpm: f64,
}

impl TempoChange {
    /// Largest value a Set Tempo meta event can carry (24 bits).
    const MAX_USEC: u32 = 0x00FF_FFFF;

    /// Slowest tempo a Set Tempo event can express.
    pub const MIN_BPM: f64 = 60_000_000.0 / Self::MAX_USEC as f64;
    /// Fastest tempo a Set Tempo event can express (1 µs per beat).
    pub const MAX_BPM: f64 = 60_000_000.0;

    /// True when `bpm` survives a round trip through a Set Tempo event.
    pub fn is_representable(bpm: f64) -> bool {
        bpm.is_finite() && (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm)
    }

    pub fn from_bpm(tick: u64, bpm: f64) -> Self {
        let usec = (60_000_000.0 / bpm).round().clamp(1.0, Self::MAX_USEC as f64) as u32;
        Self {
            tick,
            microseconds_per_beat: usec,
            bpm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: u64,
    pub numerator: u8,
    pub denominator: u8,
}

/// Ticks per quarter assumed for SMPTE-timed files.
pub const TIMECODE_FALLBACK_PPQ: u16 = 480;

/// Names and programs declared by each track, keyed the way instruments are.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    /// Track name meta event, by track index.
    pub names: Vec<Option<String>>,
    /// First program change seen, by `(track_index, channel)`.
    pub programs: BTreeMap<(usize, u8), u8>,
}

/// Extract all notes from a parsed SMF, pairing note-on/note-off events.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, MidiFileContext) {
    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(fps, subframes) => {
            warn!(
                fps = fps.as_int(),
                subframes,
                assumed_ppq = TIMECODE_FALLBACK_PPQ,
                "SMPTE-timed file read as metrical; output timing will differ"
            );
            TIMECODE_FALLBACK_PPQ
        }
    };

    let format = match smf.header.format {
        midly::Format::SingleTrack => 0,
        midly::Format::Parallel => 1,
        midly::Format::Sequential => 2,
    };

    let mut all_notes = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut time_signatures = Vec::new();
    let mut total_ticks: u64 = 0;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        // Map (channel, pitch) → Vec<(onset_tick, velocity)> for stacking
        let mut pending: BTreeMap<(u8, u8), Vec<(u64, u8)>> = BTreeMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int().max(1);
                    tempo_changes.push(TempoChange {
                        tick: current_tick,
                        microseconds_per_beat: usec,
                        bpm: 60_000_000.0 / usec as f64,
                    });
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    time_signatures.push(TimeSignature {
                        tick: current_tick,
                        numerator: num,
                        denominator: 1u8.checked_shl(denom_pow as u32).unwrap_or(4),
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. }
                        | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn is NoteOff
                            let key = (ch, key.as_int());
                            if let Some(stack) = pending.get_mut(&key) {
                                if let Some((onset, velocity)) = stack.pop() {
                                    all_notes.push(TimedNote {
                                        onset_tick: onset,
                                        offset_tick: current_tick,
                                        pitch: key.1,
                                        velocity,
                                        channel: ch,
                                        track_index,
                                    });
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }

            total_ticks = total_ticks.max(current_tick);
        }

        // Close any unclosed notes at the track's final tick
        for ((channel, pitch), stack) in &pending {
            for &(onset, velocity) in stack {
                all_notes.push(TimedNote {
                    onset_tick: onset,
                    offset_tick: current_tick,
                    pitch: *pitch,
                    velocity,
                    channel: *channel,
                    track_index,
                });
            }
        }
    }

    // Sort by onset, then pitch for determinism
    all_notes.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.track_index.cmp(&b.track_index))
            .then(a.channel.cmp(&b.channel))
    });

    // Deduplicate tempo changes (multiple tracks may repeat them in format 1)
    tempo_changes.sort_by_key(|t| t.tick);
    tempo_changes.dedup_by(|a, b| a.tick == b.tick && a.microseconds_per_beat == b.microseconds_per_beat);

    time_signatures.sort_by_key(|t| t.tick);
    time_signatures.dedup_by(|a, b| a.tick == b.tick);

    let context = MidiFileContext {
        ppq,
        format,
        track_count: smf.tracks.len(),
        tempo_changes,
        time_signatures,
        total_ticks,
    };

    (all_notes, context)
}

/// Collect track names and program changes.
pub fn track_metadata(smf: &Smf) -> TrackMetadata {
    let mut metadata = TrackMetadata::default();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut name = None;

        for event in track {
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) if name.is_none() => {
                    name = String::from_utf8(bytes.to_vec())
                        .ok()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty());
                }
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ProgramChange { program },
                } => {
                    metadata
                        .programs
                        .entry((track_index, channel.as_int()))
                        .or_insert(program.as_int());
                }
                _ => {}
            }
        }

        metadata.names.push(name);
    }

    metadata
}

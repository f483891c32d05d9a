//! Event-timed performance representation of a MIDI file.
//!
//! Notes are grouped into instruments keyed by `(track, channel)`, the way a
//! sequencer would present them. The tempo map lives in the file context.

use crate::analyze::{extract_notes, track_metadata, MidiFileContext, TempoChange};
use crate::gm;
use crate::note::TimedNote;
use midly::Smf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Channel index (0-based) reserved for percussion in General MIDI.
pub const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub track_index: usize,
    pub channel: u8,
    pub program: u8,
    pub is_drum: bool,
    pub name: Option<String>,
    pub notes: Vec<TimedNote>,
}

impl Instrument {
    /// Track name when the file has one, otherwise the GM program name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| gm::instrument_name(self.program, self.is_drum))
    }

    /// Same instrument with no notes.
    pub fn without_notes(&self) -> Self {
        Self {
            notes: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub context: MidiFileContext,
    pub instruments: Vec<Instrument>,
}

impl Performance {
    /// Parse SMF bytes.
    pub fn parse(midi_bytes: &[u8]) -> crate::Result<Self> {
        let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
        Ok(Self::from_smf(&smf))
    }

    pub fn from_smf(smf: &Smf) -> Self {
        let (notes, context) = extract_notes(smf);
        let metadata = track_metadata(smf);

        let mut grouped: BTreeMap<(usize, u8), Vec<TimedNote>> = BTreeMap::new();
        for note in notes {
            grouped
                .entry((note.track_index, note.channel))
                .or_default()
                .push(note);
        }

        let instruments: Vec<Instrument> = grouped
            .into_iter()
            .map(|((track_index, channel), notes)| Instrument {
                track_index,
                channel,
                program: metadata
                    .programs
                    .get(&(track_index, channel))
                    .copied()
                    .unwrap_or(0),
                is_drum: channel == DRUM_CHANNEL,
                name: metadata.names.get(track_index).cloned().flatten(),
                notes,
            })
            .collect();

        debug!(
            tracks = context.track_count,
            instruments = instruments.len(),
            ppq = context.ppq,
            "parsed performance"
        );

        Self {
            context,
            instruments,
        }
    }

    pub fn initial_bpm(&self) -> f64 {
        self.context.initial_bpm()
    }

    pub fn note_count(&self) -> usize {
        self.instruments.iter().map(|i| i.notes.len()).sum()
    }

    /// Notes of every non-drum instrument.
    pub fn pitched_notes(&self) -> Vec<TimedNote> {
        self.instruments
            .iter()
            .filter(|i| !i.is_drum)
            .flat_map(|i| i.notes.iter().cloned())
            .collect()
    }

    /// Copy with the tempo map rescaled so that it starts at `bpm`.
    ///
    /// Later tempo changes keep their ratio to the opening tempo. A file that
    /// sets no tempo at tick 0 gets one there, replacing the implicit 120 bpm.
    pub fn with_tempo(&self, bpm: f64) -> crate::Result<Self> {
        if !TempoChange::is_representable(bpm) {
            return Err(crate::Error::InvalidTempo(bpm));
        }

        let ratio = bpm / self.initial_bpm();
        let tempo_changes = self
            .context
            .tempo_timeline()
            .iter()
            .map(|t| TempoChange::from_bpm(t.tick, t.bpm * ratio))
            .collect();

        let mut performance = self.clone();
        performance.context.tempo_changes = tempo_changes;
        Ok(performance)
    }

    /// Copy keeping instrument metadata and the tempo map but no notes.
    pub fn without_notes(&self) -> Self {
        Self {
            context: self.context.clone(),
            instruments: self.instruments.iter().map(Instrument::without_notes).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::tests::make_test_midi_format1;
    use pretty_assertions::assert_eq;

    #[test]
    fn instruments_grouped_by_track_and_channel() {
        let perf = Performance::parse(&make_test_midi_format1()).unwrap();

        assert_eq!(perf.instruments.len(), 1);
        let lead = &perf.instruments[0];
        assert_eq!(lead.track_index, 1);
        assert_eq!(lead.channel, 0);
        assert_eq!(lead.program, 73);
        assert!(!lead.is_drum);
        assert_eq!(lead.display_name(), "Lead");
        assert_eq!(lead.notes.len(), 3);
        assert_eq!(perf.note_count(), 3);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = Performance::parse(b"not a midi file").unwrap_err();
        assert!(matches!(err, crate::Error::MidiParse(_)));
    }

    #[test]
    fn tempo_rescales_whole_timeline() {
        let mut perf = Performance::parse(&make_test_midi_format1()).unwrap();
        perf.context.tempo_changes.push(TempoChange::from_bpm(960, 60.0));

        let faster = perf.with_tempo(180.0).unwrap();
        let bpms: Vec<f64> = faster
            .context
            .tempo_changes
            .iter()
            .map(|t| (t.bpm * 10.0).round() / 10.0)
            .collect();
        assert_eq!(bpms, vec![180.0, 90.0]);
        assert_eq!(faster.context.tempo_changes[1].tick, 960);
        // Notes untouched
        assert_eq!(faster.instruments, perf.instruments);
    }

    #[test]
    fn tempo_added_when_file_has_none() {
        let mut perf = Performance::parse(&make_test_midi_format1()).unwrap();
        perf.context.tempo_changes.clear();

        let slowed = perf.with_tempo(90.0).unwrap();
        assert_eq!(slowed.context.tempo_changes.len(), 1);
        assert_eq!(slowed.context.tempo_changes[0].tick, 0);
        assert_eq!(slowed.context.tempo_changes[0].microseconds_per_beat, 666_667);
    }

    #[test]
    fn invalid_tempo_rejected() {
        let perf = Performance::parse(&make_test_midi_format1()).unwrap();
        assert!(perf.with_tempo(0.0).is_err());
        assert!(perf.with_tempo(-12.0).is_err());
        assert!(perf.with_tempo(f64::NAN).is_err());
        // Slower than a 24-bit Set Tempo can hold
        assert!(perf.with_tempo(1.0).is_err());
    }

    #[test]
    fn late_tempo_gets_an_opening_entry() {
        let mut perf = Performance::parse(&make_test_midi_format1()).unwrap();
        perf.context.tempo_changes = vec![TempoChange::from_bpm(480, 90.0)];
        assert_eq!(perf.initial_bpm(), 120.0);

        let slowed = perf.with_tempo(60.0).unwrap();
        let timeline: Vec<(u64, f64)> = slowed
            .context
            .tempo_changes
            .iter()
            .map(|t| (t.tick, t.bpm))
            .collect();
        assert_eq!(timeline, vec![(0, 60.0), (480, 45.0)]);
    }

    #[test]
    fn without_notes_keeps_metadata() {
        let perf = Performance::parse(&make_test_midi_format1()).unwrap();
        let bare = perf.without_notes();

        assert_eq!(bare.note_count(), 0);
        assert_eq!(bare.instruments[0].program, 73);
        assert_eq!(bare.context, perf.context);
    }
}

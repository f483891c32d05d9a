use crate::analyze::{MidiFileContext, DEFAULT_BPM};
use crate::performance::{Instrument, Performance};

/// Write a performance to Standard MIDI File format 1 bytes.
///
/// Track 0: tempo map + time signatures (from context).
/// Tracks 1+: one per instrument, with track name, program change, note events.
pub fn performance_to_midi(performance: &Performance) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = vec![build_tempo_track(&performance.context)];

    for instrument in &performance.instruments {
        tracks.push(build_instrument_track(instrument));
    }

    build_midi_file(performance.context.ppq, &tracks)
}

/// Build the tempo/time-signature track.
fn build_tempo_track(context: &MidiFileContext) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    for tc in &context.tempo_changes {
        events.push((tc.tick, tempo_event(tc.microseconds_per_beat)));
    }

    for ts in &context.time_signatures {
        let denom_pow = ts.denominator.max(1).trailing_zeros() as u8;
        events.push((
            ts.tick,
            vec![0xFF, 0x58, 0x04, ts.numerator, denom_pow, 0x18, 0x08],
        ));
    }

    if context.tempo_changes.is_empty() {
        let usec = (60_000_000.0 / DEFAULT_BPM) as u32;
        events.push((0, tempo_event(usec)));
    }

    events.sort_by_key(|(tick, _)| *tick);

    encode_track(events)
}

fn tempo_event(usec: u32) -> Vec<u8> {
    vec![
        0xFF,
        0x51,
        0x03,
        (usec >> 16) as u8,
        (usec >> 8) as u8,
        usec as u8,
    ]
}

/// Build a track for a single instrument.
fn build_instrument_track(instrument: &Instrument) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();
    let channel = instrument.channel & 0x0F;

    let name_bytes = instrument.display_name().as_bytes();
    let mut name_event = vec![0xFF, 0x03];
    write_vlq(&mut name_event, name_bytes.len() as u32);
    name_event.extend_from_slice(name_bytes);
    events.push((0, name_event));

    events.push((0, vec![0xC0 | channel, instrument.program & 0x7F]));

    for note in &instrument.notes {
        // A note-off at the onset tick would sort first and leave the note hanging
        let offset_tick = note.offset_tick.max(note.onset_tick + 1);
        events.push((
            note.onset_tick,
            vec![0x90 | channel, note.pitch & 0x7F, note.velocity.clamp(1, 127)],
        ));
        events.push((offset_tick, vec![0x80 | channel, note.pitch & 0x7F, 0]));
    }

    // Sort by tick, with note-offs before note-ons at the same tick
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    encode_track(events)
}

/// Delta-encode sorted `(tick, bytes)` events and terminate the track.
fn encode_track(events: Vec<(u64, Vec<u8>)>) -> Vec<u8> {
    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta.min(0x0FFF_FFFF) as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    // MThd header
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

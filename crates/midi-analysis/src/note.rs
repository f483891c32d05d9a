use serde::{Deserialize, Serialize};

/// A single MIDI note with absolute tick timing and source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedNote {
    pub onset_tick: u64,
    pub offset_tick: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub track_index: usize,
}

impl TimedNote {
    pub fn duration_ticks(&self) -> u64 {
        self.offset_tick.saturating_sub(self.onset_tick)
    }

    /// Pitch class 0–11 (C=0).
    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }

    /// True while the note is sounding at `tick` (onset inclusive, offset exclusive).
    pub fn sounds_at(&self, tick: u64) -> bool {
        self.onset_tick <= tick && tick < self.offset_tick
    }
}

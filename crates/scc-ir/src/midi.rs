//! Parsed MIDI performance, as handed over by a MIDI decoder.

use alloc::vec::Vec;

/// Tempo in effect before the first tempo event (120 BPM).
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

/// A decoded MIDI performance: ticks-per-beat plus a merged event list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MidiSequence {
    /// Ticks per quarter note
    pub division: u16,
    /// Events in non-decreasing tick order
    pub events: Vec<MidiEvent>,
}

impl MidiSequence {
    pub fn new(division: u16) -> Self {
        Self { division, events: Vec::new() }
    }

    /// Append an event at an absolute tick.
    pub fn push(&mut self, ticks: u64, kind: MidiEventKind) {
        self.events.push(MidiEvent { ticks, kind });
    }
}

/// One event at an absolute tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidiEvent {
    pub ticks: u64,
    pub kind: MidiEventKind,
}

/// Channel messages and the tempo meta event. Channels are zero-based.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MidiEventKind {
    Tempo { microseconds_per_beat: u32 },
    ProgramChange { channel: u8, program: u8 },
    Control { channel: u8, controller: u8, value: u8 },
    /// Signed bend, -8192..=8191
    PitchBend { channel: u8, value: i16 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

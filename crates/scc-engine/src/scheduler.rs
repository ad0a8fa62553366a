//! MIDI-to-timeline scheduling.
//!
//! Walks a tick-based MIDI sequence with a running tempo map, producing the
//! absolute-time event list the engine consumes.

use alloc::vec::Vec;

use crate::channel::{cc, NUM_CHANNELS};
use scc_ir::{
    EventPayload, InstrumentMap, MidiEventKind, MidiSequence, Timeline, TimelineEvent,
    DEFAULT_MICROSECONDS_PER_BEAT,
};

/// Silence appended after the longest release.
pub const TAIL_PAD_SECONDS: f64 = 0.25;

/// Time notes still held at the end of the sequence spend at their sustain
/// level before the final release.
pub const HELD_NOTE_SECONDS: f64 = 0.5;

/// Schedule every event of `sequence`, played `speed` times as fast.
///
/// A non-positive or non-finite `speed` plays at normal speed. Out-of-order
/// ticks are treated as simultaneous with the previous event.
///
/// The closing `Finish` event releases whatever still sounds. When notes are
/// left held (no note-off, or a pedal that is never lifted) it is pushed back
/// far enough for them to reach and hold their sustain level, and the tail
/// grows by the same amount.
pub fn schedule_sequence(sequence: &MidiSequence, speed: f64, map: &InstrumentMap) -> Timeline {
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    let division = sequence.division.max(1) as f64;
    let mut tick_seconds = seconds_per_tick(DEFAULT_MICROSECONDS_PER_BEAT, division);

    let mut events = Vec::with_capacity(sequence.events.len() + 1);
    let mut time = 0.0f64;
    let mut last_tick = 0u64;
    let mut held = HeldNotes::default();

    for event in &sequence.events {
        let delta = event.ticks.saturating_sub(last_tick);
        last_tick = last_tick.max(event.ticks);
        time += delta as f64 * tick_seconds / speed;

        match event.kind {
            MidiEventKind::Tempo { microseconds_per_beat } => {
                if microseconds_per_beat > 0 {
                    tick_seconds = seconds_per_tick(microseconds_per_beat, division);
                }
            }
            kind => {
                if let Some((channel, payload)) = channel_payload(kind) {
                    let channel = channel.min(15);
                    held.apply(channel, payload);
                    events.push(TimelineEvent::new(time, channel, payload));
                }
            }
        }
    }

    let duration = time;
    let hold = if held.any() {
        map.longest_onset_ms().max(0.0) as f64 / 1000.0 + HELD_NOTE_SECONDS
    } else {
        0.0
    };
    events.push(TimelineEvent::new(duration + hold, 0, EventPayload::Finish));
    let tail = hold + map.longest_release_ms().max(0.0) as f64 / 1000.0 + TAIL_PAD_SECONDS;

    log::debug!(
        "scheduled {} events over {:.3}s (+{:.3}s tail, {:.3}s of it holding)",
        events.len(),
        duration,
        tail,
        hold
    );
    Timeline { events, duration, tail }
}

/// Keys sounding at the end of the sequence, per channel, mirroring the
/// engine's key and pedal handling.
#[derive(Default)]
struct HeldNotes {
    keys: [u128; NUM_CHANNELS],
    pedalled: [u128; NUM_CHANNELS],
    pedal: [bool; NUM_CHANNELS],
}

impl HeldNotes {
    fn apply(&mut self, channel: u8, payload: EventPayload) {
        let ch = (channel as usize).min(NUM_CHANNELS - 1);
        match payload {
            EventPayload::NoteOn { note, velocity } if velocity > 0 => {
                let bit = 1u128 << note.min(127);
                self.keys[ch] |= bit;
                self.pedalled[ch] &= !bit;
            }
            EventPayload::NoteOn { note, .. } | EventPayload::NoteOff { note } => {
                let bit = 1u128 << note.min(127);
                if self.keys[ch] & bit != 0 && self.pedal[ch] {
                    self.pedalled[ch] |= bit;
                }
                self.keys[ch] &= !bit;
            }
            EventPayload::Control { controller, value } => match controller {
                cc::SUSTAIN => {
                    self.pedal[ch] = value >= 64;
                    if !self.pedal[ch] {
                        self.pedalled[ch] = 0;
                    }
                }
                cc::ALL_SOUND_OFF => {
                    self.keys[ch] = 0;
                    self.pedalled[ch] = 0;
                }
                cc::RESET_CONTROLLERS => {
                    self.pedal[ch] = false;
                    self.pedalled[ch] = 0;
                }
                cc::ALL_NOTES_OFF => {
                    if self.pedal[ch] {
                        self.pedalled[ch] |= self.keys[ch];
                    }
                    self.keys[ch] = 0;
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn any(&self) -> bool {
        self.keys.iter().chain(self.pedalled.iter()).any(|&k| k != 0)
    }
}

fn seconds_per_tick(microseconds_per_beat: u32, division: f64) -> f64 {
    microseconds_per_beat as f64 / 1_000_000.0 / division
}

/// Map a channel message to its timeline payload, clamping data bytes.
fn channel_payload(kind: MidiEventKind) -> Option<(u8, EventPayload)> {
    let mapped = match kind {
        MidiEventKind::Tempo { .. } => return None,
        MidiEventKind::ProgramChange { channel, program } => {
            (channel, EventPayload::Program(program.min(127)))
        }
        MidiEventKind::Control { channel, controller, value } => (
            channel,
            EventPayload::Control { controller: controller.min(127), value: value.min(127) },
        ),
        MidiEventKind::PitchBend { channel, value } => {
            (channel, EventPayload::PitchBend(value.clamp(-8192, 8191)))
        }
        MidiEventKind::NoteOn { channel, note, velocity } => (
            channel,
            EventPayload::NoteOn { note: note.min(127), velocity: velocity.min(127) },
        ),
        MidiEventKind::NoteOff { channel, note } => {
            (channel, EventPayload::NoteOff { note: note.min(127) })
        }
    };
    Some(mapped)
}

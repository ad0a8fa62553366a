//! Per-MIDI-channel controller state.

use crate::frequency::bend_to_ratio;
use crate::voice::ChannelMix;
use crate::voice_pool::{VoiceId, MAX_VOICES};

/// Default pitch bend range in semitones.
pub const DEFAULT_BEND_RANGE: f32 = 2.0;

/// Upper bound for CC7/CC11 gains.
pub const MAX_CONTROLLER_GAIN: f32 = 1.2;

/// Channel pan width reached by CC10 at its extremes.
pub const CHANNEL_PAN_WIDTH: f32 = 0.6;

/// Number of MIDI channels.
pub const NUM_CHANNELS: usize = 16;

/// Controller numbers the engine reacts to.
pub mod cc {
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const EXPRESSION: u8 = 11;
    pub const SUSTAIN: u8 = 64;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Small fixed-capacity set of voice slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceSet(u8);

const _: () = assert!(MAX_VOICES <= 8);

impl VoiceSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, id: VoiceId) {
        if id < MAX_VOICES {
            self.0 |= 1 << id;
        }
    }

    pub fn remove(&mut self, id: VoiceId) {
        if id < MAX_VOICES {
            self.0 &= !(1 << id);
        }
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        id < MAX_VOICES && self.0 & (1 << id) != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Slots in ascending order. Iterates a copy, so the set may be
    /// modified while iterating.
    pub fn iter(self) -> impl Iterator<Item = VoiceId> {
        (0..MAX_VOICES).filter(move |&i| self.0 & (1 << i) != 0)
    }
}

/// Controller state for one MIDI channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelState {
    /// Current program (0-127)
    pub program: u8,
    /// CC7 gain
    pub volume: f32,
    /// CC11 gain
    pub expression: f32,
    /// CC10 pan offset, -0.6..0.6
    pub pan: f32,
    /// Raw signed 14-bit pitch bend
    pub bend: i16,
    /// Semitones reached at full bend
    pub bend_range: f32,
    /// Is the sustain pedal down?
    pub sustain_pedal: bool,
    /// Voices currently held by a key.
    pub active: VoiceSet,
    /// Voices whose key was released under the pedal.
    pub sustained: VoiceSet,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            program: 0,
            volume: 1.0,
            expression: 1.0,
            pan: 0.0,
            bend: 0,
            bend_range: DEFAULT_BEND_RANGE,
            sustain_pedal: false,
            active: VoiceSet::empty(),
            sustained: VoiceSet::empty(),
        }
    }
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bend_range(bend_range: f32) -> Self {
        Self { bend_range, ..Self::default() }
    }

    /// Map a CC7/CC11 value to a gain.
    pub fn controller_gain(value: u8) -> f32 {
        (value as f32 / 100.0).clamp(0.0, MAX_CONTROLLER_GAIN)
    }

    /// Map a CC10 value to a pan offset.
    pub fn controller_pan(value: u8) -> f32 {
        ((value.min(127) as f32 / 127.0) * 2.0 - 1.0) * CHANNEL_PAN_WIDTH
    }

    /// Combined channel gain.
    pub fn gain(&self) -> f32 {
        self.volume * self.expression
    }

    pub fn bend_ratio(&self) -> f32 {
        bend_to_ratio(self.bend, self.bend_range)
    }

    /// Values a voice on this channel mixes with.
    pub fn mix(&self) -> ChannelMix {
        ChannelMix { gain: self.gain(), pan: self.pan, bend_ratio: self.bend_ratio() }
    }

    /// CC121: controllers back to defaults. Program, bend range and voice
    /// sets are kept.
    pub fn reset_controllers(&mut self) {
        self.volume = 1.0;
        self.expression = 1.0;
        self.pan = 0.0;
        self.bend = 0;
        self.sustain_pedal = false;
    }

    /// Drop `id` from both voice sets.
    pub fn forget(&mut self, id: VoiceId) {
        self.active.remove(id);
        self.sustained.remove(id);
    }
}

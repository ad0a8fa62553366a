//! Core data types for the SCC wavetable engine.
//!
//! This crate defines the representation shared throughout the engine.
//! Format loaders emit these types, and the renderer consumes them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod envelope;
mod event;
mod instrument;
mod midi;
mod render;
mod wavetable;

pub use envelope::{level_gain, ms_to_samples, EnvelopeDef, MAX_LEVEL, VOL4_TO_GAIN};
pub use event::{EventPayload, Timeline, TimelineEvent};
pub use instrument::{DrumSweep, DrumType, Instrument, InstrumentMap, Vibrato, PERCUSSION_CHANNEL};
pub use midi::{MidiEvent, MidiEventKind, MidiSequence, DEFAULT_MICROSECONDS_PER_BEAT};
pub use render::{RenderOptions, RenderResult};
pub use wavetable::{
    wrap_phase, Wavetable, WavetableBank, WavetableKey, FALLBACK_TABLE, MAX_TABLE_NAME_LEN,
    NOISE_TABLE, TABLE_LEN,
};

//! Wavetable synthesis engine for SCC chiptunes.
//!
//! Schedules MIDI performances into sample-accurate events, runs them
//! through a five-voice pool and masters the result.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod config;
mod envelope_state;
mod event_queue;
mod frame;
mod frequency;
pub mod machine;
pub mod machines;
mod mixer;
pub mod scheduler;
mod voice;
mod voice_pool;

pub use channel::{cc, ChannelState, VoiceSet, NUM_CHANNELS};
pub use config::{ChorusConfig, EngineConfig, HighShelfConfig, LowPassConfig};
pub use envelope_state::{EnvelopePhase, EnvelopeRates, EnvelopeState};
pub use event_queue::{EventQueue, QueuedEvent};
pub use frame::{Frame, PanGains};
pub use frequency::{bend_to_ratio, cents_to_ratio, note_to_frequency, note_to_increment};
pub use machines::MasteringChain;
pub use mixer::Engine;
pub use scheduler::{schedule_sequence, HELD_NOTE_SECONDS, TAIL_PAD_SECONDS};
pub use voice::{Voice, VoiceState};
pub use voice_pool::{VoiceId, VoicePool, MAX_VOICES, SLOT_PANS};

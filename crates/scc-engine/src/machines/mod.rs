//! Built-in mastering machines and the chain that runs them.

pub mod biquad;
pub mod chorus;
pub mod soft_clip;

pub use biquad::{Biquad, BiquadCoeffs};
pub use chorus::Chorus;
pub use soft_clip::SoftClip;

use crate::config::EngineConfig;
use crate::machine::Machine;

/// Chorus, low-pass, high-shelf and soft clip, in that order.
pub struct MasteringChain {
    chorus: Chorus,
    lowpass: Biquad,
    high_shelf: Biquad,
    soft_clip: SoftClip,
}

impl MasteringChain {
    pub fn new(config: &EngineConfig) -> Self {
        let mut chain = Self {
            chorus: Chorus::new(config.chorus.delay_ms, config.chorus.mix),
            lowpass: Biquad::lowpass(config.lowpass.cutoff_hz, config.lowpass.q),
            high_shelf: Biquad::high_shelf(config.high_shelf.freq_hz, config.high_shelf.gain_db),
            soft_clip: SoftClip::new(config.soft_clip_drive),
        };
        chain.init(config.sample_rate);
        log::debug!("mastering chain: {}", chain.names().join(" -> "));
        chain
    }

    fn machines(&mut self) -> [&mut dyn Machine; 4] {
        [&mut self.chorus, &mut self.lowpass, &mut self.high_shelf, &mut self.soft_clip]
    }

    pub fn init(&mut self, sample_rate: u32) {
        for m in self.machines() {
            m.init(sample_rate);
        }
    }

    /// Run every machine over the buffers in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for m in self.machines() {
            m.work(left, right);
        }
    }

    /// Clear every machine's running state.
    pub fn stop(&mut self) {
        for m in self.machines() {
            m.stop();
        }
    }

    /// Short names in processing order.
    fn names(&mut self) -> [&'static str; 4] {
        self.machines().map(|m| m.info().short_name)
    }
}

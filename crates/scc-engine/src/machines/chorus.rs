//! Fixed-delay stereo cross-feed chorus.
//!
//! Each channel is mixed with a delayed copy of the opposite channel:
//! `out_l[n] = l[n]·(1 - mix) + r[n - d]·mix`, and likewise for the right.

use alloc::vec;
use alloc::vec::Vec;

use crate::machine::{Machine, MachineInfo};

static INFO: MachineInfo = MachineInfo { short_name: "Chorus" };

pub struct Chorus {
    delay_ms: f32,
    mix: f32,
    /// Past dry input, one ring per channel
    ring_left: Vec<f32>,
    ring_right: Vec<f32>,
    pos: usize,
    sample_rate: u32,
}

impl Chorus {
    pub fn new(delay_ms: f32, mix: f32) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            mix: mix.clamp(0.0, 1.0),
            ring_left: Vec::new(),
            ring_right: Vec::new(),
            pos: 0,
            sample_rate: 44100,
        }
    }

    /// Delay length in samples at the current rate.
    pub fn delay_samples(&self) -> usize {
        libm::roundf(self.delay_ms * self.sample_rate as f32 / 1000.0) as usize
    }

    fn resize(&mut self) {
        let len = self.delay_samples();
        self.ring_left = vec![0.0; len];
        self.ring_right = vec![0.0; len];
        self.pos = 0;
    }
}

impl Machine for Chorus {
    fn info(&self) -> &MachineInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.resize();
    }

    fn work(&mut self, left: &mut [f32], right: &mut [f32]) {
        let dry = 1.0 - self.mix;
        let wet = self.mix;
        let len = self.ring_left.len();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (in_l, in_r) = (*l, *r);
            let (delayed_l, delayed_r) = if len == 0 {
                (in_l, in_r)
            } else {
                let d = (self.ring_left[self.pos], self.ring_right[self.pos]);
                self.ring_left[self.pos] = in_l;
                self.ring_right[self.pos] = in_r;
                self.pos = (self.pos + 1) % len;
                d
            };
            *l = in_l * dry + delayed_r * wet;
            *r = in_r * dry + delayed_l * wet;
        }
    }

    fn stop(&mut self) {
        self.ring_left.iter_mut().for_each(|s| *s = 0.0);
        self.ring_right.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
    }
}

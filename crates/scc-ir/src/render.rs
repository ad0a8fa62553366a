//! Render options and the finished stereo buffer.

use alloc::vec::Vec;

/// Per-render performance tweaks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Semitones added to every melodic note
    pub transpose: i8,
    /// Cents added to every melodic note
    pub fine_detune: f32,
    /// Tempo multiplier; 2.0 plays twice as fast
    pub speed: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { transpose: 0, fine_detune: 0.0, speed: 1.0 }
    }
}

impl RenderOptions {
    /// Melodic pitch multiplier implied by transpose and detune.
    pub fn pitch_ratio(&self) -> f32 {
        let cents = self.transpose as f32 * 100.0 + self.fine_detune;
        libm::exp2f(cents / 1200.0)
    }
}

/// A rendered performance in planar stereo.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderResult {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
    /// Length in seconds
    pub duration: f64,
}

impl RenderResult {
    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Interleave into L/R pairs for an audio host.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.left.len() * 2);
        for (&l, &r) in self.left.iter().zip(self.right.iter()) {
            out.push(l);
            out.push(r);
        }
        out
    }

    /// Largest absolute sample over both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0f32, |m, s| m.max(libm::fabsf(*s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn default_options_are_neutral() {
        assert_eq!(RenderOptions::default().pitch_ratio(), 1.0);
    }

    #[test]
    fn transpose_octave_doubles_ratio() {
        let opts = RenderOptions { transpose: 12, ..Default::default() };
        assert!((opts.pitch_ratio() - 2.0).abs() < 1e-5);
        let opts = RenderOptions { transpose: -12, fine_detune: 0.0, speed: 1.0 };
        assert!((opts.pitch_ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn interleaved_pairs_channels() {
        let r = RenderResult {
            left: vec![1.0, 2.0],
            right: vec![-1.0, -2.0],
            sample_rate: 44100,
            duration: 0.0,
        };
        assert_eq!(r.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(r.frames(), 2);
        assert_eq!(r.peak(), 2.0);
    }
}

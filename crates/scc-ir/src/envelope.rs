//! Envelope definitions and the 4-bit volume curve.

/// Highest quantized envelope level.
pub const MAX_LEVEL: u8 = 15;

/// Gain for each 4-bit envelope level, modelling a logarithmic volume DAC.
pub const VOL4_TO_GAIN: [f32; 16] = [
    0.0, 0.0137, 0.0205, 0.0291, 0.0423, 0.0618, 0.0847, 0.1369,
    0.1691, 0.2647, 0.3527, 0.4499, 0.5708, 0.6873, 0.8482, 1.0,
];

/// Linear gain for a quantized level (levels above 15 saturate).
pub fn level_gain(level: u8) -> f32 {
    VOL4_TO_GAIN[level.min(MAX_LEVEL) as usize]
}

/// ADSR timings in milliseconds with a 4-bit sustain level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeDef {
    pub attack_ms: f32,
    pub decay_ms: f32,
    /// Sustain level, 0-15
    pub sustain_level: u8,
    pub release_ms: f32,
}

impl Default for EnvelopeDef {
    fn default() -> Self {
        Self { attack_ms: 5.0, decay_ms: 120.0, sustain_level: 10, release_ms: 150.0 }
    }
}

impl EnvelopeDef {
    /// Build a definition, clamping negative times to zero and the
    /// sustain level into 0-15.
    pub fn new(attack_ms: f32, decay_ms: f32, sustain_level: i32, release_ms: f32) -> Self {
        Self {
            attack_ms: non_negative(attack_ms),
            decay_ms: non_negative(decay_ms),
            sustain_level: sustain_level.clamp(0, MAX_LEVEL as i32) as u8,
            release_ms: non_negative(release_ms),
        }
    }

    /// Short percussive envelope used by drum entries that name none.
    pub const fn percussive() -> Self {
        Self { attack_ms: 0.0, decay_ms: 180.0, sustain_level: 0, release_ms: 60.0 }
    }
}

fn non_negative(ms: f32) -> f32 {
    if ms.is_finite() && ms > 0.0 { ms } else { 0.0 }
}

/// Convert milliseconds into a whole sample count at `sample_rate`.
pub fn ms_to_samples(ms: f32, sample_rate: u32) -> u32 {
    libm::roundf(ms * sample_rate as f32 / 1000.0).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_table_is_non_decreasing() {
        assert!(VOL4_TO_GAIN.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(VOL4_TO_GAIN[0], 0.0);
        assert_eq!(VOL4_TO_GAIN[15], 1.0);
    }

    #[test]
    fn level_gain_saturates() {
        assert_eq!(level_gain(200), 1.0);
        assert_eq!(level_gain(0), 0.0);
    }

    #[test]
    fn new_clamps_inputs() {
        let def = EnvelopeDef::new(-3.0, f32::NAN, 99, 10.0);
        assert_eq!(def.attack_ms, 0.0);
        assert_eq!(def.decay_ms, 0.0);
        assert_eq!(def.sustain_level, 15);
        assert_eq!(def.release_ms, 10.0);
    }

    #[test]
    fn ms_to_samples_rounds() {
        assert_eq!(ms_to_samples(10.0, 44100), 441);
        assert_eq!(ms_to_samples(0.0, 44100), 0);
        assert_eq!(ms_to_samples(1.0, 48000), 48);
    }
}

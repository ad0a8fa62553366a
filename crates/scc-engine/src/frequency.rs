//! Note-to-frequency conversion for wavetable playback.
//!
//! Converts MIDI notes, cents and pitch-bend values into frequencies and
//! into per-sample phase increments through a 32-entry table.

use scc_ir::TABLE_LEN;

/// MIDI note of concert A.
const A4_NOTE: f32 = 69.0;

/// Frequency of concert A in Hz.
const A4_FREQ: f32 = 440.0;

/// Largest magnitude of a signed 14-bit pitch bend.
pub const BEND_SPAN: f32 = 8192.0;

/// Equal-tempered frequency of a (possibly fractional) MIDI note.
pub fn note_to_frequency(note: f32) -> f32 {
    A4_FREQ * libm::exp2f((note - A4_NOTE) / 12.0)
}

/// Frequency multiplier for a pitch offset in cents.
pub fn cents_to_ratio(cents: f32) -> f32 {
    libm::exp2f(cents / 1200.0)
}

/// Frequency multiplier for a signed 14-bit bend over `range_semitones`.
pub fn bend_to_ratio(bend: i16, range_semitones: f32) -> f32 {
    let normalized = (bend as f32 / BEND_SPAN).clamp(-1.0, 1.0);
    libm::exp2f(normalized * range_semitones / 12.0)
}

/// Table-phase increment per output sample for `freq`.
pub fn frequency_to_increment(freq: f32, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    TABLE_LEN as f32 * freq / sample_rate as f32
}

/// Phase increment for a MIDI note.
pub fn note_to_increment(note: u8, sample_rate: u32) -> f32 {
    frequency_to_increment(note_to_frequency(note as f32), sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn a4_is_440() {
        assert!(close(note_to_frequency(69.0), 440.0, 1e-3));
    }

    #[test]
    fn middle_c() {
        assert!(close(note_to_frequency(60.0), 261.6256, 1e-2));
    }

    #[test]
    fn octave_up_doubles_increment() {
        let base = note_to_increment(48, SAMPLE_RATE);
        let up = note_to_increment(60, SAMPLE_RATE);
        assert!(close(up, base * 2.0, 1e-5));
    }

    #[test]
    fn increment_scales_with_table_length() {
        // One cycle per second walks 32 entries per second
        let inc = frequency_to_increment(1.0, SAMPLE_RATE);
        assert!(close(inc * SAMPLE_RATE as f32, 32.0, 1e-3));
    }

    #[test]
    fn zero_sample_rate_returns_zero() {
        assert_eq!(frequency_to_increment(440.0, 0), 0.0);
    }

    #[test]
    fn center_bend_is_unity() {
        assert_eq!(bend_to_ratio(0, 2.0), 1.0);
    }

    #[test]
    fn full_bend_reaches_range() {
        let up = bend_to_ratio(8191, 2.0);
        assert!(close(up, cents_to_ratio(200.0), 1e-3));
        let down = bend_to_ratio(-8192, 2.0);
        assert!(close(down, cents_to_ratio(-200.0), 1e-6));
    }

    #[test]
    fn wider_bend_range() {
        let down = bend_to_ratio(-8192, 12.0);
        assert!(close(down, 0.5, 1e-6));
    }

    #[test]
    fn cents_hundred_is_semitone() {
        assert!(close(cents_to_ratio(100.0), 1.059463, 1e-5));
    }
}

//! Runtime evaluator for quantized ADSR envelopes.

use scc_ir::{level_gain, ms_to_samples, EnvelopeDef, MAX_LEVEL};

const TOP: f32 = MAX_LEVEL as f32;

/// Envelope lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopePhase {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// Per-sample level steps for one envelope definition at one sample rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeRates {
    attack_step: f32,
    decay_step: f32,
    release_step: f32,
    sustain_level: u8,
}

impl EnvelopeRates {
    /// Convert millisecond timings into per-sample level steps.
    /// Zero-length segments complete in a single sample.
    pub fn new(def: &EnvelopeDef, sample_rate: u32) -> Self {
        let sustain = def.sustain_level.min(MAX_LEVEL);
        Self {
            attack_step: step(TOP, ms_to_samples(def.attack_ms, sample_rate)),
            decay_step: step(TOP - sustain as f32, ms_to_samples(def.decay_ms, sample_rate)),
            release_step: step(TOP, ms_to_samples(def.release_ms, sample_rate)),
            sustain_level: sustain,
        }
    }

    pub fn sustain_level(&self) -> u8 {
        self.sustain_level
    }
}

impl Default for EnvelopeRates {
    fn default() -> Self {
        Self::new(&EnvelopeDef::default(), 44100)
    }
}

fn step(span: f32, samples: u32) -> f32 {
    if samples == 0 { TOP + 1.0 } else { span / samples as f32 }
}

/// Runtime state for a playing envelope.
///
/// The level accumulates fractionally but is reported as an integer 0-15.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeState {
    phase: EnvelopePhase,
    /// Fractional level accumulator, 0.0-15.0
    level: f32,
    rates: EnvelopeRates,
}

impl EnvelopeState {
    /// Create an idle envelope with the given rates.
    pub fn new(rates: EnvelopeRates) -> Self {
        Self { phase: EnvelopePhase::Idle, level: 0.0, rates }
    }

    /// Restart from level 0 in the attack phase.
    pub fn trigger(&mut self) {
        self.level = 0.0;
        self.phase = EnvelopePhase::Attack;
    }

    /// Take over another envelope's phase and level (legato hand-off).
    /// Keeps this envelope's own rates.
    pub fn continue_from(&mut self, other: &EnvelopeState) {
        self.phase = other.phase;
        self.level = other.level;
        if matches!(self.phase, EnvelopePhase::Idle | EnvelopePhase::Finished) {
            self.trigger();
        }
    }

    /// Enter the release phase from any live phase.
    pub fn release(&mut self) {
        if matches!(self.phase, EnvelopePhase::Idle | EnvelopePhase::Finished) {
            return;
        }
        self.phase = EnvelopePhase::Release;
    }

    /// Drop straight to silence (used when a voice is stolen).
    pub fn kill(&mut self) {
        self.level = 0.0;
        self.phase = EnvelopePhase::Finished;
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    /// Quantized output level, 0-15.
    pub fn level(&self) -> u8 {
        (libm::floorf(self.level) as i32).clamp(0, MAX_LEVEL as i32) as u8
    }

    /// Linear gain for the current level.
    pub fn gain(&self) -> f32 {
        level_gain(self.level())
    }

    /// Whether the envelope produces sound (or will again).
    pub fn is_live(&self) -> bool {
        !matches!(self.phase, EnvelopePhase::Idle | EnvelopePhase::Finished)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == EnvelopePhase::Finished
    }

    /// Advance by one sample.
    pub fn advance(&mut self) {
        let sustain = self.rates.sustain_level as f32;
        match self.phase {
            EnvelopePhase::Idle | EnvelopePhase::Finished | EnvelopePhase::Sustain => {}
            EnvelopePhase::Attack => {
                self.level += self.rates.attack_step;
                if self.level >= TOP {
                    self.level = TOP;
                    self.phase = if sustain >= TOP {
                        EnvelopePhase::Sustain
                    } else {
                        EnvelopePhase::Decay
                    };
                }
            }
            EnvelopePhase::Decay => {
                self.level -= self.rates.decay_step;
                if self.level <= sustain {
                    self.level = sustain;
                    self.phase = EnvelopePhase::Sustain;
                }
            }
            EnvelopePhase::Release => {
                self.level -= self.rates.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.phase = EnvelopePhase::Finished;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 1000; // 1 sample per ms keeps the arithmetic readable

    fn env(attack: f32, decay: f32, sustain: i32, release: f32) -> EnvelopeState {
        EnvelopeState::new(EnvelopeRates::new(&EnvelopeDef::new(attack, decay, sustain, release), SR))
    }

    fn run(state: &mut EnvelopeState, samples: usize) {
        for _ in 0..samples {
            state.advance();
        }
    }

    #[test]
    fn idle_until_triggered() {
        let mut e = env(10.0, 10.0, 8, 10.0);
        run(&mut e, 5);
        assert_eq!(e.phase(), EnvelopePhase::Idle);
        assert_eq!(e.level(), 0);
    }

    #[test]
    fn attack_reaches_top_then_decays_to_sustain() {
        let mut e = env(15.0, 7.0, 8, 10.0);
        e.trigger();
        run(&mut e, 15);
        assert_eq!(e.level(), 15);
        assert_eq!(e.phase(), EnvelopePhase::Decay);
        run(&mut e, 7);
        assert_eq!(e.level(), 8);
        assert_eq!(e.phase(), EnvelopePhase::Sustain);
        run(&mut e, 1000);
        assert_eq!(e.level(), 8);
    }

    #[test]
    fn attack_is_monotonic() {
        let mut e = env(30.0, 10.0, 4, 10.0);
        e.trigger();
        let mut prev = 0;
        for _ in 0..30 {
            e.advance();
            assert!(e.level() >= prev);
            prev = e.level();
        }
    }

    #[test]
    fn full_sustain_skips_decay() {
        let mut e = env(1.0, 100.0, 15, 10.0);
        e.trigger();
        run(&mut e, 1);
        assert_eq!(e.phase(), EnvelopePhase::Sustain);
        assert_eq!(e.level(), 15);
    }

    #[test]
    fn zero_times_complete_in_one_sample() {
        let mut e = env(0.0, 0.0, 5, 0.0);
        e.trigger();
        run(&mut e, 1);
        assert_eq!(e.level(), 15);
        run(&mut e, 1);
        assert_eq!(e.phase(), EnvelopePhase::Sustain);
        e.release();
        run(&mut e, 1);
        assert!(e.is_finished());
    }

    #[test]
    fn release_from_sustain_finishes_after_release_time() {
        let mut e = env(0.0, 0.0, 15, 30.0);
        e.trigger();
        run(&mut e, 2);
        e.release();
        // 15 levels over 30 samples at the full level
        run(&mut e, 29);
        assert_eq!(e.phase(), EnvelopePhase::Release);
        run(&mut e, 1);
        assert!(e.is_finished());
        assert_eq!(e.level(), 0);
    }

    #[test]
    fn release_during_attack_starts_from_current_level() {
        let mut e = env(15.0, 10.0, 10, 15.0);
        e.trigger();
        run(&mut e, 6);
        let at = e.level();
        e.release();
        e.advance();
        assert!(e.level() < at);
    }

    #[test]
    fn release_ignored_when_idle_or_finished() {
        let mut e = env(1.0, 1.0, 1, 1.0);
        e.release();
        assert_eq!(e.phase(), EnvelopePhase::Idle);
        e.trigger();
        e.kill();
        e.release();
        assert_eq!(e.phase(), EnvelopePhase::Finished);
    }

    #[test]
    fn level_stays_within_bounds_every_sample() {
        let mut e = env(3.0, 5.0, 7, 4.0);
        e.trigger();
        for i in 0..40 {
            if i == 20 {
                e.release();
            }
            e.advance();
            assert!(e.level() <= 15);
            assert!((0.0..=1.0).contains(&e.gain()));
        }
        assert!(e.is_finished());
    }

    #[test]
    fn continue_from_copies_phase_and_level() {
        let mut a = env(10.0, 10.0, 9, 10.0);
        a.trigger();
        run(&mut a, 30);
        let mut b = env(50.0, 50.0, 9, 50.0);
        b.continue_from(&a);
        assert_eq!(b.phase(), EnvelopePhase::Sustain);
        assert_eq!(b.level(), 9);
    }

    #[test]
    fn continue_from_finished_retriggers() {
        let mut a = env(10.0, 10.0, 9, 10.0);
        a.kill();
        let mut b = env(10.0, 10.0, 9, 10.0);
        b.continue_from(&a);
        assert_eq!(b.phase(), EnvelopePhase::Attack);
    }
}

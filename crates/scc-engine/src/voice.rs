//! Voice: one wavetable oscillator or drum generator with its envelope.

use core::f32::consts::TAU;

use scc_ir::{wrap_phase, DrumType, Instrument, Vibrato, Wavetable, WavetableKey};

use crate::envelope_state::{EnvelopeRates, EnvelopeState};
use crate::frame::{Frame, PanGains};
use crate::frequency::{cents_to_ratio, frequency_to_increment, note_to_increment};

/// Fraction of the remaining distance a portamento glide covers per sample.
pub const GLIDE_COEFF: f32 = 0.0015;

/// Relative distance at which a glide snaps to its target.
const GLIDE_EPSILON: f32 = 1e-4;

/// Frequency of the tone blended into the start of a snare.
const SNARE_TONE_HZ: f32 = 200.0;

/// Length of the snare tone blend.
const SNARE_TONE_MS: f32 = 10.0;

/// Share of raw noise mixed back into a crash after the high-pass.
const CRASH_RAW_MIX: f32 = 0.3;

/// Who is holding the voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Held by a key.
    #[default]
    Active,
    /// Key released while the sustain pedal was down.
    Sustained,
    /// Note-off received; envelope releasing.
    Released,
}

/// Channel-level values a voice picks up when it starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelMix {
    /// `volume * expression`
    pub gain: f32,
    /// Channel pan offset, already scaled
    pub pan: f32,
    /// Pitch bend multiplier
    pub bend_ratio: f32,
}

impl Default for ChannelMix {
    fn default() -> Self {
        Self { gain: 1.0, pan: 0.0, bend_ratio: 1.0 }
    }
}

/// A note to start on a voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteStart {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    /// Render sample index of the note-on
    pub at: u64,
    /// Transpose/detune multiplier for melodic voices
    pub pitch_ratio: f32,
    pub sample_rate: u32,
}

#[derive(Clone, Copy, Debug)]
struct VibratoState {
    rate: f32,
    depth_cents: f32,
    fade_samples: f32,
    lfo_phase: f32,
}

impl VibratoState {
    fn new(v: &Vibrato, sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        Self {
            rate: v.rate_hz.max(0.0) / sr,
            depth_cents: v.depth_cents,
            fade_samples: v.fade_ms.max(0.0) * sr / 1000.0,
            lfo_phase: 0.0,
        }
    }

    fn next_ratio(&mut self, age: u64) -> f32 {
        let fade = if self.fade_samples <= 0.0 {
            1.0
        } else {
            (age as f32 / self.fade_samples).min(1.0)
        };
        let ratio = cents_to_ratio(self.depth_cents * fade * libm::sinf(TAU * self.lfo_phase));
        self.lfo_phase += self.rate;
        self.lfo_phase -= libm::floorf(self.lfo_phase);
        ratio
    }
}

#[derive(Clone, Copy, Debug)]
struct DrumState {
    kind: DrumType,
    start_inc: f32,
    end_inc: f32,
    sweep_samples: f32,
    elapsed: u32,
    prev_raw: f32,
    tone_inc: f32,
    tone_phase: f32,
    tone_samples: f32,
}

impl DrumState {
    fn new(kind: DrumType, sample_rate: u32) -> Self {
        let sweep = kind.sweep();
        let sr = sample_rate.max(1) as f32;
        Self {
            kind,
            start_inc: frequency_to_increment(sweep.start_hz, sample_rate),
            end_inc: frequency_to_increment(sweep.end_hz, sample_rate),
            sweep_samples: sweep.duration_ms * sr / 1000.0,
            elapsed: 0,
            prev_raw: 0.0,
            tone_inc: SNARE_TONE_HZ / sr,
            tone_phase: 0.0,
            tone_samples: SNARE_TONE_MS * sr / 1000.0,
        }
    }

    /// Exponential sweep from start to end, then held at the end.
    fn increment(&self) -> f32 {
        if self.sweep_samples <= 0.0 || self.start_inc <= 0.0 {
            return self.end_inc;
        }
        let t = (self.elapsed as f32 / self.sweep_samples).min(1.0);
        self.start_inc * libm::powf(self.end_inc / self.start_inc, t)
    }

    fn shape(&mut self, raw: f32) -> f32 {
        let out = match self.kind {
            DrumType::Snare if (self.elapsed as f32) < self.tone_samples => {
                let w = 1.0 - self.elapsed as f32 / self.tone_samples;
                let tone = libm::sinf(TAU * self.tone_phase);
                self.tone_phase += self.tone_inc;
                self.tone_phase -= libm::floorf(self.tone_phase);
                raw * (1.0 - 0.5 * w) + tone * 0.5 * w
            }
            DrumType::HiHat => (raw - self.prev_raw) * 0.5,
            DrumType::Crash => {
                (raw - self.prev_raw) * 0.5 * (1.0 - CRASH_RAW_MIX) + raw * CRASH_RAW_MIX
            }
            _ => raw,
        };
        self.prev_raw = raw;
        self.elapsed = self.elapsed.saturating_add(1);
        out
    }
}

/// A single voice slot. Slots are reused for the whole render.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Is the voice producing audio?
    pub active: bool,
    /// Who holds the voice.
    pub state: VoiceState,
    /// Owning channel, 0-15
    pub channel: u8,
    pub note: u8,
    /// Velocity scaled to 0-1
    pub velocity: f32,
    /// Render sample index of the note-on
    pub started_at: u64,
    /// Samples rendered since the note-on
    pub age: u64,
    pub envelope: EnvelopeState,
    pub wavetable: WavetableKey,
    phase: f32,
    increment: f32,
    target_increment: f32,
    gliding: bool,
    bend_ratio: f32,
    vibrato: Option<VibratoState>,
    drum: Option<DrumState>,
    instrument_gain: f32,
    channel_gain: f32,
    slot_pan: f32,
    instrument_pan: f32,
    channel_pan: f32,
    pan: PanGains,
}

impl Voice {
    /// Create an idle voice with a fixed per-slot pan.
    pub fn new(slot_pan: f32) -> Self {
        Self {
            active: false,
            state: VoiceState::Active,
            channel: 0,
            note: 0,
            velocity: 0.0,
            started_at: 0,
            age: 0,
            envelope: EnvelopeState::default(),
            wavetable: WavetableKey::default(),
            phase: 0.0,
            increment: 0.0,
            target_increment: 0.0,
            gliding: false,
            bend_ratio: 1.0,
            vibrato: None,
            drum: None,
            instrument_gain: 1.0,
            channel_gain: 1.0,
            slot_pan,
            instrument_pan: 0.0,
            channel_pan: 0.0,
            pan: PanGains::from_pan(slot_pan),
        }
    }

    /// Configure the voice for `instrument` and trigger its envelope.
    pub fn start(&mut self, instrument: &Instrument, start: NoteStart, mix: ChannelMix) {
        self.active = true;
        self.state = VoiceState::Active;
        self.channel = start.channel;
        self.note = start.note;
        self.velocity = start.velocity.min(127) as f32 / 127.0;
        self.started_at = start.at;
        self.age = 0;
        self.wavetable = instrument.wavetable;
        self.envelope = EnvelopeState::new(EnvelopeRates::new(&instrument.envelope, start.sample_rate));
        self.envelope.trigger();
        self.phase = 0.0;
        self.gliding = false;
        self.instrument_gain = instrument.gain.max(0.0);
        self.channel_gain = mix.gain;
        self.instrument_pan = instrument.pan_offset;
        self.channel_pan = mix.pan;
        self.update_pan();

        match instrument.drum {
            Some(kind) => {
                let drum = DrumState::new(kind, start.sample_rate);
                self.increment = drum.start_inc;
                self.target_increment = drum.start_inc;
                self.drum = Some(drum);
                self.vibrato = None;
                self.bend_ratio = 1.0;
            }
            None => {
                let inc = note_to_increment(start.note, start.sample_rate) * start.pitch_ratio;
                self.increment = inc;
                self.target_increment = inc;
                self.drum = None;
                self.vibrato = instrument.vibrato.map(|v| VibratoState::new(&v, start.sample_rate));
                self.bend_ratio = mix.bend_ratio;
            }
        }
    }

    /// Begin a portamento glide from `increment` toward this voice's pitch,
    /// carrying on the oscillator phase and envelope of the previous note.
    pub fn glide_from(&mut self, increment: f32, phase: f32, envelope: &EnvelopeState) {
        if self.drum.is_some() || increment <= 0.0 {
            return;
        }
        self.increment = increment;
        self.phase = phase;
        self.gliding =
            libm::fabsf(self.target_increment - increment) > self.target_increment * GLIDE_EPSILON;
        self.envelope.continue_from(envelope);
    }

    /// Base phase increment before bend and vibrato.
    pub fn increment(&self) -> f32 {
        self.increment
    }

    /// Increment the voice is heading to.
    pub fn target_increment(&self) -> f32 {
        self.target_increment
    }

    pub fn is_gliding(&self) -> bool {
        self.gliding
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn is_drum(&self) -> bool {
        self.drum.is_some()
    }

    /// Key released: start the envelope release.
    pub fn release(&mut self) {
        self.envelope.release();
        self.state = VoiceState::Released;
    }

    /// Key released with the pedal down: keep sounding.
    pub fn sustain(&mut self) {
        self.state = VoiceState::Sustained;
    }

    /// Silence immediately and free the slot.
    pub fn kill(&mut self) {
        self.envelope.kill();
        self.active = false;
        self.gliding = false;
    }

    pub fn set_channel_gain(&mut self, gain: f32) {
        self.channel_gain = gain;
    }

    pub fn set_channel_pan(&mut self, pan: f32) {
        self.channel_pan = pan;
        self.update_pan();
    }

    pub fn set_bend_ratio(&mut self, ratio: f32) {
        if self.drum.is_none() {
            self.bend_ratio = ratio;
        }
    }

    pub fn pan_gains(&self) -> PanGains {
        self.pan
    }

    fn update_pan(&mut self) {
        self.pan = PanGains::from_pan(self.slot_pan + self.instrument_pan + self.channel_pan);
    }

    /// Samples since the note started, as seen at sample `now`.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Linear gain the voice is currently producing at.
    pub fn current_gain(&self) -> f32 {
        if !self.active {
            return 0.0;
        }
        self.envelope.gain() * self.velocity * self.channel_gain * self.instrument_gain
    }

    /// Render one frame and advance every per-sample state once.
    pub fn render(&mut self, table: &Wavetable) -> Frame {
        if !self.active {
            return Frame::silence();
        }

        let raw = match self.drum.as_mut() {
            Some(drum) => {
                let inc = drum.increment();
                let raw = table.sample(self.phase);
                self.phase = wrap_phase(self.phase + inc);
                self.increment = inc;
                drum.shape(raw)
            }
            None => {
                self.advance_glide();
                let mut inc = self.increment * self.bend_ratio;
                if let Some(vibrato) = self.vibrato.as_mut() {
                    inc *= vibrato.next_ratio(self.age);
                }
                let raw = table.sample(self.phase);
                self.phase = wrap_phase(self.phase + inc);
                raw
            }
        };

        let out = Frame::panned(raw * self.current_gain(), self.pan);

        self.envelope.advance();
        self.age += 1;
        if self.envelope.is_finished() {
            self.active = false;
        }
        out
    }

    fn advance_glide(&mut self) {
        if !self.gliding {
            return;
        }
        self.increment += (self.target_increment - self.increment) * GLIDE_COEFF;
        if libm::fabsf(self.target_increment - self.increment) <= self.target_increment * GLIDE_EPSILON {
            self.increment = self.target_increment;
            self.gliding = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scc_ir::{EnvelopeDef, WavetableBank};

    const SR: u32 = 44100;

    fn bank() -> WavetableBank {
        WavetableBank::with_builtins()
    }

    fn instrument(bank: &WavetableBank, table: &str) -> Instrument {
        Instrument::new(bank.key_of(table).unwrap(), EnvelopeDef::new(0.0, 0.0, 15, 10.0))
    }

    fn note(n: u8) -> NoteStart {
        NoteStart { channel: 0, note: n, velocity: 127, at: 0, pitch_ratio: 1.0, sample_rate: SR }
    }

    fn started(bank: &WavetableBank, inst: &Instrument, n: u8) -> Voice {
        let mut v = Voice::new(0.0);
        v.start(inst, note(n), ChannelMix::default());
        v
    }

    #[test]
    fn idle_voice_is_silent() {
        let bank = bank();
        let table = bank.get(bank.key_of("saw").unwrap()).unwrap();
        let mut v = Voice::new(0.0);
        assert_eq!(v.render(table), Frame::silence());
    }

    #[test]
    fn started_voice_produces_sound() {
        let bank = bank();
        let inst = instrument(&bank, "pulse50");
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = started(&bank, &inst, 69);
        let mut energy = 0.0;
        for _ in 0..200 {
            let f = v.render(table);
            energy += f.left.abs() + f.right.abs();
        }
        assert!(energy > 1.0);
    }

    #[test]
    fn increment_matches_formula() {
        let bank = bank();
        let inst = instrument(&bank, "sine");
        let v = started(&bank, &inst, 69);
        let expected = 32.0 * 440.0 / SR as f32;
        assert!((v.increment() - expected).abs() < 1e-4);
    }

    #[test]
    fn pitch_ratio_scales_melodic_increment() {
        let bank = bank();
        let inst = instrument(&bank, "sine");
        let mut v = Voice::new(0.0);
        v.start(&inst, NoteStart { pitch_ratio: 2.0, ..note(57) }, ChannelMix::default());
        let reference = started(&bank, &inst, 69);
        assert!((v.increment() - reference.increment()).abs() < 1e-4);
    }

    #[test]
    fn release_finishes_and_deactivates() {
        let bank = bank();
        let inst = instrument(&bank, "triangle");
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = started(&bank, &inst, 60);
        v.render(table);
        v.release();
        assert_eq!(v.state, VoiceState::Released);
        // 10 ms release at 44.1 kHz
        for _ in 0..450 {
            v.render(table);
        }
        assert!(!v.active);
    }

    #[test]
    fn kill_is_immediate() {
        let bank = bank();
        let inst = instrument(&bank, "saw");
        let mut v = started(&bank, &inst, 60);
        v.kill();
        assert!(!v.active);
        assert_eq!(v.current_gain(), 0.0);
    }

    #[test]
    fn gain_combines_velocity_channel_and_instrument() {
        let bank = bank();
        let mut inst = instrument(&bank, "saw");
        inst.gain = 0.5;
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = Voice::new(0.0);
        v.start(&inst, NoteStart { velocity: 127, ..note(60) }, ChannelMix { gain: 0.8, ..Default::default() });
        v.render(table); // attack completes in one sample
        assert!((v.current_gain() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn glide_moves_monotonically_to_target() {
        let bank = bank();
        let mut inst = instrument(&bank, "sine");
        inst.portamento = true;
        let table = bank.get(inst.wavetable).unwrap();
        let from = started(&bank, &inst, 60);
        let mut v = started(&bank, &inst, 64);
        v.glide_from(from.increment(), from.phase(), &from.envelope);
        assert!(v.is_gliding());
        assert_eq!(v.increment(), from.increment());

        let mut prev = v.increment();
        for _ in 0..20_000 {
            v.render(table);
            assert!(v.increment() >= prev);
            assert!(v.increment() <= v.target_increment());
            prev = v.increment();
        }
        assert!(!v.is_gliding());
        assert_eq!(v.increment(), v.target_increment());
    }

    #[test]
    fn vibrato_leaves_base_increment_alone() {
        let bank = bank();
        let mut inst = instrument(&bank, "sine");
        inst.vibrato = Some(Vibrato { rate_hz: 6.0, depth_cents: 50.0, fade_ms: 100.0 });
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = started(&bank, &inst, 69);
        let base = v.increment();
        // The base increment is untouched by vibrato
        for _ in 0..10_000 {
            v.render(table);
        }
        assert_eq!(v.increment(), base);
    }

    #[test]
    fn drum_sweeps_downward() {
        let bank = bank();
        let mut inst = instrument(&bank, "noise");
        inst.drum = Some(DrumType::Kick);
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = started(&bank, &inst, 36);
        assert!(v.is_drum());
        v.render(table);
        let early = v.increment();
        for _ in 0..10_000 {
            v.render(table);
        }
        assert!(v.increment() < early);
        let end = frequency_to_increment(DrumType::Kick.sweep().end_hz, SR);
        assert!((v.increment() - end).abs() < 1e-4);
    }

    #[test]
    fn drums_ignore_bend() {
        let bank = bank();
        let mut inst = instrument(&bank, "noise");
        inst.drum = Some(DrumType::Snare);
        let mut v = started(&bank, &inst, 38);
        v.set_bend_ratio(2.0);
        assert_eq!(v.bend_ratio, 1.0);
    }

    #[test]
    fn hihat_output_stays_bounded() {
        let bank = bank();
        let mut inst = instrument(&bank, "noise");
        inst.drum = Some(DrumType::HiHat);
        let table = bank.get(inst.wavetable).unwrap();
        let mut v = started(&bank, &inst, 42);
        for _ in 0..2000 {
            let f = v.render(table);
            assert!(f.left.abs() <= 1.0 && f.right.abs() <= 1.0);
        }
    }

    #[test]
    fn channel_pan_moves_image() {
        let bank = bank();
        let inst = instrument(&bank, "saw");
        let mut v = started(&bank, &inst, 60);
        v.set_channel_pan(-0.6);
        let g = v.pan_gains();
        assert!(g.left > g.right);
    }
}

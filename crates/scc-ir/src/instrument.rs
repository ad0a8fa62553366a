//! Instrument and instrument-map types.

use alloc::collections::BTreeMap;

use crate::envelope::EnvelopeDef;
use crate::wavetable::{WavetableBank, WavetableKey, FALLBACK_TABLE, NOISE_TABLE};

/// The MIDI channel (zero-based) reserved for percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Drum voice flavour, selecting the sweep and post-processing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrumType {
    Kick,
    Snare,
    HiHat,
    Crash,
    Tom,
    #[default]
    Default,
}

/// Start/end frequency of a drum's pitch sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrumSweep {
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_ms: f32,
}

impl DrumType {
    /// Parse a drum type name; unknown names map to `Default`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "kick" => DrumType::Kick,
            "snare" => DrumType::Snare,
            "hihat" | "hi-hat" | "hat" => DrumType::HiHat,
            "crash" | "cymbal" => DrumType::Crash,
            "tom" => DrumType::Tom,
            _ => DrumType::Default,
        }
    }

    /// Fixed pitch sweep for this drum type.
    pub fn sweep(self) -> DrumSweep {
        let (start_hz, end_hz, duration_ms) = match self {
            DrumType::Kick => (160.0, 45.0, 80.0),
            DrumType::Snare => (1800.0, 900.0, 50.0),
            DrumType::HiHat => (9000.0, 7000.0, 30.0),
            DrumType::Crash => (7000.0, 4000.0, 300.0),
            DrumType::Tom => (300.0, 120.0, 120.0),
            DrumType::Default => (1200.0, 600.0, 60.0),
        };
        DrumSweep { start_hz, end_hz, duration_ms }
    }
}

/// Pitch LFO settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vibrato {
    pub rate_hz: f32,
    pub depth_cents: f32,
    /// Fade-in ramp length from note start
    pub fade_ms: f32,
}

impl Default for Vibrato {
    fn default() -> Self {
        Self { rate_hz: 5.5, depth_cents: 20.0, fade_ms: 250.0 }
    }
}

/// A fully resolved instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Instrument {
    pub wavetable: WavetableKey,
    pub envelope: EnvelopeDef,
    pub vibrato: Option<Vibrato>,
    pub portamento: bool,
    pub gain: f32,
    /// Added to the slot and channel pan, -1..1
    pub pan_offset: f32,
    /// `Some` for percussion voices
    pub drum: Option<DrumType>,
}

impl Instrument {
    /// A melodic instrument with neutral settings.
    pub fn new(wavetable: WavetableKey, envelope: EnvelopeDef) -> Self {
        Self {
            wavetable,
            envelope,
            vibrato: None,
            portamento: false,
            gain: 1.0,
            pan_offset: 0.0,
            drum: None,
        }
    }

    pub fn is_drum(&self) -> bool {
        self.drum.is_some()
    }
}

/// Program and drum-note bindings plus the wavetables they reference.
///
/// Resolution is total: every program and every drum note yields an
/// instrument, falling back to `defaults`.
#[derive(Clone, Debug)]
pub struct InstrumentMap {
    bank: WavetableBank,
    programs: BTreeMap<u8, Instrument>,
    drums: BTreeMap<u8, Instrument>,
    drum_default: Option<Instrument>,
    defaults: Instrument,
    drum_fallback: Instrument,
}

impl InstrumentMap {
    /// Create a map with no bindings. Every lookup resolves to `defaults`.
    pub fn new(bank: WavetableBank, defaults: Instrument) -> Self {
        let drum_fallback = Self::drum_from_defaults(&bank, &defaults);
        Self {
            bank,
            programs: BTreeMap::new(),
            drums: BTreeMap::new(),
            drum_default: None,
            defaults,
            drum_fallback,
        }
    }

    /// Builtin wavetables with a 50% pulse default instrument.
    pub fn with_builtins() -> Self {
        let bank = WavetableBank::with_builtins();
        let key = bank.key_of(FALLBACK_TABLE).unwrap_or_default();
        Self::new(bank, Instrument::new(key, EnvelopeDef::default()))
    }

    fn drum_from_defaults(bank: &WavetableBank, defaults: &Instrument) -> Instrument {
        let mut inst = defaults.clone();
        if let Some(noise) = bank.key_of(NOISE_TABLE) {
            inst.wavetable = noise;
        }
        inst.vibrato = None;
        inst.portamento = false;
        inst.drum = Some(DrumType::Default);
        inst
    }

    pub fn bank(&self) -> &WavetableBank {
        &self.bank
    }

    pub fn defaults(&self) -> &Instrument {
        &self.defaults
    }

    /// Bind a melodic program (0-127).
    pub fn set_program(&mut self, program: u8, instrument: Instrument) {
        self.programs.insert(program.min(127), instrument);
    }

    /// Bind a drum note (0-127). The instrument is forced to be a drum.
    pub fn set_drum(&mut self, note: u8, mut instrument: Instrument) {
        instrument.drum.get_or_insert(DrumType::Default);
        self.drums.insert(note.min(127), instrument);
    }

    /// Bind the drum used for notes without their own entry.
    pub fn set_drum_default(&mut self, mut instrument: Instrument) {
        instrument.drum.get_or_insert(DrumType::Default);
        self.drum_default = Some(instrument);
    }

    /// Melodic instrument for `program`.
    pub fn resolve_program(&self, program: u8) -> &Instrument {
        self.programs.get(&program).unwrap_or(&self.defaults)
    }

    /// Percussion instrument for drum `note`.
    pub fn resolve_drum(&self, note: u8) -> &Instrument {
        self.drums
            .get(&note)
            .or(self.drum_default.as_ref())
            .unwrap_or(&self.drum_fallback)
    }

    /// Instrument a note-on on `channel` should play.
    pub fn resolve(&self, channel: u8, program: u8, note: u8) -> &Instrument {
        if channel == PERCUSSION_CHANNEL {
            self.resolve_drum(note)
        } else {
            self.resolve_program(program)
        }
    }

    /// Every instrument the map can resolve.
    fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.programs
            .values()
            .chain(self.drums.values())
            .chain(self.drum_default.iter())
            .chain(core::iter::once(&self.defaults))
            .chain(core::iter::once(&self.drum_fallback))
    }

    /// Longest release time across every instrument the map can resolve.
    pub fn longest_release_ms(&self) -> f32 {
        self.instruments().map(|inst| inst.envelope.release_ms).fold(0.0, f32::max)
    }

    /// Longest attack plus decay, i.e. the time any note needs to reach its
    /// sustain level.
    pub fn longest_onset_ms(&self) -> f32 {
        self.instruments()
            .map(|inst| inst.envelope.attack_ms + inst.envelope.decay_ms)
            .fold(0.0, f32::max)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn drum_count(&self) -> usize {
        self.drums.len()
    }
}

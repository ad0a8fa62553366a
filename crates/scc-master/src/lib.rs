//! Headless controller for the SCC wavetable synth.
//!
//! Owns the loaded instrument map and the engine, and provides the
//! load / render / export API that the CLI (or any other host) drives.

mod config;
mod error;

use std::path::Path;

use scc_engine::{Engine, EngineConfig};

// Re-export common types so callers don't need scc-ir/scc-formats directly.
pub use config::{validate, ChorusSection, HighShelfSection, LowPassSection, SynthConfig};
pub use error::SynthError;
pub use scc_formats::{ExportOptions, FormatError};
pub use scc_ir::{InstrumentMap, MidiSequence, RenderOptions, RenderResult};

/// Offline synthesizer: load an instrument map, then render sequences.
pub struct Synth {
    config: EngineConfig,
    engine: Option<Engine>,
}

impl Synth {
    pub fn new() -> Self {
        Self { config: EngineConfig::default(), engine: None }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, SynthError> {
        config::validate(&config)?;
        Ok(Self { config, engine: None })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the engine settings, keeping any loaded map.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), SynthError> {
        config::validate(&config)?;
        self.config = config;
        if let Some(engine) = self.engine.take() {
            self.engine = Some(Engine::new(engine.map().clone(), config));
        }
        Ok(())
    }

    // --- Instrument map ---

    /// Install an instrument map. Must succeed before `render`.
    pub fn load(&mut self, map: InstrumentMap) -> Result<(), SynthError> {
        if map.bank().is_empty() {
            return Err(SynthError::InvalidInstrumentMap("no wavetables".into()));
        }
        log::debug!(
            "instrument map installed: {} programs, {} drums",
            map.program_count(),
            map.drum_count()
        );
        self.engine = Some(Engine::new(map, self.config));
        Ok(())
    }

    pub fn load_instrument_map_json(&mut self, text: &str) -> Result<(), SynthError> {
        let map = scc_formats::parse_instrument_map(text)?;
        self.load(map)
    }

    pub fn load_instrument_map_file(&mut self, path: impl AsRef<Path>) -> Result<(), SynthError> {
        let text = std::fs::read_to_string(path)?;
        self.load_instrument_map_json(&text)
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn instrument_map(&self) -> Option<&InstrumentMap> {
        self.engine.as_ref().map(Engine::map)
    }

    // --- Offline rendering ---

    /// Render a whole performance into memory.
    pub fn render(
        &mut self,
        sequence: &MidiSequence,
        options: &RenderOptions,
    ) -> Result<RenderResult, SynthError> {
        check_options(options)?;
        let engine = self.engine.as_mut().ok_or(SynthError::EngineNotReady)?;
        if sequence.division == 0 {
            return Err(SynthError::InvalidMidiInput("division must be positive".into()));
        }
        let result = engine.render(sequence, options);
        log::debug!(
            "rendered {:.2}s ({} frames, peak {:.3})",
            result.duration,
            result.frames(),
            result.peak()
        );
        Ok(result)
    }

    /// Parse a JSON MIDI sequence and render it.
    pub fn render_midi_json(
        &mut self,
        text: &str,
        options: &RenderOptions,
    ) -> Result<RenderResult, SynthError> {
        let sequence = scc_formats::parse_midi_json(text)?;
        self.render(&sequence, options)
    }

    // --- Export ---

    /// Encode a render as dithered 16-bit stereo WAV.
    pub fn export_wav(result: &RenderResult) -> Result<Vec<u8>, SynthError> {
        Self::export_wav_with(result, &ExportOptions::default())
    }

    pub fn export_wav_with(
        result: &RenderResult,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, SynthError> {
        Ok(scc_formats::export_wav(result, options)?)
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new()
    }
}

fn check_options(options: &RenderOptions) -> Result<(), SynthError> {
    if !(options.speed.is_finite() && options.speed > 0.0) {
        return Err(SynthError::InvalidOptions(format!(
            "speed must be a positive number, got {}",
            options.speed
        )));
    }
    if !options.fine_detune.is_finite() {
        return Err(SynthError::InvalidOptions("fine detune must be finite".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scc_ir::MidiEventKind;

    fn small_config() -> EngineConfig {
        let mut cfg = EngineConfig { sample_rate: 8000, ..EngineConfig::default() };
        cfg.lowpass.cutoff_hz = 3_500.0;
        cfg.high_shelf.freq_hz = 2_000.0;
        cfg
    }

    fn one_note() -> MidiSequence {
        let mut seq = MidiSequence::new(96);
        seq.push(0, MidiEventKind::NoteOn { channel: 0, note: 60, velocity: 100 });
        seq.push(96, MidiEventKind::NoteOff { channel: 0, note: 60 });
        seq
    }

    #[test]
    fn render_before_load_is_not_ready() {
        let mut synth = Synth::new();
        let err = synth.render(&one_note(), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, SynthError::EngineNotReady));
    }

    #[test]
    fn render_after_load_produces_audio() {
        let mut synth = Synth::with_config(small_config()).unwrap();
        synth.load(InstrumentMap::with_builtins()).unwrap();
        let result = synth.render(&one_note(), &RenderOptions::default()).unwrap();
        assert_eq!(result.sample_rate, 8000);
        assert_eq!(result.left.len(), result.right.len());
        assert!(result.frames() > 4000);
        assert!(result.peak() > 0.01);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut synth = Synth::with_config(small_config()).unwrap();
        synth.load(InstrumentMap::with_builtins()).unwrap();
        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let opts = RenderOptions { speed, ..Default::default() };
            assert!(matches!(
                synth.render(&one_note(), &opts),
                Err(SynthError::InvalidOptions(_))
            ));
        }
        let opts = RenderOptions { fine_detune: f32::NAN, ..Default::default() };
        assert!(matches!(synth.render(&one_note(), &opts), Err(SynthError::InvalidOptions(_))));
    }

    #[test]
    fn zero_division_is_invalid_midi() {
        let mut synth = Synth::with_config(small_config()).unwrap();
        synth.load(InstrumentMap::with_builtins()).unwrap();
        let seq = MidiSequence::new(0);
        assert!(matches!(
            synth.render(&seq, &RenderOptions::default()),
            Err(SynthError::InvalidMidiInput(_))
        ));
    }

    #[test]
    fn format_errors_keep_their_category() {
        let mut synth = Synth::new();
        assert!(matches!(synth.load_instrument_map_json("{"), Err(SynthError::Json(_))));
        assert!(matches!(
            synth.load_instrument_map_json("[]"),
            Err(SynthError::InvalidInstrumentMap(_))
        ));
        assert!(!synth.is_loaded());

        synth.load_instrument_map_json("{}").unwrap();
        assert!(matches!(
            synth.render_midi_json(r#"{ "events": [] }"#, &RenderOptions::default()),
            Err(SynthError::InvalidMidiInput(_))
        ));
    }

    #[test]
    fn missing_map_file_is_io() {
        let mut synth = Synth::new();
        assert!(matches!(
            synth.load_instrument_map_file("/nonexistent/scc/map.json"),
            Err(SynthError::Io(_))
        ));
    }

    #[test]
    fn set_config_keeps_the_map() {
        let mut synth = Synth::new();
        synth.load(InstrumentMap::with_builtins()).unwrap();
        synth.set_config(small_config()).unwrap();
        assert!(synth.is_loaded());
        let result = synth.render(&one_note(), &RenderOptions::default()).unwrap();
        assert_eq!(result.sample_rate, 8000);
        assert!(synth
            .set_config(EngineConfig { sample_rate: 0, ..EngineConfig::default() })
            .is_err());
    }

    #[test]
    fn export_length_matches_frames() {
        let mut synth = Synth::with_config(small_config()).unwrap();
        synth.load(InstrumentMap::with_builtins()).unwrap();
        let result = synth.render(&one_note(), &RenderOptions::default()).unwrap();
        let wav = Synth::export_wav(&result).unwrap();
        assert_eq!(wav.len(), 44 + result.frames() * 4);
    }
}

//! File-backed engine configuration.

use std::path::Path;

use scc_engine::EngineConfig;
use serde::Deserialize;

use crate::SynthError;

/// JSON mirror of [`EngineConfig`]. Absent fields keep the engine defaults.
///
/// ```json
/// { "sampleRate": 48000, "masterGain": 0.25, "chorus": { "mix": 0.1 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    pub sample_rate: Option<u32>,
    pub master_gain: Option<f32>,
    pub bend_range_semitones: Option<f32>,
    pub max_duration_secs: Option<f64>,
    pub chorus: ChorusSection,
    pub lowpass: LowPassSection,
    pub high_shelf: HighShelfSection,
    pub soft_clip_drive: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChorusSection {
    pub delay_ms: Option<f32>,
    pub mix: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LowPassSection {
    pub cutoff_hz: Option<f32>,
    pub q: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HighShelfSection {
    pub freq_hz: Option<f32>,
    pub gain_db: Option<f32>,
}

impl SynthConfig {
    pub fn from_json(text: &str) -> Result<Self, SynthError> {
        serde_json::from_str(text).map_err(|e| SynthError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Overlay onto the engine defaults and check the result.
    pub fn engine_config(&self) -> Result<EngineConfig, SynthError> {
        let mut cfg = EngineConfig::default();
        if let Some(v) = self.sample_rate {
            cfg.sample_rate = v;
        }
        if let Some(v) = self.master_gain {
            cfg.master_gain = v;
        }
        if let Some(v) = self.bend_range_semitones {
            cfg.bend_range_semitones = v;
        }
        if let Some(v) = self.max_duration_secs {
            cfg.max_duration_secs = v;
        }
        if let Some(v) = self.chorus.delay_ms {
            cfg.chorus.delay_ms = v;
        }
        if let Some(v) = self.chorus.mix {
            cfg.chorus.mix = v;
        }
        if let Some(v) = self.lowpass.cutoff_hz {
            cfg.lowpass.cutoff_hz = v;
        }
        if let Some(v) = self.lowpass.q {
            cfg.lowpass.q = v;
        }
        if let Some(v) = self.high_shelf.freq_hz {
            cfg.high_shelf.freq_hz = v;
        }
        if let Some(v) = self.high_shelf.gain_db {
            cfg.high_shelf.gain_db = v;
        }
        if let Some(v) = self.soft_clip_drive {
            cfg.soft_clip_drive = v;
        }
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Reject settings the engine cannot render with.
pub fn validate(cfg: &EngineConfig) -> Result<(), SynthError> {
    let bad = |what: &str| Err(SynthError::InvalidConfig(what.to_string()));
    if !(8_000..=192_000).contains(&cfg.sample_rate) {
        return bad("sampleRate must be between 8000 and 192000");
    }
    if !(cfg.master_gain.is_finite() && cfg.master_gain >= 0.0) {
        return bad("masterGain must be a non-negative number");
    }
    if !(cfg.bend_range_semitones.is_finite() && cfg.bend_range_semitones >= 0.0) {
        return bad("bendRangeSemitones must be a non-negative number");
    }
    if !(cfg.max_duration_secs.is_finite() && cfg.max_duration_secs > 0.0) {
        return bad("maxDurationSecs must be positive");
    }
    if !(cfg.chorus.delay_ms.is_finite() && cfg.chorus.delay_ms >= 0.0) {
        return bad("chorus.delayMs must be a non-negative number");
    }
    if !(0.0..=1.0).contains(&cfg.chorus.mix) {
        return bad("chorus.mix must be between 0 and 1");
    }
    let nyquist = cfg.sample_rate as f32 / 2.0;
    if !(cfg.lowpass.cutoff_hz > 0.0 && cfg.lowpass.cutoff_hz < nyquist) {
        return bad("lowpass.cutoffHz must be between 0 and Nyquist");
    }
    if !(cfg.lowpass.q.is_finite() && cfg.lowpass.q > 0.0) {
        return bad("lowpass.q must be positive");
    }
    if !(cfg.high_shelf.freq_hz > 0.0 && cfg.high_shelf.freq_hz < nyquist) {
        return bad("highShelf.freqHz must be between 0 and Nyquist");
    }
    if !cfg.high_shelf.gain_db.is_finite() {
        return bad("highShelf.gainDb must be a number");
    }
    if !(cfg.soft_clip_drive.is_finite() && cfg.soft_clip_drive > 0.0) {
        return bad("softClipDrive must be positive");
    }
    Ok(())
}

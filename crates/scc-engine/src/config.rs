//! Engine configuration.

/// Chorus settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChorusConfig {
    pub delay_ms: f32,
    /// Cross-feed amount, 0-1
    pub mix: f32,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self { delay_ms: 12.0, mix: 0.04 }
    }
}

/// Low-pass settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowPassConfig {
    pub cutoff_hz: f32,
    pub q: f32,
}

impl Default for LowPassConfig {
    fn default() -> Self {
        Self { cutoff_hz: 12_000.0, q: 0.7 }
    }
}

/// High-shelf settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighShelfConfig {
    pub freq_hz: f32,
    pub gain_db: f32,
}

impl Default for HighShelfConfig {
    fn default() -> Self {
        Self { freq_hz: 6_000.0, gain_db: 2.0 }
    }
}

/// Everything the engine needs besides the instrument map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Applied to the voice mix before mastering
    pub master_gain: f32,
    pub bend_range_semitones: f32,
    /// Renders longer than this are truncated
    pub max_duration_secs: f64,
    pub chorus: ChorusConfig,
    pub lowpass: LowPassConfig,
    pub high_shelf: HighShelfConfig,
    pub soft_clip_drive: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            master_gain: 0.3,
            bend_range_semitones: 2.0,
            max_duration_secs: 600.0,
            chorus: ChorusConfig::default(),
            lowpass: LowPassConfig::default(),
            high_shelf: HighShelfConfig::default(),
            soft_clip_drive: 1.5,
        }
    }
}

use scc_formats::FormatError;
use thiserror::Error;

/// Everything that can go wrong between loading a map and exporting audio.
#[derive(Debug, Error)]
pub enum SynthError {
    /// `render` was called before an instrument map was loaded
    #[error("engine not ready: load an instrument map first")]
    EngineNotReady,
    #[error("malformed JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("invalid instrument map: {0}")]
    InvalidInstrumentMap(String),
    #[error("invalid MIDI input: {0}")]
    InvalidMidiInput(String),
    #[error("invalid render options: {0}")]
    InvalidOptions(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FormatError> for SynthError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Json(e) => SynthError::Json(e),
            FormatError::InvalidInstrumentMap(msg) => SynthError::InvalidInstrumentMap(msg),
            FormatError::InvalidMidiInput(msg) => SynthError::InvalidMidiInput(msg),
            FormatError::InvalidWav(msg) => {
                SynthError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
            }
            FormatError::Io(e) => SynthError::Io(e),
        }
    }
}
